//! Logging configuration for tradequery.

use tracing_subscriber::EnvFilter;

/// Initializes logging to stderr, honoring `RUST_LOG` when set.
///
/// stdout is reserved for the JSON answer, so diagnostics go to stderr.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
