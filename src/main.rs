//! tradequery: natural-language questions answered over a single guarded dataset.

use anyhow::Context;
use tracing::error;

use tradequery::cli::Cli;
use tradequery::config::Config;
use tradequery::dataset::RestDatasetSource;
use tradequery::llm::{OpenRouterClient, OpenRouterConfig};
use tradequery::logging;
use tradequery::service::QueryService;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init_stderr_logging();

    if let Err(e) = run().await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    let mut config = Config::load_from_file(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    config.apply_env_overrides();
    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
    }
    config.validate()?;

    let llm = OpenRouterClient::new(OpenRouterConfig::new(
        config.llm.api_key.clone(),
        config.llm.model.clone(),
    ))?;
    let dataset = RestDatasetSource::new(&config.dataset, &config.guard.table)?;
    let service = QueryService::new(&llm, &dataset, config.guard.clone());

    let answer = service
        .answer(&cli.question())
        .await
        .context("Failed to answer question")?;

    let output = if cli.pretty {
        serde_json::to_string_pretty(&answer)?
    } else {
        serde_json::to_string(&answer)?
    };
    println!("{output}");

    Ok(())
}
