//! Candidate-query validation.
//!
//! The guard is the security boundary between the generative adapter and the
//! sandbox: it accepts or rejects a model-produced statement by a fixed,
//! ordered set of syntactic and lexical rules, and injects a default row cap
//! into non-aggregating statements that lack one. It is a pure function of the
//! candidate text and an immutable policy; no I/O, no shared state.

mod tables;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Reason a candidate query was rejected, in rule order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardRejection {
    /// Nothing left after trimming whitespace and the trailing terminator.
    #[error("no SQL statement was produced")]
    EmptyStatement,

    /// A statement terminator remained inside the statement body.
    #[error("only a single SQL statement is allowed")]
    MultipleStatements,

    /// Line or block comment markers are a smuggling vector and always rejected.
    #[error("SQL comments are not allowed")]
    CommentSyntax,

    /// The statement does not start with the read-only selection keyword.
    #[error("only SELECT statements are allowed")]
    NotSelect,

    /// A forbidden keyword appeared as a whole word.
    #[error("forbidden SQL keyword detected: {0}")]
    ForbiddenKeyword(String),

    /// The statement did not parse as a single query; never assumed safe.
    #[error("statement could not be parsed: {0}")]
    Unparseable(String),

    /// The statement references no table at all.
    #[error("no table reference found")]
    NoTableReference,

    /// The statement references a table outside the allowlist.
    #[error("table reference is not permitted: {0}")]
    TableNotAllowed(String),
}

/// Policy data the guard enforces. Lives in the `[guard]` config section so
/// the keyword and phrase sets can be audited and tuned without code changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardPolicy {
    /// Row cap appended to non-aggregating statements without a LIMIT clause.
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    /// The single table statements may reference.
    #[serde(default = "default_table")]
    pub table: String,

    /// Keywords rejected anywhere in the statement (whole-word, case-insensitive).
    #[serde(default = "default_forbidden_keywords")]
    pub forbidden_keywords: Vec<String>,

    /// Prompt-injection phrases stripped from questions before generation.
    #[serde(default = "default_injection_phrases")]
    pub injection_phrases: Vec<String>,
}

fn default_limit() -> u32 {
    200
}

fn default_table() -> String {
    "countries_lpi".to_string()
}

fn default_forbidden_keywords() -> Vec<String> {
    [
        // Mutation and DDL verbs
        "insert",
        "update",
        "delete",
        "drop",
        "alter",
        "truncate",
        "create",
        // Privilege verbs
        "grant",
        "revoke",
        // Procedure invocation
        "execute",
        "call",
        // SELECT INTO would materialize a second table
        "into",
        // Sandbox engine escape hatches (the sandbox is SQLite)
        "attach",
        "detach",
        "pragma",
        // Catalog/metadata schemas
        "pg_catalog",
        "information_schema",
        "sqlite_master",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_injection_phrases() -> Vec<String> {
    [
        "ignore previous instructions",
        "system prompt",
        "developer mode",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            table: default_table(),
            forbidden_keywords: default_forbidden_keywords(),
            injection_phrases: default_injection_phrases(),
        }
    }
}

/// A statement that survived every guard rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardedSql {
    /// The statement text, possibly with an injected LIMIT clause.
    pub sql: String,
    /// True when the guard appended the default row cap.
    pub default_limit_applied: bool,
}

/// The policy engine. Construct once, reuse across requests; evaluation is
/// pure and side-effect free.
#[derive(Debug)]
pub struct QueryGuard {
    policy: GuardPolicy,
    select_re: Regex,
    limit_re: Regex,
    keyword_res: Vec<(String, Regex)>,
}

impl QueryGuard {
    /// Creates a guard for the given policy, precompiling keyword patterns.
    pub fn new(policy: GuardPolicy) -> Self {
        let keyword_res = policy
            .forbidden_keywords
            .iter()
            .filter_map(|kw| {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(kw));
                match Regex::new(&pattern) {
                    Ok(re) => Some((kw.clone(), re)),
                    Err(e) => {
                        warn!("Skipping unusable forbidden keyword {kw:?}: {e}");
                        None
                    }
                }
            })
            .collect();

        Self {
            policy,
            select_re: Regex::new(r"(?i)^select\b").expect("static pattern"),
            limit_re: Regex::new(r"(?i)\blimit\s+\d+\b").expect("static pattern"),
            keyword_res,
        }
    }

    /// Returns the policy this guard enforces.
    pub fn policy(&self) -> &GuardPolicy {
        &self.policy
    }

    /// Evaluates a candidate statement against every rule, first failure wins.
    ///
    /// Accepted statements come back as [`GuardedSql`], with the default row
    /// cap appended when the statement is non-aggregating and has none of its
    /// own. Feeding an accepted statement back through yields it unchanged.
    pub fn guard(&self, candidate: &str) -> Result<GuardedSql, GuardRejection> {
        let cleaned = strip_statement(candidate);

        if cleaned.is_empty() {
            return Err(GuardRejection::EmptyStatement);
        }
        if cleaned.contains(';') {
            return Err(GuardRejection::MultipleStatements);
        }
        if cleaned.contains("--") || cleaned.contains("/*") || cleaned.contains("*/") {
            return Err(GuardRejection::CommentSyntax);
        }
        if !self.select_re.is_match(&cleaned) {
            return Err(GuardRejection::NotSelect);
        }
        if let Some(keyword) = self.find_forbidden_keyword(&cleaned) {
            return Err(GuardRejection::ForbiddenKeyword(keyword));
        }

        tables::check_table_references(&cleaned, &self.policy.table)?;

        if !is_aggregating(&cleaned) && !self.limit_re.is_match(&cleaned) {
            return Ok(GuardedSql {
                sql: format!("{} LIMIT {}", cleaned, self.policy.default_limit),
                default_limit_applied: true,
            });
        }

        Ok(GuardedSql {
            sql: cleaned,
            default_limit_applied: false,
        })
    }

    /// Returns the first forbidden keyword present as a whole word, if any.
    fn find_forbidden_keyword(&self, sql: &str) -> Option<String> {
        self.keyword_res
            .iter()
            .find(|(_, re)| re.is_match(sql))
            .map(|(kw, _)| kw.clone())
    }
}

/// Trims surrounding whitespace and at most one trailing statement terminator.
fn strip_statement(sql: &str) -> String {
    let cleaned = sql.trim();
    cleaned
        .strip_suffix(';')
        .map(|s| s.trim_end())
        .unwrap_or(cleaned)
        .to_string()
}

/// Detects aggregating statements: aggregate-function tokens or a grouping
/// clause, checked over a whitespace-collapsed lowercase rendering so line
/// breaks inside "group by" are still caught.
fn is_aggregating(sql: &str) -> bool {
    let compact = sql
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    ["count(", "avg(", "sum(", "min(", "max(", "group by"]
        .iter()
        .any(|token| compact.contains(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn guard() -> QueryGuard {
        QueryGuard::new(GuardPolicy::default())
    }

    fn accept(sql: &str) -> GuardedSql {
        guard()
            .guard(sql)
            .unwrap_or_else(|r| panic!("expected accept for {sql:?}, got {r}"))
    }

    fn reject(sql: &str) -> GuardRejection {
        guard()
            .guard(sql)
            .expect_err(&format!("expected reject for {sql:?}"))
    }

    // Rule 1: empty input

    #[test]
    fn test_empty_candidate_is_rejected() {
        assert_eq!(reject(""), GuardRejection::EmptyStatement);
        assert_eq!(reject("   \n\t  "), GuardRejection::EmptyStatement);
        assert_eq!(reject(" ; "), GuardRejection::EmptyStatement);
    }

    // Rule 2: single statement only

    #[test]
    fn test_multiple_statements_rejected() {
        assert_eq!(
            reject("SELECT * FROM countries_lpi; DROP TABLE countries_lpi"),
            GuardRejection::MultipleStatements
        );
    }

    #[test]
    fn test_embedded_terminator_rejected() {
        assert_eq!(
            reject("SELECT * FROM countries_lpi WHERE country = 'a;b'"),
            GuardRejection::MultipleStatements
        );
    }

    #[test]
    fn test_single_trailing_terminator_is_stripped() {
        let guarded = accept("SELECT country FROM countries_lpi LIMIT 5;");
        assert_eq!(guarded.sql, "SELECT country FROM countries_lpi LIMIT 5");
    }

    // Rule 3: no comments

    #[test]
    fn test_line_comment_rejected() {
        assert_eq!(
            reject("SELECT * FROM countries_lpi -- sneak"),
            GuardRejection::CommentSyntax
        );
    }

    #[test]
    fn test_block_comment_rejected() {
        assert_eq!(
            reject("SELECT /* hidden */ * FROM countries_lpi"),
            GuardRejection::CommentSyntax
        );
        assert_eq!(
            reject("SELECT * FROM countries_lpi */"),
            GuardRejection::CommentSyntax
        );
    }

    // Rule 4: SELECT only

    #[test]
    fn test_non_select_rejected() {
        assert_eq!(
            reject("UPDATE countries_lpi SET lpi_score = 5"),
            GuardRejection::NotSelect
        );
        assert_eq!(
            reject("WITH x AS (SELECT 1) SELECT * FROM x"),
            GuardRejection::NotSelect
        );
    }

    #[test]
    fn test_select_prefix_is_case_insensitive() {
        assert!(guard().guard("select country from countries_lpi limit 1").is_ok());
        assert!(guard().guard("SeLeCt country FROM countries_lpi LIMIT 1").is_ok());
    }

    #[test]
    fn test_selecting_is_not_select() {
        // Whole-word prefix match, not a substring match.
        assert_eq!(
            reject("SELECTING * FROM countries_lpi"),
            GuardRejection::NotSelect
        );
    }

    // Rule 5: forbidden keywords, whole-word

    #[test]
    fn test_forbidden_keyword_rejected() {
        assert_eq!(
            reject("SELECT * FROM countries_lpi WHERE drop = 1"),
            GuardRejection::ForbiddenKeyword("drop".to_string())
        );
    }

    #[test]
    fn test_catalog_schema_rejected() {
        assert_eq!(
            reject("SELECT * FROM information_schema.tables"),
            GuardRejection::ForbiddenKeyword("information_schema".to_string())
        );
        assert_eq!(
            reject("SELECT * FROM pg_catalog.pg_tables"),
            GuardRejection::ForbiddenKeyword("pg_catalog".to_string())
        );
    }

    #[test]
    fn test_sqlite_escape_hatches_rejected() {
        assert_eq!(
            reject("SELECT * FROM sqlite_master"),
            GuardRejection::ForbiddenKeyword("sqlite_master".to_string())
        );
        assert_eq!(
            reject("SELECT * FROM countries_lpi WHERE pragma = 1"),
            GuardRejection::ForbiddenKeyword("pragma".to_string())
        );
    }

    #[test]
    fn test_select_into_rejected() {
        assert_eq!(
            reject("SELECT * INTO stolen FROM countries_lpi"),
            GuardRejection::ForbiddenKeyword("into".to_string())
        );
    }

    #[test]
    fn test_keyword_substring_is_not_a_match() {
        // "undropped" must not trip the whole-word "drop" rule.
        let guarded = accept("SELECT country FROM countries_lpi WHERE region = 'undropped' LIMIT 5");
        assert!(!guarded.default_limit_applied);
    }

    // Rule 6: table allowlist over the parsed AST

    #[test]
    fn test_permitted_spellings_accepted() {
        for sql in [
            "SELECT * FROM countries_lpi LIMIT 1",
            "SELECT * FROM public.countries_lpi LIMIT 1",
            "SELECT * FROM \"countries_lpi\" LIMIT 1",
            "SELECT * FROM \"public\".\"countries_lpi\" LIMIT 1",
            "SELECT c.country FROM countries_lpi c LIMIT 1",
            "SELECT * FROM Countries_LPI LIMIT 1",
        ] {
            assert!(guard().guard(sql).is_ok(), "expected accept for {sql:?}");
        }
    }

    #[test]
    fn test_foreign_table_rejected() {
        assert_eq!(
            reject("SELECT * FROM users"),
            GuardRejection::TableNotAllowed("users".to_string())
        );
    }

    #[test]
    fn test_foreign_schema_rejected() {
        assert_eq!(
            reject("SELECT * FROM other.countries_lpi"),
            GuardRejection::TableNotAllowed("other.countries_lpi".to_string())
        );
    }

    #[test]
    fn test_join_to_foreign_table_rejected() {
        assert_eq!(
            reject("SELECT * FROM countries_lpi JOIN users ON 1 = 1"),
            GuardRejection::TableNotAllowed("users".to_string())
        );
    }

    #[test]
    fn test_subquery_over_permitted_table_accepted() {
        let guarded = accept(
            "SELECT country, lpi_score FROM countries_lpi \
             WHERE year = (SELECT MAX(year) FROM countries_lpi) LIMIT 5",
        );
        assert!(!guarded.default_limit_applied);
    }

    #[test]
    fn test_subquery_over_foreign_table_rejected() {
        assert_eq!(
            reject(
                "SELECT country FROM countries_lpi \
                 WHERE year = (SELECT MAX(year) FROM audit_log)"
            ),
            GuardRejection::TableNotAllowed("audit_log".to_string())
        );
    }

    #[test]
    fn test_no_table_reference_rejected() {
        assert_eq!(reject("SELECT 1"), GuardRejection::NoTableReference);
    }

    #[test]
    fn test_unparseable_statement_rejected() {
        assert!(matches!(
            reject("SELECT * FROM"),
            GuardRejection::Unparseable(_)
        ));
    }

    // Rule 7: default limit injection

    #[test]
    fn test_default_limit_injected() {
        let guarded = accept("SELECT country FROM countries_lpi");
        assert_eq!(guarded.sql, "SELECT country FROM countries_lpi LIMIT 200");
        assert!(guarded.default_limit_applied);
    }

    #[test]
    fn test_configured_limit_used() {
        let mut policy = GuardPolicy::default();
        policy.default_limit = 25;
        let guarded = QueryGuard::new(policy)
            .guard("SELECT country FROM countries_lpi")
            .unwrap();
        assert_eq!(guarded.sql, "SELECT country FROM countries_lpi LIMIT 25");
        assert!(guarded.default_limit_applied);
    }

    #[test]
    fn test_existing_limit_passes_through() {
        let sql = "SELECT country FROM countries_lpi LIMIT 10";
        let guarded = accept(sql);
        assert_eq!(guarded.sql, sql);
        assert!(!guarded.default_limit_applied);
    }

    #[test]
    fn test_aggregating_statement_passes_through() {
        let sql = "SELECT region, AVG(lpi_score) FROM countries_lpi GROUP BY region";
        let guarded = accept(sql);
        assert_eq!(guarded.sql, sql);
        assert!(!guarded.default_limit_applied);
    }

    #[test]
    fn test_count_statement_passes_through() {
        let sql = "SELECT COUNT(*) FROM countries_lpi";
        let guarded = accept(sql);
        assert_eq!(guarded.sql, sql);
        assert!(!guarded.default_limit_applied);
    }

    #[test]
    fn test_group_by_across_newline_detected() {
        let sql = "SELECT region, AVG(lpi_score) FROM countries_lpi GROUP\nBY region";
        let guarded = accept(sql);
        assert!(!guarded.default_limit_applied);
    }

    #[test]
    fn test_guard_is_idempotent() {
        let first = accept("SELECT country FROM countries_lpi");
        let second = accept(&first.sql);
        assert_eq!(second.sql, first.sql);
        assert!(!second.default_limit_applied);
    }

    #[test]
    fn test_comma_join_to_foreign_table_rejected() {
        let rejection = guard()
            .guard("SELECT scores FROM countries_lpi, extra LIMIT 1")
            .unwrap_err();
        assert_eq!(
            rejection,
            GuardRejection::TableNotAllowed("extra".to_string())
        );
    }

    #[test]
    fn test_rejection_messages_are_stable() {
        assert_eq!(
            GuardRejection::MultipleStatements.to_string(),
            "only a single SQL statement is allowed"
        );
        assert_eq!(
            GuardRejection::CommentSyntax.to_string(),
            "SQL comments are not allowed"
        );
        assert_eq!(
            GuardRejection::ForbiddenKeyword("drop".into()).to_string(),
            "forbidden SQL keyword detected: drop"
        );
        assert_eq!(
            GuardRejection::TableNotAllowed("users".into()).to_string(),
            "table reference is not permitted: users"
        );
    }
}
