//! Guard policy integration tests.
//!
//! Exercises the published guarantees of the guard as a black box: rejection
//! rules in order, limit injection, and idempotence.

use tradequery::guard::{GuardPolicy, GuardRejection, QueryGuard};

fn guard() -> QueryGuard {
    QueryGuard::new(GuardPolicy::default())
}

#[test]
fn terminator_followed_by_text_is_always_multiple_statements() {
    for sql in [
        "SELECT * FROM countries_lpi; DROP TABLE countries_lpi",
        "SELECT 1; SELECT 2",
        "select country from countries_lpi ; select 1",
        "SELECT * FROM countries_lpi;--",
    ] {
        assert_eq!(
            guard().guard(sql).unwrap_err(),
            GuardRejection::MultipleStatements,
            "for {sql:?}"
        );
    }
}

#[test]
fn comment_markers_anywhere_are_rejected() {
    for sql in [
        "SELECT * FROM countries_lpi -- LIMIT 1",
        "-- leading comment",
        "SELECT /* block */ country FROM countries_lpi",
        "*/",
    ] {
        assert_eq!(
            guard().guard(sql).unwrap_err(),
            GuardRejection::CommentSyntax,
            "for {sql:?}"
        );
    }
}

#[test]
fn first_keyword_must_be_select() {
    for sql in [
        "INSERT INTO countries_lpi VALUES (1)",
        "DROP TABLE countries_lpi",
        "EXPLAIN SELECT * FROM countries_lpi",
        "  with x as (select 1) select * from x",
        "TRUNCATE countries_lpi",
    ] {
        assert_eq!(
            guard().guard(sql).unwrap_err(),
            GuardRejection::NotSelect,
            "for {sql:?}"
        );
    }
}

#[test]
fn accepted_statement_without_limit_gets_the_configured_cap() {
    let guarded = guard()
        .guard("SELECT country, lpi_score FROM countries_lpi WHERE lpi_score > 3.0")
        .unwrap();
    assert!(guarded.sql.ends_with("LIMIT 200"));
    assert!(guarded.default_limit_applied);
}

#[test]
fn statements_with_their_own_limit_are_unchanged() {
    let sql = "SELECT country FROM countries_lpi ORDER BY lpi_score DESC LIMIT 5";
    let guarded = guard().guard(sql).unwrap();
    assert_eq!(guarded.sql, sql);
    assert!(!guarded.default_limit_applied);
}

#[test]
fn aggregating_statements_are_unchanged() {
    for sql in [
        "SELECT region, AVG(lpi_score) FROM countries_lpi GROUP BY region",
        "SELECT COUNT(*) FROM countries_lpi",
        "SELECT MAX(year) FROM countries_lpi",
    ] {
        let guarded = guard().guard(sql).unwrap();
        assert_eq!(guarded.sql, sql, "for {sql:?}");
        assert!(!guarded.default_limit_applied, "for {sql:?}");
    }
}

#[test]
fn guarding_is_idempotent() {
    let first = guard()
        .guard("SELECT country FROM countries_lpi")
        .unwrap();
    let second = guard().guard(&first.sql).unwrap();
    assert_eq!(second.sql, first.sql);
    assert!(!second.default_limit_applied);
}

#[test]
fn catalog_references_never_survive() {
    assert!(matches!(
        guard()
            .guard("SELECT table_name FROM information_schema.tables")
            .unwrap_err(),
        GuardRejection::ForbiddenKeyword(ref kw) if kw == "information_schema"
    ));
}

#[test]
fn only_the_permitted_table_may_be_referenced() {
    assert_eq!(
        guard().guard("SELECT * FROM users LIMIT 1").unwrap_err(),
        GuardRejection::TableNotAllowed("users".to_string())
    );
    assert_eq!(
        guard().guard("SELECT 1").unwrap_err(),
        GuardRejection::NoTableReference
    );
    assert!(guard()
        .guard("SELECT * FROM \"public\".\"countries_lpi\" LIMIT 1")
        .is_ok());
}

#[test]
fn custom_policy_table_is_honored() {
    let policy = GuardPolicy {
        table: "inventory".to_string(),
        ..GuardPolicy::default()
    };
    let guard = QueryGuard::new(policy);

    assert!(guard.guard("SELECT * FROM inventory LIMIT 1").is_ok());
    assert_eq!(
        guard.guard("SELECT * FROM countries_lpi LIMIT 1").unwrap_err(),
        GuardRejection::TableNotAllowed("countries_lpi".to_string())
    );
}
