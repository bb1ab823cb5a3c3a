//! Table-reference allowlisting over the parsed AST.
//!
//! Builds the reference list from sqlparser's abstract syntax instead of
//! pattern-matching reference sites, so subqueries at any depth are covered
//! and unusual quoting or whitespace cannot slip a second table past the
//! check. Anything that fails to parse is rejected, never assumed safe.

use core::ops::ControlFlow;

use sqlparser::ast::{visit_relations, ObjectName, Statement};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use super::GuardRejection;

/// Verifies that the statement parses as exactly one query and that every
/// relation it references is a permitted spelling of the allowed table.
pub(super) fn check_table_references(sql: &str, table: &str) -> Result<(), GuardRejection> {
    let statements = Parser::parse_sql(&GenericDialect {}, sql)
        .map_err(|e| GuardRejection::Unparseable(e.to_string()))?;

    let statement = match statements.as_slice() {
        [] => return Err(GuardRejection::EmptyStatement),
        [statement] => statement,
        _ => return Err(GuardRejection::MultipleStatements),
    };

    if !matches!(statement, Statement::Query(_)) {
        return Err(GuardRejection::NotSelect);
    }

    let mut relations: Vec<ObjectName> = Vec::new();
    let _ = visit_relations(statement, |relation| {
        relations.push(relation.clone());
        ControlFlow::<()>::Continue(())
    });

    if relations.is_empty() {
        return Err(GuardRejection::NoTableReference);
    }

    for relation in &relations {
        if !is_permitted_reference(relation, table) {
            return Err(GuardRejection::TableNotAllowed(relation.to_string()));
        }
    }

    Ok(())
}

/// Accepts the bare table name or a `public`-qualified one, quoted or not,
/// compared case-insensitively on the unquoted identifier text.
fn is_permitted_reference(relation: &ObjectName, table: &str) -> bool {
    match relation.0.as_slice() {
        [name] => name.value.eq_ignore_ascii_case(table),
        [schema, name] => {
            schema.value.eq_ignore_ascii_case("public") && name.value.eq_ignore_ascii_case(table)
        }
        _ => false,
    }
}
