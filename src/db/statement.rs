//! SQL statement classification.
//!
//! The façade passes arbitrary SQL through to the driver, but it must decide
//! up front whether a statement produces rows (fetched with a row cap) or not
//! (executed for its affected row count). Classification uses
//! [sqlparser](https://docs.rs/sqlparser/) with the connection's dialect and
//! falls back to the leading keyword when the text does not parse.

use crate::models::DatabaseType;
use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

/// Whether a statement returns a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// SELECT, WITH, VALUES, EXPLAIN, SHOW, PRAGMA, DML with RETURNING ...
    Rows,
    /// DML, DDL, transaction control and everything else
    NoRows,
}

impl StatementKind {
    pub fn returns_rows(&self) -> bool {
        matches!(self, Self::Rows)
    }
}

/// Keywords that start a row-returning statement, used when parsing fails.
const ROW_KEYWORDS: &[&str] = &[
    "SELECT", "WITH", "VALUES", "EXPLAIN", "PRAGMA", "SHOW", "DESCRIBE", "DESC", "TABLE",
];

/// Statements that return rows only with a RETURNING clause.
const DML_KEYWORDS: &[&str] = &["INSERT", "UPDATE", "DELETE"];

fn get_dialect(db_type: DatabaseType) -> Box<dyn Dialect> {
    match db_type {
        DatabaseType::PostgreSQL => Box::new(PostgreSqlDialect {}),
        DatabaseType::MySQL => Box::new(MySqlDialect {}),
        DatabaseType::SQLite => Box::new(SQLiteDialect {}),
    }
}

/// Classify `sql` for the given dialect. For scripts the last statement decides,
/// since that is the one whose result the driver hands back.
pub fn classify(sql: &str, db_type: DatabaseType) -> StatementKind {
    let dialect = get_dialect(db_type);
    match Parser::parse_sql(dialect.as_ref(), sql) {
        Ok(statements) => match statements.last() {
            Some(stmt) => classify_statement(stmt),
            None => StatementKind::NoRows,
        },
        Err(_) => classify_by_keyword(sql),
    }
}

fn classify_statement(stmt: &Statement) -> StatementKind {
    match stmt {
        Statement::Query(_)
        | Statement::Explain { .. }
        | Statement::ExplainTable { .. }
        | Statement::Pragma { .. }
        | Statement::ShowTables { .. }
        | Statement::ShowColumns { .. }
        | Statement::ShowDatabases { .. }
        | Statement::ShowSchemas { .. }
        | Statement::ShowCreate { .. }
        | Statement::ShowFunctions { .. }
        | Statement::ShowVariable { .. }
        | Statement::ShowVariables { .. }
        | Statement::ShowStatus { .. }
        | Statement::ShowCollation { .. } => StatementKind::Rows,
        Statement::Insert(insert) if insert.returning.is_some() => StatementKind::Rows,
        Statement::Update(update) if update.returning.is_some() => StatementKind::Rows,
        Statement::Delete(delete) if delete.returning.is_some() => StatementKind::Rows,
        _ => StatementKind::NoRows,
    }
}

/// Leading keyword of the statement, ignoring comments and opening parentheses.
fn classify_by_keyword(sql: &str) -> StatementKind {
    match leading_keyword(sql) {
        Some(keyword) if ROW_KEYWORDS.contains(&keyword.as_str()) => StatementKind::Rows,
        Some(keyword) if DML_KEYWORDS.contains(&keyword.as_str()) && has_returning(sql) => {
            StatementKind::Rows
        }
        _ => StatementKind::NoRows,
    }
}

fn has_returning(sql: &str) -> bool {
    sql.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|word| word.eq_ignore_ascii_case("RETURNING"))
}

fn leading_keyword(sql: &str) -> Option<String> {
    let mut rest = sql.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix("--") {
            rest = after.split_once('\n').map(|(_, r)| r).unwrap_or("").trim_start();
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.split_once("*/").map(|(_, r)| r).unwrap_or("").trim_start();
        } else if let Some(after) = rest.strip_prefix('(') {
            rest = after.trim_start();
        } else {
            break;
        }
    }
    let word: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if word.is_empty() {
        None
    } else {
        Some(word.to_ascii_uppercase())
    }
}
