//! Syntax-only SQL validation.
//!
//! The check never touches a database: table and column names, types and
//! semantics are only verified when the statement is executed. A statement
//! is valid when the text holds exactly one statement that `sqlparser`
//! accepts for the configured dialect.
//!
//! The parser grammar is narrower than SQLite's (`GLOB`, `PRAGMA`,
//! `INDEXED BY`, `IS NOT <expr>`). When parsing fails, text that opens with
//! a statement keyword and holds a single statement is still accepted and
//! the engine decides at execution. Empty input, bare terminators and prose
//! stay invalid.
//!
//! # Example
//!
//! ```
//! use sql_query_generator::{query::SqlDialect, validator::validate_sql};
//!
//! let ok = validate_sql("SELECT * FROM director WHERE birth_year < 1980;", SqlDialect::SQLite);
//! assert!(ok.is_valid);
//!
//! let empty = validate_sql("", SqlDialect::SQLite);
//! assert!(!empty.is_valid);
//! ```

use serde::Serialize;
use sqlparser::{
    dialect::Dialect,
    parser::Parser,
    tokenizer::{Token, Tokenizer}
};
use tracing::debug;

use crate::{
    error::{AppResult, format_sql_error, validation_error},
    query::{QueryType, SqlDialect, ValidatedQuery, classify_statement}
};

/// Message reported for a statement that parses
pub const VALID_MESSAGE: &str = "SQL is valid";

/// Outcome of the syntax check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub message:  String
}

impl ValidationResult {
    fn valid() -> Self {
        Self {
            is_valid: true,
            message:  VALID_MESSAGE.to_string()
        }
    }

    fn invalid(message: String) -> Self {
        Self {
            is_valid: false,
            message
        }
    }
}

/// Check syntax and return a report
pub fn validate_sql(sql: &str, dialect: SqlDialect) -> ValidationResult {
    match check(sql, dialect) {
        Ok(_) => ValidationResult::valid(),
        Err(diagnostic) => ValidationResult::invalid(diagnostic)
    }
}

/// Check syntax and return the statement ready for execution
pub fn validate(sql: &str, dialect: SqlDialect) -> AppResult<ValidatedQuery> {
    check(sql, dialect).map_err(validation_error)
}

/// Validate, handing back both the report and (when valid) the statement
pub fn validate_with_report(
    sql: &str,
    dialect: SqlDialect
) -> (ValidationResult, Option<ValidatedQuery>) {
    match check(sql, dialect) {
        Ok(query) => (ValidationResult::valid(), Some(query)),
        Err(diagnostic) => (ValidationResult::invalid(diagnostic), None)
    }
}

fn check(sql: &str, dialect: SqlDialect) -> Result<ValidatedQuery, String> {
    let parser_dialect = dialect.into_parser_dialect();
    let statements = match Parser::parse_sql(parser_dialect.as_ref(), sql) {
        Ok(statements) => statements,
        Err(e) => {
            let diagnostic = format_sql_error("Invalid SQL syntax", &e.to_string());
            return engine_statement(sql, parser_dialect.as_ref()).ok_or(diagnostic);
        }
    };
    debug!(count = statements.len(), "parsed statements");
    match statements.as_slice() {
        [] => Err(String::from("Invalid SQL syntax: no statement found")),
        [statement] => Ok(ValidatedQuery::new(
            sql.trim().to_string(),
            classify_statement(statement)
        )),
        many => Err(format!(
            "Invalid SQL: expected a single statement, found {}",
            many.len()
        ))
    }
}

/// Statement outside the parser grammar that the engine may still run
fn engine_statement(sql: &str, dialect: &dyn Dialect) -> Option<ValidatedQuery> {
    let tokens = Tokenizer::new(dialect, sql).tokenize().ok()?;
    let mut significant = tokens
        .iter()
        .filter(|token| !matches!(token, Token::Whitespace(_)));
    let query_type = match significant.next()? {
        Token::Word(word) if word.quote_style.is_none() => statement_keyword(&word.value)?,
        _ => return None
    };
    // Only terminators may follow the first terminator
    let mut rest = significant.skip_while(|token| !matches!(token, Token::SemiColon));
    if rest.any(|token| !matches!(token, Token::SemiColon)) {
        return None;
    }
    debug!(kind = %query_type, "statement accepted outside the parser grammar");
    Some(ValidatedQuery::new(sql.trim().to_string(), query_type))
}

fn statement_keyword(word: &str) -> Option<QueryType> {
    let query_type = match word.to_ascii_uppercase().as_str() {
        "SELECT" | "WITH" | "VALUES" => QueryType::Select,
        "INSERT" | "REPLACE" => QueryType::Insert,
        "UPDATE" => QueryType::Update,
        "DELETE" => QueryType::Delete,
        "CREATE" => QueryType::Create,
        "DROP" => QueryType::Drop,
        "ALTER" | "ANALYZE" | "ATTACH" | "BEGIN" | "COMMIT" | "DETACH" | "END" | "EXPLAIN"
        | "PRAGMA" | "REINDEX" | "RELEASE" | "ROLLBACK" | "SAVEPOINT" | "VACUUM" => {
            QueryType::Other
        }
        _ => return None
    };
    Some(query_type)
}
