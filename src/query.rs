//! SQL dialects and the query types that flow through the pipeline.
//!
//! A query starts life as a [`GeneratedQuery`] (model output, sanitized once)
//! and becomes a [`ValidatedQuery`] only by passing
//! [`validate`](crate::validator::validate).

mod types;

use sqlparser::{
    ast::Statement,
    dialect::{
        ClickHouseDialect, Dialect, GenericDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect
    }
};
pub use types::{GeneratedQuery, QueryType, ValidatedQuery};

/// SQL dialect for parsing and for the prompt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum SqlDialect {
    Generic,
    MySQL,
    PostgreSQL,
    #[default]
    SQLite,
    ClickHouse
}

impl SqlDialect {
    /// Convert to sqlparser dialect for parsing
    pub fn into_parser_dialect(self) -> Box<dyn Dialect> {
        match self {
            Self::Generic => Box::new(GenericDialect {}),
            Self::MySQL => Box::new(MySqlDialect {}),
            Self::PostgreSQL => Box::new(PostgreSqlDialect {}),
            Self::SQLite => Box::new(SQLiteDialect {}),
            Self::ClickHouse => Box::new(ClickHouseDialect {})
        }
    }

    /// Name used when asking the model for a statement
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Generic => "standard SQL",
            Self::MySQL => "MySQL",
            Self::PostgreSQL => "PostgreSQL",
            Self::SQLite => "sqlite",
            Self::ClickHouse => "ClickHouse"
        }
    }
}

/// Classify a parsed statement
pub fn classify_statement(stmt: &Statement) -> QueryType {
    match stmt {
        Statement::Query { .. } => QueryType::Select,
        Statement::Insert { .. } => QueryType::Insert,
        Statement::Update { .. } => QueryType::Update,
        Statement::Delete { .. } => QueryType::Delete,
        Statement::CreateTable { .. } | Statement::CreateIndex { .. } | Statement::CreateView { .. } => {
            QueryType::Create
        }
        Statement::Drop { .. } => QueryType::Drop,
        _ => QueryType::Other
    }
}

/// True when the statement text starts with the `select` keyword.
///
/// The executor uses this textual rule, not the parsed kind, to decide
/// whether rows are fetched.
pub fn is_read_statement(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("select"))
}

#[cfg(test)]
mod tests {
    use sqlparser::parser::Parser;

    use super::*;

    fn classify(sql: &str) -> QueryType {
        let dialect = SqlDialect::SQLite.into_parser_dialect();
        let stmts = Parser::parse_sql(dialect.as_ref(), sql).unwrap();
        classify_statement(&stmts[0])
    }

    #[test]
    fn test_default_dialect_is_sqlite() {
        assert_eq!(SqlDialect::default(), SqlDialect::SQLite);
        assert_eq!(SqlDialect::default().display_name(), "sqlite");
    }

    #[test]
    fn test_classify_statements() {
        assert_eq!(classify("SELECT 1"), QueryType::Select);
        assert_eq!(classify("INSERT INTO t VALUES (1)"), QueryType::Insert);
        assert_eq!(classify("UPDATE t SET a = 1"), QueryType::Update);
        assert_eq!(classify("DELETE FROM t"), QueryType::Delete);
        assert_eq!(classify("CREATE TABLE t (a INTEGER)"), QueryType::Create);
        assert_eq!(classify("DROP TABLE t"), QueryType::Drop);
    }

    #[test]
    fn test_is_read_statement() {
        assert!(is_read_statement("SELECT * FROM t"));
        assert!(is_read_statement("  select id from t"));
        assert!(is_read_statement("SeLeCt 1"));
        assert!(!is_read_statement("INSERT INTO t VALUES (1)"));
        assert!(!is_read_statement("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(!is_read_statement("sel"));
        assert!(!is_read_statement(""));
    }

    #[test]
    fn test_dialect_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            dialect: SqlDialect
        }
        let w: Wrapper = toml::from_str("dialect = \"postgresql\"").unwrap();
        assert_eq!(w.dialect, SqlDialect::PostgreSQL);
    }
}
