use std::fmt;

use serde::Serialize;

use crate::sanitize::clean_sql_output;

/// Model completion together with the SQL recovered from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedQuery {
    /// Completion text exactly as returned by the service
    pub raw:   String,
    /// Sanitized statement text
    pub sql:   String,
    /// Model identifier that produced the completion
    pub model: String
}

impl GeneratedQuery {
    /// Build from a raw completion, running the sanitizer once
    pub fn from_completion(model: impl Into<String>, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let sql = clean_sql_output(&raw);
        Self {
            raw,
            sql,
            model: model.into()
        }
    }
}

/// Statement that passed the syntax check.
///
/// Only the validator constructs this type, so the executor can never run
/// text that was not validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedQuery {
    sql:        String,
    query_type: QueryType
}

impl ValidatedQuery {
    pub(crate) fn new(sql: String, query_type: QueryType) -> Self {
        Self {
            sql,
            query_type
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn query_type(&self) -> &QueryType {
        &self.query_type
    }
}

/// Type of SQL statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Drop,
    Other
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => write!(f, "SELECT"),
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Create => write!(f, "CREATE"),
            Self::Drop => write!(f, "DROP"),
            Self::Other => write!(f, "OTHER")
        }
    }
}
