//! # SQL Query Generator Library
//!
//! Natural-language to SQL over a SQLite database: the schema is read from
//! the database, a hosted model turns the question into SQL, the answer is
//! sanitized and syntax-checked, and only then executed.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod llm;
pub mod output;
pub mod query;
pub mod sanitize;
pub mod schema;
pub mod validator;
