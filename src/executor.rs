//! Execution of a validated statement against a SQLite database.
//!
//! Every call opens its own connection and closes it before returning.
//! Failures are never raised: whatever the engine reports ends up in
//! [`ExecutionResult::Failed`] so callers can display it.

mod types;

use std::path::Path;

use rusqlite::{Connection, OpenFlags, Statement};
use tracing::{debug, warn};
pub use types::{Acknowledgement, CellValue, ExecutionResult, ResultSet};

use crate::query::{SqlDialect, ValidatedQuery, is_read_statement};

/// Dialect of the engine every statement runs on; prompts and validation
/// ahead of execution use it too
pub const ENGINE_DIALECT: SqlDialect = SqlDialect::SQLite;

/// Acknowledgement text for statements that return no rows
pub const SUCCESS_MESSAGE: &str = "Query executed successfully.";

/// Run exactly one validated statement against the database at `path`.
///
/// Statements whose text starts with `select` return their rows; anything
/// else is stepped to completion and acknowledged. A pending transaction is
/// committed before the connection closes, for reads as well.
pub fn execute_query(query: &ValidatedQuery, path: impl AsRef<Path>) -> ExecutionResult {
    let path = path.as_ref();
    match try_execute(query.sql(), path) {
        Ok(result) => result,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "statement failed");
            ExecutionResult::Failed {
                message: e.to_string()
            }
        }
    }
}

fn try_execute(sql: &str, path: &Path) -> rusqlite::Result<ExecutionResult> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX
    )?;
    let result = {
        let mut stmt = conn.prepare(sql)?;
        if is_read_statement(sql) {
            ExecutionResult::Rows(fetch_rows(&mut stmt)?)
        } else {
            let mut rows = stmt.query([])?;
            while rows.next()?.is_some() {}
            ExecutionResult::Acknowledged(Acknowledgement {
                message:       SUCCESS_MESSAGE.to_string(),
                rows_affected: conn.changes() as u64
            })
        }
    };
    if !conn.is_autocommit() {
        conn.execute_batch("COMMIT")?;
    }
    conn.close().map_err(|(_, e)| e)?;
    debug!(sql, "statement executed");
    Ok(result)
}

fn fetch_rows(stmt: &mut Statement<'_>) -> rusqlite::Result<ResultSet> {
    let columns: Vec<String> = stmt
        .column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let width = columns.len();
    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(CellValue::from(row.get_ref(idx)?));
        }
        rows.push(values);
    }
    Ok(ResultSet::new(columns, rows))
}
