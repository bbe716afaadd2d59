//! Schema description extracted from a SQLite database.
//!
//! The description grounds the model: it is the text of every
//! `CREATE TABLE` statement stored in `sqlite_master`, one per line, in the
//! order the engine reports them. It is rebuilt for every request.
//!
//! # Example
//!
//! ```no_run
//! use sql_query_generator::schema::load_schema;
//!
//! let schema = load_schema("movies.db").unwrap();
//! println!("{} tables\n{}", schema.table_count(), schema);
//! ```

use std::{fmt, path::Path};

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::{AppResult, connection_error};

/// Concatenated table definitions of one database
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDescription {
    text:        String,
    table_count: usize
}

impl SchemaDescription {
    /// Build from table definitions, skipping missing or blank ones
    pub fn from_definitions<I, S>(definitions: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>
    {
        let mut text = String::new();
        let mut table_count = 0;
        for definition in definitions.into_iter().flatten() {
            let definition = definition.as_ref();
            if definition.trim().is_empty() {
                continue;
            }
            if table_count > 0 {
                text.push('\n');
            }
            text.push_str(definition);
            table_count += 1;
        }
        Self {
            text,
            table_count
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn table_count(&self) -> usize {
        self.table_count
    }
}

impl fmt::Display for SchemaDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Read every table definition of the database at `path`.
///
/// # Errors
///
/// Returns a connection error if the file does not exist, is not a
/// database, or cannot be queried. A database without tables yields an
/// empty description.
pub fn load_schema(path: impl AsRef<Path>) -> AppResult<SchemaDescription> {
    let path = path.as_ref();
    let db = path.display().to_string();
    let conn = open_read_only(path)?;
    let definitions = {
        let mut stmt = conn
            .prepare("SELECT sql FROM sqlite_master WHERE type = 'table'")
            .map_err(|e| connection_error(&db, e))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, Option<String>>(0))
            .map_err(|e| connection_error(&db, e))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| connection_error(&db, e))?
    };
    conn.close().map_err(|(_, e)| connection_error(&db, e))?;
    let schema = SchemaDescription::from_definitions(definitions);
    debug!(path = %db, tables = schema.table_count(), "loaded schema");
    Ok(schema)
}

/// Table names with their exact case, in engine order
pub fn list_tables(path: impl AsRef<Path>) -> AppResult<Vec<String>> {
    let path = path.as_ref();
    let db = path.display().to_string();
    let conn = open_read_only(path)?;
    let names = {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")
            .map_err(|e| connection_error(&db, e))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| connection_error(&db, e))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| connection_error(&db, e))?
    };
    conn.close().map_err(|(_, e)| connection_error(&db, e))?;
    Ok(names)
}

fn open_read_only(path: &Path) -> AppResult<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
    )
    .map_err(|e| connection_error(&path.display().to_string(), e))
}
