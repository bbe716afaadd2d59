//! Error constructors for every failure kind of the request pipeline.
//!
//! All fallible functions return [`AppResult`]. The constructors below keep
//! the message format consistent so the CLI can print any error as-is.

pub use masterror::{AppError, AppResult};

/// Create file read error
pub fn file_read_error(path: &str, source: std::io::Error) -> AppError {
    AppError::internal(format!("Failed to read file '{}': {}", path, source))
}

/// Create file write error
pub fn file_write_error(path: &str, source: std::io::Error) -> AppError {
    AppError::internal(format!("Failed to write file '{}': {}", path, source))
}

/// Database could not be opened or introspected
pub fn connection_error(path: &str, source: rusqlite::Error) -> AppError {
    AppError::service(format!(
        "Connection error: cannot use database '{}': {}",
        path, source
    ))
}

/// SQL text failed the syntax check
pub fn validation_error(message: impl Into<String>) -> AppError {
    let msg = message.into();
    AppError::bad_request(format_sql_error("Invalid SQL", &msg))
}

/// Create LLM API error
pub fn llm_api_error(message: impl Into<String>) -> AppError {
    AppError::service(message.into())
}

/// Generation failed even after the fallback model was tried
pub fn generation_error(message: impl Into<String>) -> AppError {
    AppError::service(format!("Generation error: {}", message.into()))
}

/// Create HTTP error
pub fn http_error(err: reqwest::Error) -> AppError {
    let msg = if err.is_timeout() {
        format!("Request timeout: {}", err)
    } else if err.is_connect() {
        format!("Connection failed: {}", err)
    } else if err.is_status() {
        format!("HTTP error {}: {}", err.status().unwrap_or_default(), err)
    } else {
        err.to_string()
    };
    AppError::service(msg)
}

/// Create config error
pub fn config_error(message: impl Into<String>) -> AppError {
    AppError::bad_request(message.into())
}

/// Format SQL error with position highlighting
pub(crate) fn format_sql_error(prefix: &str, message: &str) -> String {
    // sqlparser format: "... at Line: X, Column: Y"
    if let Some(pos) = extract_position(message) {
        format!(
            "{} at line {}, column {}:\n  {}",
            prefix, pos.line, pos.column, message
        )
    } else {
        format!("{}:\n  {}", prefix, message)
    }
}

struct SqlPosition {
    line:   usize,
    column: usize
}

fn extract_position(message: &str) -> Option<SqlPosition> {
    let line_marker = "Line: ";
    let line_start = message.find(line_marker)? + line_marker.len();
    let rest = &message[line_start..];
    let line_end = rest.find(|c: char| !c.is_ascii_digit())?;
    let line = rest[..line_end].parse().ok()?;

    // Both "Column 7" and "Column: 7" appear across sqlparser releases
    let after_line = &rest[line_end..];
    let col_marker = after_line.find("Column")? + "Column".len();
    let col_digits = after_line[col_marker..].trim_start_matches([':', ' ']);
    let col_end = col_digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(col_digits.len());
    let column = col_digits[..col_end].parse().ok()?;

    Some(SqlPosition { line, column })
}
