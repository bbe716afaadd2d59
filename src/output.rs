//! Rendering of generated SQL, validation reports and query results.
//!
//! Every formatter returns a `String` so the CLI decides where it goes.
//! Result sets render as an aligned text table, CSV, JSON (array of objects
//! in column order) or YAML.

use std::{fs, path::Path};

use colored::Colorize;
use serde::Serialize;

use crate::{
    app::{RequestOutcome, RunOutcome},
    error::{AppResult, file_write_error},
    executor::{CellValue, ExecutionResult, ResultSet},
    query::GeneratedQuery,
    schema::SchemaDescription,
    validator::ValidationResult
};

/// Output format for results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Csv,
    Json,
    Yaml
}

/// Output options
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format:  OutputFormat,
    pub colored: bool,
    pub verbose: bool
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format:  OutputFormat::Text,
            colored: true,
            verbose: false
        }
    }
}

#[derive(Serialize)]
struct SchemaReport<'a> {
    tables: usize,
    schema: &'a str
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn to_yaml<T: Serialize + ?Sized>(value: &T) -> String {
    serde_yaml::to_string(value).unwrap_or_default()
}

fn heading(text: &str, opts: &OutputOptions) -> String {
    if opts.colored {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

/// Format a generated query; `raw` also shows the completion as returned
pub fn format_generated(query: &GeneratedQuery, raw: bool, opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Json => to_json(query),
        OutputFormat::Yaml => to_yaml(query),
        OutputFormat::Text | OutputFormat::Csv => {
            let mut output = String::new();
            if opts.verbose {
                output.push_str(&format!("-- model: {}\n", query.model));
            }
            if raw {
                output.push_str(&heading("Raw completion:", opts));
                output.push('\n');
                output.push_str(&query.raw);
                output.push_str("\n\n");
                output.push_str(&heading("SQL:", opts));
                output.push('\n');
            }
            if opts.colored {
                output.push_str(&query.sql.cyan().to_string());
            } else {
                output.push_str(&query.sql);
            }
            output
        }
    }
}

/// Format a syntax check report
pub fn format_validation(result: &ValidationResult, opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Json => to_json(result),
        OutputFormat::Yaml => to_yaml(result),
        OutputFormat::Text | OutputFormat::Csv => match (result.is_valid, opts.colored) {
            (true, true) => result.message.green().to_string(),
            (false, true) => result.message.red().to_string(),
            _ => result.message.clone()
        }
    }
}

/// Format the result of one executed statement
pub fn format_execution(result: &ExecutionResult, opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Json => match result {
            ExecutionResult::Rows(rows) => to_json(rows),
            other => to_json(other)
        },
        OutputFormat::Yaml => match result {
            ExecutionResult::Rows(rows) => to_yaml(rows),
            other => to_yaml(other)
        },
        OutputFormat::Csv => match result {
            ExecutionResult::Rows(rows) => to_csv(rows),
            other => format_execution_text(other, opts)
        },
        OutputFormat::Text => format_execution_text(result, opts)
    }
}

fn format_execution_text(result: &ExecutionResult, opts: &OutputOptions) -> String {
    match result {
        ExecutionResult::Rows(rows) => format_table(rows, opts),
        ExecutionResult::Acknowledged(ack) => {
            let text = format!("{} ({} rows affected)", ack.message, ack.rows_affected);
            if opts.colored {
                text.green().to_string()
            } else {
                text
            }
        }
        ExecutionResult::Failed {
            message
        } => {
            let text = format!("Execution error: {}", message);
            if opts.colored {
                text.red().to_string()
            } else {
                text
            }
        }
    }
}

/// Format the outcome of validating and executing one statement
pub fn format_run_outcome(outcome: &RunOutcome, opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Json => match outcome {
            RunOutcome::Executed {
                result, ..
            } => format_execution(result, opts),
            RunOutcome::Rejected {
                ..
            } => to_json(outcome)
        },
        OutputFormat::Yaml => match outcome {
            RunOutcome::Executed {
                result, ..
            } => format_execution(result, opts),
            RunOutcome::Rejected {
                ..
            } => to_yaml(outcome)
        },
        OutputFormat::Text | OutputFormat::Csv => match outcome {
            RunOutcome::Executed {
                result, ..
            } => format_execution(result, opts),
            RunOutcome::Rejected {
                validation, ..
            } => format_validation(validation, opts)
        }
    }
}

/// Format a full request cycle: the SQL that was generated, then its result
pub fn format_request_outcome(outcome: &RequestOutcome, opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Json => to_json(outcome),
        OutputFormat::Yaml => to_yaml(outcome),
        OutputFormat::Text | OutputFormat::Csv => match outcome {
            RequestOutcome::Completed {
                generated,
                outcome
            } => {
                let sql_opts = OutputOptions {
                    format: OutputFormat::Text,
                    ..opts.clone()
                };
                format!(
                    "{}\n\n{}",
                    format_generated(generated, false, &sql_opts),
                    format_run_outcome(outcome, opts)
                )
            }
            RequestOutcome::GenerationFailed {
                message
            }
            | RequestOutcome::ConnectionFailed {
                message
            } => {
                if opts.colored {
                    message.red().to_string()
                } else {
                    message.clone()
                }
            }
        }
    }
}

/// Format the schema description
pub fn format_schema(schema: &SchemaDescription, opts: &OutputOptions) -> String {
    let report = SchemaReport {
        tables: schema.table_count(),
        schema: schema.as_str()
    };
    match opts.format {
        OutputFormat::Json => to_json(&report),
        OutputFormat::Yaml => to_yaml(&report),
        OutputFormat::Text | OutputFormat::Csv => {
            if schema.is_empty() {
                "(no tables)".to_string()
            } else {
                schema.to_string()
            }
        }
    }
}

/// Format a list of names (tables or models), one per line in text mode
pub fn format_names(title: &str, names: &[String], opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Json => to_json(names),
        OutputFormat::Yaml => to_yaml(names),
        OutputFormat::Csv => {
            let mut output = csv_quote(title);
            output.push_str("\r\n");
            for name in names {
                output.push_str(&csv_quote(name));
                output.push_str("\r\n");
            }
            output
        }
        OutputFormat::Text => {
            let mut output = heading(&format!("{} ({}):", title, names.len()), opts);
            for name in names {
                output.push_str("\n  ");
                output.push_str(name);
            }
            output
        }
    }
}

/// Render rows as an aligned table followed by a rows/columns summary
pub fn format_table(rows: &ResultSet, opts: &OutputOptions) -> String {
    let columns = rows.columns();
    let cells: Vec<Vec<String>> = rows
        .rows()
        .iter()
        .map(|row| row.iter().map(ToString::to_string).collect())
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    if !columns.is_empty() {
        let header = join_padded(columns.iter().map(String::as_str), &widths);
        if opts.colored {
            output.push_str(&header.cyan().bold().to_string());
        } else {
            output.push_str(&header);
        }
        output.push('\n');
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        output.push_str(&rule.join("-+-"));
        output.push('\n');
        for row in &cells {
            output.push_str(&join_padded(row.iter().map(String::as_str), &widths));
            output.push('\n');
        }
    }

    let summary = format!(
        "({} {}, {} {})",
        rows.len(),
        if rows.len() == 1 { "row" } else { "rows" },
        columns.len(),
        if columns.len() == 1 { "column" } else { "columns" }
    );
    if opts.colored {
        output.push_str(&summary.dimmed().to_string());
    } else {
        output.push_str(&summary);
    }
    output
}

fn join_padded<'a>(values: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let padded: Vec<String> = values
        .zip(widths)
        .map(|(value, width)| format!("{:<width$}", value, width = *width))
        .collect();
    padded.join(" | ").trim_end().to_string()
}

/// Render rows as CSV with a header line
pub fn to_csv(rows: &ResultSet) -> String {
    let mut output = String::new();
    let header: Vec<String> = rows.columns().iter().map(|c| csv_quote(c)).collect();
    output.push_str(&header.join(","));
    output.push_str("\r\n");
    for row in rows.rows() {
        let fields: Vec<String> = row.iter().map(|cell| csv_quote(&csv_field(cell))).collect();
        output.push_str(&fields.join(","));
        output.push_str("\r\n");
    }
    output
}

/// Write rows to `path` as CSV
pub fn write_csv_export(rows: &ResultSet, path: &Path) -> AppResult<()> {
    fs::write(path, to_csv(rows)).map_err(|e| file_write_error(&path.display().to_string(), e))
}

fn csv_field(cell: &CellValue) -> String {
    match cell {
        CellValue::Null => String::new(),
        other => other.to_string()
    }
}

/// Quote a CSV field per RFC 4180: enclose in double quotes if it contains a
/// comma, double quote or line break. Inner quotes are doubled.
fn csv_quote(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Acknowledgement;

    fn plain(format: OutputFormat) -> OutputOptions {
        OutputOptions {
            format,
            colored: false,
            verbose: false
        }
    }

    fn directors() -> ResultSet {
        ResultSet::new(
            vec!["id".into(), "name".into(), "birth_year".into()],
            vec![
                vec![
                    CellValue::Integer(1),
                    CellValue::Text("Christopher Nolan".into()),
                    CellValue::Integer(1970),
                ],
                vec![
                    CellValue::Integer(2),
                    CellValue::Text("Greta Gerwig".into()),
                    CellValue::Null,
                ],
            ]
        )
    }

    #[test]
    fn test_text_table() {
        let table = format_table(&directors(), &plain(OutputFormat::Text));
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "id | name              | birth_year");
        assert_eq!(lines[1], "---+-------------------+-----------");
        assert_eq!(lines[2], "1  | Christopher Nolan | 1970");
        assert_eq!(lines[3], "2  | Greta Gerwig      | NULL");
        assert_eq!(lines[4], "(2 rows, 3 columns)");
    }

    #[test]
    fn test_empty_result_summary() {
        let rows = ResultSet::new(vec!["id".into()], Vec::new());
        let table = format_table(&rows, &plain(OutputFormat::Text));
        assert!(table.ends_with("(0 rows, 1 column)"));
    }

    #[test]
    fn test_csv_quoting() {
        assert_eq!(csv_quote("plain"), "plain");
        assert_eq!(csv_quote("a,b"), "\"a,b\"");
        assert_eq!(csv_quote("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_quote("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_to_csv() {
        let rows = ResultSet::new(
            vec!["name".into(), "note".into()],
            vec![vec![CellValue::Text("Lee, Ang".into()), CellValue::Null]]
        );
        assert_eq!(to_csv(&rows), "name,note\r\n\"Lee, Ang\",\r\n");
    }

    #[test]
    fn test_json_rows_in_column_order() {
        let result = ExecutionResult::Rows(directors());
        let json = format_execution(&result, &plain(OutputFormat::Json));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["name"], "Christopher Nolan");
        assert!(value[1]["birth_year"].is_null());
        assert!(json.find("\"id\"").unwrap() < json.find("\"name\"").unwrap());
    }

    #[test]
    fn test_acknowledgement_text() {
        let result = ExecutionResult::Acknowledged(Acknowledgement {
            message:       "Query executed successfully.".into(),
            rows_affected: 1
        });
        assert_eq!(
            format_execution(&result, &plain(OutputFormat::Text)),
            "Query executed successfully. (1 rows affected)"
        );
    }

    #[test]
    fn test_failure_text() {
        let result = ExecutionResult::Failed {
            message: "no such table: actors".into()
        };
        assert_eq!(
            format_execution(&result, &plain(OutputFormat::Csv)),
            "Execution error: no such table: actors"
        );
    }

    #[test]
    fn test_generated_raw() {
        let query = GeneratedQuery::from_completion("gemini-1.5-flash", "```sql\nSELECT 1\n```");
        let text = format_generated(&query, true, &plain(OutputFormat::Text));
        assert!(text.starts_with("Raw completion:\n```sql"));
        assert!(text.ends_with("SQL:\nSELECT 1"));
        assert_eq!(format_generated(&query, false, &plain(OutputFormat::Text)), "SELECT 1");
    }

    #[test]
    fn test_names_list() {
        let names = vec!["actor".to_string(), "director".to_string()];
        assert_eq!(
            format_names("Tables", &names, &plain(OutputFormat::Text)),
            "Tables (2):\n  actor\n  director"
        );
        assert_eq!(
            format_names("table", &names, &plain(OutputFormat::Csv)),
            "table\r\nactor\r\ndirector\r\n"
        );
    }

    #[test]
    fn test_schema_yaml() {
        let schema = SchemaDescription::from_definitions([Some("CREATE TABLE t(x INTEGER)")]);
        let yaml = format_schema(&schema, &plain(OutputFormat::Yaml));
        assert!(yaml.contains("tables: 1"));
    }
}
