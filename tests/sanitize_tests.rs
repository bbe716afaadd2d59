// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

use sql_query_generator::{query::GeneratedQuery, sanitize::clean_sql_output};

#[test]
fn test_sql_fence_recovers_statement() {
    assert_eq!(clean_sql_output("```sql\nSELECT 1\n```"), "SELECT 1");
}

#[test]
fn test_generic_fence_recovers_statement() {
    assert_eq!(
        clean_sql_output("```\nSELECT name FROM director\n```"),
        "SELECT name FROM director"
    );
}

#[test]
fn test_backtick_wrapped_statement() {
    assert_eq!(clean_sql_output("`SELECT 1`"), "SELECT 1");
}

#[test]
fn test_unwrapped_statement_is_trimmed() {
    assert_eq!(clean_sql_output("\n  SELECT 1;  \n"), "SELECT 1;");
}

#[test]
fn test_sanitizing_twice_changes_nothing() {
    let inputs = [
        "```sql\nSELECT * FROM director WHERE birth_year < 1980;\n```",
        "```\nSELECT 1\n```",
        "`SELECT 1`",
        "SELECT 1",
        "Here you go:\n```sql\nSELECT 2\n```\nEnjoy"
    ];
    for input in inputs {
        let once = clean_sql_output(input);
        assert_eq!(clean_sql_output(&once), once, "{input:?}");
    }
}

#[test]
fn test_generated_query_keeps_raw_completion() {
    let raw = "```sql\nSELECT * FROM director WHERE birth_year < 1980;\n```";
    let query = GeneratedQuery::from_completion("gemini-1.5-flash", raw);
    assert_eq!(query.raw, raw);
    assert_eq!(query.sql, "SELECT * FROM director WHERE birth_year < 1980;");
    assert_eq!(query.model, "gemini-1.5-flash");
}
