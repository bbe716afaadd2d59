//! Recovery of a bare SQL statement from model output.
//!
//! Models often wrap their answer in markdown even when told not to. The
//! passes run in a fixed order and each one replaces every match:
//!
//! 1. `` ```sql … ``` `` fences
//! 2. generic `` ``` … ``` `` fences
//! 3. single-backtick spans
//! 4. outer whitespace
//!
//! # Example
//!
//! ```
//! use sql_query_generator::sanitize::clean_sql_output;
//!
//! assert_eq!(clean_sql_output("```sql\nSELECT 1\n```"), "SELECT 1");
//! assert_eq!(clean_sql_output("`SELECT 1`"), "SELECT 1");
//! assert_eq!(clean_sql_output("  SELECT 1  "), "SELECT 1");
//! ```

use std::sync::LazyLock;

use regex::Regex;

static SQL_FENCE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?is)```sql\s*(.*?)```"));
static GENERIC_FENCE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?s)```\s*(.*?)```"));
static BACKTICKS: LazyLock<Regex> = LazyLock::new(|| compile(r"(?s)`(.*?)`"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("sanitizer patterns are valid literals")
}

/// Strip code fences and backticks, then trim
pub fn clean_sql_output(text: &str) -> String {
    let text = SQL_FENCE.replace_all(text, "$1");
    let text = GENERIC_FENCE.replace_all(&text, "$1");
    let text = BACKTICKS.replace_all(&text, "$1");
    text.trim().to_string()
}
