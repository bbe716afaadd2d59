//! Conversions from CLI-facing enums to library types.

use crate::{
    cli::{Dialect, Format, Provider},
    output::OutputFormat,
    query::SqlDialect
};

/// Converts a CLI dialect to the parser dialect.
///
/// # Example
///
/// ```
/// use sql_query_generator::{app::convert_dialect, cli::Dialect, query::SqlDialect};
///
/// assert_eq!(convert_dialect(Dialect::Sqlite), SqlDialect::SQLite);
/// ```
pub fn convert_dialect(dialect: Dialect) -> SqlDialect {
    match dialect {
        Dialect::Generic => SqlDialect::Generic,
        Dialect::Mysql => SqlDialect::MySQL,
        Dialect::Postgresql => SqlDialect::PostgreSQL,
        Dialect::Sqlite => SqlDialect::SQLite,
        Dialect::Clickhouse => SqlDialect::ClickHouse
    }
}

/// Converts a CLI format to the output format.
pub fn convert_format(format: Format) -> OutputFormat {
    match format {
        Format::Text => OutputFormat::Text,
        Format::Csv => OutputFormat::Csv,
        Format::Json => OutputFormat::Json,
        Format::Yaml => OutputFormat::Yaml
    }
}

/// Human-readable provider name for messages
pub fn provider_label(provider: Provider) -> &'static str {
    match provider {
        Provider::Gemini => "Gemini",
        Provider::OpenAI => "OpenAI",
        Provider::Anthropic => "Anthropic",
        Provider::Ollama => "Ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_dialect() {
        assert_eq!(convert_dialect(Dialect::Generic), SqlDialect::Generic);
        assert_eq!(convert_dialect(Dialect::Mysql), SqlDialect::MySQL);
        assert_eq!(convert_dialect(Dialect::Postgresql), SqlDialect::PostgreSQL);
        assert_eq!(convert_dialect(Dialect::Clickhouse), SqlDialect::ClickHouse);
    }

    #[test]
    fn test_convert_format() {
        assert_eq!(convert_format(Format::Text), OutputFormat::Text);
        assert_eq!(convert_format(Format::Csv), OutputFormat::Csv);
        assert_eq!(convert_format(Format::Json), OutputFormat::Json);
        assert_eq!(convert_format(Format::Yaml), OutputFormat::Yaml);
    }
}
