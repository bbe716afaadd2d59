use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// SQL Query Generator - Turn natural-language questions into SQL with an LLM
/// and run them against a SQLite database
#[derive(Parser, Debug)]
#[command(name = "sql-query-generator")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a config file (replaces the default lookup)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate SQL for a natural-language request
    Generate {
        /// Request in natural language
        request: String,

        #[command(flatten)]
        database: DatabaseArgs,

        #[command(flatten)]
        model: ModelArgs,

        /// Print the prompt without calling the model
        #[arg(long)]
        dry_run: bool,

        /// Also print the completion exactly as returned
        #[arg(long)]
        raw: bool,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: Format
    },

    /// Validate and execute SQL
    Run {
        #[command(flatten)]
        input: SqlInput,

        #[command(flatten)]
        database: DatabaseArgs,

        #[command(flatten)]
        output: OutputArgs
    },

    /// Generate SQL, validate it and execute it
    Ask {
        /// Request in natural language
        request: String,

        #[command(flatten)]
        database: DatabaseArgs,

        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        output: OutputArgs
    },

    /// Check SQL syntax without executing it
    Validate {
        #[command(flatten)]
        input: SqlInput,

        /// SQL dialect for parsing (SQLite by default)
        #[arg(long, value_enum)]
        dialect: Option<Dialect>,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: Format
    },

    /// Print the schema description sent to the model
    Schema {
        #[command(flatten)]
        database: DatabaseArgs
    },

    /// List table names
    Tables {
        #[command(flatten)]
        database: DatabaseArgs,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: Format
    },

    /// List models offered by the provider
    Models {
        #[command(flatten)]
        model: ModelArgs,

        /// Include models outside the configured family
        #[arg(long)]
        all: bool
    },

    /// Ask questions one after another and choose which queries to run
    Interactive {
        #[command(flatten)]
        database: DatabaseArgs,

        #[command(flatten)]
        model: ModelArgs,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: Format
    }
}

/// Target database selection
#[derive(Args, Debug, Clone, Default)]
pub struct DatabaseArgs {
    /// Path to the SQLite database file
    #[arg(short, long, env = "SQL_GENERATOR_DATABASE")]
    pub database: Option<PathBuf>
}

/// Completion service selection
#[derive(Args, Debug, Clone, Default)]
pub struct ModelArgs {
    /// LLM provider to use
    #[arg(short, long, value_enum)]
    pub provider: Option<Provider>,

    /// API key for the provider
    #[arg(short = 'k', long, env = "LLM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model name
    #[arg(short, long)]
    pub model: Option<String>,

    /// Provider base URL
    #[arg(long)]
    pub base_url: Option<String>
}

/// Result rendering
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    pub format: Format,

    /// Also write the result rows to a CSV file
    #[arg(long)]
    pub export: Option<PathBuf>
}

/// Where the SQL text comes from
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct SqlInput {
    /// SQL statement
    #[arg(short, long)]
    pub sql: Option<String>,

    /// File containing the statement (use - for stdin)
    #[arg(long)]
    pub file: Option<String>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    Gemini,
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    Ollama
}

impl Provider {
    /// Get default model for provider
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-1.5-flash",
            Self::OpenAI => "gpt-4",
            Self::Anthropic => "claude-sonnet-4-20250514",
            Self::Ollama => "llama3.2"
        }
    }

    /// Substring shared by the provider's fallback candidates
    pub fn family(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAI => "gpt",
            Self::Anthropic => "claude",
            Self::Ollama => "llama"
        }
    }

    /// Parse a provider name from config or environment
    pub fn from_name(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name.trim(), true).ok()
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Dialect {
    Generic,
    Mysql,
    Postgresql,
    Sqlite,
    Clickhouse
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Format {
    Text,
    Csv,
    Json,
    Yaml
}
