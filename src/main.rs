//! # SQL Query Generator
//!
//! Ask questions about a SQLite database in plain language.
//!
//! `sql-query-generator` reads the table definitions of a database, asks a
//! hosted language model to turn a question into a SQL statement, strips
//! any markdown the model wrapped around it, checks the syntax and runs the
//! statement. Read statements print their rows, write statements print an
//! acknowledgement, and engine errors are reported instead of crashing.
//!
//! # Quick Start
//!
//! ```bash
//! export LLM_API_KEY="..."
//!
//! # Generate, validate and run in one step
//! sql-query-generator ask "Select all directors born before 1980" -d movies.db
//!
//! # Only show the SQL (or the prompt, without calling the model)
//! sql-query-generator generate "How many movies per genre?" -d movies.db
//! sql-query-generator generate "How many movies per genre?" -d movies.db --dry-run
//!
//! # Run your own SQL and export the rows
//! sql-query-generator run -d movies.db --sql "SELECT * FROM director" --export directors.csv
//!
//! # Read requests one by one and confirm each query before it runs
//! sql-query-generator interactive -d movies.db
//! ```
//!
//! # Model Fallback
//!
//! When the default model fails, one alternative is tried: the first entry
//! of `[llm] fallback_models` if configured, otherwise the first model the
//! provider lists whose name contains the model family (`gemini`, `gpt`,
//! `claude` or `llama`).
//!
//! # Configuration
//!
//! Configuration is loaded from (in order of precedence):
//!
//! 1. Command-line arguments
//! 2. Environment variables (`LLM_API_KEY`, `LLM_PROVIDER`, `LLM_MODEL`,
//!    `LLM_BASE_URL`, `SQL_GENERATOR_DATABASE`)
//! 3. `--config <file>`, else `.sql-generator.toml` in the current directory,
//!    else `~/.config/sql-generator/config.toml`
//!
//! # Exit Codes
//!
//! - `0` - Success
//! - `1` - The request failed: invalid SQL, execution or generation error,
//!   missing configuration
//! - `2` - Invalid command-line usage
//!
//! # Logging
//!
//! Diagnostics go to stderr through `tracing`. The default level is `warn`,
//! `--verbose` raises it to `info`, and `RUST_LOG` overrides both.

use std::process;

use clap::Parser;
use sql_query_generator::{
    app::{Context, run_command},
    cli::Cli,
    config::Config,
    error::AppResult
};
use tokio::main;
use tracing_subscriber::EnvFilter;

#[main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e.render_message());
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> AppResult<i32> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?
    };
    let ctx = Context {
        config,
        no_color: cli.no_color,
        verbose: cli.verbose
    };

    let output = run_command(cli.command, &ctx).await?;
    if !output.stdout.is_empty() {
        println!("{}", output.stdout);
    }
    Ok(output.exit_code)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into())
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
