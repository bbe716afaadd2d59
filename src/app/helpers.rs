//! Helper functions for CLI operations.
//!
//! Settings resolution lives here: every value is taken from the command
//! line first, then from the [`Config`] (which already folded in the
//! environment), then from the provider defaults.

use std::{
    fs::read_to_string,
    io::{self, Read},
    path::PathBuf,
    time::Duration
};

use indicatif::{ProgressBar, ProgressStyle};

use super::convert::{convert_dialect, convert_format, provider_label};
use crate::{
    cli::{DatabaseArgs, Dialect, Format, ModelArgs, Provider, SqlInput},
    config::Config,
    error::{AppResult, config_error, file_read_error},
    llm::{LlmClient, LlmProvider, ModelClient, ModelSettings},
    output::OutputOptions,
    query::SqlDialect
};

/// Exit code for a request that was rejected or failed
pub const EXIT_FAILURE: i32 = 1;

/// Maps a request result to the process exit code.
///
/// `0` when the request succeeded, `1` when it was rejected or failed.
/// Usage errors never get here: clap exits with `2` on its own.
pub fn calculate_exit_code(success: bool) -> i32 {
    if success { 0 } else { EXIT_FAILURE }
}

/// Reads SQL from `--sql` or from `--file`.
///
/// A file path of `-` reads standard input.
///
/// # Errors
///
/// Returns an error if the file cannot be read or stdin fails.
pub fn read_sql_input(input: &SqlInput) -> AppResult<String> {
    match (&input.sql, &input.file) {
        (Some(sql), _) => Ok(sql.clone()),
        (None, Some(path)) if path == "-" => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| file_read_error("stdin", e))?;
            Ok(buffer)
        }
        (None, Some(path)) => read_to_string(path).map_err(|e| file_read_error(path, e)),
        (None, None) => Err(config_error("Provide SQL with --sql or --file"))
    }
}

/// Creates output options from CLI parameters.
pub fn create_output_options(format: Format, no_color: bool, verbose: bool) -> OutputOptions {
    OutputOptions {
        format: convert_format(format),
        colored: !no_color,
        verbose
    }
}

/// Resolves the database file.
///
/// There is no default location: without `--database`,
/// `SQL_GENERATOR_DATABASE` or `[database] path` this is an error.
///
/// # Errors
///
/// Returns a config error when no database path is configured.
pub fn resolve_database(args: &DatabaseArgs, config: &Config) -> AppResult<PathBuf> {
    args.database
        .clone()
        .or_else(|| config.database.path.clone())
        .ok_or_else(|| {
            config_error(
                "No database configured (use --database, SQL_GENERATOR_DATABASE or [database] path)"
            )
        })
}

/// Resolves the dialect for a syntax-only check; SQLite when not given.
///
/// Statements that get executed are always checked as SQLite.
pub fn resolve_dialect(dialect: Option<Dialect>) -> SqlDialect {
    dialect.map(convert_dialect).unwrap_or_default()
}

/// Resolves the provider; Gemini when nothing is configured.
///
/// # Errors
///
/// Returns a config error when `LLM_PROVIDER` or `[llm] provider` names an
/// unknown provider.
pub fn resolve_provider(provider: Option<Provider>, config: &Config) -> AppResult<Provider> {
    if let Some(provider) = provider {
        return Ok(provider);
    }
    match config.llm.provider.as_deref() {
        None => Ok(Provider::Gemini),
        Some(name) => Provider::from_name(name).ok_or_else(|| {
            config_error(format!(
                "Unknown provider '{}' (expected gemini, openai, anthropic or ollama)",
                name
            ))
        })
    }
}

/// Gets the effective model name
pub fn get_effective_model(
    model: Option<String>,
    config_model: Option<String>,
    provider: Provider
) -> String {
    model
        .or(config_model)
        .unwrap_or_else(|| provider.default_model().to_string())
}

/// Gets the model family used to pick fallback models
pub fn get_effective_family(config_family: Option<String>, provider: Provider) -> String {
    config_family
        .filter(|family| !family.trim().is_empty())
        .unwrap_or_else(|| provider.family().to_string())
}

/// Builds the provider with its credentials.
///
/// Ollama runs locally and needs no key; every other provider does.
///
/// # Errors
///
/// Returns an error if a cloud provider is selected without an API key.
pub fn build_llm_provider(provider: Provider, api_key: Option<String>) -> AppResult<LlmProvider> {
    if provider == Provider::Ollama {
        return Ok(LlmProvider::Ollama);
    }
    let api_key = api_key.filter(|key| !key.trim().is_empty()).ok_or_else(|| {
        config_error(format!(
            "API key required for {} (use --api-key or LLM_API_KEY)",
            provider_label(provider)
        ))
    })?;
    Ok(match provider {
        Provider::Gemini => LlmProvider::Gemini {
            api_key
        },
        Provider::OpenAI => LlmProvider::OpenAI {
            api_key
        },
        Provider::Anthropic => LlmProvider::Anthropic {
            api_key
        },
        Provider::Ollama => LlmProvider::Ollama
    })
}

/// Builds the HTTP-backed model client from CLI arguments and config.
///
/// # Errors
///
/// Returns a config error for an unknown provider or a missing API key.
pub fn build_model_client(args: &ModelArgs, config: &Config) -> AppResult<ModelClient<LlmClient>> {
    let provider = resolve_provider(args.provider, config)?;
    let settings = ModelSettings {
        model: get_effective_model(args.model.clone(), config.llm.model.clone(), provider),
        family: get_effective_family(config.llm.model_family.clone(), provider),
        fallback_models: config.llm.fallback_models.clone()
    };
    let api_key = args.api_key.clone().or_else(|| config.llm.api_key.clone());
    let base_url = args.base_url.clone().or_else(|| config.llm.base_url.clone());
    let llm_provider = build_llm_provider(provider, api_key)?;
    let service = LlmClient::new(
        llm_provider,
        base_url,
        Duration::from_secs(config.llm.timeout_secs)
    );
    Ok(ModelClient::new(service, settings))
}

/// Spinner shown on stderr while waiting for the model
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
