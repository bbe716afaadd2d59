//! Configuration loading and management.
//!
//! Configuration is loaded from multiple sources with the following precedence
//! (highest to lowest):
//!
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. `--config <file>`, else `.sql-generator.toml` in the current directory,
//!    else `~/.config/sql-generator/config.toml`
//! 4. Default values
//!
//! There is deliberately no default database path: commands that touch a
//! database fail until one is supplied.
//!
//! # Configuration File Format
//!
//! ```toml
//! [llm]
//! provider = "gemini"          # gemini, openai, anthropic, ollama
//! model = "gemini-1.5-flash"
//! api_key = "..."              # or use LLM_API_KEY / GEMINI_API_KEY
//! base_url = "https://generativelanguage.googleapis.com"
//! model_family = "gemini"
//! fallback_models = ["gemini-2.0-flash"]
//! timeout_secs = 120
//!
//! [database]
//! path = "data/movies.db"
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `LLM_API_KEY` | API key for the completion service |
//! | `GEMINI_API_KEY` | Used when `LLM_API_KEY` is not set |
//! | `LLM_PROVIDER` | Provider name |
//! | `LLM_MODEL` | Default model identifier |
//! | `LLM_BASE_URL` | Provider base URL |
//! | `SQL_GENERATOR_DATABASE` | Database file path |

use std::{
    env, fs,
    path::{Path, PathBuf}
};

use serde::Deserialize;

use crate::error::{AppResult, config_error};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm:      LlmConfig,
    #[serde(default)]
    pub database: DatabaseConfig
}

/// Completion service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider:        Option<String>,
    pub api_key:         Option<String>,
    pub model:           Option<String>,
    pub base_url:        Option<String>,
    pub model_family:    Option<String>,
    pub fallback_models: Vec<String>,
    pub timeout_secs:    u64
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider:        None,
            api_key:         None,
            model:           None,
            base_url:        None,
            model_family:    None,
            fallback_models: Vec::new(),
            timeout_secs:    120
        }
    }
}

/// Target database configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>
}

impl Config {
    /// Load configuration from the default files and the environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file in current directory (.sql-generator.toml)
    /// 3. Config file in home directory (~/.config/sql-generator/config.toml)
    /// 4. Default values
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(home) = env::var_os("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("sql-generator")
                .join("config.toml");
            if home_config.exists() {
                config = Self::from_file(&home_config)?;
            }
        }

        // Current directory config replaces the home one
        let local_config = PathBuf::from(".sql-generator.toml");
        if local_config.exists() {
            config = Self::from_file(&local_config)?;
        }

        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    /// Load an explicit config file, then apply the environment
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    /// Read and parse one config file
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            config_error(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| config_error(format!("Invalid config file: {}", e)))
    }

    /// Override values from environment variables.
    ///
    /// `lookup` stands in for `std::env::var` so the precedence can be
    /// exercised without touching the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(api_key) = non_empty("LLM_API_KEY").or_else(|| non_empty("GEMINI_API_KEY")) {
            self.llm.api_key = Some(api_key);
        }

        if let Some(provider) = non_empty("LLM_PROVIDER") {
            self.llm.provider = Some(provider);
        }

        if let Some(model) = non_empty("LLM_MODEL") {
            self.llm.model = Some(model);
        }

        if let Some(url) = non_empty("LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }

        if let Some(path) = non_empty("SQL_GENERATOR_DATABASE") {
            self.database.path = Some(PathBuf::from(path));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::from_toml(
            r#"
            [llm]
            model = "gemini-1.5-flash"
            [database]
            path = "from_file.db"
            "#
        )
        .unwrap();
        config.apply_env(lookup(&[
            ("LLM_MODEL", "gemini-2.0-flash"),
            ("SQL_GENERATOR_DATABASE", "from_env.db")
        ]));
        assert_eq!(config.llm.model.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(config.database.path, Some(PathBuf::from("from_env.db")));
    }

    #[test]
    fn test_llm_api_key_preferred_over_gemini_key() {
        let mut config = Config::default();
        config.apply_env(lookup(&[("LLM_API_KEY", "primary"), ("GEMINI_API_KEY", "gemini")]));
        assert_eq!(config.llm.api_key.as_deref(), Some("primary"));

        let mut config = Config::default();
        config.apply_env(lookup(&[("GEMINI_API_KEY", "gemini")]));
        assert_eq!(config.llm.api_key.as_deref(), Some("gemini"));
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let mut config = Config::default();
        config.llm.api_key = Some("from-file".into());
        config.apply_env(lookup(&[("LLM_API_KEY", "  ")]));
        assert_eq!(config.llm.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_partial_llm_section_keeps_defaults() {
        let config = Config::from_toml("[llm]\nprovider = \"ollama\"\n").unwrap();
        assert_eq!(config.llm.provider.as_deref(), Some("ollama"));
        assert_eq!(config.llm.timeout_secs, 120);
        assert!(config.llm.fallback_models.is_empty());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Config::from_toml("[llm\nprovider = ").is_err());
    }
}
