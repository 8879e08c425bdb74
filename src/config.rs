//! Configuration loading and management for forska.
//!
//! Loads settings from `forska.toml` with environment variable overrides for sensitive data.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("missing required API key for service: {0}")]
    MissingApiKey(String),
}

/// LLM summarisation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model identifier (e.g., "gpt-4o-mini")
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL of the chat completions API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound on generated tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// How many characters of fetched content are sent to the model
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

/// Literature search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of results to request per search
    #[serde(default = "default_result_count")]
    pub result_count: u32,
    /// Interface language passed to the search service
    #[serde(default = "default_language")]
    pub language: String,
}

/// API keys configuration (loaded from environment)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub serpapi_key: Option<String>,
    #[serde(default)]
    pub openai_key: Option<String>,
    #[serde(default)]
    pub firecrawl_key: Option<String>,
}

/// Report export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory that exported PDFs are written to
    pub output_dir: PathBuf,
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_max_input_chars() -> usize {
    6000
}

fn default_result_count() -> u32 {
    10
}

fn default_language() -> String {
    "en".to_string()
}

impl Config {
    /// Load configuration from the default location (forska.toml in cwd or home)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::find_config_file();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            // No config file is fine: defaults plus environment keys
            let mut config = Config::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override API keys from environment variables.
    ///
    /// Keys live in memory only and are never written back to disk.
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("SERPAPI_KEY") {
            self.api.serpapi_key = Some(key);
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.api.openai_key = Some(key);
        }
        if let Ok(key) = std::env::var("FIRECRAWL_API_KEY") {
            self.api.firecrawl_key = Some(key);
        }
    }

    /// Find the config file in standard locations
    fn find_config_file() -> PathBuf {
        // Check current directory first
        let local_config = PathBuf::from("forska.toml");
        if local_config.exists() {
            return local_config;
        }

        // Check home directory
        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config").join("forska").join("forska.toml");
            if home_config.exists() {
                return home_config;
            }
        }

        local_config
    }

    /// Get the search service API key
    pub fn serpapi_key(&self) -> Result<&str, ConfigError> {
        self.api
            .serpapi_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingApiKey("serpapi".to_string()))
    }

    /// Get the language-model service API key
    pub fn openai_key(&self) -> Result<&str, ConfigError> {
        self.api
            .openai_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingApiKey("openai".to_string()))
    }

    /// Get the crawl service API key
    pub fn firecrawl_key(&self) -> Result<&str, ConfigError> {
        self.api
            .firecrawl_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingApiKey("firecrawl".to_string()))
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            result_count: default_result_count(),
            language: default_language(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.agent.model, "gpt-4o-mini");
        assert_eq!(config.agent.max_tokens, 2000);
        assert_eq!(config.agent.max_input_chars, 6000);
        assert_eq!(config.search.result_count, 10);
        assert_eq!(config.search.language, "en");
    }

    #[test]
    fn missing_keys_are_config_errors() {
        // Default config carries no keys; env overrides only apply on load
        let config = Config::default();
        assert!(matches!(
            config.serpapi_key(),
            Err(ConfigError::MissingApiKey(service)) if service == "serpapi"
        ));
        assert!(matches!(
            config.openai_key(),
            Err(ConfigError::MissingApiKey(service)) if service == "openai"
        ));
        assert!(matches!(
            config.firecrawl_key(),
            Err(ConfigError::MissingApiKey(service)) if service == "firecrawl"
        ));
    }

    #[test]
    fn load_from_reads_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forska.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[agent]\nmodel = \"gpt-4o\"\n\n[api]\nserpapi_key = \"from-file\"\n"
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.agent.model, "gpt-4o");
        // Untouched sections fall back to defaults
        assert_eq!(config.search.result_count, 10);
        // Key from file is visible unless the environment overrides it
        if std::env::var("SERPAPI_KEY").is_err() {
            assert_eq!(config.serpapi_key().unwrap(), "from-file");
        }
    }
}
