//! Configuration management for the tax document server

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("Failed to read prompt file {path}: {source}")]
    PromptFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub prompts: PromptConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// OpenAI-compatible model service
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub extraction_model: String,
    pub search_model: String,
    pub validation_model: String,
    pub timeout_secs: u64,
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Optional prompt overrides; `None` selects the built-in text
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptConfig {
    pub extraction_file: Option<PathBuf>,
    pub conversation_file: Option<PathBuf>,
    pub tax_assist_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Per-file upload limit in bytes
    pub max_upload_bytes: usize,
    /// Limit for a whole upload request body
    pub max_request_bytes: usize,
    /// Number of past turns sent with every chat request
    pub chat_history_window: usize,
    pub tax_year: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            model: ModelConfig {
                api_key: String::new(),
                base_url: "https://api.openai.com/v1".to_string(),
                chat_model: "gpt-4o".to_string(),
                extraction_model: "gpt-4o".to_string(),
                search_model: "gpt-4o-search-preview".to_string(),
                validation_model: "gpt-4o-mini".to_string(),
                timeout_secs: 120,
            },
            prompts: PromptConfig::default(),
            limits: LimitsConfig {
                max_upload_bytes: 50 * 1024 * 1024,
                max_request_bytes: 200 * 1024 * 1024,
                chat_history_window: 100,
                tax_year: 2025,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
            },
            model: ModelConfig {
                api_key: env::var("OPENAI_API_KEY")
                    .ok()
                    .filter(|key| !key.trim().is_empty())
                    .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?,
                base_url: env::var("OPENAI_BASE_URL").unwrap_or(defaults.model.base_url),
                chat_model: env::var("OPENAI_CHAT_MODEL").unwrap_or(defaults.model.chat_model),
                extraction_model: env::var("OPENAI_EXTRACTION_MODEL")
                    .unwrap_or(defaults.model.extraction_model),
                search_model: env::var("OPENAI_SEARCH_MODEL")
                    .unwrap_or(defaults.model.search_model),
                validation_model: env::var("OPENAI_VALIDATION_MODEL")
                    .unwrap_or(defaults.model.validation_model),
                timeout_secs: parse_var("MODEL_TIMEOUT_SECS", defaults.model.timeout_secs)?,
            },
            prompts: PromptConfig {
                extraction_file: env::var_os("EXTRACTION_PROMPT_FILE").map(PathBuf::from),
                conversation_file: env::var_os("CONVERSATION_PROMPT_FILE").map(PathBuf::from),
                tax_assist_file: env::var_os("TAX_ASSIST_PROMPT_FILE").map(PathBuf::from),
            },
            limits: LimitsConfig {
                max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", defaults.limits.max_upload_bytes)?,
                max_request_bytes: parse_var(
                    "MAX_REQUEST_BYTES",
                    defaults.limits.max_request_bytes,
                )?,
                chat_history_window: parse_var(
                    "CHAT_HISTORY_WINDOW",
                    defaults.limits.chat_history_window,
                )?,
                tax_year: parse_tax_year(defaults.limits.tax_year)?,
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Tax years the advisor prompts accept
const TAX_YEARS: std::ops::RangeInclusive<u16> = 1913..=2200;

fn parse_tax_year(default: u16) -> Result<u16, ConfigError> {
    let year = parse_var("TAX_YEAR", default)?;
    if !TAX_YEARS.contains(&year) {
        return Err(ConfigError::Invalid {
            var: "TAX_YEAR",
            value: year.to_string(),
        });
    }
    Ok(year)
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.limits.max_upload_bytes, 52_428_800);
        assert_eq!(config.limits.chat_history_window, 100);
        assert_eq!(config.model.timeout(), Duration::from_secs(120));
        assert!(config.prompts.extraction_file.is_none());
    }

    #[test]
    fn test_parse_var_falls_back_when_unset() {
        let port: u16 = parse_var("TAXDOC_TEST_UNSET_VARIABLE", 1234).unwrap();
        assert_eq!(port, 1234);
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        env::set_var("TAXDOC_TEST_BAD_NUMBER", "eighty");
        let err = parse_var::<u16>("TAXDOC_TEST_BAD_NUMBER", 80).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "TAXDOC_TEST_BAD_NUMBER", .. }));
        env::remove_var("TAXDOC_TEST_BAD_NUMBER");
    }

    #[test]
    fn test_tax_year_range() {
        env::set_var("TAX_YEAR", "0");
        let err = parse_tax_year(2025).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "TAX_YEAR", .. }));

        env::set_var("TAX_YEAR", "2024");
        assert_eq!(parse_tax_year(2025).unwrap(), 2024);

        env::remove_var("TAX_YEAR");
        assert_eq!(parse_tax_year(2025).unwrap(), 2025);
    }
}
