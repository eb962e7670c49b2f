//! Configuration schema (snowscope.toml)

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Warehouse connection settings
///
/// The access token is never stored in the file; `token_env` names the
/// environment variable that holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Account identifier (e.g. `xy12345.us-east-1`)
    #[serde(default)]
    pub account: Option<String>,

    /// Login name
    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub warehouse: Option<String>,

    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub schema: Option<String>,

    /// Environment variable holding the personal access token
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_token_env() -> String {
    "SNOWFLAKE_PAT".to_string()
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            account: None,
            user: None,
            role: None,
            warehouse: None,
            database: None,
            schema: None,
            token_env: default_token_env(),
        }
    }
}

/// LLM endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_glossary_temperature")]
    pub glossary_temperature: f32,

    #[serde(default = "default_lineage_temperature")]
    pub lineage_temperature: f32,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_glossary_temperature() -> f32 {
    0.2
}

fn default_lineage_temperature() -> f32 {
    0.1
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            glossary_temperature: default_glossary_temperature(),
            lineage_temperature: default_lineage_temperature(),
        }
    }
}

/// Defaults for lineage diagram requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageConfig {
    /// Colour theme: vibrant, muted or monochrome
    #[serde(default = "default_theme")]
    pub theme: String,

    #[serde(default = "default_max_hops")]
    pub max_hops: u32,

    #[serde(default = "default_detail_level")]
    pub detail_level: String,
}

fn default_theme() -> String {
    "vibrant".to_string()
}

fn default_max_hops() -> u32 {
    2
}

fn default_detail_level() -> String {
    "high".to_string()
}

impl Default for LineageConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            max_hops: default_max_hops(),
            detail_level: default_detail_level(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub lineage: LineageConfig,
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.connection.token_env, "SNOWFLAKE_PAT");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.glossary_temperature, 0.2);
        assert_eq!(config.lineage.theme, "vibrant");
        assert_eq!(config.lineage.max_hops, 2);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = Config::from_toml(
            r#"
            [connection]
            account = "xy12345.us-east-1"
            user = "ANALYST"
            warehouse = "COMPUTE_WH"

            [llm]
            model = "gpt-4o"
            "#,
        )
        .unwrap();

        assert_eq!(config.connection.account.as_deref(), Some("xy12345.us-east-1"));
        assert_eq!(config.connection.role, None);
        assert_eq!(config.connection.token_env, "SNOWFLAKE_PAT");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.api_base, "https://api.openai.com/v1");
        assert_eq!(config.lineage, LineageConfig::default());
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let err = Config::from_toml("[connection\naccount = 1").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn config_toml_roundtrip() {
        let mut config = Config::default();
        config.connection.database = Some("ANALYTICS".to_string());
        let toml = toml::to_string(&config).unwrap();
        let parsed = Config::from_toml(&toml).unwrap();
        assert_eq!(config, parsed);
    }
}
