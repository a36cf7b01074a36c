//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.hoopcoach.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".hoopcoach.toml";

/// Number of clips after which a session is consolidated.
pub const SATURATION_THRESHOLD: usize = 5;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Media upload settings.
    #[serde(default)]
    pub media: MediaConfig,

    /// Progressive session settings.
    #[serde(default)]
    pub session: SessionConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed by CORS.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Maximum accepted request body, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_max_upload_bytes() -> usize {
    200 * 1024 * 1024
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Generative Language API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// API key. Usually supplied through `GOOGLE_API_KEY` instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            api_base: default_api_base(),
            api_key: None,
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_temperature() -> f32 {
    0.4
}

fn default_timeout() -> u64 {
    120
}

/// Media handling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Media below this size is sent inline.
    #[serde(default = "default_inline_limit")]
    pub inline_limit_bytes: usize,

    /// Seconds between upload status checks.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,

    /// Give up waiting for an upload to become active after this long.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_seconds: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            inline_limit_bytes: default_inline_limit(),
            poll_interval_seconds: default_poll_interval(),
            poll_timeout_seconds: default_poll_timeout(),
        }
    }
}

fn default_inline_limit() -> usize {
    20 * 1024 * 1024 // 20MB request cap for inline data
}

fn default_poll_interval() -> u64 {
    2
}

fn default_poll_timeout() -> u64 {
    60
}

/// Progressive session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Clips collected before consolidation.
    #[serde(default = "default_saturation_threshold")]
    pub saturation_threshold: usize,

    #[serde(default = "default_skill_level")]
    pub default_skill_level: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            saturation_threshold: default_saturation_threshold(),
            default_skill_level: default_skill_level(),
        }
    }
}

fn default_saturation_threshold() -> usize {
    SATURATION_THRESHOLD
}

fn default_skill_level() -> String {
    crate::models::DEFAULT_SKILL_LEVEL.to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.session.saturation_threshold == 0 {
            anyhow::bail!("session.saturation_threshold must be at least 1");
        }
        if self.media.poll_interval_seconds == 0 {
            anyhow::bail!("media.poll_interval_seconds must be at least 1");
        }
        if !self.model.api_base.starts_with("http://") && !self.model.api_base.starts_with("https://")
        {
            anyhow::bail!("model.api_base must start with 'http://' or 'https://'");
        }
        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Optional arguments only override when given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref host) = args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref api_base) = args.api_base {
            self.model.api_base = api_base.clone();
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }

        // The environment/CLI key wins over a key committed to a file
        if let Some(ref key) = args.api_key {
            self.model.api_key = Some(key.clone());
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.name, "gemini-1.5-flash");
        assert_eq!(config.session.saturation_threshold, 5);
        assert_eq!(config.session.default_skill_level, "intermediate");
        assert_eq!(config.media.inline_limit_bytes, 20 * 1024 * 1024);
        assert!(config
            .server
            .allowed_origins
            .contains(&"http://localhost:3000".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[server]
port = 9000

[model]
name = "gemini-1.5-pro"
temperature = 0.2

[session]
saturation_threshold = 3
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.model.name, "gemini-1.5-pro");
        assert_eq!(config.model.temperature, 0.2);
        assert_eq!(config.session.saturation_threshold, 3);
        assert_eq!(config.media.poll_timeout_seconds, 60);
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let mut config = Config::default();
        config.session.saturation_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[model]"));
        assert!(toml_str.contains("[media]"));
        assert!(toml_str.contains("[session]"));
        assert!(!toml_str.contains("api_key"));
    }
}
