//! Application configuration
//!
//! Layered loading: embedded defaults, then optional files under
//! `config/`, then `ATELIER`-prefixed environment variables.

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub generation: GenerationConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Generation source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// "openai" or "scripted"
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            default_model: default_model(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Artifact pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    /// Outbound delta channel capacity per run
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Commit a failed run's partial draft as a version
    #[serde(default)]
    pub commit_partial_on_failure: bool,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            commit_partial_on_failure: false,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_ms() -> u64 {
    120_000
}

fn default_channel_capacity() -> usize {
    64
}

/// Embedded default configuration (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Load configuration from embedded defaults, files, and environment
pub fn load_config() -> Result<AppConfig> {
    let config = Config::builder()
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name("config/local").required(false))
        .add_source(
            File::with_name(&format!(
                "config/{}",
                std::env::var("ATELIER_ENV").unwrap_or_else(|_| "development".to_string())
            ))
            .required(false),
        )
        // prefix_separator("_") so ATELIER_SERVER__PORT works with a
        // single underscore after the prefix.
        .add_source(
            Environment::with_prefix("ATELIER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_defaults_deserialize() {
        let config = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .unwrap();
        let app: AppConfig = config.try_deserialize().unwrap();

        assert_eq!(app.server.port, 8080);
        assert_eq!(app.generation.provider, "openai");
        assert_eq!(app.artifacts.channel_capacity, 64);
        assert!(!app.artifacts.commit_partial_on_failure);
    }
}
