use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Which embedding provider to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI embeddings API.
    #[default]
    OpenAi,
    /// Deterministic offline embedder; no network, no key.
    Local,
}

/// Configuration for partdb.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (PARTDB_* prefix)
/// 3. Config file (~/.config/partdb/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite database.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: PARTDB_DATABASE_PATH
    /// - Config: database_path = "/path/to/db"
    /// - Default: ~/.local/share/partdb/partdb.db
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,

    /// Embedding provider: "openai" or "local".
    #[serde(default)]
    pub provider: ProviderKind,

    /// OpenAI API key. Falls back to the OPENAI_API_KEY environment variable.
    ///
    /// Can be set via:
    /// - ENV: PARTDB_OPENAI_API_KEY
    /// - Config: openai_api_key = "..."
    pub openai_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    /// Embedding model name.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Dimensionality of the configured model's vectors.
    #[serde(default = "default_embedding_dimensions", deserialize_with = "lenient_usize")]
    pub embedding_dimensions: usize,

    /// Descriptions sent to the provider per request during synchronization.
    #[serde(default = "default_batch_size", deserialize_with = "lenient_usize")]
    pub batch_size: usize,

    /// Upper bound on provider requests per second.
    #[serde(default = "default_requests_per_second", deserialize_with = "lenient_u32")]
    pub requests_per_second: u32,

    /// Default number of search results.
    #[serde(default = "default_search_limit", deserialize_with = "lenient_usize")]
    pub search_limit: usize,

    /// Log filter used when RUST_LOG is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            provider: ProviderKind::default(),
            openai_api_key: None,
            openai_base_url: default_openai_base_url(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            batch_size: default_batch_size(),
            requests_per_second: default_requests_per_second(),
            search_limit: default_search_limit(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/partdb/config.toml
    /// Reads environment variables with PARTDB_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed, or
    /// if a loaded value is out of range.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("partdb");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration with custom database path.
    ///
    /// This is used when the --db CLI flag is provided.
    pub fn load_with_db_path(db_path: PathBuf) -> Result<Self> {
        let mut config = Self::load()?;
        config.database_path = db_path;
        Ok(config)
    }

    /// Reject values the synchronizer and rate limiter cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be at least 1");
        }
        if self.requests_per_second == 0 {
            anyhow::bail!("requests_per_second must be at least 1");
        }
        if self.embedding_dimensions == 0 {
            anyhow::bail!("embedding_dimensions must be at least 1");
        }
        Ok(())
    }

    /// The OpenAI API key from config, or from OPENAI_API_KEY.
    pub fn api_key(&self) -> Option<String> {
        self.openai_api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("partdb")
        .join("partdb.db")
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

const fn default_embedding_dimensions() -> usize {
    1536
}

const fn default_batch_size() -> usize {
    crate::sync::DEFAULT_BATCH_SIZE
}

const fn default_requests_per_second() -> u32 {
    5
}

const fn default_search_limit() -> usize {
    10
}

fn default_log_level() -> String {
    "warn".to_string()
}

// Environment variables arrive as strings; accept both forms for numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(u64),
    Text(String),
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn lenient_usize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    let n = lenient_u64(deserializer)?;
    usize::try_from(n).map_err(serde::de::Error::custom)
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let n = lenient_u64(deserializer)?;
    u32::try_from(n).map_err(serde::de::Error::custom)
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/partdb/config.toml
/// - macOS: ~/Library/Application Support/partdb/config.toml
/// - Windows: %APPDATA%\partdb\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("partdb")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# partdb Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (PARTDB_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Path to the SQLite database
#
# Can also be set via:
# - CLI: partdb --db /custom/path.db list
# - Environment: PARTDB_DATABASE_PATH=/custom/path.db
#
# Default: Platform-specific data directory
#database_path = "/path/to/custom/partdb.db"

# Embedding provider used by `search` and `update-embeddings`
#
# "openai" calls the OpenAI embeddings API.
# "local" uses a deterministic offline embedder (keyword-level similarity only).
provider = "openai"

# OpenAI API key
#
# Can also be set via:
# - Environment: PARTDB_OPENAI_API_KEY=sk-...
# - Environment: OPENAI_API_KEY=sk-...
#openai_api_key = "sk-..."

# Embedding model and its vector size
#
# Changing either after embeddings exist requires re-embedding every part.
embedding_model = "text-embedding-3-small"
embedding_dimensions = 1536

# Descriptions sent per provider request during `update-embeddings`
batch_size = 16

# Upper bound on provider requests per second
requests_per_second = 5

# Default number of search results
search_limit = 10

# Log filter used when RUST_LOG is not set (error, warn, info, debug, trace)
log_level = "warn"
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.database_path.as_os_str().is_empty());
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.provider, ProviderKind::OpenAi);
        assert_eq!(config.embedding_model, "text-embedding-3-small");
        assert_eq!(config.embedding_dimensions, 1536);
        assert_eq!(config.batch_size, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load() {
        // Should not fail even if config file doesn't exist
        let result = Config::load();
        assert!(result.is_ok());
    }

    #[test]
    fn test_config_with_custom_db_path() {
        let custom_path = PathBuf::from("/tmp/test-parts.db");
        let config = Config::load_with_db_path(custom_path.clone());
        assert!(config.is_ok());
        assert_eq!(config.unwrap().database_path, custom_path);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = Config {
            batch_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_numbers_accepted_as_strings() {
        let config: Config = serde_json::from_str(
            r#"{"batch_size": "8", "requests_per_second": 2, "provider": "local"}"#,
        )
        .unwrap();
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.requests_per_second, 2);
        assert_eq!(config.provider, ProviderKind::Local);
        assert_eq!(config.search_limit, 10);
    }

    #[test]
    fn test_configured_key_wins() {
        let config = Config {
            openai_api_key: Some("sk-configured".to_string()),
            ..Config::default()
        };
        assert_eq!(config.api_key().as_deref(), Some("sk-configured"));
    }

    #[test]
    fn test_example_config_mentions_every_key() {
        let example = example_config();
        for key in [
            "database_path",
            "provider",
            "openai_api_key",
            "embedding_model",
            "embedding_dimensions",
            "batch_size",
            "requests_per_second",
            "search_limit",
            "log_level",
        ] {
            assert!(example.contains(key), "missing {key}");
        }
    }
}
