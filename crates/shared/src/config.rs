//! Application configuration management.

use std::path::PathBuf;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Storage backend wiring.
    pub storage: StorageSettings,
    /// Media upload settings.
    #[serde(default)]
    pub media: MediaSettings,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Storage backend selection and credentials.
///
/// The concrete backend is constructed from this at wiring time; core
/// services only ever see the backend trait.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageSettings {
    /// Local filesystem storage (development and single-node deployments).
    Local {
        /// Root directory all objects live under.
        root: PathBuf,
        /// Public base URL the root is served from.
        #[serde(default = "default_base_url")]
        base_url: String,
    },
    /// S3-compatible object storage.
    S3 {
        /// Access key ID.
        access_key: String,
        /// Secret access key.
        secret_key: String,
        /// Bucket name.
        bucket: String,
        /// Region; defaults to `us-east-1` when omitted.
        #[serde(default)]
        region: Option<String>,
        /// Custom endpoint for non-AWS providers (R2, Spaces, MinIO).
        #[serde(default)]
        endpoint: Option<String>,
        /// Whether stored objects are publicly readable.
        #[serde(default)]
        public: bool,
        /// Custom key prefix; defaults to `public`/`private` from the flag.
        #[serde(default)]
        prefix: Option<String>,
    },
}

fn default_base_url() -> String {
    "/media/".to_string()
}

/// Media upload settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaSettings {
    /// Maximum upload size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Layering: `config/default.*`, then `config/{RUN_MODE}.*`, then
    /// `PAPYRA__`-prefixed environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("PAPYRA").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
