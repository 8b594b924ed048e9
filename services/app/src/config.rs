//! services/app/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub data_dir: PathBuf,
    pub log_level: Level,
    pub auth_base_url: String,
    pub reqres_api_key: Option<String>,
    pub catalog_url: String,
    pub quotes_url: String,
    pub intent_ttl: chrono::Duration,
    pub quote_rotation: Duration,
    pub http_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        // --- Storage and Logging ---
        let data_dir = PathBuf::from(var("LITLOOM_DATA_DIR", "./.litloom"));

        let log_level_str = var("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Remote Endpoints ---
        let auth_base_url = non_empty("AUTH_BASE_URL", var("AUTH_BASE_URL", "https://reqres.in/api"))?
            .trim_end_matches('/')
            .to_string();
        let reqres_api_key = Some(var("REQRES_API_KEY", "reqres-free-v1")).filter(|k| !k.is_empty());
        let catalog_url = non_empty("CATALOG_URL", var("CATALOG_URL", "http://localhost:3000/books"))?;
        let quotes_url = non_empty(
            "QUOTES_URL",
            var("QUOTES_URL", "https://dummyjson.com/quotes?limit=50"),
        )?;

        // --- Timings ---
        let intent_ttl_minutes = positive("INTENT_TTL_MINUTES", &var("INTENT_TTL_MINUTES", "20"))?;
        let rotate_secs = positive("QUOTE_ROTATE_SECS", &var("QUOTE_ROTATE_SECS", "10"))?;
        let timeout_secs = positive("HTTP_TIMEOUT_SECS", &var("HTTP_TIMEOUT_SECS", "15"))?;

        Ok(Self {
            data_dir,
            log_level,
            auth_base_url,
            reqres_api_key,
            catalog_url,
            quotes_url,
            intent_ttl: chrono::Duration::minutes(intent_ttl_minutes as i64),
            quote_rotation: Duration::from_secs(rotate_secs),
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// The durable key/value file.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("store.json")
    }

    /// The file holding deferred intents, kept apart from durable data.
    pub fn intent_path(&self) -> PathBuf {
        self.data_dir.join("intent.json")
    }
}

fn non_empty(name: &str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::MissingVar(name.to_string()))
    } else {
        Ok(value.trim().to_string())
    }
}

fn positive(name: &str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value >= 1 => Ok(value),
        _ => Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("'{}' is not a positive whole number", raw),
        )),
    }
}
