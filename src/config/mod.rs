use serde::{de::DeserializeOwned, Deserialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

/// Prefix of every environment variable the service reads
pub const ENV_PREFIX: &str = "STOREFRONT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_products_file")]
    pub products_file: PathBuf,
    #[serde(default = "default_carts_file")]
    pub carts_file: PathBuf,
    #[serde(default = "default_create_missing_files")]
    pub create_missing_files: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_enable_json_logging")]
    pub enable_json_logging: bool,
}

impl Config {
    /// Load configuration from `STOREFRONT_*` environment variables
    pub fn from_environment() -> Result<Self, ConfigError> {
        info!("Loading configuration from environment");
        Self::load(None)
    }

    /// Load configuration from an explicit variable map instead of the process environment
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::load(Some(vars))
    }

    fn load(vars: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let mut observability: ObservabilityConfig = load_section(&vars, "observability")?;
        // An empty endpoint means "no exporter"
        observability.otlp_endpoint = observability
            .otlp_endpoint
            .filter(|endpoint| !endpoint.trim().is_empty());

        let config = Config {
            server: load_section(&vars, "server")?,
            storage: load_section(&vars, "storage")?,
            observability,
        };

        config.validate()?;

        debug!("Configuration: {:?}", config);
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError {
                message: "Server port cannot be 0".to_string(),
            });
        }

        if self.server.max_request_size == 0 {
            return Err(ConfigError::ValidationError {
                message: "Maximum request size cannot be 0".to_string(),
            });
        }

        if self.storage.products_file.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "Products file path cannot be empty".to_string(),
            });
        }

        if self.storage.carts_file.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "Carts file path cannot be empty".to_string(),
            });
        }

        if self.storage.products_file == self.storage.carts_file {
            return Err(ConfigError::ValidationError {
                message: "Products and carts must be stored in different files".to_string(),
            });
        }

        Ok(())
    }
}

fn load_section<T: DeserializeOwned>(
    vars: &Option<HashMap<String, String>>,
    section: &str,
) -> Result<T, ConfigError> {
    let environment = config::Environment::with_prefix(ENV_PREFIX).source(vars.clone());

    let settings = config::Config::builder()
        .add_source(environment)
        .build()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to load {} config: {}", section, e),
        })?;

    settings
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", section, e),
        })
}

// Default value functions
pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

pub(crate) fn default_max_request_size() -> usize {
    1024 * 1024 // 1MB
}

pub(crate) fn default_products_file() -> PathBuf {
    PathBuf::from("products.json")
}

pub(crate) fn default_carts_file() -> PathBuf {
    PathBuf::from("carts.json")
}

pub(crate) fn default_create_missing_files() -> bool {
    true
}

pub(crate) fn default_service_name() -> String {
    "storefront-rs".to_string()
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}

pub(crate) fn default_enable_json_logging() -> bool {
    false
}
