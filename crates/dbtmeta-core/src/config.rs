//! Configuration schema (dbtmeta.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding [`Config::service_name`]
pub const SERVICE_NAME_ENV: &str = "DBTMETA_SERVICE_NAME";

fn default_manifest() -> PathBuf {
    PathBuf::from("target/manifest.json")
}

fn default_catalog() -> PathBuf {
    PathBuf::from("target/catalog.json")
}

/// Locations of the dbt artifacts
///
/// Presence of this section switches dbt ingestion on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbtConfig {
    /// Path to manifest.json
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,

    /// Path to catalog.json
    #[serde(default = "default_catalog")]
    pub catalog: PathBuf,

    /// Path to run_results.json (test results are skipped without it)
    #[serde(default)]
    pub run_results: Option<PathBuf>,
}

impl Default for DbtConfig {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            catalog: default_catalog(),
            run_results: None,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Name of the database service the dbt project writes to
    pub service_name: String,

    /// dbt artifact locations
    #[serde(default)]
    pub dbt: Option<DbtConfig>,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "default".to_string(),
            dbt: None,
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config = Self::from_toml(&contents)?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if config.service_name.trim().is_empty() {
            return Err(ConfigError::Invalid("service_name must not be empty".to_string()));
        }

        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Replace the service name with `value` when it is set and non-empty
    pub fn with_service_override(mut self, value: Option<String>) -> Self {
        if let Some(name) = value.filter(|v| !v.trim().is_empty()) {
            self.service_name = name;
        }
        self
    }

    /// Resolve a configured path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_relative() {
            self.project_root.join(path)
        } else {
            path.to_path_buf()
        }
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
