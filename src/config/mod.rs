//! Configuration management for cachegate

pub mod schema;

pub use schema::{Config, LogFormat, StoreBackend};

use crate::error::{CachegateError, CachegateResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cachegate")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cachegate")
    }

    /// Get the default run state directory path
    pub fn runs_dir() -> PathBuf {
        Self::state_dir().join("runs")
    }

    /// Get the default local store root
    pub fn store_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cachegate")
            .join("store")
    }

    /// Run state directory for a loaded config
    pub fn runs_dir_for(config: &Config) -> PathBuf {
        config
            .state
            .dir
            .as_ref()
            .map(|dir| dir.join("runs"))
            .unwrap_or_else(Self::runs_dir)
    }

    /// Local store root for a loaded config
    pub fn store_dir_for(config: &Config) -> PathBuf {
        config
            .store
            .root
            .clone()
            .unwrap_or_else(Self::store_dir)
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> CachegateResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> CachegateResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| CachegateError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| CachegateError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> CachegateResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            CachegateError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> CachegateResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| CachegateError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
