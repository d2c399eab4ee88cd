// Bookmark service configuration loader
// Reads and writes `ServiceConfig` as a JSON file, by default `config.json`
// in the platform config directory, and resolves storage locations.

use std::fs;
use std::path::{Path, PathBuf};

use crate::platform;
use crate::types::config::ServiceConfig;
use crate::types::errors::ConfigError;

pub struct ConfigLoader {
    config_path: String,
    config: ServiceConfig,
}

impl ConfigLoader {
    /// Creates a loader for `path_override`, or for `config.json` in the
    /// platform config directory when `None`.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = match path_override {
            Some(p) => p,
            None => platform::get_config_dir()
                .join("config.json")
                .to_string_lossy()
                .to_string(),
        };
        Self {
            config_path,
            config: ServiceConfig::default(),
        }
    }

    /// Loads the config file.
    ///
    /// A missing file yields the defaults. A malformed file is a
    /// serialization error and out-of-range values are rejected.
    pub fn load(&mut self) -> Result<ServiceConfig, ConfigError> {
        let path = Path::new(&self.config_path);

        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| ConfigError::IoError(format!("Failed to read config file: {}", e)))?;
            serde_json::from_str(&content).map_err(|e| {
                ConfigError::SerializationError(format!("Failed to parse config file: {}", e))
            })?
        } else {
            ServiceConfig::default()
        };
        config.validate()?;

        self.config = config;
        Ok(self.config.clone())
    }

    /// Writes the current config, creating parent directories as needed.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Path::new(&self.config_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ConfigError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.config).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to serialize config: {}", e))
        })?;
        fs::write(path, json)
            .map_err(|e| ConfigError::IoError(format!("Failed to write config file: {}", e)))?;
        Ok(())
    }

    pub fn get_config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Replaces the in-memory config after validating it. Call `save` to persist.
    pub fn set_config(&mut self, config: ServiceConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn get_config_path(&self) -> &str {
        &self.config_path
    }
}

impl ServiceConfig {
    pub fn resolved_database_path(&self) -> PathBuf {
        match &self.database_path {
            Some(p) => PathBuf::from(p),
            None => platform::get_data_dir().join("bookmarks.db"),
        }
    }

    pub fn resolved_index_path(&self) -> PathBuf {
        match &self.index_path {
            Some(p) => PathBuf::from(p),
            None => platform::get_data_dir().join("search-index"),
        }
    }
}
