pub mod types;

use crate::error::{ConfigError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub use types::Config;

const CONFIG_FILE_NAME: &str = ".cdp-insights.toml";

/// Get the global config file path (~/.cdp-insights.toml)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(CONFIG_FILE_NAME))
}

/// Get the local config file path (./.cdp-insights.toml)
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

/// Read and parse one config file
pub fn read_config_file(path: &Path) -> std::result::Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Load configuration.
///
/// An explicit path must exist and parse. Otherwise the local file in the
/// working directory is tried first, then the global one, then defaults.
/// Environment overrides are applied last.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()).into());
            }
            read_config_file(path)?
        }
        None => discover_config(),
    };

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

fn discover_config() -> Config {
    let mut candidates = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(local_config_path(&cwd));
    }
    if let Some(global) = global_config_path() {
        candidates.push(global);
    }

    for candidate in candidates {
        if !candidate.exists() {
            continue;
        }
        match read_config_file(&candidate) {
            Ok(config) => {
                log::debug!("Loaded configuration from {}", candidate.display());
                return config;
            }
            Err(e) => log::warn!("Ignoring configuration file: {}", e),
        }
    }

    log::debug!("No configuration file found, using defaults");
    Config::default()
}

/// Save configuration to a file
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::ParsingFailed(e.to_string()))?;
    fs::write(path, content)?;
    Ok(())
}

/// Save configuration to the global config file, returning its path
pub fn save_global_config(config: &Config) -> Result<PathBuf> {
    let path = global_config_path()
        .ok_or_else(|| ConfigError::MissingValue("home directory".to_string()))?;
    save_config(config, &path)?;
    Ok(path)
}

/// Fail with a readable message when a required string setting is empty
pub fn require(value: &str, name: &str) -> std::result::Result<(), ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::MissingValue(name.to_string()))
    } else {
        Ok(())
    }
}
