// src/config.rs

//! Configuration loading utilities.

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::Config;

/// Config file name looked up inside the storage directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

pub fn default_config_path(storage_dir: &Path) -> PathBuf {
    storage_dir.join(CONFIG_FILE_NAME)
}

/// Load and validate configuration.
///
/// An explicitly requested file must load. The default location may be
/// missing or broken, in which case defaults are used with a warning.
pub fn load_config(path: &Path, explicit: bool) -> Result<Config> {
    let config = if explicit {
        Config::load(path).map_err(|e| {
            AppError::config(format!("failed to load {}: {e}", path.display()))
        })?
    } else if path.exists() {
        Config::load_or_default(path)
    } else {
        log::info!("No config at {}, using defaults", path.display());
        Config::default()
    };

    config.validate()?;
    Ok(config)
}
