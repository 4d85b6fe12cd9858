// SPDX-License-Identifier: MPL-2.0
//! This module handles the sanitizer's configuration, loading and saving it
//! from a `settings.toml` file.
//!
//! # Examples
//!
//! ```no_run
//! use upload_scrubber::config::{self, Config};
//! use std::path::PathBuf;
//!
//! // Load existing configuration
//! let mut config = config::load().unwrap_or_default();
//!
//! // Keep uploads without their colour profile
//! config.preserve_icc_profile = Some(false);
//!
//! // Save the modified configuration
//! config::save(&config).expect("Failed to save config");
//!
//! // To load/save from a specific path (e.g., for testing)
//! let temp_dir = PathBuf::from("./temp_config_dir");
//! std::fs::create_dir_all(&temp_dir).unwrap();
//! let temp_file = temp_dir.join("test_settings.toml");
//! config::save_to_path(&config, &temp_file).expect("Failed to save to path");
//! let loaded_config = config::load_from_path(&temp_file).expect("Failed to load from path");
//! assert_eq!(loaded_config.preserve_icc_profile, Some(false));
//! std::fs::remove_dir_all(&temp_dir).unwrap();
//! ```

pub mod defaults;

use crate::error::Result;
use defaults::{DEFAULT_PRESERVE_ICC_PROFILE, DEFAULT_VERIFY_DECODE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "settings.toml";
const APP_NAME: &str = "UploadScrubber";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub verify_decode: Option<bool>,
    #[serde(default)]
    pub preserve_icc_profile: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verify_decode: Some(DEFAULT_VERIFY_DECODE),
            preserve_icc_profile: Some(DEFAULT_PRESERVE_ICC_PROFILE),
        }
    }
}

impl Config {
    pub fn verify_decode(&self) -> bool {
        self.verify_decode.unwrap_or(DEFAULT_VERIFY_DECODE)
    }

    pub fn preserve_icc_profile(&self) -> bool {
        self.preserve_icc_profile
            .unwrap_or(DEFAULT_PRESERVE_ICC_PROFILE)
    }
}

/// Location of `settings.toml` in the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut path| {
        path.push(APP_NAME);
        path.push(CONFIG_FILE);
        path
    })
}

pub fn load() -> Result<Config> {
    if let Some(path) = default_config_path() {
        if path.exists() {
            return load_from_path(&path);
        }
    }
    Ok(Config::default())
}

pub fn save(config: &Config) -> Result<()> {
    if let Some(path) = default_config_path() {
        return save_to_path(config, &path);
    }
    Ok(())
}

/// Reads a settings file. Content that is not valid TOML yields the
/// defaults; an unreadable file is an error.
pub fn load_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "invalid settings file, using defaults");
        Config::default()
    }))
}

pub fn save_to_path(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_and_load_round_trip_preserves_settings() {
        let config = Config {
            verify_decode: Some(false),
            preserve_icc_profile: Some(false),
        };
        let temp_dir = tempdir().expect("failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        save_to_path(&config, &config_path).expect("failed to save config");
        let loaded = load_from_path(&config_path).expect("failed to load config");

        assert_eq!(loaded, config);
    }

    #[test]
    fn load_from_path_returns_default_on_invalid_toml() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let config_path = temp_dir.path().join("settings.toml");
        fs::write(&config_path, "not = valid = toml").expect("failed to write invalid toml");

        let loaded = load_from_path(&config_path).expect("load should not error");
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn load_from_path_errors_on_missing_file() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let result = load_from_path(&temp_dir.path().join("absent.toml"));
        assert!(matches!(result, Err(crate::error::Error::Io(_))));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let config_path = temp_dir.path().join("settings.toml");
        fs::write(&config_path, "verify_decode = false\n").expect("failed to write toml");

        let loaded = load_from_path(&config_path).expect("load should not error");
        assert!(!loaded.verify_decode());
        assert_eq!(loaded.preserve_icc_profile, None);
        assert!(loaded.preserve_icc_profile());
    }

    #[test]
    fn save_to_path_creates_parent_directories() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let config_path = temp_dir.path().join("deep").join("path").join("settings.toml");

        save_to_path(&Config::default(), &config_path).expect("save should create directories");
        assert!(config_path.exists());
    }

    #[test]
    fn default_config_enables_both_steps() {
        let config = Config::default();
        assert!(config.verify_decode());
        assert!(config.preserve_icc_profile());
    }

    #[test]
    fn default_config_path_ends_with_app_dir() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with(Path::new(APP_NAME).join(CONFIG_FILE)));
        }
    }
}
