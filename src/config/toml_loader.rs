//! TOML configuration file parsing.
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

use super::Configuration;
use crate::error::ConfigError;

/// Load and deserialize a TOML file.
///
/// A missing file deserializes from empty TOML, so optional layers can be
/// named unconditionally.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return toml::from_str("").context("Failed to create empty config");
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    toml::from_str(&content).map_err(|e| {
        ConfigError::Parse {
            path: path.display().to_string(),
            message: e.message().to_string(),
        }
        .into()
    })
}

/// Load a TOML file as a [`Configuration`] table.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML.
pub fn load_configuration(path: &Path) -> Result<Configuration> {
    load_config(path).with_context(|| format!("loading configuration {}", path.display()))
}

/// Load each file in order and deep-merge them into one configuration.
///
/// Later files override earlier ones key-by-key.
///
/// # Errors
///
/// Returns an error if any file cannot be read or parsed.
pub fn load_layers<P: AsRef<Path>>(paths: &[P]) -> Result<Configuration> {
    let mut merged = Configuration::new();
    for path in paths {
        merged.deep_merge(&load_configuration(path.as_ref())?);
    }
    Ok(merged)
}
