//! On-disk manifest declarations (`manifest.toml`).
//!
//! ```toml
//! name = "web"
//! extends = "base.toml"
//!
//! [[recipes]]
//! name = "packages"
//!
//! [[recipes]]
//! name = "execs"
//! options = { reload = { command = "systemctl reload nginx" } }
//!
//! [requires]
//! env = ["HOME"]
//!
//! [configuration.packages]
//! nginx = { ensure = "installed" }
//! ```
use anyhow::Result;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use super::Configuration;
use super::toml_loader::load_config;

/// A manifest declared in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestFile {
    /// Type name used for the manifest and its instances.
    pub name: String,
    /// Parent manifest file, relative to this file's directory.
    #[serde(default)]
    pub extends: Option<PathBuf>,
    /// Recipes in declaration order.
    #[serde(default)]
    pub recipes: Vec<RecipeEntry>,
    /// Requirement declarations.
    #[serde(default)]
    pub requires: Requirements,
    /// Type-level configuration.
    #[serde(default)]
    pub configuration: Configuration,
}

/// One `[[recipes]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeEntry {
    /// Recipe name; must match a registered handler.
    pub name: String,
    /// Explicit options passed to the handler instead of configuration.
    #[serde(default)]
    pub options: Map<String, Value>,
}

/// Conditions that must hold for the manifest to be executable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Requirements {
    /// Environment variables that must be set.
    #[serde(default)]
    pub env: Vec<String>,
}

/// Load a manifest file.
///
/// # Errors
///
/// Returns an error if the file does not exist, cannot be read, or does not
/// match the manifest schema.
pub fn load(path: &Path) -> Result<ManifestFile> {
    if !path.is_file() {
        anyhow::bail!("manifest file not found: {}", path.display());
    }
    load_config(path)
}
