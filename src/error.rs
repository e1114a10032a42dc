//! Domain-specific error types for the manifest engine.
//!
//! This module provides structured per-domain error types using [`thiserror`].
//! Internal modules return typed errors (e.g., [`ManifestError`],
//! [`TemplateError`]) while command handlers at the CLI boundary convert them
//! to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error types
//!
//! ```text
//! ConfigError      — configuration and manifest files
//! ManifestError    — requirements, recipes, apply (manifest module)
//! TemplateError    — template parsing and rendering (template module)
//! ResourceError    — resource descriptors and local providers
//! ```

use thiserror::Error;

pub use crate::manifest::ManifestError;
pub use crate::resources::error::ResourceError;
pub use crate::template::TemplateError;

/// Errors that arise from configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading a configuration file.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the expected schema.
    #[error("Invalid TOML in {path}: {message}")]
    Parse {
        /// Path to the offending file.
        path: String,
        /// Parser message.
        message: String,
    },

    /// A configuration value was expected to be a table but was not.
    #[error("Expected a table for configuration, found {found}")]
    NotATable {
        /// JSON type name of the value that was found.
        found: &'static str,
    },

    /// Manifest files extend each other in a cycle.
    #[error("Manifest inheritance cycle detected: {0}")]
    ExtendsCycle(String),
}
