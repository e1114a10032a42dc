//! Command: print version information.
use std::io::{self, Write as _};

use anyhow::{Context as _, Result};

/// Build version: `MARIONETTE_VERSION` when set at build time, otherwise the
/// crate version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("MARIONETTE_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the marionette version to stdout.
///
/// # Errors
///
/// Returns an error if stdout cannot be written.
pub fn run() -> Result<()> {
    writeln!(io::stdout().lock(), "marionette {}", version()).context("writing to stdout")
}
