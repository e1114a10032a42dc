//! Command: execute a manifest and apply its resources.
use std::sync::Arc;

use anyhow::Result;

use super::{CommandSetup, run_manifest};
use crate::cli::{GlobalOpts, ManifestOpts};
use crate::logging::Logger;

/// Run the apply command.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded or its execution fails.
pub fn run(global: &GlobalOpts, opts: &ManifestOpts, log: &Arc<Logger>) -> Result<()> {
    log.info(&format!("marionette {}", super::version::version()));
    let setup = CommandSetup::init(global, &opts.manifest, log)?;
    run_manifest(&setup, log, false)
}
