//! Command: show what applying a manifest would change.
use std::sync::Arc;

use anyhow::Result;

use super::{CommandSetup, run_manifest};
use crate::cli::{GlobalOpts, ManifestOpts};
use crate::logging::Logger;

/// Run the plan command: execute the manifest in noop mode.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded or a recipe fails.
pub fn run(global: &GlobalOpts, opts: &ManifestOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = CommandSetup::init(global, &opts.manifest, log)?;
    run_manifest(&setup, log, true)
}
