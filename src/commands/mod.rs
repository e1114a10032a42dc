//! Subcommand implementations and their shared setup.
pub mod apply;
pub mod plan;
pub mod recipes;
pub mod version;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::backend::LocalBackend;
use crate::cli::GlobalOpts;
use crate::config::toml_loader::load_layers;
use crate::logging::{Log, Logger};
use crate::manifest::loader::load_manifest_type;
use crate::manifest::{Manifest, ManifestType, Runtime};

/// Shared state produced by the common command setup sequence.
///
/// Loads the manifest type and merges any `--config` layers into it so each
/// command starts from the same resolved type.
#[derive(Debug)]
pub struct CommandSetup {
    /// The loaded manifest type with configuration layers merged in.
    pub manifest_type: Arc<ManifestType>,
}

impl CommandSetup {
    /// Load the manifest at `path` and apply the global configuration layers.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest or any configuration layer fails to
    /// load.
    pub fn init(global: &GlobalOpts, path: &Path, log: &Logger) -> Result<Self> {
        log.stage("Loading manifest");
        let manifest_type = load_manifest_type(path)?;
        log.info(&format!(
            "{}: {} recipes",
            manifest_type.name(),
            manifest_type.recipes().len()
        ));

        if !global.configs.is_empty() {
            let overlay = load_layers(&global.configs)?;
            log.debug(&format!(
                "merging {} configuration keys from {} file(s)",
                overlay.len(),
                global.configs.len()
            ));
            manifest_type.configure(&overlay);
        }

        Ok(Self { manifest_type })
    }
}

/// Execute one instance of the set-up manifest on the local host, print the
/// summary, and bail if execution failed.
///
/// # Errors
///
/// Returns the execution error, including recipe and apply failures.
pub fn run_manifest(setup: &CommandSetup, log: &Arc<Logger>, noop: bool) -> Result<()> {
    let log_dyn: Arc<dyn Log> = Arc::<Logger>::clone(log);
    let backend = LocalBackend::new(Arc::clone(&log_dyn));
    let runtime = Arc::new(Runtime::new(Arc::new(backend), log_dyn));
    let mut manifest = Manifest::new(&setup.manifest_type, &runtime);

    let outcome = if noop {
        manifest.noop_strict()
    } else {
        manifest.execute_strict()
    };

    log.print_summary();

    outcome.with_context(|| format!("executing {}", manifest.name()))?;
    Ok(())
}
