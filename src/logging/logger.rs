//! Structured logger with noop awareness and summary collection.
use std::path::PathBuf;
use std::sync::Mutex;

use super::types::{Log, RecipeEntry, RecipeStatus};
use super::utils::log_file_path;

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger with noop awareness and summary collection.
///
/// Every message goes through `tracing`; the subscriber installed by
/// [`init_subscriber`](super::subscriber::init_subscriber) also appends it to
/// `$XDG_CACHE_HOME/marionette/<command>.log`.
#[derive(Debug)]
pub struct Logger {
    recipes: Mutex<Vec<RecipeEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a new logger.
    ///
    /// Stores the log file path for display in the run summary.  The file
    /// itself is created by the subscriber's file layer.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            recipes: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Return the log file path, if available.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Return a clone of all recorded recipe entries.
    #[must_use]
    pub fn recipe_entries(&self) -> Vec<RecipeEntry> {
        self.recipes.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: "marionette::stage", "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose; always
    /// written to the log file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a change that noop mode did not make.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: "marionette::dry_run", "{msg}");
    }

    /// Record a recipe result for the summary.
    pub fn record_recipe(&self, name: &str, status: RecipeStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.recipes.lock() {
            guard.push(RecipeEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Count the number of failed recipes.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.recipes.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|r| r.status == RecipeStatus::Failed)
                .count()
        })
    }

    /// Print the summary of all recorded recipes.
    pub fn print_summary(&self) {
        let recipes = match self.recipes.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => return,
        };
        if recipes.is_empty() {
            return;
        }

        self.stage("Summary");

        let mut ok = 0u32;
        let mut noop = 0u32;
        let mut failed = 0u32;

        for recipe in &recipes {
            let (icon, color) = match recipe.status {
                RecipeStatus::Ok => {
                    ok += 1;
                    ("✓", "\x1b[32m")
                }
                RecipeStatus::NoOp => {
                    noop += 1;
                    ("~", "\x1b[37m")
                }
                RecipeStatus::Failed => {
                    failed += 1;
                    ("✗", "\x1b[31m")
                }
            };

            let suffix = recipe
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));

            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", recipe.name));
        }

        let total = ok + noop + failed;
        self.info(&format!(
            "{total} recipes: \x1b[32m{ok} ok\x1b[0m, \x1b[37m{noop} noop\x1b[0m, \x1b[31m{failed} failed\x1b[0m"
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);

    fn record_recipe(&self, name: &str, status: RecipeStatus, message: Option<&str>) {
        self.record_recipe(name, status, message);
    }
}
