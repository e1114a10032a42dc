//! Core logging types: recipe entries, status, and the [`Log`] trait.

/// Recipe evaluation result for summary reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeEntry {
    /// Recipe name, qualified by the manifest that ran it.
    pub name: String,
    /// Final status of the recipe.
    pub status: RecipeStatus,
    /// Optional detail message (e.g., error description).
    pub message: Option<String>,
}

/// Status of an evaluated recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeStatus {
    /// Recipe ran and its resources were applied.
    Ok,
    /// Recipe ran in noop mode; resources were planned but not applied.
    NoOp,
    /// Recipe could not be evaluated.
    Failed,
}

/// Abstraction over logging backends.
///
/// [`Logger`](super::logger::Logger) forwards to `tracing`; tests substitute
/// recorders so manifest code can log without a global subscriber.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a change that noop mode did not make.
    fn dry_run(&self, msg: &str);
    /// Record a recipe result for the summary.
    fn record_recipe(&self, name: &str, status: RecipeStatus, message: Option<&str>);
}
