use thiserror::Error;

use crate::template::TemplateError;

/// Errors raised while executing a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// A requirement predicate declared on the manifest type returned false.
    #[error("{manifest} is not executable: requirement '{requirement}' is unmet")]
    UnmetRequirement {
        /// Manifest name.
        manifest: String,
        /// Name of the failing requirement.
        requirement: String,
    },

    /// A declared recipe has no registered handler.
    #[error("{manifest} declares recipe '{recipe}' but no handler implements it")]
    UndeclaredRecipe {
        /// Manifest or manifest type name.
        manifest: String,
        /// Recipe name.
        recipe: String,
    },

    /// A recipe handler returned an error.
    #[error("recipe '{recipe}' of {manifest} failed")]
    RecipeFailed {
        /// Manifest name.
        manifest: String,
        /// Recipe name.
        recipe: String,
        /// Handler error.
        source: anyhow::Error,
    },

    /// The apply backend reported a failure.
    #[error("applying resources of {manifest} failed")]
    ApplyFailed {
        /// Manifest name.
        manifest: String,
        /// Backend error.
        source: anyhow::Error,
    },

    /// A template was requested but `template_root` is not configured.
    #[error("template_root is not configured")]
    TemplateRootMissing,

    /// A template could not be read or rendered.
    #[error(transparent)]
    Template(#[from] TemplateError),
}
