//! Manifests: typed recipe lists applied once to produce resources.
//!
//! A [`ManifestType`] declares the ordered recipes, their handlers and the
//! shared configuration.  A [`Manifest`] is one instance of a type bound to a
//! [`Runtime`].  Executing it runs every recipe in order, each handler
//! describing desired state through [`Manifest::new_resource`], then hands the
//! collected resources to the runtime's backend.  A manifest executes
//! successfully at most once.
mod descriptor;
mod error;
pub mod library;
pub mod loader;
mod recipe;
mod runtime;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::backend::ApplyReport;
use crate::config::Configuration;
use crate::logging::RecipeStatus;
use crate::resources::ledger::ResourceLedger;
use crate::resources::{Attributes, ResourceDescriptor, ResourceKind};
use crate::template::{Bindings, Template};

pub use descriptor::{ManifestType, ManifestTypeBuilder, Requirement};
pub use error::ManifestError;
pub use recipe::{RecipeArgs, RecipeDeclaration, RecipeHandler, RecipeOptions};
pub use runtime::{NoopGuard, Runtime, Section};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of a manifest instance.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ManifestState {
    /// Not yet executed successfully.
    #[default]
    Fresh,
    /// Executed successfully; further executions do nothing.
    Executed,
}

/// One instance of a [`ManifestType`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use marionette::backend::{ApplyBackend, ApplyReport};
/// use marionette::logging::Logger;
/// use marionette::manifest::{Manifest, ManifestTypeBuilder, Runtime};
/// use marionette::resources::{ResourceDescriptor, attributes};
/// use serde_json::json;
///
/// struct Accept;
/// impl ApplyBackend for Accept {
///     fn apply(&self, r: &[ResourceDescriptor], _: bool) -> anyhow::Result<ApplyReport> {
///         Ok(ApplyReport { changed: r.len() as u32, ..ApplyReport::new() })
///     }
/// }
///
/// let motd = ManifestTypeBuilder::new("Motd")
///     .recipe("motd")
///     .handler("motd", |m, _| {
///         m.file("/etc/motd", attributes(json!({"content": "hello\n"})));
///         Ok(())
///     })
///     .build();
/// let runtime = Arc::new(Runtime::new(Arc::new(Accept), Arc::new(Logger::new("doc"))));
///
/// let mut manifest = Manifest::new(&motd, &runtime);
/// assert!(manifest.execute());
/// assert!(!manifest.execute());
/// assert_eq!(manifest.files().len(), 1);
/// ```
#[derive(Debug)]
pub struct Manifest {
    manifest_type: Arc<ManifestType>,
    name: String,
    configuration: Configuration,
    ledger: ResourceLedger,
    state: ManifestState,
    runtime: Arc<Runtime>,
}

impl Manifest {
    /// Instantiate `manifest_type` against `runtime`.
    ///
    /// The instance starts from a copy of the type's current configuration.
    #[must_use]
    pub fn new(manifest_type: &Arc<ManifestType>, runtime: &Arc<Runtime>) -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            name: format!("{}#{id}", manifest_type.name()),
            configuration: manifest_type.configuration(),
            manifest_type: Arc::clone(manifest_type),
            ledger: ResourceLedger::new(),
            state: ManifestState::Fresh,
            runtime: Arc::clone(runtime),
        }
    }

    /// Instance name, `"<Type>#<id>"`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type this manifest instantiates.
    #[must_use]
    pub const fn manifest_type(&self) -> &Arc<ManifestType> {
        &self.manifest_type
    }

    /// The runtime this manifest executes on.
    ///
    /// Recipes use it to create and execute further manifests in place.
    #[must_use]
    pub const fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// The instance configuration.
    #[must_use]
    pub const fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Inherited recipe list of the manifest's type.
    #[must_use]
    pub fn recipes(&self) -> Vec<RecipeDeclaration> {
        self.manifest_type.recipes()
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ManifestState {
        self.state
    }

    /// Whether every requirement of the type and its ancestors holds.
    #[must_use]
    pub fn is_executable(&self) -> bool {
        self.unmet_requirement().is_none()
    }

    /// Name of the first requirement that does not hold.
    #[must_use]
    pub fn unmet_requirement(&self) -> Option<String> {
        self.manifest_type.first_unmet(self)
    }

    /// Deep-merge `updates` into this instance's configuration.
    ///
    /// The merge is also written through to the type, so instances created
    /// afterwards start from the updated configuration.  Instances that
    /// already exist are unaffected.
    pub fn configure(&mut self, updates: impl Into<Configuration>) {
        let updates = updates.into();
        self.configuration.deep_merge(&updates);
        self.manifest_type.configure(&updates);
    }

    /// Construct, or look up and update, the resource `(kind, name)`.
    ///
    /// `attributes` are merged over any already present.  The type's
    /// attribute-default policies then fill attributes still unset.  The
    /// descriptor is returned for further customisation.
    pub fn new_resource(
        &mut self,
        kind: ResourceKind,
        name: &str,
        attributes: Attributes,
    ) -> &mut ResourceDescriptor {
        let defaults = self.manifest_type.resource_defaults();
        let descriptor = self.ledger.upsert(kind, name, attributes);
        for policy in defaults.iter().filter(|p| p.applies_to(kind)) {
            policy.apply(descriptor);
        }
        descriptor
    }

    /// `name → descriptor` for `kind`.
    #[must_use]
    pub fn resources_for(&self, kind: ResourceKind) -> &IndexMap<String, ResourceDescriptor> {
        self.ledger.resources_for(kind)
    }

    /// Look up one constructed resource.
    #[must_use]
    pub fn resource(&self, kind: ResourceKind, name: &str) -> Option<&ResourceDescriptor> {
        self.ledger.get(kind, name)
    }

    /// Every constructed resource, ordered by first use of its kind and then
    /// by insertion within the kind.
    #[must_use]
    pub fn flat_resources(&self) -> Vec<ResourceDescriptor> {
        self.ledger.iter().cloned().collect()
    }

    /// Run every recipe in declaration order.
    ///
    /// # Errors
    ///
    /// Stops at the first recipe without a handler
    /// ([`ManifestError::UndeclaredRecipe`]) or whose handler fails
    /// ([`ManifestError::RecipeFailed`]).
    pub fn evaluate_recipes(&mut self) -> Result<(), ManifestError> {
        let runtime = Arc::clone(&self.runtime);
        for declaration in self.recipes() {
            let qualified = format!("{}::{}", self.name, declaration.name());
            let Some(handler) = self.manifest_type.handler(declaration.name()) else {
                runtime.log().record_recipe(
                    &qualified,
                    RecipeStatus::Failed,
                    Some("no handler implements this recipe"),
                );
                return Err(ManifestError::UndeclaredRecipe {
                    manifest: self.name.clone(),
                    recipe: declaration.name().to_string(),
                });
            };
            let args = RecipeArgs::for_declaration(&declaration, &self.configuration);
            runtime.log().debug(&format!("evaluating {qualified}"));
            if let Err(source) = handler(self, &args) {
                runtime
                    .log()
                    .record_recipe(&qualified, RecipeStatus::Failed, Some(&format!("{source:#}")));
                return Err(ManifestError::RecipeFailed {
                    manifest: self.name.clone(),
                    recipe: declaration.name().to_string(),
                    source,
                });
            }
        }
        Ok(())
    }

    /// Hand the flat resource list and the current noop flag to the backend.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::ApplyFailed`] if the backend reports failure.
    pub fn apply(&self) -> Result<ApplyReport, ManifestError> {
        let resources = self.flat_resources();
        self.runtime
            .backend()
            .apply(&resources, self.runtime.is_noop())
            .map_err(|source| ManifestError::ApplyFailed {
                manifest: self.name.clone(),
                source,
            })
    }

    /// Evaluate and apply the manifest unless it already ran.
    ///
    /// Returns `true` on the first successful run.  Failures are logged and
    /// reported as `false`; the manifest then stays fresh and may be executed
    /// again.
    pub fn execute(&mut self) -> bool {
        let runtime = Arc::clone(&self.runtime);
        let _section = runtime.enter();
        let outcome = self.run();
        self.report(outcome)
    }

    /// Like [`Manifest::execute`] but returns the first error.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::UnmetRequirement`],
    /// [`ManifestError::UndeclaredRecipe`], [`ManifestError::RecipeFailed`]
    /// or [`ManifestError::ApplyFailed`].
    pub fn execute_strict(&mut self) -> Result<bool, ManifestError> {
        let runtime = Arc::clone(&self.runtime);
        let _section = runtime.enter();
        self.run()
    }

    /// [`Manifest::execute`] with the runtime's noop flag set for the
    /// duration of the call.
    pub fn noop(&mut self) -> bool {
        let runtime = Arc::clone(&self.runtime);
        let _section = runtime.enter();
        let _noop = runtime.noop_guard();
        let outcome = self.run();
        self.report(outcome)
    }

    /// [`Manifest::execute_strict`] with the runtime's noop flag set for the
    /// duration of the call.
    ///
    /// # Errors
    ///
    /// Same as [`Manifest::execute_strict`].
    pub fn noop_strict(&mut self) -> Result<bool, ManifestError> {
        let runtime = Arc::clone(&self.runtime);
        let _section = runtime.enter();
        let _noop = runtime.noop_guard();
        self.run()
    }

    /// Render template `name` below the configured `template_root`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::TemplateRootMissing`] when `template_root` is
    /// not configured, or [`ManifestError::Template`] when the file cannot be
    /// read or rendered.
    pub fn template(&self, name: &str, context: Bindings) -> Result<String, ManifestError> {
        let root = self
            .configuration
            .get_str("template_root")
            .ok_or(ManifestError::TemplateRootMissing)?;
        let template = Template::new(Path::new(root).join(name), context);
        Ok(template.render(self.runtime.fs_ops())?)
    }

    fn run(&mut self) -> Result<bool, ManifestError> {
        let runtime = Arc::clone(&self.runtime);
        if self.state == ManifestState::Executed {
            runtime
                .log()
                .debug(&format!("{} already executed, skipping", self.name));
            return Ok(false);
        }
        if let Some(requirement) = self.unmet_requirement() {
            return Err(ManifestError::UnmetRequirement {
                manifest: self.name.clone(),
                requirement,
            });
        }

        let noop = runtime.is_noop();
        let stage = if noop { "Plan" } else { "Apply" };
        runtime.log().stage(&format!("{stage} {}", self.name));
        self.evaluate_recipes()?;
        let report = self.apply()?;
        runtime
            .log()
            .debug(&format!("{}: {}", self.name, report.summary(noop)));

        let status = if noop {
            RecipeStatus::NoOp
        } else {
            RecipeStatus::Ok
        };
        for declaration in self.recipes() {
            runtime.log().record_recipe(
                &format!("{}::{}", self.name, declaration.name()),
                status,
                None,
            );
        }
        self.state = ManifestState::Executed;
        Ok(true)
    }

    fn report(&self, outcome: Result<bool, ManifestError>) -> bool {
        outcome.unwrap_or_else(|e| {
            self.runtime.log().error(&format!("{:#}", anyhow::Error::from(e)));
            false
        })
    }
}

macro_rules! resource_shortcuts {
    ($($kind:ident => $single:ident, $plural:ident;)*) => {
        impl Manifest {
            $(
                #[doc = concat!("Construct or update the `", stringify!($single), "` resource `name`.")]
                pub fn $single(&mut self, name: &str, attributes: Attributes) -> &mut ResourceDescriptor {
                    self.new_resource(ResourceKind::$kind, name, attributes)
                }

                #[doc = concat!("Every `", stringify!($single), "` resource, by name.")]
                #[must_use]
                pub fn $plural(&self) -> &IndexMap<String, ResourceDescriptor> {
                    self.resources_for(ResourceKind::$kind)
                }
            )*
        }
    };
}

resource_shortcuts! {
    Exec => exec, execs;
    File => file, files;
    Package => package, packages;
    Service => service, services;
}
