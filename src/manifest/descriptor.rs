//! Manifest types: declared recipes, handlers, configuration and policies.
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::recipe::{RecipeArgs, RecipeDeclaration, RecipeHandler, RecipeOptions};
use super::{Manifest, ManifestError};
use crate::config::Configuration;
use crate::resources::{ResourceDefault, SearchPathDefault};

/// Predicate deciding whether a manifest may execute.
pub type Requirement = Arc<dyn Fn(&Manifest) -> bool + Send + Sync>;

/// Everything instances of one kind of manifest share.
///
/// Built once with [`ManifestTypeBuilder`] and shared behind an [`Arc`].
/// Recipes, handlers, requirements and resource defaults are fixed at build
/// time.  The configuration stays writable: [`ManifestType::configure`] and
/// instance-level [`Manifest::configure`] merge into it, and every instance
/// created afterwards starts from the merged result.
pub struct ManifestType {
    name: String,
    parent: Option<Arc<ManifestType>>,
    recipes: Vec<RecipeDeclaration>,
    handlers: HashMap<String, RecipeHandler>,
    configuration: RwLock<Configuration>,
    requirements: Vec<(String, Requirement)>,
    resource_defaults: Vec<Arc<dyn ResourceDefault>>,
}

impl std::fmt::Debug for ManifestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut handlers: Vec<&String> = self.handlers.keys().collect();
        handlers.sort();
        let requirements: Vec<&String> = self.requirements.iter().map(|(name, _)| name).collect();
        f.debug_struct("ManifestType")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("recipes", &self.recipes)
            .field("handlers", &handlers)
            .field("configuration", &self.configuration())
            .field("requirements", &requirements)
            .field("resource_defaults", &self.resource_defaults)
            .finish()
    }
}

impl ManifestType {
    /// Type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type this one extends, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<&Arc<Self>> {
        self.parent.as_ref()
    }

    /// Recipes declared directly on this type.
    #[must_use]
    pub fn own_recipes(&self) -> &[RecipeDeclaration] {
        &self.recipes
    }

    /// Inherited recipe list: the parent's list followed by this type's own
    /// declarations.
    #[must_use]
    pub fn recipes(&self) -> Vec<RecipeDeclaration> {
        let mut all = self.parent.as_ref().map_or_else(Vec::new, |p| p.recipes());
        all.extend(self.recipes.iter().cloned());
        all
    }

    /// Find the handler for `recipe`, searching this type before its
    /// ancestors.
    #[must_use]
    pub fn handler(&self, recipe: &str) -> Option<RecipeHandler> {
        self.handlers
            .get(recipe)
            .cloned()
            .or_else(|| self.parent.as_ref()?.handler(recipe))
    }

    /// Snapshot of the type-level configuration.
    #[must_use]
    pub fn configuration(&self) -> Configuration {
        self.configuration
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Deep-merge `updates` into the type-level configuration.
    ///
    /// Instances already created keep their own copy; later instances see
    /// the change.
    pub fn configure(&self, updates: &Configuration) {
        self.configuration
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .deep_merge(updates);
    }

    /// Requirement names, ancestors first.
    #[must_use]
    pub fn requirement_names(&self) -> Vec<String> {
        let mut names = self
            .parent
            .as_ref()
            .map_or_else(Vec::new, |p| p.requirement_names());
        names.extend(self.requirements.iter().map(|(name, _)| name.clone()));
        names
    }

    /// Name of the first requirement `manifest` does not meet, checking
    /// ancestors first.
    pub(super) fn first_unmet(&self, manifest: &Manifest) -> Option<String> {
        if let Some(unmet) = self.parent.as_ref().and_then(|p| p.first_unmet(manifest)) {
            return Some(unmet);
        }
        self.requirements
            .iter()
            .find(|(_, check)| !check(manifest))
            .map(|(name, _)| name.clone())
    }

    /// Attribute-default policies, ancestors first.
    #[must_use]
    pub fn resource_defaults(&self) -> Vec<Arc<dyn ResourceDefault>> {
        let mut all = self
            .parent
            .as_ref()
            .map_or_else(Vec::new, |p| p.resource_defaults());
        all.extend(self.resource_defaults.iter().cloned());
        all
    }

    /// Verify every declared recipe has a handler.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::UndeclaredRecipe`] for the first recipe
    /// without one.
    pub fn check(&self) -> Result<(), ManifestError> {
        self.recipes()
            .into_iter()
            .find(|r| self.handler(r.name()).is_none())
            .map_or(Ok(()), |missing| {
                Err(ManifestError::UndeclaredRecipe {
                    manifest: self.name.clone(),
                    recipe: missing.name().to_string(),
                })
            })
    }
}

/// Builder for [`ManifestType`].
///
/// # Examples
///
/// ```
/// use marionette::manifest::ManifestTypeBuilder;
///
/// let base = ManifestTypeBuilder::new("Base")
///     .recipe("users")
///     .handler("users", |_, _| Ok(()))
///     .build();
/// let web = ManifestTypeBuilder::extend("Web", &base)
///     .recipe("nginx")
///     .handler("nginx", |_, _| Ok(()))
///     .build();
///
/// let names: Vec<String> = web.recipes().iter().map(|r| r.name().to_string()).collect();
/// assert_eq!(names, ["users", "nginx"]);
/// assert_eq!(base.recipes().len(), 1);
/// ```
#[must_use]
pub struct ManifestTypeBuilder {
    name: String,
    parent: Option<Arc<ManifestType>>,
    recipes: Vec<RecipeDeclaration>,
    handlers: HashMap<String, RecipeHandler>,
    configuration: Configuration,
    requirements: Vec<(String, Requirement)>,
    resource_defaults: Vec<Arc<dyn ResourceDefault>>,
}

impl std::fmt::Debug for ManifestTypeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestTypeBuilder")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("recipes", &self.recipes)
            .finish_non_exhaustive()
    }
}

impl ManifestTypeBuilder {
    /// Start a root type.  Root types stamp `exec` resources with the
    /// process search path ([`SearchPathDefault`]).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            recipes: Vec::new(),
            handlers: HashMap::new(),
            configuration: Configuration::new(),
            requirements: Vec::new(),
            resource_defaults: vec![Arc::new(SearchPathDefault)],
        }
    }

    /// Start a type extending `parent`.
    ///
    /// The new type inherits the parent's recipes, handlers, requirements and
    /// resource defaults, and starts from a snapshot of its configuration.
    pub fn extend(name: impl Into<String>, parent: &Arc<ManifestType>) -> Self {
        Self {
            name: name.into(),
            parent: Some(Arc::clone(parent)),
            recipes: Vec::new(),
            handlers: HashMap::new(),
            configuration: parent.configuration(),
            requirements: Vec::new(),
            resource_defaults: Vec::new(),
        }
    }

    /// Declare recipe `name` without options.
    pub fn recipe(self, name: impl Into<String>) -> Self {
        self.recipe_with(name, RecipeOptions::new())
    }

    /// Declare recipe `name` with explicit options.
    pub fn recipe_with(mut self, name: impl Into<String>, options: RecipeOptions) -> Self {
        self.recipes.push(RecipeDeclaration::new(name, options));
        self
    }

    /// Register the handler implementing recipe `name`.
    pub fn handler<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Manifest, &RecipeArgs) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    /// Register an already shared handler.
    pub fn shared_handler(mut self, name: impl Into<String>, handler: RecipeHandler) -> Self {
        self.handlers.insert(name.into(), handler);
        self
    }

    /// Deep-merge `updates` into the type's configuration.
    pub fn configure(mut self, updates: impl Into<Configuration>) -> Self {
        self.configuration.deep_merge(&updates.into());
        self
    }

    /// Add a named requirement; instances are executable only when it holds.
    pub fn requires<F>(mut self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Manifest) -> bool + Send + Sync + 'static,
    {
        self.requirements.push((name.into(), Arc::new(check)));
        self
    }

    /// Add an attribute-default policy for constructed resources.
    pub fn resource_default(mut self, policy: impl ResourceDefault + 'static) -> Self {
        self.resource_defaults.push(Arc::new(policy));
        self
    }

    /// Finish the type without checking handlers.
    ///
    /// A recipe without a handler then fails when an instance executes.
    #[must_use]
    pub fn build(self) -> Arc<ManifestType> {
        Arc::new(ManifestType {
            name: self.name,
            parent: self.parent,
            recipes: self.recipes,
            handlers: self.handlers,
            configuration: RwLock::new(self.configuration),
            requirements: self.requirements,
            resource_defaults: self.resource_defaults,
        })
    }

    /// Finish the type, rejecting recipes without handlers.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::UndeclaredRecipe`] for the first declared
    /// recipe no handler implements.
    pub fn build_checked(self) -> Result<Arc<ManifestType>, ManifestError> {
        let built = self.build();
        built.check()?;
        Ok(built)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::resources::{AttributeDefault, ResourceKind};
    use serde_json::{Value, json};

    fn config(value: Value) -> Configuration {
        Configuration::from_value(value).unwrap()
    }

    fn names(recipes: &[RecipeDeclaration]) -> Vec<&str> {
        recipes.iter().map(RecipeDeclaration::name).collect()
    }

    #[test]
    fn empty_type_has_no_recipes() {
        let t = ManifestTypeBuilder::new("Empty").build();
        assert!(t.recipes().is_empty());
        assert!(t.check().is_ok());
    }

    #[test]
    fn parent_recipes_come_first_and_parent_is_untouched() {
        let base = ManifestTypeBuilder::new("Base")
            .recipe("a")
            .recipe("b")
            .build();
        let child = ManifestTypeBuilder::extend("Child", &base)
            .recipe("c")
            .recipe("d")
            .build();
        assert_eq!(names(&child.recipes()), ["a", "b", "c", "d"]);
        assert_eq!(names(child.own_recipes()), ["c", "d"]);
        assert_eq!(names(&base.recipes()), ["a", "b"]);
    }

    #[test]
    fn siblings_do_not_see_each_other() {
        let base = ManifestTypeBuilder::new("Base").recipe("a").build();
        let left = ManifestTypeBuilder::extend("Left", &base).recipe("l").build();
        let right = ManifestTypeBuilder::extend("Right", &base).recipe("r").build();
        assert_eq!(names(&left.recipes()), ["a", "l"]);
        assert_eq!(names(&right.recipes()), ["a", "r"]);
    }

    #[test]
    fn child_configuration_deep_merges_into_parent() {
        let base = ManifestTypeBuilder::new("Base")
            .configure(config(json!({"a": {"b": 1}, "keep": true})))
            .build();
        let child = ManifestTypeBuilder::extend("Child", &base)
            .configure(config(json!({"a": {"c": 2}})))
            .build();
        let merged = child.configuration();
        assert_eq!(merged.get_path("a.b"), Some(&json!(1)));
        assert_eq!(merged.get_path("a.c"), Some(&json!(2)));
        assert_eq!(merged.get("keep"), Some(&json!(true)));
        assert_eq!(base.configuration().get_path("a.c"), None);
    }

    #[test]
    fn handler_lookup_prefers_own_then_ancestors() {
        let base = ManifestTypeBuilder::new("Base")
            .recipe("shared")
            .handler("shared", |_, _| Ok(()))
            .handler("overridden", |_, _| anyhow::bail!("base"))
            .build();
        let child = ManifestTypeBuilder::extend("Child", &base)
            .handler("overridden", |_, _| Ok(()))
            .build();
        assert!(child.handler("shared").is_some());
        assert!(child.handler("overridden").is_some());
        assert!(child.handler("missing").is_none());
        assert!(base.handler("overridden").is_some());
    }

    #[test]
    fn child_may_implement_parent_recipe() {
        let base = ManifestTypeBuilder::new("Abstract").recipe("deploy").build();
        assert!(base.check().is_err());
        let concrete = ManifestTypeBuilder::extend("Concrete", &base)
            .handler("deploy", |_, _| Ok(()))
            .build_checked();
        assert!(concrete.is_ok());
    }

    #[test]
    fn build_checked_reports_first_undeclared_recipe() {
        let err = ManifestTypeBuilder::new("Broken")
            .recipe("ok")
            .handler("ok", |_, _| Ok(()))
            .recipe("missing")
            .recipe("also_missing")
            .build_checked()
            .unwrap_err();
        assert!(matches!(
            err,
            ManifestError::UndeclaredRecipe { ref manifest, ref recipe }
                if manifest == "Broken" && recipe == "missing"
        ));
    }

    #[test]
    fn type_configure_is_visible_in_later_snapshots() {
        let t = ManifestTypeBuilder::new("Base").build();
        t.configure(&config(json!({"x": 1})));
        assert_eq!(t.configuration().get("x"), Some(&json!(1)));
    }

    #[test]
    fn requirements_and_defaults_are_inherited() {
        let base = ManifestTypeBuilder::new("Base")
            .requires("always", |_| true)
            .build();
        let child = ManifestTypeBuilder::extend("Child", &base)
            .requires("never", |_| false)
            .resource_default(AttributeDefault::new(ResourceKind::File, "owner", "root"))
            .build();
        assert_eq!(child.requirement_names(), ["always", "never"]);
        assert_eq!(base.resource_defaults().len(), 1);
        assert_eq!(child.resource_defaults().len(), 2);
    }

    #[test]
    fn debug_lists_handlers_without_closures() {
        let t = ManifestTypeBuilder::new("Base")
            .recipe("a")
            .handler("a", |_, _| Ok(()))
            .build();
        let rendered = format!("{t:?}");
        assert!(rendered.contains("ManifestType"));
        assert!(rendered.contains("\"a\""));
    }
}
