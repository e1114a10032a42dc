//! Built-in recipe handlers for manifests declared in files.
//!
//! Each handler turns its arguments (explicit options or the configuration
//! entry named after the recipe) into resources:
//!
//! ```toml
//! [configuration.packages]
//! nginx = { ensure = "installed" }
//! curl = "latest"
//!
//! [configuration.execs]
//! reload = "systemctl reload nginx"
//!
//! [configuration.templates."/etc/motd"]
//! template = "motd.erb"
//! context = { owner = "ops" }
//! ```
//!
//! A string entry is shorthand for the kind's main attribute; `packages` and
//! `services` also accept a plain list of names.
use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use serde_json::Value;

use super::{Manifest, RecipeArgs, RecipeHandler};
use crate::config::type_name;
use crate::resources::{Attributes, ResourceKind};

/// Names [`builtin`] resolves, in the order `recipes` listings show them.
pub const BUILTIN_RECIPES: [&str; 5] = ["execs", "files", "packages", "services", "templates"];

/// Look up a built-in handler by recipe name.
///
/// # Examples
///
/// ```
/// use marionette::manifest::library::builtin;
///
/// assert!(builtin("packages").is_some());
/// assert!(builtin("nginx").is_none());
/// ```
#[must_use]
pub fn builtin(name: &str) -> Option<RecipeHandler> {
    let handler: RecipeHandler = match name {
        "execs" => Arc::new(execs),
        "files" => Arc::new(files),
        "packages" => Arc::new(packages),
        "services" => Arc::new(services),
        "templates" => Arc::new(templates),
        _ => return None,
    };
    Some(handler)
}

/// Requirement that holds while environment variable `var` is set.
#[must_use]
pub fn require_env(var: impl Into<String>) -> impl Fn(&Manifest) -> bool + Send + Sync + 'static {
    let var = var.into();
    move |_| std::env::var_os(&var).is_some()
}

fn execs(manifest: &mut Manifest, args: &RecipeArgs) -> Result<()> {
    declare_each(manifest, ResourceKind::Exec, args)
}

fn files(manifest: &mut Manifest, args: &RecipeArgs) -> Result<()> {
    declare_each(manifest, ResourceKind::File, args)
}

fn packages(manifest: &mut Manifest, args: &RecipeArgs) -> Result<()> {
    declare_each(manifest, ResourceKind::Package, args)
}

fn services(manifest: &mut Manifest, args: &RecipeArgs) -> Result<()> {
    declare_each(manifest, ResourceKind::Service, args)
}

/// Render a template per entry into a `file` resource.
///
/// Template bindings are the manifest configuration overlaid with the entry's
/// `context` table.  The remaining entry keys become file attributes.
fn templates(manifest: &mut Manifest, args: &RecipeArgs) -> Result<()> {
    for (path, mut attributes) in entries("template", &args.to_value(), "template", false)? {
        let template = match attributes.remove("template") {
            Some(Value::String(template)) => template,
            Some(other) => bail!(
                "template for {path}: expected a string, found {}",
                type_name(&other)
            ),
            None => bail!("template for {path}: missing 'template'"),
        };
        let mut bindings = manifest.configuration().as_map().clone();
        match attributes.remove("context") {
            Some(Value::Object(context)) => bindings.extend(context),
            Some(Value::Null) | None => {}
            Some(other) => bail!(
                "template for {path}: context must be a table, found {}",
                type_name(&other)
            ),
        }
        let content = manifest
            .template(&template, bindings)
            .with_context(|| format!("rendering {template} for {path}"))?;
        manifest.file(&path, attributes).set("content", content);
    }
    Ok(())
}

fn declare_each(manifest: &mut Manifest, kind: ResourceKind, args: &RecipeArgs) -> Result<()> {
    let names_allowed = matches!(kind, ResourceKind::Package | ResourceKind::Service);
    let value = args.to_value();
    for (name, attributes) in entries(kind.as_str(), &value, shorthand_key(kind), names_allowed)? {
        manifest.new_resource(kind, &name, attributes);
    }
    Ok(())
}

/// Attribute a string entry sets.
const fn shorthand_key(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Exec => "command",
        ResourceKind::File => "content",
        _ => "ensure",
    }
}

/// Normalise recipe arguments into `(name, attributes)` pairs.
fn entries(
    what: &str,
    value: &Value,
    shorthand: &str,
    names_allowed: bool,
) -> Result<Vec<(String, Attributes)>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Object(table) => table
            .iter()
            .map(|(name, entry)| {
                let attributes = match entry {
                    Value::Object(attributes) => attributes.clone(),
                    Value::Null => Attributes::new(),
                    Value::String(s) => {
                        let mut attributes = Attributes::new();
                        attributes.insert(shorthand.to_string(), Value::String(s.clone()));
                        attributes
                    }
                    other => bail!(
                        "{what} {name}: expected a table or string, found {}",
                        type_name(other)
                    ),
                };
                Ok((name.clone(), attributes))
            })
            .collect(),
        Value::Array(names) if names_allowed => names
            .iter()
            .map(|entry| match entry {
                Value::String(name) => Ok((name.clone(), Attributes::new())),
                other => bail!("{what} names must be strings, found {}", type_name(other)),
            })
            .collect(),
        other => bail!("expected a table of {what} entries, found {}", type_name(other)),
    }
}
