//! Build manifest types from `manifest.toml` files.
//!
//! Recipe names resolve to the [`library`](super::library) handlers.  A file
//! may `extend` another; the parent is loaded first and the child type is
//! built on top of it.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::library::{BUILTIN_RECIPES, builtin, require_env};
use super::{ManifestType, ManifestTypeBuilder};
use crate::config::manifest_file;
use crate::error::ConfigError;

/// Load the manifest type declared in `path`, following `extends`.
///
/// A relative `template_root` is resolved against the directory of the file
/// that declares it.
///
/// # Errors
///
/// Returns an error if a file in the chain cannot be read or parsed, the
/// chain is cyclic, or a declared recipe has no built-in handler.
pub fn load_manifest_type(path: &Path) -> Result<Arc<ManifestType>> {
    load_chain(path, &mut Vec::new())
}

fn load_chain(path: &Path, visiting: &mut Vec<PathBuf>) -> Result<Arc<ManifestType>> {
    let file = manifest_file::load(path)?;
    let canonical = std::fs::canonicalize(path)
        .with_context(|| format!("resolving manifest {}", path.display()))?;
    if visiting.contains(&canonical) {
        let chain: Vec<String> = visiting
            .iter()
            .chain(std::iter::once(&canonical))
            .map(|p| p.display().to_string())
            .collect();
        return Err(ConfigError::ExtendsCycle(chain.join(" → ")).into());
    }
    visiting.push(canonical.clone());
    let dir = canonical.parent().unwrap_or_else(|| Path::new("."));

    let mut builder = match &file.extends {
        Some(parent) => {
            let parent = load_chain(&dir.join(parent), visiting)?;
            ManifestTypeBuilder::extend(&file.name, &parent)
        }
        None => BUILTIN_RECIPES
            .iter()
            .filter_map(|name| builtin(name).map(|handler| (*name, handler)))
            .fold(ManifestTypeBuilder::new(&file.name), |b, (name, handler)| {
                b.shared_handler(name, handler)
            }),
    };

    let mut configuration = file.configuration;
    let template_root = configuration
        .get_str("template_root")
        .filter(|root| Path::new(root).is_relative())
        .map(|root| dir.join(root).display().to_string());
    if let Some(root) = template_root {
        configuration.insert("template_root", root);
    }
    builder = builder.configure(configuration);

    for entry in file.recipes {
        builder = builder.recipe_with(entry.name, entry.options);
    }
    for var in file.requires.env {
        builder = builder.requires(format!("env {var}"), require_env(var));
    }

    let built = builder
        .build_checked()
        .with_context(|| format!("loading manifest {}", path.display()))?;
    visiting.pop();
    Ok(built)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn recipe_names(t: &ManifestType) -> Vec<String> {
        t.recipes().iter().map(|r| r.name().to_string()).collect()
    }

    #[test]
    fn loads_recipes_and_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "web.toml",
            r#"
name = "Web"

[[recipes]]
name = "packages"

[[recipes]]
name = "services"
options = { nginx = { ensure = "running" } }

[configuration.packages]
nginx = "installed"
"#,
        );
        let t = load_manifest_type(&path).unwrap();
        assert_eq!(t.name(), "Web");
        assert_eq!(recipe_names(&t), ["packages", "services"]);
        assert_eq!(
            t.configuration().get_path("packages.nginx"),
            Some(&json!("installed"))
        );
        assert!(t.recipes()[1].options().contains_key("nginx"));
    }

    #[test]
    fn extends_parent_relative_to_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("roles")).unwrap();
        write(
            dir.path(),
            "base.toml",
            r#"
name = "Base"
[[recipes]]
name = "packages"
[configuration.packages]
curl = "installed"
"#,
        );
        let child = write(
            &dir.path().join("roles"),
            "web.toml",
            r#"
name = "Web"
extends = "../base.toml"
[[recipes]]
name = "services"
[configuration.packages]
nginx = "installed"
"#,
        );
        let t = load_manifest_type(&child).unwrap();
        assert_eq!(t.parent().map(|p| p.name()), Some("Base"));
        assert_eq!(recipe_names(&t), ["packages", "services"]);
        let config = t.configuration();
        assert!(config.get_path("packages.curl").is_some());
        assert!(config.get_path("packages.nginx").is_some());
    }

    #[test]
    fn relative_template_root_is_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "site.toml",
            "name = \"Site\"\n[configuration]\ntemplate_root = \"templates\"\n",
        );
        let t = load_manifest_type(&path).unwrap();
        let expected = std::fs::canonicalize(dir.path())
            .unwrap()
            .join("templates")
            .display()
            .to_string();
        assert_eq!(
            t.configuration().get_str("template_root"),
            Some(expected.as_str())
        );
    }

    #[test]
    fn unknown_recipe_is_rejected_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "bad.toml",
            "name = \"Bad\"\n[[recipes]]\nname = \"nginx\"\n",
        );
        let err = load_manifest_type(&path).unwrap_err();
        assert!(format!("{err:#}").contains("declares recipe 'nginx'"));
    }

    #[test]
    fn extends_cycle_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.toml", "name = \"A\"\nextends = \"b.toml\"\n");
        let b = write(dir.path(), "b.toml", "name = \"B\"\nextends = \"a.toml\"\n");
        let err = load_manifest_type(&b).unwrap_err();
        assert!(
            err.chain()
                .any(|e| e.to_string().contains("inheritance cycle"))
        );
    }

    #[test]
    fn env_requirements_are_named() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "env.toml",
            "name = \"Env\"\n[requires]\nenv = [\"PATH\"]\n",
        );
        let t = load_manifest_type(&path).unwrap();
        assert_eq!(t.requirement_names(), ["env PATH"]);
    }
}
