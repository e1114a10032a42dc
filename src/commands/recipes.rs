//! Command: list a manifest's recipes in execution order.
use std::io::{self, Write as _};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use serde_json::Value;

use super::CommandSetup;
use crate::cli::{GlobalOpts, ManifestOpts};
use crate::logging::Logger;
use crate::manifest::ManifestType;

/// Run the recipes command.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded or stdout cannot be
/// written.
pub fn run(global: &GlobalOpts, opts: &ManifestOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, &opts.manifest, log)?;
    writeln!(io::stdout().lock(), "{}", listing(&setup.manifest_type))
        .context("writing to stdout")
}

/// Render the inherited recipe order, naming the type that declares each
/// recipe and any explicit options.
#[must_use]
pub fn listing(manifest_type: &ManifestType) -> String {
    let mut chain = Vec::new();
    let mut current = Some(manifest_type);
    while let Some(t) = current {
        chain.push(t);
        current = t.parent().map(Arc::as_ref);
    }
    chain.reverse();

    let mut lines = vec![
        chain
            .iter()
            .rev()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(" < "),
    ];
    let declared = chain
        .iter()
        .flat_map(|t| t.own_recipes().iter().map(move |r| (t.name(), r)));
    for (index, (owner, recipe)) in declared.enumerate() {
        let options = if recipe.options().is_empty() {
            String::new()
        } else {
            format!(" {}", Value::Object(recipe.options().clone()))
        };
        lines.push(format!("  {}. {}{options} ({owner})", index + 1, recipe.name()));
    }
    lines.join("\n")
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::manifest::ManifestTypeBuilder;
    use serde_json::json;

    #[test]
    fn listing_shows_inherited_order_and_owners() {
        let base = ManifestTypeBuilder::new("Base")
            .recipe("users")
            .recipe("packages")
            .build();
        let web = ManifestTypeBuilder::extend("Web", &base)
            .recipe_with("nginx", json!({"port": 8080}).as_object().unwrap().clone())
            .recipe("services")
            .build();
        insta::assert_snapshot!(listing(&web), @r#"
        Web < Base
          1. users (Base)
          2. packages (Base)
          3. nginx {"port":8080} (Web)
          4. services (Web)
        "#);
    }

    #[test]
    fn empty_manifest_lists_only_its_name() {
        let t = ManifestTypeBuilder::new("Empty").build();
        assert_eq!(listing(&t), "Empty");
    }
}
