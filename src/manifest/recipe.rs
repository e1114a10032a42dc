//! Recipe declarations and the arguments handlers receive.
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use super::Manifest;
use crate::config::Configuration;

/// Explicit options attached to a recipe declaration.
pub type RecipeOptions = Map<String, Value>;

/// A recipe handler.
///
/// Handlers construct resources through the manifest they are given and
/// report failure with an error.
pub type RecipeHandler =
    Arc<dyn Fn(&mut Manifest, &RecipeArgs) -> anyhow::Result<()> + Send + Sync>;

/// One entry of a manifest type's ordered recipe list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeDeclaration {
    name: String,
    options: RecipeOptions,
}

impl RecipeDeclaration {
    /// Declare recipe `name` with `options` (possibly empty).
    #[must_use]
    pub fn new(name: impl Into<String>, options: RecipeOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }

    /// Recipe name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared options.
    #[must_use]
    pub const fn options(&self) -> &RecipeOptions {
        &self.options
    }
}

/// What a handler is called with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeArgs {
    /// No options and no configuration entry named after the recipe.
    None,
    /// The configuration value stored under the recipe's name.
    Config(Value),
    /// The declaration's explicit options.
    Options(RecipeOptions),
}

impl RecipeArgs {
    /// Resolve arguments for `declaration`: explicit options win, then the
    /// configuration entry named after the recipe, then nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use marionette::config::Configuration;
    /// use marionette::manifest::{RecipeArgs, RecipeDeclaration};
    /// use serde_json::{Map, json};
    ///
    /// let config = Configuration::from_value(json!({"motd": "hello"})).unwrap();
    /// let decl = RecipeDeclaration::new("motd", Map::new());
    /// assert_eq!(RecipeArgs::for_declaration(&decl, &config), RecipeArgs::Config(json!("hello")));
    /// ```
    #[must_use]
    pub fn for_declaration(declaration: &RecipeDeclaration, configuration: &Configuration) -> Self {
        if !declaration.options.is_empty() {
            return Self::Options(declaration.options.clone());
        }
        configuration
            .get(&declaration.name)
            .map_or(Self::None, |value| Self::Config(value.clone()))
    }

    /// Look up a named argument in options or a table-valued configuration
    /// entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Options(options) => options.get(key),
            Self::Config(Value::Object(table)) => table.get(key),
            Self::Config(_) | Self::None => None,
        }
    }

    /// The arguments as one value: options as a table, `null` for none.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::None => Value::Null,
            Self::Config(value) => value.clone(),
            Self::Options(options) => Value::Object(options.clone()),
        }
    }

    /// Returns `true` if the handler received no arguments.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}
