//! Hierarchical configuration store with recursive deep merge.
//!
//! A [`Configuration`] is a string-keyed table of JSON values. Nested tables
//! merge key-by-key; every other value replaces what was there before.
pub mod manifest_file;
pub mod toml_loader;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// A string-keyed configuration table supporting deep merge.
///
/// # Examples
///
/// ```
/// use marionette::config::Configuration;
/// use serde_json::json;
///
/// let mut base = Configuration::from_value(json!({"a": {"b": 1}})).unwrap();
/// let child = Configuration::from_value(json!({"a": {"c": 2}})).unwrap();
/// base.deep_merge(&child);
///
/// assert_eq!(base.get_path("a.b"), Some(&json!(1)));
/// assert_eq!(base.get_path("a.c"), Some(&json!(2)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration(Map<String, Value>);

impl Configuration {
    /// Create an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from a JSON value, which must be an object.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotATable`] if `value` is not an object.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ConfigError::NotATable {
                found: type_name(&other),
            }),
        }
    }

    /// Look up a top-level key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a dotted path such as `"nginx.ports.http"`.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = self.0.get(parts.next()?)?;
        parts.try_fold(first, |value, part| value.as_object()?.get(part))
    }

    /// Look up a top-level key holding a string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Returns `true` if `key` is present at the top level.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Insert (or replace) a top-level value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Iterate over top-level keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Number of top-level keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying table.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Recursively merge `updates` into this configuration.
    ///
    /// When both sides hold a table for the same key the tables are merged;
    /// otherwise the value from `updates` replaces the existing one.
    pub fn deep_merge(&mut self, updates: &Self) {
        deep_merge_maps(&mut self.0, &updates.0);
    }
}

impl From<Map<String, Value>> for Configuration {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Configuration> for Value {
    fn from(config: Configuration) -> Self {
        Self::Object(config.0)
    }
}

/// Merge `updates` into `target`, recursing into tables present on both sides.
pub fn deep_merge_maps(target: &mut Map<String, Value>, updates: &Map<String, Value>) {
    for (key, value) in updates {
        if let Value::Object(incoming) = value
            && let Some(Value::Object(existing)) = target.get_mut(key)
        {
            deep_merge_maps(existing, incoming);
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}

/// Human-readable JSON type name used in error messages.
pub(crate) const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "nil",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "table",
    }
}
