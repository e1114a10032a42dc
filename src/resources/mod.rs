//! Resource descriptors, the per-manifest ledger, and local providers.
//!
//! Recipes describe desired state by constructing [`ResourceDescriptor`]s
//! through [`Manifest::new_resource`](crate::manifest::Manifest::new_resource).
//! The descriptors are opaque attribute tables as far as the manifest is
//! concerned; the [`exec`] and [`file`] providers turn them into idempotent
//! `check + apply` primitives for the local backend.
pub mod error;
pub mod exec;
pub mod file;
pub mod ledger;

use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute table of a resource.
pub type Attributes = Map<String, Value>;

/// Convert a JSON object into [`Attributes`].
///
/// Anything other than an object yields an empty table, so `json!({})` and
/// `Value::Null` both mean "no attributes".
///
/// # Examples
///
/// ```
/// use marionette::resources::attributes;
/// use serde_json::json;
///
/// let attrs = attributes(json!({"command": "true"}));
/// assert_eq!(attrs.get("command"), Some(&json!("true")));
/// assert!(attributes(json!(null)).is_empty());
/// ```
#[must_use]
pub fn attributes(value: Value) -> Attributes {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Type tag of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A command to run.
    Exec,
    /// A file with optional content.
    File,
    /// A system package.
    Package,
    /// A system service.
    Service,
    /// A scheduled job.
    Cron,
    /// A local user account.
    User,
    /// A local group.
    Group,
    /// A hosts-file entry.
    Host,
    /// A filesystem mount.
    Mount,
    /// An authorized SSH key.
    SshKey,
}

impl ResourceKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Exec,
        Self::File,
        Self::Package,
        Self::Service,
        Self::Cron,
        Self::User,
        Self::Group,
        Self::Host,
        Self::Mount,
        Self::SshKey,
    ];

    /// Lower-case tag, e.g. `"exec"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exec => "exec",
            Self::File => "file",
            Self::Package => "package",
            Self::Service => "service",
            Self::Cron => "cron",
            Self::User => "user",
            Self::Group => "group",
            Self::Host => "host",
            Self::Mount => "mount",
            Self::SshKey => "ssh_key",
        }
    }

    /// Parse a lower-case tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == tag)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed record of desired state.
///
/// Only [`ledger::ResourceLedger`] creates descriptors; recipes receive a
/// mutable reference and customise attributes from there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDescriptor {
    kind: ResourceKind,
    name: String,
    attributes: Attributes,
}

impl ResourceDescriptor {
    pub(crate) fn new(kind: ResourceKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            attributes: Map::new(),
        }
    }

    /// Resource kind.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Resource name, unique within its kind.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All attributes.
    #[must_use]
    pub const fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Look up one attribute.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Look up a string attribute.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Set an attribute, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Set an attribute only if it is not already present.
    pub fn set_default(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        if !self.attributes.contains_key(key) {
            self.attributes.insert(key.to_string(), value.into());
        }
        self
    }

    /// Overwrite attributes with every entry of `updates`.
    pub fn merge(&mut self, updates: Attributes) -> &mut Self {
        self.attributes.extend(updates);
        self
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.name)
    }
}

/// Attribute-default policy stamped onto resources as they are constructed.
///
/// Policies only fill attributes the recipe left unset.
pub trait ResourceDefault: Send + Sync + fmt::Debug {
    /// Whether the policy applies to resources of `kind`.
    fn applies_to(&self, kind: ResourceKind) -> bool;

    /// Stamp defaults onto `resource`.
    fn apply(&self, resource: &mut ResourceDescriptor);
}

/// Default `path` of every `exec` resource to the process search path.
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchPathDefault;

impl ResourceDefault for SearchPathDefault {
    fn applies_to(&self, kind: ResourceKind) -> bool {
        kind == ResourceKind::Exec
    }

    fn apply(&self, resource: &mut ResourceDescriptor) {
        if let Ok(path) = std::env::var("PATH") {
            resource.set_default("path", path);
        }
    }
}

/// A fixed attribute value for every resource of one kind.
#[derive(Debug, Clone)]
pub struct AttributeDefault {
    kind: ResourceKind,
    key: String,
    value: Value,
}

impl AttributeDefault {
    /// Default `key` to `value` on resources of `kind`.
    #[must_use]
    pub fn new(kind: ResourceKind, key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            kind,
            key: key.into(),
            value: value.into(),
        }
    }
}

impl ResourceDefault for AttributeDefault {
    fn applies_to(&self, kind: ResourceKind) -> bool {
        kind == self.kind
    }

    fn apply(&self, resource: &mut ResourceDescriptor) {
        resource.set_default(&self.key, self.value.clone());
    }
}

/// State of a resource on the local host.
///
/// # Examples
///
/// ```
/// use marionette::resources::ResourceState;
///
/// let missing = ResourceState::Missing;
/// let correct = ResourceState::Correct;
/// let wrong = ResourceState::Incorrect { current: "stale content".into() };
/// let skip = ResourceState::Invalid { reason: "path is a directory".into() };
///
/// assert_ne!(missing, correct);
/// assert_eq!(correct, ResourceState::Correct);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Resource does not exist or has not run.
    Missing,
    /// Resource exists and matches the desired state.
    Correct,
    /// Resource exists but does not match the desired state.
    Incorrect {
        /// The current value of the resource.
        current: String,
    },
    /// Resource cannot be applied.
    Invalid {
        /// Reason why the resource cannot be applied.
        reason: String,
    },
}

/// Result of applying a resource change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    /// Resource was created, updated or run.
    Applied,
    /// Resource was already correct (no change needed).
    AlreadyCorrect,
}

/// A locally applicable resource following the check-then-apply pattern.
///
/// # Examples
///
/// ```ignore
/// let state = resource.current_state()?;
/// if resource.needs_change()? {
///     resource.apply()?;
/// }
/// ```
pub trait Resource {
    /// Human-readable description of this resource.
    fn description(&self) -> String;

    /// Check the current state of the resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be determined due to I/O
    /// failures or failing probe commands.
    fn current_state(&self) -> Result<ResourceState>;

    /// Bring the resource to the desired state.
    ///
    /// # Errors
    ///
    /// Returns an error if the change cannot be applied.
    fn apply(&self) -> Result<ResourceChange>;

    /// Verb used when reporting a change, e.g. `"run"` or `"write"`.
    fn verb(&self) -> &'static str {
        "apply"
    }

    /// Determine if the resource needs to be changed.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Resource::current_state`].
    fn needs_change(&self) -> Result<bool> {
        Ok(matches!(
            self.current_state()?,
            ResourceState::Missing | ResourceState::Incorrect { .. }
        ))
    }
}


#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    struct TestResource {
        state: ResourceState,
    }

    impl Resource for TestResource {
        fn description(&self) -> String {
            "test resource".to_string()
        }

        fn current_state(&self) -> Result<ResourceState> {
            Ok(self.state.clone())
        }

        fn apply(&self) -> Result<ResourceChange> {
            Ok(ResourceChange::Applied)
        }
    }

    #[test]
    fn needs_change_for_missing_resource() {
        let resource = TestResource {
            state: ResourceState::Missing,
        };
        assert!(resource.needs_change().unwrap());
    }

    #[test]
    fn needs_change_for_incorrect_resource() {
        let resource = TestResource {
            state: ResourceState::Incorrect {
                current: "wrong".to_string(),
            },
        };
        assert!(resource.needs_change().unwrap());
    }

    #[test]
    fn no_change_for_correct_or_invalid_resource() {
        for state in [
            ResourceState::Correct,
            ResourceState::Invalid {
                reason: "directory".to_string(),
            },
        ] {
            assert!(!TestResource { state }.needs_change().unwrap());
        }
    }

    #[test]
    fn kind_tags_round_trip() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_tag(kind.as_str()), Some(kind));
        }
        assert_eq!(ResourceKind::from_tag("nope"), None);
        assert_eq!(ResourceKind::SshKey.to_string(), "ssh_key");
    }

    #[test]
    fn descriptor_display_is_kind_and_name() {
        let d = ResourceDescriptor::new(ResourceKind::Exec, "foo");
        assert_eq!(d.to_string(), "exec[foo]");
    }

    #[test]
    fn set_default_does_not_override() {
        let mut d = ResourceDescriptor::new(ResourceKind::File, "/etc/motd");
        d.set("owner", "root");
        d.set_default("owner", "nobody").set_default("mode", "0644");
        assert_eq!(d.get_str("owner"), Some("root"));
        assert_eq!(d.get_str("mode"), Some("0644"));
    }

    #[test]
    fn merge_overwrites_existing_keys() {
        let mut d = ResourceDescriptor::new(ResourceKind::Package, "nginx");
        d.merge(attributes(json!({"ensure": "installed"})));
        d.merge(attributes(json!({"ensure": "latest", "provider": "apt"})));
        assert_eq!(d.get_str("ensure"), Some("latest"));
        assert_eq!(d.get_str("provider"), Some("apt"));
    }

    #[test]
    fn search_path_default_only_stamps_execs() {
        let policy = SearchPathDefault;
        assert!(policy.applies_to(ResourceKind::Exec));
        assert!(!policy.applies_to(ResourceKind::File));

        let mut d = ResourceDescriptor::new(ResourceKind::Exec, "foo");
        policy.apply(&mut d);
        assert_eq!(d.get_str("path"), std::env::var("PATH").ok().as_deref());
    }

    #[test]
    fn search_path_default_keeps_explicit_path() {
        let mut d = ResourceDescriptor::new(ResourceKind::Exec, "foo");
        d.set("path", "/opt/bin");
        SearchPathDefault.apply(&mut d);
        assert_eq!(d.get_str("path"), Some("/opt/bin"));
    }

    #[test]
    fn attribute_default_targets_one_kind() {
        let policy = AttributeDefault::new(ResourceKind::File, "owner", "root");
        assert!(policy.applies_to(ResourceKind::File));
        assert!(!policy.applies_to(ResourceKind::Exec));
        let mut d = ResourceDescriptor::new(ResourceKind::File, "/etc/motd");
        policy.apply(&mut d);
        assert_eq!(d.get_str("owner"), Some("root"));
    }
}
