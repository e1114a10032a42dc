//! Per-manifest record of constructed resources.
use indexmap::IndexMap;

use super::{Attributes, ResourceDescriptor, ResourceKind};

/// Descriptors keyed by kind, then by name.
///
/// Kinds keep the order in which they were first used; names keep their
/// insertion order within a kind.  `(kind, name)` is unique: constructing an
/// existing pair returns the stored descriptor with the new attributes merged
/// over the old ones.
#[derive(Debug, Clone, Default)]
pub struct ResourceLedger {
    entries: IndexMap<ResourceKind, IndexMap<String, ResourceDescriptor>>,
    empty: IndexMap<String, ResourceDescriptor>,
}

impl ResourceLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct or look up the descriptor for `(kind, name)` and merge
    /// `attributes` into it.
    pub fn upsert(
        &mut self,
        kind: ResourceKind,
        name: &str,
        attributes: Attributes,
    ) -> &mut ResourceDescriptor {
        let descriptor = self
            .entries
            .entry(kind)
            .or_default()
            .entry(name.to_string())
            .or_insert_with(|| ResourceDescriptor::new(kind, name));
        descriptor.merge(attributes);
        descriptor
    }

    /// Look up one descriptor.
    #[must_use]
    pub fn get(&self, kind: ResourceKind, name: &str) -> Option<&ResourceDescriptor> {
        self.entries.get(&kind)?.get(name)
    }

    /// `name → descriptor` for `kind`; empty when none were constructed.
    #[must_use]
    pub fn resources_for(&self, kind: ResourceKind) -> &IndexMap<String, ResourceDescriptor> {
        self.entries.get(&kind).unwrap_or(&self.empty)
    }

    /// Kinds in first-use order.
    pub fn kinds(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.entries.keys().copied()
    }

    /// Every descriptor, by kind first-use order then name insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.entries.values().flat_map(IndexMap::values)
    }

    /// Total number of descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(IndexMap::len).sum()
    }

    /// Returns `true` if nothing has been constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
