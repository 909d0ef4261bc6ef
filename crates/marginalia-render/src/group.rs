//! One highlight, many marker elements.
//!
//! The rendered tree is authoritative: the registry is a cache of which
//! markers belong to which highlight and is refreshed from the tree whenever
//! it could be stale.

use std::collections::HashMap;

use marginalia_core::{DocumentTree, NodeId};
use tracing::trace;

/// Every marker element rendered for one highlight, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerGroup {
    pub highlight_id: String,
    pub markers: Vec<NodeId>,
}

impl MarkerGroup {
    pub fn new(highlight_id: impl Into<String>, markers: Vec<NodeId>) -> Self {
        Self {
            highlight_id: highlight_id.into(),
            markers,
        }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.markers.contains(&node)
    }

    /// True when every recorded marker is still attached and tagged with
    /// this group's id.
    pub fn is_current<T: DocumentTree + ?Sized>(&self, tree: &T) -> bool {
        !self.markers.is_empty()
            && self
                .markers
                .iter()
                .all(|m| tree.highlight_id(*m) == Some(self.highlight_id.as_str()))
    }
}

/// Highlight id to marker group.
#[derive(Debug, Clone, Default)]
pub struct MarkerRegistry {
    groups: HashMap<String, MarkerGroup>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, group: MarkerGroup) {
        self.groups.insert(group.highlight_id.clone(), group);
    }

    pub fn get(&self, highlight_id: &str) -> Option<&MarkerGroup> {
        self.groups.get(highlight_id)
    }

    pub fn remove(&mut self, highlight_id: &str) -> Option<MarkerGroup> {
        self.groups.remove(highlight_id)
    }

    pub fn contains(&self, highlight_id: &str) -> bool {
        self.groups.contains_key(highlight_id)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Current group for `highlight_id`, rescanning the tree when the cached
    /// group is missing or stale. Drops the entry if nothing is rendered.
    pub fn resolve<T: DocumentTree + ?Sized>(
        &mut self,
        tree: &T,
        highlight_id: &str,
    ) -> Option<&MarkerGroup> {
        let fresh = self
            .groups
            .get(highlight_id)
            .is_some_and(|group| group.is_current(tree));
        if !fresh {
            let markers = tree.markers_for(highlight_id);
            trace!(highlight_id, marker_count = markers.len(), "Registry rescan");
            if markers.is_empty() {
                self.groups.remove(highlight_id);
                return None;
            }
            self.insert(MarkerGroup::new(highlight_id, markers));
        }
        self.groups.get(highlight_id)
    }

    /// Highlight id of the marker at or above `node`.
    pub fn highlight_of<T: DocumentTree + ?Sized>(&self, tree: &T, node: NodeId) -> Option<String> {
        let mut current = Some(node);
        while let Some(n) = current {
            if let Some(id) = tree.highlight_id(n) {
                return Some(id.to_string());
            }
            current = tree.parent(n);
        }
        None
    }

    /// Rebuild every group from the markers currently in the tree.
    pub fn refresh<T: DocumentTree + ?Sized>(&mut self, tree: &T) {
        self.groups.clear();
        for node in tree.descendants(tree.document()) {
            if let Some(id) = tree.highlight_id(node) {
                self.groups
                    .entry(id.to_string())
                    .or_insert_with(|| MarkerGroup::new(id, Vec::new()))
                    .markers
                    .push(node);
            }
        }
    }
}
