//! Host document-tree interface.
//!
//! The surrounding application supplies a live, mutable node tree through
//! [`DocumentTree`]. Anchoring and matching only read through it; the span
//! applier mutates through it. `marginalia-dom` provides an in-memory
//! implementation.

use crate::defaults::NON_RENDERED_TAGS;
use crate::error::{Error, Result};
use crate::marker::{MarkerSpec, ATTR_HIGHLIGHT_ID};
use crate::models::{NodeId, SelectionRange};

/// Coarse node classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element,
    Text,
    /// Comments, doctypes, processing instructions.
    Other,
}

/// Operations the core consumes from the host tree.
///
/// Text offsets are char offsets within a single text node.
pub trait DocumentTree {
    // ─── Reading ──────────────────────────────────────────────────────────

    /// The document node.
    fn document(&self) -> NodeId;

    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Lowercase tag name for elements.
    fn tag_name(&self, node: NodeId) -> Option<&str>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    /// Contents of a text node.
    fn text(&self, node: NodeId) -> Option<&str>;

    /// False once a node has been removed from the tree.
    fn is_attached(&self, node: NodeId) -> bool;

    // ─── Mutation ─────────────────────────────────────────────────────────

    /// Split a text node at `offset`; the original keeps `[0, offset)` and the
    /// returned new sibling holds the rest.
    fn split_text(&mut self, node: NodeId, offset: usize) -> Result<NodeId>;

    /// Replace `node` with a new marker element containing it.
    fn wrap(&mut self, node: NodeId, marker: &MarkerSpec) -> Result<NodeId>;

    /// Replace a marker element with its children. Returns the highlight id it
    /// carried.
    fn unwrap(&mut self, element: NodeId) -> Result<Option<String>>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<()>;

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<()>;

    /// Merge adjacent text children of `parent`, dropping empty ones.
    fn merge_text(&mut self, parent: NodeId) -> Result<()>;

    /// Host-native "apply background color to range" command. Returns the
    /// elements the host created. Hosts without one keep the default.
    fn apply_native_highlight(
        &mut self,
        _range: &SelectionRange,
        _background: &str,
    ) -> Result<Vec<NodeId>> {
        Err(Error::Host("native highlight not supported".to_string()))
    }

    // ─── Derived queries ──────────────────────────────────────────────────

    fn is_element(&self, node: NodeId) -> bool {
        self.kind(node) == Some(NodeKind::Element)
    }

    fn is_text(&self, node: NodeId) -> bool {
        self.kind(node) == Some(NodeKind::Text)
    }

    /// The root element (`<html>` for parsed documents).
    fn document_element(&self) -> Option<NodeId> {
        self.children(self.document())
            .into_iter()
            .find(|n| self.is_element(*n))
    }

    /// First element with the given tag, in document order.
    fn find_element(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.document())
            .into_iter()
            .find(|n| self.tag_name(*n) == Some(tag))
    }

    /// `<body>`, or the document element when there is none.
    fn body(&self) -> Option<NodeId> {
        self.find_element("body").or_else(|| self.document_element())
    }

    /// All descendants of `root` in document order, excluding `root`.
    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).into_iter().rev());
        }
        out
    }

    /// Rendered text nodes under `root`, in document order.
    ///
    /// Text under `script`, `style`, `noscript` and `template` is skipped.
    fn text_nodes(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if self.is_text(root) {
            out.push(root);
            return out;
        }
        let mut stack: Vec<NodeId> = self.children(root).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            match self.kind(node) {
                Some(NodeKind::Text) => out.push(node),
                Some(NodeKind::Element) => {
                    let skipped = self
                        .tag_name(node)
                        .is_some_and(|tag| NON_RENDERED_TAGS.contains(&tag));
                    if !skipped {
                        stack.extend(self.children(node).into_iter().rev());
                    }
                }
                _ => {}
            }
        }
        out
    }

    /// Highlight id carried by a marker element.
    fn highlight_id(&self, node: NodeId) -> Option<&str> {
        if !self.is_attached(node) || !self.is_element(node) {
            return None;
        }
        self.attribute(node, ATTR_HIGHLIGHT_ID)
    }

    /// Every attached marker element carrying `highlight_id`, in document order.
    fn markers_for(&self, highlight_id: &str) -> Vec<NodeId> {
        self.descendants(self.document())
            .into_iter()
            .filter(|n| self.highlight_id(*n) == Some(highlight_id))
            .collect()
    }
}
