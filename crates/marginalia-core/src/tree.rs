//! Tree utilities: content roots and structural paths.
//!
//! A structural path is a list of tokens from a content root down to an
//! element. Each token is `tag#id` when the element has an id, otherwise
//! `tag:N` with `N` the element's index among same-tag element siblings.

use crate::defaults::{CONTENT_ROOT_MARKERS, CONTENT_ROOT_ROLES, CONTENT_ROOT_TAGS};
use crate::models::NodeId;
use crate::traits::DocumentTree;
use tracing::debug;

/// Nearest element at or above `node`.
pub fn element_at_or_above<T: DocumentTree + ?Sized>(tree: &T, node: NodeId) -> Option<NodeId> {
    let mut current = Some(node);
    while let Some(n) = current {
        if tree.is_element(n) {
            return Some(n);
        }
        current = tree.parent(n);
    }
    None
}

/// True when `element` looks like the boundary of the main readable content.
pub fn is_content_root<T: DocumentTree + ?Sized>(tree: &T, element: NodeId) -> bool {
    let Some(tag) = tree.tag_name(element) else {
        return false;
    };
    if CONTENT_ROOT_TAGS.contains(&tag) {
        return true;
    }
    if tree
        .attribute(element, "role")
        .is_some_and(|role| CONTENT_ROOT_ROLES.contains(&role.trim()))
    {
        return true;
    }
    let has_marker = |value: Option<&str>| {
        value.is_some_and(|v| {
            v.split_whitespace()
                .any(|token| CONTENT_ROOT_MARKERS.contains(&token.to_ascii_lowercase().as_str()))
        })
    };
    has_marker(tree.attribute(element, "id")) || has_marker(tree.attribute(element, "class"))
}

/// Nearest content root at or above `node`, falling back to `<body>` and then
/// the document element. `None` only for a tree with no elements.
pub fn content_root_of<T: DocumentTree + ?Sized>(tree: &T, node: NodeId) -> Option<NodeId> {
    let mut current = element_at_or_above(tree, node);
    while let Some(el) = current {
        if is_content_root(tree, el) {
            return Some(el);
        }
        current = tree.parent(el).filter(|p| tree.is_element(*p));
    }
    let fallback = tree.body();
    debug!(
        subsystem = "core",
        component = "tree",
        node = %node,
        fallback = ?fallback,
        "No content root above node, falling back to body"
    );
    fallback
}

/// First content root in the document, for resolving anchors on load.
pub fn find_content_root<T: DocumentTree + ?Sized>(tree: &T) -> Option<NodeId> {
    tree.descendants(tree.document())
        .into_iter()
        .find(|n| tree.is_element(*n) && is_content_root(tree, *n))
        .or_else(|| {
            debug!(subsystem = "core", component = "tree", "Document has no content root, using body");
            tree.body()
        })
}

/// Every content root in document order (outermost first), then `<body>` if
/// not already listed.
///
/// Anchors record offsets relative to the root nearest the selection, which
/// may be nested inside another root, so resolution tries each candidate.
pub fn content_roots<T: DocumentTree + ?Sized>(tree: &T) -> Vec<NodeId> {
    let mut roots: Vec<NodeId> = tree
        .descendants(tree.document())
        .into_iter()
        .filter(|n| tree.is_element(*n) && is_content_root(tree, *n))
        .collect();
    if let Some(body) = tree.body() {
        if !roots.contains(&body) {
            roots.push(body);
        }
    }
    roots
}

fn path_token<T: DocumentTree + ?Sized>(tree: &T, element: NodeId) -> Option<String> {
    let tag = tree.tag_name(element)?;
    if let Some(id) = tree.attribute(element, "id").map(str::trim).filter(|id| !id.is_empty()) {
        return Some(format!("{}#{}", tag, id));
    }
    let index = match tree.parent(element) {
        Some(parent) => tree
            .children(parent)
            .into_iter()
            .filter(|sib| tree.tag_name(*sib) == Some(tag))
            .position(|sib| sib == element)
            .unwrap_or(0),
        None => 0,
    };
    Some(format!("{}:{}", tag, index))
}

/// Path tokens from `root` (exclusive) down to `element` (inclusive).
///
/// Empty when `element` is `root`, or when `element` is not under `root`.
pub fn structural_path<T: DocumentTree + ?Sized>(
    tree: &T,
    element: NodeId,
    root: NodeId,
) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = Some(element);
    while let Some(el) = current {
        if el == root {
            tokens.reverse();
            return tokens;
        }
        match path_token(tree, el) {
            Some(token) => tokens.push(token),
            None => return Vec::new(),
        }
        current = tree.parent(el);
    }
    Vec::new()
}

/// Follow path tokens down from `root`. `None` if any step is missing.
pub fn resolve_structural_path<T: DocumentTree + ?Sized>(
    tree: &T,
    root: NodeId,
    path: &[String],
) -> Option<NodeId> {
    let mut current = root;
    for token in path {
        current = resolve_token(tree, current, token)?;
    }
    Some(current)
}

fn resolve_token<T: DocumentTree + ?Sized>(tree: &T, parent: NodeId, token: &str) -> Option<NodeId> {
    if let Some((tag, id)) = token.split_once('#') {
        // ids are document-unique, but prefer a direct child when one matches
        let matches = |n: &NodeId| tree.tag_name(*n) == Some(tag) && tree.attribute(*n, "id") == Some(id);
        return tree
            .children(parent)
            .into_iter()
            .find(matches)
            .or_else(|| tree.descendants(parent).into_iter().find(matches));
    }
    let (tag, index) = token.split_once(':')?;
    let index: usize = index.parse().ok()?;
    tree.children(parent)
        .into_iter()
        .filter(|n| tree.tag_name(*n) == Some(tag))
        .nth(index)
}

/// Index of `text_node` among the text children of its parent.
pub fn text_child_index<T: DocumentTree + ?Sized>(tree: &T, text_node: NodeId) -> Option<usize> {
    let parent = tree.parent(text_node)?;
    tree.children(parent)
        .into_iter()
        .filter(|n| tree.is_text(*n))
        .position(|n| n == text_node)
}

/// The `index`-th text child of `element`.
pub fn nth_text_child<T: DocumentTree + ?Sized>(
    tree: &T,
    element: NodeId,
    index: usize,
) -> Option<NodeId> {
    tree.children(element)
        .into_iter()
        .filter(|n| tree.is_text(*n))
        .nth(index)
}
