//! Arena storage and the [`DocumentTree`] implementation.

use marginalia_core::marker::{MarkerSpec, ATTR_HIGHLIGHT_ID, MARKER_TAG};
use marginalia_core::text::{byte_offset, char_len};
use marginalia_core::{DocumentTree, Error, NodeId, NodeKind, Result, SelectionRange};
use tracing::trace;

#[derive(Debug, Clone)]
pub(crate) enum NodeData {
    Document,
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
    Doctype(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) data: NodeData,
}

/// Mutable in-memory document.
///
/// Nodes are never freed; removed nodes are simply detached, so a stale
/// [`NodeId`] stays safe to query.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) nodes: Vec<Node>,
    direct_wrapping: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document containing only the document node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
            direct_wrapping: true,
        }
    }

    /// Emulate a host where text nodes cannot be split or wrapped directly.
    /// Only the native highlight command can then mark text.
    pub fn set_direct_wrapping(&mut self, enabled: bool) {
        self.direct_wrapping = enabled;
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| Error::Host(format!("unknown node {}", id)))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Create a detached element.
    pub fn create_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        self.push(NodeData::Element {
            name: name.to_ascii_lowercase(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    pub(crate) fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Comment(text.to_string()))
    }

    pub(crate) fn create_doctype(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Doctype(name.to_string()))
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.detach(child)?;
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Replace the contents of a text node.
    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<()> {
        match &mut self.node_mut(node)?.data {
            NodeData::Text(existing) => {
                *existing = text.to_string();
                Ok(())
            }
            _ => Err(Error::Host(format!("{} is not a text node", node))),
        }
    }

    /// Remove `node` from its parent. No-op for detached nodes.
    pub fn detach(&mut self, node: NodeId) -> Result<()> {
        let parent = self.node_mut(node)?.parent.take();
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|c| *c != node);
        }
        Ok(())
    }

    fn index_in_parent(&self, node: NodeId) -> Result<(NodeId, usize)> {
        let parent = self
            .parent(node)
            .ok_or_else(|| Error::Host(format!("{} has no parent", node)))?;
        let index = self
            .node(parent)
            .and_then(|p| p.children.iter().position(|c| *c == node))
            .ok_or_else(|| Error::Host(format!("{} missing from its parent", node)))?;
        Ok((parent, index))
    }

    fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        self.node_mut(child)?.parent = Some(parent);
        let siblings = &mut self.node_mut(parent)?.children;
        let index = index.min(siblings.len());
        siblings.insert(index, child);
        Ok(())
    }

    /// Concatenated rendered text under `root`.
    pub fn text_content(&self, root: NodeId) -> String {
        self.text_nodes(root)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    /// Split without consulting `direct_wrapping`.
    pub(crate) fn split_text_unchecked(&mut self, node: NodeId, offset: usize) -> Result<NodeId> {
        let text = self
            .text(node)
            .ok_or_else(|| Error::Host(format!("{} is not a text node", node)))?
            .to_string();
        let at = byte_offset(&text, offset).ok_or_else(|| {
            Error::Host(format!(
                "offset {} out of bounds for text node of length {}",
                offset,
                char_len(&text)
            ))
        })?;
        let (head, tail) = text.split_at(at);
        let (parent, index) = self.index_in_parent(node)?;
        let tail_node = self.create_text(tail);
        self.set_text(node, head)?;
        self.insert_at(parent, index + 1, tail_node)?;
        trace!(node = %node, offset, tail = %tail_node, "dom: split text");
        Ok(tail_node)
    }

    /// Wrap without consulting `direct_wrapping`.
    pub(crate) fn wrap_unchecked(
        &mut self,
        node: NodeId,
        tag: &str,
        attrs: &[(String, String)],
    ) -> Result<NodeId> {
        let (parent, index) = self.index_in_parent(node)?;
        let wrapper = self.push(NodeData::Element {
            name: tag.to_string(),
            attrs: attrs.to_vec(),
        });
        self.detach(node)?;
        self.insert_at(parent, index, wrapper)?;
        self.append_child(wrapper, node)?;
        trace!(node = %node, wrapper = %wrapper, "dom: wrap");
        Ok(wrapper)
    }

    /// Text nodes under `<body>` from the start boundary's node through the
    /// end boundary's node, with the local offsets to clip each one to.
    pub(crate) fn range_segments(
        &self,
        range: &SelectionRange,
    ) -> Result<Vec<(NodeId, usize, usize)>> {
        let body = self.body().ok_or(Error::NoContentRoot)?;
        let nodes = self.text_nodes(body);
        let first = nodes
            .iter()
            .position(|n| *n == range.start.node)
            .ok_or_else(|| Error::Host("range start is not a rendered text node".to_string()))?;
        let last = nodes
            .iter()
            .position(|n| *n == range.end.node)
            .ok_or_else(|| Error::Host("range end is not a rendered text node".to_string()))?;
        if last < first {
            return Err(Error::InvalidInput("range end precedes start".to_string()));
        }
        let mut segments = Vec::new();
        for (i, node) in nodes[first..=last].iter().enumerate() {
            let len = self.text(*node).map(char_len).unwrap_or(0);
            let from = if i == 0 { range.start.offset } else { 0 };
            let to = if first + i == last { range.end.offset } else { len };
            if from > len || to > len {
                return Err(Error::InvalidInput(format!(
                    "offset out of bounds for {} (length {})",
                    node, len
                )));
            }
            if from < to {
                segments.push((*node, from, to));
            }
        }
        Ok(segments)
    }
}

impl DocumentTree for Document {
    fn document(&self) -> NodeId {
        NodeId(0)
    }

    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.node(node).map(|n| match n.data {
            NodeData::Document => NodeKind::Document,
            NodeData::Element { .. } => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Comment(_) | NodeData::Doctype(_) => NodeKind::Other,
        })
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        match &self.node(node)?.data {
            NodeData::Element { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.node(node)?.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        match &self.node(node)?.data {
            NodeData::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    fn is_attached(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.document() {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn split_text(&mut self, node: NodeId, offset: usize) -> Result<NodeId> {
        if !self.direct_wrapping {
            return Err(Error::Host("direct text splitting is unavailable".to_string()));
        }
        self.split_text_unchecked(node, offset)
    }

    fn wrap(&mut self, node: NodeId, marker: &MarkerSpec) -> Result<NodeId> {
        if !self.direct_wrapping {
            return Err(Error::Host("direct wrapping is unavailable".to_string()));
        }
        if !self.is_attached(node) {
            return Err(Error::Host(format!("{} is detached", node)));
        }
        self.wrap_unchecked(node, MARKER_TAG, &marker.attributes())
    }

    fn unwrap(&mut self, element: NodeId) -> Result<Option<String>> {
        if !self.is_element(element) {
            return Err(Error::Host(format!("{} is not an element", element)));
        }
        let highlight_id = self.attribute(element, ATTR_HIGHLIGHT_ID).map(str::to_string);
        let (parent, index) = self.index_in_parent(element)?;
        let children = std::mem::take(&mut self.node_mut(element)?.children);
        self.detach(element)?;
        for (offset, child) in children.into_iter().enumerate() {
            self.insert_at(parent, index + offset, child)?;
        }
        trace!(element = %element, parent = %parent, "dom: unwrap");
        Ok(highlight_id)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        match &mut self.node_mut(node)?.data {
            NodeData::Element { attrs, .. } => {
                match attrs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
                    Some((_, existing)) => *existing = value.to_string(),
                    None => attrs.push((name.to_string(), value.to_string())),
                }
                Ok(())
            }
            _ => Err(Error::Host(format!("{} is not an element", node))),
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<()> {
        match &mut self.node_mut(node)?.data {
            NodeData::Element { attrs, .. } => {
                attrs.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
                Ok(())
            }
            _ => Err(Error::Host(format!("{} is not an element", node))),
        }
    }

    fn merge_text(&mut self, parent: NodeId) -> Result<()> {
        let children = self.children(parent);
        let mut previous_text: Option<NodeId> = None;
        for child in children {
            let Some(text) = self.text(child).map(str::to_string) else {
                previous_text = None;
                continue;
            };
            if text.is_empty() {
                self.detach(child)?;
                continue;
            }
            match previous_text {
                Some(prev) => {
                    let merged = format!("{}{}", self.text(prev).unwrap_or_default(), text);
                    self.set_text(prev, &merged)?;
                    self.detach(child)?;
                }
                None => previous_text = Some(child),
            }
        }
        Ok(())
    }

    fn apply_native_highlight(
        &mut self,
        range: &SelectionRange,
        background: &str,
    ) -> Result<Vec<NodeId>> {
        let segments = self.range_segments(range)?;
        let style = vec![(
            "style".to_string(),
            format!("background-color: {};", background),
        )];
        let mut created = Vec::with_capacity(segments.len());
        for (node, from, to) in segments {
            let len = self.text(node).map(char_len).unwrap_or(0);
            let mut target = node;
            if to < len {
                self.split_text_unchecked(target, to)?;
            }
            if from > 0 {
                target = self.split_text_unchecked(target, from)?;
            }
            created.push(self.wrap_unchecked(target, "span", &style)?);
        }
        Ok(created)
    }
}
