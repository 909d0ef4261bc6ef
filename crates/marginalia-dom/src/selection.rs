//! Selection helpers: the host's "current selection" surface.
//!
//! There is no pointer in a headless tree, so selections are made by finding
//! raw text the way a user would see it.

use marginalia_core::text::{char_len, char_slice, find_all};
use marginalia_core::{Boundary, DocumentTree, Error, NodeId, Result, Selection, SelectionRange};

use crate::document::Document;

impl Document {
    /// Select the `occurrence`-th (0-based) match of `needle` in the raw
    /// rendered text under `<body>`. Matches may span several text nodes.
    pub fn select_text(&self, needle: &str, occurrence: usize) -> Option<SelectionRange> {
        let body = self.body()?;
        let nodes = self.text_nodes(body);
        let mut spans: Vec<(NodeId, usize, usize)> = Vec::with_capacity(nodes.len());
        let mut flat = String::new();
        let mut offset = 0usize;
        for node in nodes {
            let text = self.text(node).unwrap_or_default();
            let len = char_len(text);
            spans.push((node, offset, offset + len));
            flat.push_str(text);
            offset += len;
        }

        let start = *find_all(&flat, needle).get(occurrence)?;
        let end = start + char_len(needle);
        if end == start {
            return None;
        }

        // start belongs to the node containing its char, end to the node
        // containing the last selected char
        let (start_node, start_base, _) = spans
            .iter()
            .find(|(_, from, to)| start >= *from && start < *to)?;
        let (end_node, end_base, _) = spans
            .iter()
            .find(|(_, from, to)| end > *from && end <= *to)?;

        Some(SelectionRange::new(
            Boundary::new(*start_node, start - start_base),
            Boundary::new(*end_node, end - end_base),
        ))
    }

    /// [`select_text`](Self::select_text) together with the selected text.
    pub fn select(&self, needle: &str, occurrence: usize) -> Option<Selection> {
        let range = self.select_text(needle, occurrence)?;
        let text = self.selection_text(&range).ok()?;
        Some(Selection::new(range, text))
    }

    /// Plain text covered by a selection, as the host would report it.
    pub fn selection_text(&self, range: &SelectionRange) -> Result<String> {
        let segments = self.range_segments(range)?;
        if segments.is_empty() {
            return Err(Error::EmptySelection);
        }
        Ok(segments
            .into_iter()
            .map(|(node, from, to)| char_slice(self.text(node).unwrap_or_default(), from, to).to_string())
            .collect())
    }
}
