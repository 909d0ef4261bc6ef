//! Flattened, whitespace-normalized text of a content root.
//!
//! The normalized text equals `normalize_whitespace` applied to the raw
//! concatenation of the root's rendered text nodes. Every normalized char
//! remembers the raw `(node, offset)` it came from; a collapsed whitespace
//! run maps to its first raw whitespace char.

use marginalia_core::text::char_slice;
use marginalia_core::{Boundary, CharRange, DocumentTree, NodeId, SelectionRange};

/// A text node's `[start, end)` span in normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeSpan {
    pub node: NodeId,
    pub start: usize,
    pub end: usize,
}

impl NodeSpan {
    pub fn range(&self) -> CharRange {
        CharRange::new(self.start, self.end)
    }
}

#[derive(Debug, Clone)]
pub struct TextIndex {
    root: NodeId,
    text: String,
    chars: Vec<char>,
    positions: Vec<Boundary>,
    spans: Vec<NodeSpan>,
}

impl TextIndex {
    /// Index the rendered text under `root`.
    pub fn build<T: DocumentTree + ?Sized>(tree: &T, root: NodeId) -> Self {
        let mut chars = Vec::new();
        let mut positions: Vec<Boundary> = Vec::new();
        let mut spans: Vec<NodeSpan> = Vec::new();
        let mut pending_space: Option<Boundary> = None;

        for node in tree.text_nodes(root) {
            let here = chars.len();
            spans.push(NodeSpan {
                node,
                start: here,
                end: here,
            });
            let Some(raw) = tree.text(node) else {
                continue;
            };
            for (offset, ch) in raw.chars().enumerate() {
                if ch.is_whitespace() {
                    if !chars.is_empty() && pending_space.is_none() {
                        pending_space = Some(Boundary::new(node, offset));
                    }
                    continue;
                }
                if let Some(space) = pending_space.take() {
                    push_char(&mut chars, &mut positions, &mut spans, ' ', space);
                }
                push_char(&mut chars, &mut positions, &mut spans, ch, Boundary::new(node, offset));
            }
        }

        Self {
            root,
            text: chars.iter().collect(),
            chars,
            positions,
            spans,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The normalized text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn slice(&self, range: CharRange) -> &str {
        char_slice(&self.text, range.start, range.end)
    }

    /// Spans of every indexed text node, in document order.
    pub fn spans(&self) -> &[NodeSpan] {
        &self.spans
    }

    pub fn span_of(&self, node: NodeId) -> Option<NodeSpan> {
        self.spans.iter().find(|s| s.node == node).copied()
    }

    /// Smallest normalized range covering every indexed text node in `nodes`.
    pub fn span_covering(&self, nodes: &[NodeId]) -> Option<CharRange> {
        let mut covered = self.spans.iter().filter(|s| nodes.contains(&s.node));
        let first = covered.next()?;
        let (start, end) = covered.fold((first.start, first.end), |(lo, hi), s| {
            (lo.min(s.start), hi.max(s.end))
        });
        Some(CharRange::new(start, end))
    }

    /// Normalized offset of a raw boundary: the first normalized char at or
    /// after it. `None` when the boundary's node is not indexed.
    pub fn offset_of(&self, boundary: Boundary) -> Option<usize> {
        let span = self.span_of(boundary.node)?;
        let found = self.positions[span.start..span.end]
            .iter()
            .position(|p| p.node == boundary.node && p.offset >= boundary.offset);
        Some(found.map(|i| span.start + i).unwrap_or(span.end))
    }

    /// Map a non-empty normalized range back onto raw node boundaries.
    ///
    /// The start boundary sits on the first char's source, the end boundary
    /// just past the last char's source.
    pub fn boundaries(&self, range: CharRange) -> Option<SelectionRange> {
        if range.is_empty() || range.end > self.positions.len() {
            return None;
        }
        let first = self.positions[range.start];
        let last = self.positions[range.end - 1];
        Some(SelectionRange::new(
            first,
            Boundary::new(last.node, last.offset + 1),
        ))
    }
}

fn push_char(
    chars: &mut Vec<char>,
    positions: &mut Vec<Boundary>,
    spans: &mut [NodeSpan],
    ch: char,
    source: Boundary,
) {
    let at = chars.len();
    chars.push(ch);
    positions.push(source);
    // the owning span is the last one for this node; spans stay contiguous
    // because sources arrive in document order
    if let Some(span) = spans.iter_mut().rev().find(|s| s.node == source.node) {
        if span.start == span.end {
            span.start = at;
        }
        span.end = at + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marginalia_core::normalize_whitespace;
    use marginalia_dom::Document;

    fn index(html: &str) -> (Document, TextIndex) {
        let doc = Document::parse_html(html);
        let body = doc.body().unwrap();
        let index = TextIndex::build(&doc, body);
        (doc, index)
    }

    #[test]
    fn test_text_matches_normalized_concatenation() {
        let (doc, index) = index("<p>  one\n  two </p>\n<p>three<b> four</b>  </p>");
        let body = doc.body().unwrap();
        assert_eq!(index.text(), normalize_whitespace(&doc.text_content(body)));
        assert_eq!(index.text(), "one two three four");
        assert_eq!(index.len(), 18);
    }

    #[test]
    fn test_spans_follow_nodes() {
        let (doc, index) = index("<p>ab <i>cd</i> ef</p>");
        let range = doc.select_text("cd", 0).unwrap();
        let span = index.span_of(range.start.node).unwrap();
        assert_eq!(index.slice(span.range()), "cd");
        // the space before "cd" belongs to the first node
        let first = index.spans()[0];
        assert_eq!(index.slice(first.range()), "ab ");
    }

    #[test]
    fn test_boundaries_map_back_across_nodes() {
        let (doc, index) = index("<p>one <b>two</b> three</p>");
        let at = index.text().find("two three").unwrap();
        let selection = index.boundaries(CharRange::new(at, at + 9)).unwrap();
        assert_eq!(doc.selection_text(&selection).unwrap(), "two three");
    }

    #[test]
    fn test_boundaries_skip_collapsed_whitespace() {
        let (doc, index) = index("<p>alpha   \n   beta</p>");
        assert_eq!(index.text(), "alpha beta");
        let selection = index.boundaries(CharRange::new(6, 10)).unwrap();
        assert_eq!(selection.start.offset, 12);
        assert_eq!(doc.selection_text(&selection).unwrap(), "beta");
    }

    #[test]
    fn test_offset_of_raw_boundary() {
        let (doc, index) = index("<p>  lead  <em>target</em></p>");
        let range = doc.select_text("target", 0).unwrap();
        assert_eq!(index.offset_of(range.start), Some(5));
        let lead = doc.select_text("lead", 0).unwrap();
        assert_eq!(index.offset_of(lead.start), Some(0));
    }

    #[test]
    fn test_empty_or_out_of_bounds_range_has_no_boundaries() {
        let (_, index) = index("<p>abc</p>");
        assert!(index.boundaries(CharRange::new(1, 1)).is_none());
        assert!(index.boundaries(CharRange::new(1, 4)).is_none());
    }

    #[test]
    fn test_span_covering_element() {
        let (doc, index) = index("<p>x</p><div><p>one</p> <p>two</p></div>");
        let div = doc.find_element("div").unwrap();
        let nodes = doc.text_nodes(div);
        let covered = index.span_covering(&nodes).unwrap();
        assert_eq!(index.slice(covered), "one two");
    }
}
