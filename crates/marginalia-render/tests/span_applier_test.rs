//! Multi-part, nested, fallback, and rollback behaviour of the applier.

use marginalia_core::marker::{ATTR_COLOR, ATTR_HIGHLIGHT_ID};
use marginalia_core::{
    DocumentTree, Error, HighlightColor, MarkerSpec, NodeId, NodeKind, Result, SelectionRange,
};
use marginalia_dom::Document;
use marginalia_render::{ApplyMethod, MarkerRegistry, SpanApplier};

fn spec(id: &str, color: HighlightColor) -> MarkerSpec {
    MarkerSpec::new(id, color, None)
}

#[test]
fn test_three_elements_share_one_id() {
    let mut doc =
        Document::parse_html("<article><p>alpha</p><p>beta</p><p>gamma</p></article>");
    let before = doc.to_html();
    let range = doc.select_text("phabetaga", 0).unwrap();
    let applier = SpanApplier::new();
    let applied = applier
        .apply(&mut doc, &range, &spec("h1", HighlightColor::Yellow))
        .unwrap();

    assert_eq!(applied.markers.len(), 3);
    for marker in &applied.markers {
        assert_eq!(doc.attribute(*marker, ATTR_HIGHLIGHT_ID), Some("h1"));
    }
    let texts: Vec<String> = applied.markers.iter().map(|m| doc.text_content(*m)).collect();
    assert_eq!(texts, vec!["pha", "beta", "ga"]);

    // removing via any one marker's group removes all of them
    let mut registry = MarkerRegistry::new();
    let id = registry.highlight_of(&doc, applied.markers[1]).unwrap();
    let group = registry.resolve(&doc, &id).cloned().unwrap();
    assert_eq!(group.markers, applied.markers);
    assert_eq!(applier.remove(&mut doc, &group).unwrap(), 3);
    assert!(doc.markers_for("h1").is_empty());
    assert_eq!(doc.to_html(), before);
    assert!(registry.resolve(&doc, "h1").is_none());
}

#[test]
fn test_overlapping_highlights_nest() {
    let mut doc = Document::parse_html("<p>the quick brown fox jumps</p>");
    let applier = SpanApplier::new();

    let outer = doc.select_text("quick brown fox", 0).unwrap();
    let outer_group = applier
        .apply(&mut doc, &outer, &spec("outer", HighlightColor::Yellow))
        .unwrap()
        .to_group();
    let inner = doc.select_text("brown", 0).unwrap();
    let applied = applier
        .apply(&mut doc, &inner, &spec("inner", HighlightColor::Blue))
        .unwrap();

    let inner_marker = applied.markers[0];
    let parent = doc.parent(inner_marker).unwrap();
    assert_eq!(doc.highlight_id(parent), Some("outer"));
    let p = doc.find_element("p").unwrap();
    assert_eq!(doc.text_content(p), "the quick brown fox jumps");

    // a superset applied later straddles the existing marker
    let wider = doc.select_text("the quick", 0).unwrap();
    let applied = applier
        .apply(&mut doc, &wider, &spec("wider", HighlightColor::Pink))
        .unwrap();
    assert_eq!(applied.markers.len(), 2);

    assert_eq!(applier.remove(&mut doc, &outer_group).unwrap(), 1);
    assert_eq!(doc.markers_for("inner").len(), 1);
    assert_eq!(doc.markers_for("wider").len(), 2);
    assert_eq!(doc.text_content(p), "the quick brown fox jumps");
}

#[test]
fn test_native_fallback_is_tagged() {
    let mut doc = Document::parse_html("<p>one <b>two</b> three</p>");
    doc.set_direct_wrapping(false);
    let range = doc.select_text("two thr", 0).unwrap();
    let applier = SpanApplier::new();
    let applied = applier
        .apply(&mut doc, &range, &spec("h1", HighlightColor::Green))
        .unwrap();

    assert_eq!(applied.method, ApplyMethod::Native);
    assert_eq!(applied.markers.len(), 2);
    assert_eq!(doc.markers_for("h1"), applied.markers);
    for marker in &applied.markers {
        assert_eq!(doc.attribute(*marker, ATTR_COLOR), Some("green"));
    }

    applier
        .recolor(&mut doc, &applied.to_group(), HighlightColor::Blue)
        .unwrap();
    for marker in &applied.markers {
        assert_eq!(
            doc.attribute(*marker, "style"),
            Some(format!("background-color: {};", HighlightColor::Blue.css_background()).as_str())
        );
    }
}

#[test]
fn test_fallback_disabled_reports_apply_error() {
    let mut doc = Document::parse_html("<p>one two</p>");
    doc.set_direct_wrapping(false);
    let range = doc.select_text("two", 0).unwrap();
    let err = SpanApplier::new()
        .with_native_fallback(false)
        .apply(&mut doc, &range, &spec("h1", HighlightColor::Yellow))
        .unwrap_err();
    assert!(matches!(err, Error::Apply(_)));
    assert!(doc.markers_for("h1").is_empty());
}

/// Delegates to a [`Document`] but refuses to wrap after a number of wraps.
struct FlakyTree {
    inner: Document,
    wraps_left: usize,
}

impl DocumentTree for FlakyTree {
    fn document(&self) -> NodeId {
        self.inner.document()
    }
    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.inner.kind(node)
    }
    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.parent(node)
    }
    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner.children(node)
    }
    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.inner.tag_name(node)
    }
    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.inner.attribute(node, name)
    }
    fn text(&self, node: NodeId) -> Option<&str> {
        self.inner.text(node)
    }
    fn is_attached(&self, node: NodeId) -> bool {
        self.inner.is_attached(node)
    }
    fn split_text(&mut self, node: NodeId, offset: usize) -> Result<NodeId> {
        self.inner.split_text(node, offset)
    }
    fn wrap(&mut self, node: NodeId, marker: &MarkerSpec) -> Result<NodeId> {
        if self.wraps_left == 0 {
            return Err(Error::Host("wrap refused".to_string()));
        }
        self.wraps_left -= 1;
        self.inner.wrap(node, marker)
    }
    fn unwrap(&mut self, element: NodeId) -> Result<Option<String>> {
        self.inner.unwrap(element)
    }
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        self.inner.set_attribute(node, name, value)
    }
    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<()> {
        self.inner.remove_attribute(node, name)
    }
    fn merge_text(&mut self, parent: NodeId) -> Result<()> {
        self.inner.merge_text(parent)
    }
}

#[test]
fn test_failure_midway_rolls_back() {
    let doc = Document::parse_html("<p>one <b>two</b> three <i>four</i> five</p>");
    let before = doc.to_html();
    let range: SelectionRange = doc.select_text("ne two three four fi", 0).unwrap();
    let mut tree = FlakyTree {
        inner: doc,
        wraps_left: 2,
    };

    let err = SpanApplier::new()
        .apply(&mut tree, &range, &spec("h1", HighlightColor::Yellow))
        .unwrap_err();
    assert!(matches!(err, Error::Apply(_)));
    assert!(tree.markers_for("h1").is_empty());
    assert_eq!(tree.inner.to_html(), before);
}
