//! Data models for highlights, anchors, and selections.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ids::new_highlight_id;

// =============================================================================
// TREE ADDRESSING
// =============================================================================

/// Handle to a node in a host document tree.
///
/// Ids are only meaningful for the tree that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A position inside a text node, as a character (not byte) offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A live selection, passed explicitly by the caller.
///
/// `start` must precede `end` in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRange {
    pub start: Boundary,
    pub end: Boundary,
}

impl SelectionRange {
    pub fn new(start: Boundary, end: Boundary) -> Self {
        Self { start, end }
    }

    /// True when the range covers no characters.
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// A selection as the host reports it: the range and its plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub range: SelectionRange,
    pub text: String,
}

impl Selection {
    pub fn new(range: SelectionRange, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }
}

/// Half-open character range `[start, end)` in normalized text coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharRange {
    pub start: usize,
    pub end: usize,
}

impl CharRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

// =============================================================================
// COLORS
// =============================================================================

/// Fixed highlight palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightColor {
    #[default]
    Yellow,
    Green,
    Blue,
    Pink,
    Purple,
    Orange,
}

impl HighlightColor {
    /// Every palette entry, in menu order.
    pub const ALL: [HighlightColor; 6] = [
        HighlightColor::Yellow,
        HighlightColor::Green,
        HighlightColor::Blue,
        HighlightColor::Pink,
        HighlightColor::Purple,
        HighlightColor::Orange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HighlightColor::Yellow => "yellow",
            HighlightColor::Green => "green",
            HighlightColor::Blue => "blue",
            HighlightColor::Pink => "pink",
            HighlightColor::Purple => "purple",
            HighlightColor::Orange => "orange",
        }
    }

    /// Background value handed to a host's native highlight command.
    pub fn css_background(&self) -> &'static str {
        match self {
            HighlightColor::Yellow => "#fff176",
            HighlightColor::Green => "#aed581",
            HighlightColor::Blue => "#81d4fa",
            HighlightColor::Pink => "#f48fb1",
            HighlightColor::Purple => "#ce93d8",
            HighlightColor::Orange => "#ffb74d",
        }
    }
}

impl fmt::Display for HighlightColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HighlightColor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        HighlightColor::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| Error::InvalidInput(format!("unknown highlight color '{}'", s)))
    }
}

// =============================================================================
// ANCHOR DESCRIPTOR
// =============================================================================

/// Durable, reload-surviving description of where a highlighted span was.
///
/// Serialized flat into the persisted record, so field names follow the
/// record format (`text`, `domPath`, camelCase for the rest).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorDescriptor {
    /// Whitespace-normalized highlighted text. Never empty.
    #[serde(rename = "text")]
    pub exact_text: String,
    /// Normalized context immediately before `exact_text`.
    #[serde(default)]
    pub text_before: String,
    /// Normalized context immediately after `exact_text`.
    #[serde(default)]
    pub text_after: String,
    /// Absolute start offset in the content root's normalized text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    /// Absolute end offset (exclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
    /// Tokens from the content root down to the containing element.
    #[serde(rename = "domPath", default, skip_serializing_if = "Vec::is_empty")]
    pub structural_path: Vec<String>,
    /// Index of the originating text node among its element's text children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_index: Option<usize>,
}

impl AnchorDescriptor {
    /// Check the descriptor invariants.
    pub fn validate(&self) -> Result<()> {
        if self.exact_text.trim().is_empty() {
            return Err(Error::InvalidInput("anchor text is empty".to_string()));
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(Error::InvalidInput(format!(
                    "anchor start {} is after end {}",
                    start, end
                )));
            }
        }
        Ok(())
    }

    /// Absolute offsets, when both were recorded.
    pub fn char_range(&self) -> Option<CharRange> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start <= end => Some(CharRange::new(start, end)),
            _ => None,
        }
    }

    /// True when the builder could not place the text and only structure is known.
    pub fn is_structural_only(&self) -> bool {
        self.start.is_none() && self.text_before.is_empty() && self.text_after.is_empty()
    }
}

// =============================================================================
// HIGHLIGHT
// =============================================================================

/// A persisted highlight: color, optional note, and its anchor.
///
/// This is also the persisted record shape: timestamps are epoch
/// milliseconds and the anchor fields are flattened into the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub id: String,
    pub url: String,
    pub color: HighlightColor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub anchor: AnchorDescriptor,
}

impl Highlight {
    /// Create a highlight with a fresh id for the given page.
    pub fn new(
        url: &str,
        color: HighlightColor,
        note: Option<String>,
        anchor: AnchorDescriptor,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_highlight_id(),
            url: page_key(url),
            color,
            note: note.and_then(clean_note),
            created_at: now,
            updated_at: now,
            anchor,
        }
    }

    /// Apply a partial update, bumping `updated_at`.
    pub fn apply_patch(&mut self, patch: &HighlightPatch) {
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(note) = &patch.note {
            self.note = note.clone().and_then(clean_note);
        }
        self.updated_at = Utc::now().max(self.updated_at);
    }
}

/// Partial update for a stored highlight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HighlightPatch {
    pub color: Option<HighlightColor>,
    /// `Some(None)` clears the note.
    pub note: Option<Option<String>>,
}

impl HighlightPatch {
    pub fn color(color: HighlightColor) -> Self {
        Self {
            color: Some(color),
            note: None,
        }
    }

    pub fn note(note: Option<String>) -> Self {
        Self {
            color: None,
            note: Some(note),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.note.is_none()
    }
}

/// Empty or whitespace-only notes are stored as no note.
fn clean_note(note: String) -> Option<String> {
    if note.trim().is_empty() {
        None
    } else {
        Some(note)
    }
}

/// Page identity used to partition highlights.
///
/// The fragment is dropped so in-page navigation keeps the same highlights;
/// the query is kept. Unparseable input is used as-is, trimmed.
pub fn page_key(url: &str) -> String {
    let trimmed = url.trim();
    match url::Url::parse(trimmed) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor() -> AnchorDescriptor {
        AnchorDescriptor {
            exact_text: "the quick brown fox".to_string(),
            text_before: "said ".to_string(),
            text_after: " jumped".to_string(),
            start: Some(5),
            end: Some(24),
            structural_path: vec!["p:0".to_string()],
            node_index: Some(0),
        }
    }

    #[test]
    fn test_color_round_trips_through_str() {
        for color in HighlightColor::ALL {
            assert_eq!(color.as_str().parse::<HighlightColor>().unwrap(), color);
        }
        assert_eq!("  BLUE ".parse::<HighlightColor>().unwrap(), HighlightColor::Blue);
        assert!("teal".parse::<HighlightColor>().is_err());
    }

    #[test]
    fn test_record_uses_wire_field_names() {
        let mut h = Highlight::new("https://example.com/a#frag", HighlightColor::Purple, None, anchor());
        h.note = Some("remember".to_string());
        let value = serde_json::to_value(&h).unwrap();
        let obj = value.as_object().unwrap();

        assert_eq!(obj["url"], "https://example.com/a");
        assert_eq!(obj["text"], "the quick brown fox");
        assert_eq!(obj["color"], "purple");
        assert_eq!(obj["textBefore"], "said ");
        assert_eq!(obj["textAfter"], " jumped");
        assert_eq!(obj["domPath"][0], "p:0");
        assert_eq!(obj["nodeIndex"], 0);
        assert_eq!(obj["start"], 5);
        assert_eq!(obj["end"], 24);
        assert!(obj["createdAt"].is_i64());
        assert!(obj["updatedAt"].is_i64());
        assert!(!obj.contains_key("exactText"));
        assert!(!obj.contains_key("anchor"));
    }

    #[test]
    fn test_record_without_optional_fields_deserializes() {
        let json = r#"{
            "id": "abc",
            "url": "https://example.com/",
            "text": "hello",
            "color": "yellow",
            "createdAt": 1700000000000,
            "updatedAt": 1700000000000,
            "textBefore": "",
            "textAfter": ""
        }"#;
        let h: Highlight = serde_json::from_str(json).unwrap();
        assert_eq!(h.anchor.exact_text, "hello");
        assert_eq!(h.anchor.start, None);
        assert!(h.anchor.structural_path.is_empty());
        assert_eq!(h.note, None);
        assert_eq!(h.created_at.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_optional_fields_are_omitted_when_absent() {
        let mut a = anchor();
        a.start = None;
        a.end = None;
        a.node_index = None;
        a.structural_path.clear();
        let h = Highlight::new("https://example.com", HighlightColor::Yellow, None, a);
        let value = serde_json::to_value(&h).unwrap();
        let obj = value.as_object().unwrap();
        for key in ["start", "end", "nodeIndex", "domPath", "note"] {
            assert!(!obj.contains_key(key), "{} should be omitted", key);
        }
    }

    #[test]
    fn test_validate_rejects_inverted_offsets() {
        let mut a = anchor();
        a.start = Some(10);
        a.end = Some(3);
        assert!(a.validate().is_err());
        assert!(a.char_range().is_none());
    }

    #[test]
    fn test_validate_rejects_blank_text() {
        let mut a = anchor();
        a.exact_text = "   ".to_string();
        assert!(matches!(a.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_patch_bumps_updated_at_and_clears_note() {
        let mut h = Highlight::new(
            "https://example.com",
            HighlightColor::Yellow,
            Some("first".to_string()),
            anchor(),
        );
        let created = h.updated_at;
        h.apply_patch(&HighlightPatch::color(HighlightColor::Green));
        assert_eq!(h.color, HighlightColor::Green);
        assert_eq!(h.note.as_deref(), Some("first"));
        assert!(h.updated_at >= created);

        h.apply_patch(&HighlightPatch::note(None));
        assert_eq!(h.note, None);
    }

    #[test]
    fn test_blank_note_is_dropped() {
        let h = Highlight::new(
            "https://example.com",
            HighlightColor::Yellow,
            Some("  ".to_string()),
            anchor(),
        );
        assert_eq!(h.note, None);
    }

    #[test]
    fn test_page_key_drops_fragment_keeps_query() {
        assert_eq!(
            page_key("https://example.com/post?id=3#comments"),
            "https://example.com/post?id=3"
        );
        assert_eq!(page_key("  not a url "), "not a url");
    }

    #[test]
    fn test_structural_only_descriptor() {
        let a = AnchorDescriptor {
            exact_text: "x".to_string(),
            text_before: String::new(),
            text_after: String::new(),
            start: None,
            end: None,
            structural_path: vec!["div:1".to_string()],
            node_index: Some(2),
        };
        assert!(a.is_structural_only());
        assert!(!anchor().is_structural_only());
    }
}
