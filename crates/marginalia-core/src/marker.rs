//! Marker markup conventions.
//!
//! A marker is the element wrapping highlighted text. Every marker of one
//! highlight carries the same `data-highlight-id`.

use crate::models::HighlightColor;

/// Tag name of marker elements.
pub const MARKER_TAG: &str = "span";

/// Class present on every marker.
pub const MARKER_CLASS: &str = "marginalia-highlight";

/// Attribute carrying the highlight id.
pub const ATTR_HIGHLIGHT_ID: &str = "data-highlight-id";

/// Attribute carrying the color name.
pub const ATTR_COLOR: &str = "data-highlight-color";

/// Attribute carrying the note text.
pub const ATTR_NOTE: &str = "data-highlight-note";

/// Tooltip attribute mirroring the note.
pub const ATTR_TITLE: &str = "title";

/// Class attribute name.
pub const ATTR_CLASS: &str = "class";

/// Color-specific class, e.g. `marginalia-highlight--yellow`.
pub fn color_class(color: HighlightColor) -> String {
    format!("{}--{}", MARKER_CLASS, color.as_str())
}

/// Full class attribute value for a marker of the given color.
pub fn class_value(color: HighlightColor) -> String {
    format!("{} {}", MARKER_CLASS, color_class(color))
}

/// Everything a host needs to build one marker element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSpec {
    pub highlight_id: String,
    pub color: HighlightColor,
    pub note: Option<String>,
}

impl MarkerSpec {
    pub fn new(highlight_id: impl Into<String>, color: HighlightColor, note: Option<String>) -> Self {
        Self {
            highlight_id: highlight_id.into(),
            color,
            note,
        }
    }

    /// Attributes in the order they are written onto the element.
    pub fn attributes(&self) -> Vec<(String, String)> {
        let mut attrs = vec![
            (ATTR_CLASS.to_string(), class_value(self.color)),
            (ATTR_HIGHLIGHT_ID.to_string(), self.highlight_id.clone()),
            (ATTR_COLOR.to_string(), self.color.as_str().to_string()),
        ];
        if let Some(note) = &self.note {
            attrs.push((ATTR_NOTE.to_string(), note.clone()));
            attrs.push((ATTR_TITLE.to_string(), note.clone()));
        }
        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_without_note() {
        let spec = MarkerSpec::new("h1", HighlightColor::Blue, None);
        let attrs = spec.attributes();
        assert_eq!(attrs.len(), 3);
        assert!(attrs.contains(&(
            "class".to_string(),
            "marginalia-highlight marginalia-highlight--blue".to_string()
        )));
        assert!(attrs.contains(&(ATTR_HIGHLIGHT_ID.to_string(), "h1".to_string())));
    }

    #[test]
    fn test_attributes_with_note_set_title() {
        let spec = MarkerSpec::new("h1", HighlightColor::Yellow, Some("why".to_string()));
        let attrs = spec.attributes();
        assert!(attrs.contains(&(ATTR_NOTE.to_string(), "why".to_string())));
        assert!(attrs.contains(&(ATTR_TITLE.to_string(), "why".to_string())));
    }
}
