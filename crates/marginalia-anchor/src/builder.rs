//! Anchor construction from a live selection.

use std::env;

use marginalia_core::defaults::{
    CONTEXT_CHARS, CONTEXT_CHARS_LOGOGRAPHIC, PREFIX_PROBE_CHARS, WINDOW_MAX_CHARS,
    WINDOW_MIN_CHARS,
};
use marginalia_core::text::{char_len, char_slice, find_nearest};
use marginalia_core::tree::{content_root_of, element_at_or_above, structural_path, text_child_index};
use marginalia_core::{
    is_blank, is_logographic, normalize_whitespace, AnchorDescriptor, CharRange, DocumentTree,
    Error, Result, SelectionRange,
};
use tracing::{debug, instrument};

use crate::index::TextIndex;

/// Tunables for [`AnchorBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Context captured on each side of the exact text.
    pub context_chars: usize,
    /// Context width when the text is predominantly logographic.
    pub context_chars_logographic: usize,
    /// Length of the selection prefix tried when the full text is not found.
    pub prefix_probe_chars: usize,
    /// Smallest window in the last-resort window scan.
    pub window_min_chars: usize,
    /// Largest window in the last-resort window scan.
    pub window_max_chars: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            context_chars: CONTEXT_CHARS,
            context_chars_logographic: CONTEXT_CHARS_LOGOGRAPHIC,
            prefix_probe_chars: PREFIX_PROBE_CHARS,
            window_min_chars: WINDOW_MIN_CHARS,
            window_max_chars: WINDOW_MAX_CHARS,
        }
    }
}

impl BuilderConfig {
    /// Load overrides from the environment.
    ///
    /// Environment variables:
    /// - `MARGINALIA_CONTEXT_CHARS` (default: 32)
    /// - `MARGINALIA_CONTEXT_CHARS_LOGOGRAPHIC` (default: 64)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            context_chars: parse_env("MARGINALIA_CONTEXT_CHARS", defaults.context_chars),
            context_chars_logographic: parse_env(
                "MARGINALIA_CONTEXT_CHARS_LOGOGRAPHIC",
                defaults.context_chars_logographic,
            ),
            ..defaults
        }
    }

    pub fn with_context_chars(mut self, chars: usize) -> Self {
        self.context_chars = chars;
        self
    }

    pub fn with_logographic_context_chars(mut self, chars: usize) -> Self {
        self.context_chars_logographic = chars;
        self
    }

    pub fn with_prefix_probe_chars(mut self, chars: usize) -> Self {
        self.prefix_probe_chars = chars;
        self
    }

    /// Window sizes for the last-resort scan. `min` is raised to at least 1.
    pub fn with_window(mut self, min: usize, max: usize) -> Self {
        self.window_min_chars = min.max(1);
        self.window_max_chars = max.max(self.window_min_chars);
        self
    }
}

pub(crate) fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|val| val.trim().parse().ok())
        .unwrap_or(default)
}

/// How the exact text was placed in the root text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Full,
    Prefix,
    Window,
}

/// Builds [`AnchorDescriptor`]s from selections.
#[derive(Debug, Clone, Default)]
pub struct AnchorBuilder {
    config: BuilderConfig,
}

impl AnchorBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Describe `range`, whose plain text is `selected_text`.
    ///
    /// Fails with [`Error::EmptySelection`] for collapsed or blank selections
    /// and [`Error::NoContentRoot`] when no root element can be found. When
    /// the text cannot be placed in the root text at all, the descriptor
    /// carries only the structural fields.
    #[instrument(skip(self, tree, range, selected_text), fields(
        subsystem = "anchor",
        component = "builder",
        op = "build",
    ))]
    pub fn build<T: DocumentTree + ?Sized>(
        &self,
        tree: &T,
        range: &SelectionRange,
        selected_text: &str,
    ) -> Result<AnchorDescriptor> {
        if range.is_collapsed() || is_blank(selected_text) {
            return Err(Error::EmptySelection);
        }
        let root = content_root_of(tree, range.start.node).ok_or(Error::NoContentRoot)?;
        let index = TextIndex::build(tree, root);
        let exact = normalize_whitespace(selected_text);
        let hint = index.offset_of(range.start);

        let element = element_at_or_above(tree, range.start.node);
        let path = element
            .map(|el| structural_path(tree, el, root))
            .unwrap_or_default();
        let node_index = if tree.is_text(range.start.node) {
            text_child_index(tree, range.start.node)
        } else {
            None
        };

        let Some((placed, how)) = self.place(&index, &exact, hint) else {
            debug!(
                root = %root,
                path_len = path.len(),
                "Selection not found in root text, keeping structure only"
            );
            return Ok(AnchorDescriptor {
                exact_text: exact,
                text_before: String::new(),
                text_after: String::new(),
                start: None,
                end: None,
                structural_path: path,
                node_index,
            });
        };

        let width = self.context_width(&index, &exact, placed);
        let text = index.text();
        let descriptor = AnchorDescriptor {
            text_before: char_slice(text, placed.start.saturating_sub(width), placed.start)
                .to_string(),
            text_after: char_slice(text, placed.end, placed.end + width).to_string(),
            exact_text: exact,
            start: Some(placed.start),
            end: Some(placed.end),
            structural_path: path,
            node_index,
        };
        debug!(
            ?how,
            start = placed.start,
            end = placed.end,
            context_chars = width,
            "Anchor built"
        );
        Ok(descriptor)
    }

    /// Place `exact` in the root text: full text, then prefix, then windows.
    /// Among several occurrences the one nearest `hint` wins.
    fn place(&self, index: &TextIndex, exact: &str, hint: Option<usize>) -> Option<(CharRange, Placement)> {
        let text = index.text();
        let len = char_len(exact);
        let clamp = |at: usize| CharRange::new(at, (at + len).min(index.len()));

        if let Some(at) = find_nearest(text, exact, hint) {
            return Some((clamp(at), Placement::Full));
        }

        if len > self.config.prefix_probe_chars && self.config.prefix_probe_chars > 0 {
            let probe = char_slice(exact, 0, self.config.prefix_probe_chars);
            if let Some(at) = find_nearest(text, probe, hint) {
                return Some((clamp(at), Placement::Prefix));
            }
        }

        // windows of the selection start, largest first so short windows
        // only decide when nothing longer matched
        let max = self.config.window_max_chars.min(len);
        for size in (self.config.window_min_chars..=max).rev() {
            for shift in 0..=(self.config.window_max_chars.min(len - size)) {
                let probe = char_slice(exact, shift, shift + size);
                if is_blank(probe) {
                    continue;
                }
                let target = hint.map(|h| h + shift);
                if let Some(at) = find_nearest(text, probe, target) {
                    return Some((clamp(at.saturating_sub(shift)), Placement::Window));
                }
            }
        }
        None
    }

    fn context_width(&self, index: &TextIndex, exact: &str, placed: CharRange) -> usize {
        let narrow = self.config.context_chars;
        let surroundings = index.slice(CharRange::new(
            placed.start.saturating_sub(narrow),
            (placed.end + narrow).min(index.len()),
        ));
        if is_logographic(exact) || is_logographic(surroundings) {
            self.config.context_chars_logographic
        } else {
            narrow
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marginalia_dom::Document;

    fn build(html: &str, needle: &str) -> Result<AnchorDescriptor> {
        let doc = Document::parse_html(html);
        let range = doc.select_text(needle, 0).unwrap();
        let text = doc.selection_text(&range).unwrap();
        AnchorBuilder::default().build(&doc, &range, &text)
    }

    #[test]
    fn test_quick_brown_fox_context() {
        let anchor = build(
            "<article><p>said the quick brown fox jumped</p></article>",
            "the quick brown fox",
        )
        .unwrap();
        assert_eq!(anchor.exact_text, "the quick brown fox");
        assert_eq!(char_len(&anchor.exact_text), 19);
        assert_eq!(anchor.text_before, "said ");
        assert_eq!(anchor.text_after, " jumped");
        assert_eq!(anchor.start, Some(5));
        assert_eq!(anchor.end, Some(24));
        assert!(anchor.structural_path.len() == 1);
        assert_eq!(anchor.structural_path[0], "p:0");
        assert_eq!(anchor.node_index, Some(0));
    }

    #[test]
    fn test_context_is_capped() {
        let long = "x".repeat(100);
        let html = format!("<article><p>{} target {}</p></article>", long, long);
        let anchor = build(&html, "target").unwrap();
        assert_eq!(char_len(&anchor.text_before), CONTEXT_CHARS);
        assert_eq!(char_len(&anchor.text_after), CONTEXT_CHARS);
    }

    #[test]
    fn test_logographic_context_is_wider() {
        let filler = "中文文本内容".repeat(20);
        let html = format!("<article><p>{}目标{}</p></article>", filler, filler);
        let anchor = build(&html, "目标").unwrap();
        assert_eq!(char_len(&anchor.text_before), CONTEXT_CHARS_LOGOGRAPHIC);
        assert_eq!(char_len(&anchor.text_after), CONTEXT_CHARS_LOGOGRAPHIC);
    }

    #[test]
    fn test_repeated_phrase_picks_selected_occurrence() {
        let doc = Document::parse_html("<article><p>fox one fox two fox three</p></article>");
        let range = doc.select_text("fox", 1).unwrap();
        let anchor = AnchorBuilder::default().build(&doc, &range, "fox").unwrap();
        assert_eq!(anchor.start, Some(8));
        assert_eq!(anchor.text_after, " two fox three");
    }

    #[test]
    fn test_blank_and_collapsed_selections_rejected() {
        let doc = Document::parse_html("<p>some text</p>");
        let range = doc.select_text("some", 0).unwrap();
        let builder = AnchorBuilder::default();
        assert!(matches!(
            builder.build(&doc, &range, "  \n "),
            Err(Error::EmptySelection)
        ));
        let collapsed = SelectionRange::new(range.start, range.start);
        assert!(matches!(
            builder.build(&doc, &collapsed, "some"),
            Err(Error::EmptySelection)
        ));
    }

    #[test]
    fn test_selection_across_blocks_uses_prefix() {
        // the host reports a line break between blocks that the flattened
        // text does not contain
        let doc = Document::parse_html(
            "<article><p>first paragraph ends here</p><p>second begins</p></article>",
        );
        let range = doc.select_text("paragraph ends heresecond", 0).unwrap();
        let builder = AnchorBuilder::new(BuilderConfig::default().with_prefix_probe_chars(10));
        let anchor = builder
            .build(&doc, &range, "paragraph ends here\n\nsecond")
            .unwrap();
        assert_eq!(anchor.exact_text, "paragraph ends here second");
        assert_eq!(anchor.start, Some(6));
    }

    #[test]
    fn test_unplaceable_text_keeps_structure_only() {
        let doc = Document::parse_html("<article><p id=\"x\">visible words</p></article>");
        let range = doc.select_text("visible", 0).unwrap();
        let anchor = AnchorBuilder::default()
            .build(&doc, &range, "qqq zzz")
            .unwrap();
        assert!(anchor.is_structural_only());
        assert_eq!(anchor.structural_path, vec!["p#x"]);
        assert_eq!(anchor.exact_text, "qqq zzz");
    }

    #[test]
    fn test_config_builders() {
        let config = BuilderConfig::default()
            .with_context_chars(10)
            .with_logographic_context_chars(20)
            .with_window(0, 0);
        assert_eq!(config.context_chars, 10);
        assert_eq!(config.context_chars_logographic, 20);
        assert_eq!(config.window_min_chars, 1);
        assert_eq!(config.window_max_chars, 1);
    }
}
