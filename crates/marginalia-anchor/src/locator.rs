//! Anchor resolution: an ordered cascade of matching strategies.
//!
//! Each [`LocateStrategy`] is a pure function of the descriptor and a
//! [`LocateContext`] (normalized root text plus an optional structural
//! hint), so strategies can be tested and reordered independently. The
//! first strategy to produce a range wins.

use marginalia_core::defaults::{FUZZY_PROBE_CHARS, FUZZY_THRESHOLD};
use marginalia_core::text::{char_index_of_byte, char_len, find_all};
use marginalia_core::tree::{content_roots, nth_text_child, resolve_structural_path};
use marginalia_core::{AnchorDescriptor, CharRange, DocumentTree, Error, Result, SelectionRange};
use regex::Regex;
use std::cmp::Reverse;
use tracing::{debug, instrument, trace};

use crate::builder::parse_env;
use crate::index::TextIndex;

/// One matching strategy of the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocateStrategy {
    /// Resolve the structural path and match inside the recorded text node.
    StructuralPath,
    /// Search the root text for the exact text.
    ExactQuote,
    /// Search for context + exact text + context with flexible whitespace.
    ContextBounded,
    /// Best per-character alignment of the exact text above a threshold.
    FuzzyChunk,
    /// Recorded offsets, if still in bounds.
    AbsolutePosition,
}

impl LocateStrategy {
    pub const DEFAULT_ORDER: [LocateStrategy; 5] = [
        LocateStrategy::StructuralPath,
        LocateStrategy::ExactQuote,
        LocateStrategy::ContextBounded,
        LocateStrategy::FuzzyChunk,
        LocateStrategy::AbsolutePosition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LocateStrategy::StructuralPath => "structural_path",
            LocateStrategy::ExactQuote => "exact_quote",
            LocateStrategy::ContextBounded => "context_bounded",
            LocateStrategy::FuzzyChunk => "fuzzy_chunk",
            LocateStrategy::AbsolutePosition => "absolute_position",
        }
    }

    /// Ranked strategies run on every content root and the hit whose
    /// surroundings best agree with the recorded context wins. The others
    /// take the first root that yields a hit.
    pub fn is_ranked(&self) -> bool {
        matches!(self, LocateStrategy::ExactQuote | LocateStrategy::ContextBounded)
    }

    /// Run this strategy alone.
    pub fn locate(
        &self,
        ctx: &LocateContext<'_>,
        anchor: &AnchorDescriptor,
        config: &LocatorConfig,
    ) -> Option<CharRange> {
        if anchor.exact_text.is_empty() {
            return None;
        }
        match self {
            LocateStrategy::StructuralPath => structural(ctx, anchor),
            LocateStrategy::ExactQuote => exact_quote(ctx, anchor),
            LocateStrategy::ContextBounded => context_bounded(ctx, anchor),
            LocateStrategy::FuzzyChunk => fuzzy_chunk(ctx, anchor, config),
            LocateStrategy::AbsolutePosition => absolute(ctx, anchor),
        }
    }
}

impl std::fmt::Display for LocateStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunables for [`TextLocator`].
#[derive(Debug, Clone, PartialEq)]
pub struct LocatorConfig {
    /// Minimum fraction of equal aligned chars for a fuzzy match.
    pub fuzzy_threshold: f32,
    /// Cap on the fuzzy probe length.
    pub fuzzy_probe_chars: usize,
    /// Strategies in the order they are tried.
    pub strategies: Vec<LocateStrategy>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: FUZZY_THRESHOLD,
            fuzzy_probe_chars: FUZZY_PROBE_CHARS,
            strategies: LocateStrategy::DEFAULT_ORDER.to_vec(),
        }
    }
}

impl LocatorConfig {
    /// Load overrides from the environment.
    ///
    /// Environment variables:
    /// - `MARGINALIA_FUZZY_THRESHOLD` (default: 0.7)
    /// - `MARGINALIA_FUZZY_PROBE_CHARS` (default: 50)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            fuzzy_threshold: parse_env("MARGINALIA_FUZZY_THRESHOLD", defaults.fuzzy_threshold)
                .clamp(0.0, 1.0),
            fuzzy_probe_chars: parse_env(
                "MARGINALIA_FUZZY_PROBE_CHARS",
                defaults.fuzzy_probe_chars,
            ),
            ..defaults
        }
    }

    pub fn with_fuzzy_threshold(mut self, threshold: f32) -> Self {
        self.fuzzy_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_fuzzy_probe_chars(mut self, chars: usize) -> Self {
        self.fuzzy_probe_chars = chars;
        self
    }

    pub fn with_strategies(mut self, strategies: &[LocateStrategy]) -> Self {
        self.strategies = strategies.to_vec();
        self
    }
}

/// Where the structural path and node index point, in normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StructuralHint {
    /// Span of all text under the resolved element.
    pub element: Option<CharRange>,
    /// Span of the recorded text node, if the node index was valid.
    pub node: Option<CharRange>,
}

/// Input shared by all strategies.
#[derive(Debug, Clone, Copy)]
pub struct LocateContext<'a> {
    pub text: &'a str,
    pub chars: &'a [char],
    pub structural: StructuralHint,
}

impl<'a> LocateContext<'a> {
    pub fn new(text: &'a str, chars: &'a [char]) -> Self {
        Self {
            text,
            chars,
            structural: StructuralHint::default(),
        }
    }

    pub fn from_index(index: &'a TextIndex) -> Self {
        Self::new(index.text(), index.chars())
    }

    pub fn with_structural(mut self, hint: StructuralHint) -> Self {
        self.structural = hint;
        self
    }
}

/// A resolved anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Range in the root's normalized text.
    pub range: CharRange,
    /// Range mapped onto live text nodes.
    pub selection: SelectionRange,
    pub strategy: LocateStrategy,
}

/// Resolves descriptors against a document tree.
#[derive(Debug, Clone, Default)]
pub struct TextLocator {
    config: LocatorConfig,
}

impl TextLocator {
    pub fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Run the cascade on prepared text. Returns the first strategy's hit.
    pub fn locate_in(
        &self,
        ctx: &LocateContext<'_>,
        anchor: &AnchorDescriptor,
    ) -> Option<(CharRange, LocateStrategy)> {
        self.config.strategies.iter().find_map(|strategy| {
            let hit = strategy.locate(ctx, anchor, &self.config);
            trace!(strategy = strategy.as_str(), matched = hit.is_some(), "Strategy tried");
            hit.map(|range| (range, *strategy))
        })
    }

    /// Resolve `anchor` against `tree`.
    ///
    /// Each strategy is tried against every candidate content root before
    /// the next strategy runs. For ranked strategies a hit in one root does
    /// not end the search: hits from all roots compete on context agreement,
    /// then on distance from the recorded start. Fails with [`Error::NoContentRoot`] for a
    /// tree without elements and [`Error::Unresolvable`] when every
    /// strategy misses.
    #[instrument(skip(self, tree, anchor), fields(
        subsystem = "anchor",
        component = "locator",
        op = "locate",
    ))]
    pub fn locate<T: DocumentTree + ?Sized>(
        &self,
        tree: &T,
        anchor: &AnchorDescriptor,
    ) -> Result<Resolution> {
        anchor.validate()?;
        let roots = content_roots(tree);
        if roots.is_empty() {
            return Err(Error::NoContentRoot);
        }
        let prepared: Vec<(TextIndex, StructuralHint)> = roots
            .into_iter()
            .map(|root| {
                let index = TextIndex::build(tree, root);
                let hint = structural_hint(tree, &index, anchor);
                (index, hint)
            })
            .collect();

        let before: Vec<char> = anchor.text_before.chars().collect();
        let after: Vec<char> = anchor.text_after.chars().collect();
        let found = self.config.strategies.iter().find_map(|strategy| {
            let mut hits = prepared.iter().filter_map(|(index, hint)| {
                let ctx = LocateContext::from_index(index).with_structural(*hint);
                let hit = strategy.locate(&ctx, anchor, &self.config);
                trace!(
                    strategy = strategy.as_str(),
                    root = %index.root(),
                    matched = hit.is_some(),
                    "Strategy tried"
                );
                hit.map(|range| (index, range))
            });
            let best = if strategy.is_ranked() {
                // ties keep the earlier root
                hits.min_by_key(|(index, range)| {
                    let agreement =
                        context_agreement(index.chars(), range.start, range.end, &before, &after);
                    let distance = anchor.start.map(|s| s.abs_diff(range.start)).unwrap_or(0);
                    (Reverse(agreement), distance)
                })
            } else {
                hits.next()
            };
            best.map(|(index, range)| (index, range, *strategy))
        });
        let (index, range, strategy) = found.ok_or_else(|| {
            Error::Unresolvable(format!("no strategy matched {:?}", anchor.exact_text))
        })?;
        let selection = index.boundaries(range).ok_or_else(|| {
            Error::Unresolvable(format!("range {}..{} has no live boundaries", range.start, range.end))
        })?;
        debug!(
            strategy = strategy.as_str(),
            root = %index.root(),
            start = range.start,
            end = range.end,
            "Anchor resolved"
        );
        Ok(Resolution {
            range,
            selection,
            strategy,
        })
    }
}

fn structural_hint<T: DocumentTree + ?Sized>(
    tree: &T,
    index: &TextIndex,
    anchor: &AnchorDescriptor,
) -> StructuralHint {
    if anchor.structural_path.is_empty() && anchor.node_index.is_none() {
        return StructuralHint::default();
    }
    let Some(element) = resolve_structural_path(tree, index.root(), &anchor.structural_path) else {
        return StructuralHint::default();
    };
    let node = anchor
        .node_index
        .and_then(|i| nth_text_child(tree, element, i))
        .and_then(|n| index.span_of(n))
        .map(|span| span.range());
    StructuralHint {
        element: index.span_covering(&tree.text_nodes(element)),
        node,
    }
}

/// A structural hit must keep at least one full side of its recorded
/// context, so a shifted sibling index cannot claim the wrong element.
fn structural(ctx: &LocateContext<'_>, anchor: &AnchorDescriptor) -> Option<CharRange> {
    let len = char_len(&anchor.exact_text);
    let before: Vec<char> = anchor.text_before.chars().collect();
    let after: Vec<char> = anchor.text_after.chars().collect();
    let keeps_context = |at: usize| {
        if before.is_empty() && after.is_empty() {
            return true;
        }
        let (left, right) = context_sides(ctx.chars, at, at + len, &before, &after);
        (!before.is_empty() && left == before.len()) || (!after.is_empty() && right == after.len())
    };

    let hits = find_all(ctx.text, &anchor.exact_text);
    if let Some(node) = ctx.structural.node {
        // a node that collapsed to nothing still pins the match start
        return hits
            .into_iter()
            .filter(|at| *at >= node.start && (*at < node.end || (node.is_empty() && *at == node.start)))
            .find(|at| keeps_context(*at))
            .map(|at| CharRange::new(at, at + len));
    }
    let element = ctx.structural.element?;
    hits.into_iter()
        .filter(|at| *at >= element.start && at + len <= element.end)
        .find(|at| keeps_context(*at))
        .map(|at| CharRange::new(at, at + len))
}

fn exact_quote(ctx: &LocateContext<'_>, anchor: &AnchorDescriptor) -> Option<CharRange> {
    let len = char_len(&anchor.exact_text);
    let hits = find_all(ctx.text, &anchor.exact_text);
    if hits.len() <= 1 {
        return hits.first().map(|at| CharRange::new(*at, at + len));
    }
    let before: Vec<char> = anchor.text_before.chars().collect();
    let after: Vec<char> = anchor.text_after.chars().collect();
    hits.into_iter()
        .map(|at| {
            let score = context_agreement(ctx.chars, at, at + len, &before, &after);
            let distance = anchor.start.map(|s| s.abs_diff(at)).unwrap_or(0);
            (at, score, distance)
        })
        // best agreement first, then the occurrence nearest the recorded start
        .min_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)).then(a.0.cmp(&b.0)))
        .map(|(at, _, _)| CharRange::new(at, at + len))
}

/// Chars of recorded context that still sit next to `[start, end)`.
fn context_agreement(text: &[char], start: usize, end: usize, before: &[char], after: &[char]) -> usize {
    let (left, right) = context_sides(text, start, end, before, after);
    left + right
}

/// Matching chars on each side, counted outward from the range.
fn context_sides(
    text: &[char],
    start: usize,
    end: usize,
    before: &[char],
    after: &[char],
) -> (usize, usize) {
    let start = start.min(text.len());
    let left = before
        .iter()
        .rev()
        .zip(text[..start].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    let right = after
        .iter()
        .zip(text[end.min(text.len())..].iter())
        .take_while(|(a, b)| a == b)
        .count();
    (left, right)
}

/// Regex for a normalized fragment where any whitespace run, or none at
/// all, may sit between two chars. Block boundaries flatten without a
/// separator, so a later reflow can add whitespace where none was recorded.
fn flexible(part: &str) -> String {
    part.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| regex::escape(c.encode_utf8(&mut [0u8; 4])))
        .collect::<Vec<_>>()
        .join(r"\s*")
}

fn context_bounded(ctx: &LocateContext<'_>, anchor: &AnchorDescriptor) -> Option<CharRange> {
    let before = anchor.text_before.trim();
    let after = anchor.text_after.trim();
    if before.is_empty() && after.is_empty() {
        return None;
    }
    let pattern = format!(
        r"{}\s*({})\s*{}",
        flexible(before),
        flexible(anchor.exact_text.trim()),
        flexible(after)
    );
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            debug!(error = %e, "Context pattern rejected");
            return None;
        }
    };
    let found: Vec<CharRange> = re
        .captures_iter(ctx.text)
        .filter_map(|caps| caps.get(1))
        .map(|m| {
            CharRange::new(
                char_index_of_byte(ctx.text, m.start()),
                char_index_of_byte(ctx.text, m.end()),
            )
        })
        .collect();
    match anchor.start {
        Some(start) => found.into_iter().min_by_key(|r| r.start.abs_diff(start)),
        None => found.into_iter().next(),
    }
}

fn fuzzy_chunk(
    ctx: &LocateContext<'_>,
    anchor: &AnchorDescriptor,
    config: &LocatorConfig,
) -> Option<CharRange> {
    // whitespace is skipped on both sides; `dense` keeps each kept char's
    // position in the root text
    let exact: Vec<char> = anchor
        .exact_text
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let dense: Vec<(usize, char)> = ctx
        .chars
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, c)| !c.is_whitespace())
        .collect();
    let probe_len = exact.len().min(config.fuzzy_probe_chars);
    if probe_len == 0 || dense.len() < probe_len {
        return None;
    }
    let probe = &exact[..probe_len];

    let mut best: Option<(usize, usize)> = None;
    for at in 0..=(dense.len() - probe_len) {
        let equal = probe
            .iter()
            .zip(&dense[at..at + probe_len])
            .filter(|(a, (_, b))| *a == b)
            .count();
        if best.map_or(true, |(_, score)| equal > score) {
            best = Some((at, equal));
            if equal == probe_len {
                break;
            }
        }
    }

    let (at, equal) = best?;
    let score = equal as f32 / probe_len as f32;
    trace!(at, score, "Best fuzzy alignment");
    if score < config.fuzzy_threshold {
        return None;
    }
    let last = (at + exact.len()).min(dense.len()) - 1;
    Some(CharRange::new(dense[at].0, dense[last].0 + 1))
}

fn absolute(ctx: &LocateContext<'_>, anchor: &AnchorDescriptor) -> Option<CharRange> {
    anchor
        .char_range()
        .filter(|r| !r.is_empty() && r.end <= ctx.chars.len())
}
