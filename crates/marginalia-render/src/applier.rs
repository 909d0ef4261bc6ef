//! Marker application and removal.
//!
//! Application is planned before anything is touched: every segment is
//! validated against the live tree first, and a failure during mutation
//! unwraps whatever was created and merges split text back.

use marginalia_core::marker::{class_value, ATTR_CLASS, ATTR_COLOR, ATTR_NOTE, ATTR_TITLE};
use marginalia_core::text::{char_len, char_slice};
use marginalia_core::{
    is_blank, DocumentTree, Error, HighlightColor, MarkerSpec, NodeId, Result, SelectionRange,
};
use tracing::{debug, instrument, trace, warn};

use crate::group::MarkerGroup;

/// How a highlight ended up in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMethod {
    /// Split and wrapped text nodes directly.
    Direct,
    /// Host-native background command, tagged afterwards.
    Native,
}

impl ApplyMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyMethod::Direct => "direct",
            ApplyMethod::Native => "native",
        }
    }
}

/// Result of a successful application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMarkers {
    pub highlight_id: String,
    /// Marker elements in document order.
    pub markers: Vec<NodeId>,
    pub method: ApplyMethod,
}

impl AppliedMarkers {
    /// The markers as a group for the registry.
    pub fn to_group(&self) -> MarkerGroup {
        MarkerGroup::new(self.highlight_id.clone(), self.markers.clone())
    }
}

/// A clipped piece of one text node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    node: NodeId,
    from: usize,
    to: usize,
    len: usize,
}

/// Undo log for an application in progress.
#[derive(Debug, Default)]
struct Journal {
    markers: Vec<NodeId>,
    split_parents: Vec<NodeId>,
}

impl Journal {
    fn note_split<T: DocumentTree + ?Sized>(&mut self, tree: &T, node: NodeId) {
        if let Some(parent) = tree.parent(node) {
            if !self.split_parents.contains(&parent) {
                self.split_parents.push(parent);
            }
        }
    }

    fn rollback<T: DocumentTree + ?Sized>(self, tree: &mut T) {
        for marker in self.markers.iter().rev() {
            if let Err(e) = tree.unwrap(*marker) {
                warn!(marker = %marker, error = %e, "Rollback could not unwrap marker");
            }
        }
        for parent in self.split_parents {
            if let Err(e) = tree.merge_text(parent) {
                warn!(parent = %parent, error = %e, "Rollback could not merge text");
            }
        }
    }
}

/// Applies and removes highlight markers.
#[derive(Debug, Clone, Copy)]
pub struct SpanApplier {
    native_fallback: bool,
}

impl Default for SpanApplier {
    fn default() -> Self {
        Self::new()
    }
}

impl SpanApplier {
    /// Applier with the native fallback enabled.
    pub fn new() -> Self {
        Self {
            native_fallback: true,
        }
    }

    pub fn with_native_fallback(mut self, enabled: bool) -> Self {
        self.native_fallback = enabled;
        self
    }

    pub fn native_fallback(&self) -> bool {
        self.native_fallback
    }

    /// Wrap `range` in markers described by `marker`.
    ///
    /// Tries direct wrapping first, then the host's native command. On
    /// failure the tree is left as it was and [`Error::Apply`] is returned.
    #[instrument(skip(self, tree, range, marker), fields(
        subsystem = "render",
        component = "span_applier",
        op = "apply",
        highlight_id = %marker.highlight_id,
    ))]
    pub fn apply<T: DocumentTree + ?Sized>(
        &self,
        tree: &mut T,
        range: &SelectionRange,
        marker: &MarkerSpec,
    ) -> Result<AppliedMarkers> {
        let direct_err = match self.apply_direct(tree, range, marker) {
            Ok(applied) => return Ok(applied),
            Err(e) => e,
        };
        if !self.native_fallback {
            return Err(Error::Apply(direct_err.to_string()));
        }
        warn!(error = %direct_err, "Direct wrapping failed, trying native highlight");
        self.apply_native(tree, range, marker).map_err(|native_err| {
            Error::Apply(format!(
                "direct: {}; native: {}",
                direct_err, native_err
            ))
        })
    }

    /// Split and wrap every text node the range touches.
    pub fn apply_direct<T: DocumentTree + ?Sized>(
        &self,
        tree: &mut T,
        range: &SelectionRange,
        marker: &MarkerSpec,
    ) -> Result<AppliedMarkers> {
        let plan = plan_segments(tree, range)?;
        let mut journal = Journal::default();
        for segment in &plan {
            match wrap_segment(tree, *segment, marker, &mut journal) {
                Ok(()) => {}
                Err(e) => {
                    debug!(node = %segment.node, error = %e, "Wrapping failed, rolling back");
                    journal.rollback(tree);
                    return Err(e);
                }
            }
        }
        debug!(marker_count = journal.markers.len(), "Markers applied");
        Ok(AppliedMarkers {
            highlight_id: marker.highlight_id.clone(),
            markers: journal.markers,
            method: ApplyMethod::Direct,
        })
    }

    /// Use the host's background command, then tag what it created.
    pub fn apply_native<T: DocumentTree + ?Sized>(
        &self,
        tree: &mut T,
        range: &SelectionRange,
        marker: &MarkerSpec,
    ) -> Result<AppliedMarkers> {
        let created = tree.apply_native_highlight(range, marker.color.css_background())?;
        if created.is_empty() {
            return Err(Error::Host("native highlight created no elements".to_string()));
        }
        let attrs = marker.attributes();
        let tagged = created.iter().try_for_each(|el| {
            attrs
                .iter()
                .try_for_each(|(name, value)| tree.set_attribute(*el, name, value))
        });
        if let Err(e) = tagged {
            let mut journal = Journal::default();
            for el in &created {
                journal.note_split(tree, *el);
            }
            journal.markers = created;
            journal.rollback(tree);
            return Err(e);
        }
        debug!(marker_count = created.len(), "Native highlight tagged");
        Ok(AppliedMarkers {
            highlight_id: marker.highlight_id.clone(),
            markers: created,
            method: ApplyMethod::Native,
        })
    }

    /// Unwrap every marker of `group` and merge the text around them.
    /// Markers that are detached or no longer carry the group's id are
    /// skipped. Returns how many markers were removed.
    #[instrument(skip(self, tree, group), fields(
        subsystem = "render",
        component = "span_applier",
        op = "remove",
        highlight_id = %group.highlight_id,
    ))]
    pub fn remove<T: DocumentTree + ?Sized>(&self, tree: &mut T, group: &MarkerGroup) -> Result<usize> {
        let markers = live_markers(&*tree, group);
        let mut parents = Vec::new();
        // innermost first, so nested markers of the same id unwrap cleanly
        for marker in markers.iter().rev() {
            let parent = tree.parent(*marker);
            tree.unwrap(*marker)?;
            if let Some(parent) = parent {
                if !parents.contains(&parent) {
                    parents.push(parent);
                }
            }
        }
        for parent in parents {
            if tree.is_attached(parent) {
                tree.merge_text(parent)?;
            }
        }
        debug!(marker_count = markers.len(), "Markers removed");
        Ok(markers.len())
    }

    /// Set the color on every live marker of `group`.
    pub fn recolor<T: DocumentTree + ?Sized>(
        &self,
        tree: &mut T,
        group: &MarkerGroup,
        color: HighlightColor,
    ) -> Result<usize> {
        let markers = live_markers(&*tree, group);
        let class = class_value(color);
        for marker in &markers {
            tree.set_attribute(*marker, ATTR_CLASS, &class)?;
            tree.set_attribute(*marker, ATTR_COLOR, color.as_str())?;
            // native markers also carry an inline background
            if tree.attribute(*marker, "style").is_some() {
                let style = format!("background-color: {};", color.css_background());
                tree.set_attribute(*marker, "style", &style)?;
            }
        }
        trace!(
            highlight_id = %group.highlight_id,
            marker_count = markers.len(),
            color = color.as_str(),
            "Recolored"
        );
        Ok(markers.len())
    }

    /// Set or clear the note on every live marker of `group`.
    pub fn set_note<T: DocumentTree + ?Sized>(
        &self,
        tree: &mut T,
        group: &MarkerGroup,
        note: Option<&str>,
    ) -> Result<usize> {
        let markers = live_markers(&*tree, group);
        for marker in &markers {
            match note {
                Some(note) => {
                    tree.set_attribute(*marker, ATTR_NOTE, note)?;
                    tree.set_attribute(*marker, ATTR_TITLE, note)?;
                }
                None => {
                    tree.remove_attribute(*marker, ATTR_NOTE)?;
                    tree.remove_attribute(*marker, ATTR_TITLE)?;
                }
            }
        }
        trace!(highlight_id = %group.highlight_id, marker_count = markers.len(), "Note updated");
        Ok(markers.len())
    }
}

/// Markers of `group` still attached and tagged with its id.
fn live_markers<T: DocumentTree + ?Sized>(tree: &T, group: &MarkerGroup) -> Vec<NodeId> {
    group
        .markers
        .iter()
        .copied()
        .filter(|m| tree.highlight_id(*m) == Some(group.highlight_id.as_str()))
        .collect()
}

/// Validate the range and turn it into per-node segments.
///
/// Interior segments that are empty or whitespace-only are skipped; the
/// first and last are clipped to the range offsets.
fn plan_segments<T: DocumentTree + ?Sized>(
    tree: &T,
    range: &SelectionRange,
) -> Result<Vec<Segment>> {
    if range.is_collapsed() {
        return Err(Error::EmptySelection);
    }
    for node in [range.start.node, range.end.node] {
        if !tree.is_text(node) || !tree.is_attached(node) {
            return Err(Error::Apply(format!("{} is not an attached text node", node)));
        }
    }
    let scope = tree.body().unwrap_or_else(|| tree.document());
    let nodes = tree.text_nodes(scope);
    let first = nodes
        .iter()
        .position(|n| *n == range.start.node)
        .ok_or_else(|| Error::Apply("range start is not rendered text".to_string()))?;
    let last = nodes
        .iter()
        .position(|n| *n == range.end.node)
        .ok_or_else(|| Error::Apply("range end is not rendered text".to_string()))?;
    if last < first || (first == last && range.end.offset <= range.start.offset) {
        return Err(Error::Apply("range end precedes start".to_string()));
    }

    let mut plan = Vec::new();
    for (i, node) in nodes[first..=last].iter().enumerate() {
        let text = tree.text(*node).unwrap_or_default();
        let len = char_len(text);
        let is_first = i == 0;
        let is_last = first + i == last;
        let from = if is_first { range.start.offset } else { 0 };
        let to = if is_last { range.end.offset } else { len };
        if from > len || to > len {
            return Err(Error::Apply(format!(
                "offset out of bounds for {} (length {})",
                node, len
            )));
        }
        if from >= to {
            continue;
        }
        if !is_first && !is_last && is_blank(char_slice(text, from, to)) {
            trace!(node = %node, "Skipping whitespace-only segment");
            continue;
        }
        plan.push(Segment {
            node: *node,
            from,
            to,
            len,
        });
    }
    if plan.is_empty() {
        return Err(Error::Apply("range covers no text".to_string()));
    }
    Ok(plan)
}

fn wrap_segment<T: DocumentTree + ?Sized>(
    tree: &mut T,
    segment: Segment,
    marker: &MarkerSpec,
    journal: &mut Journal,
) -> Result<()> {
    let mut target = segment.node;
    if segment.to < segment.len {
        tree.split_text(target, segment.to)?;
        journal.note_split(tree, target);
    }
    if segment.from > 0 {
        target = tree.split_text(target, segment.from)?;
        journal.note_split(tree, target);
    }
    let wrapper = tree.wrap(target, marker)?;
    journal.markers.push(wrapper);
    Ok(())
}
