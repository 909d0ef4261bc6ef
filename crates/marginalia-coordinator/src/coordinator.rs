//! The highlight coordinator.
//!
//! Tree work is synchronous; persistence is awaited afterwards. The
//! in-memory list is updated before the store is written, and a failed
//! write is reported as a warning rather than undoing the rendered markers.

use marginalia_anchor::{AnchorBuilder, TextLocator};
use marginalia_core::{
    page_key, DocumentTree, Error, Highlight, HighlightColor, HighlightPatch, MarkerSpec, NodeId,
    Result, Selection, SelectionRange,
};
use marginalia_render::{AppliedMarkers, ApplyMethod, MarkerGroup, MarkerRegistry, SpanApplier};
use marginalia_store::HighlightStore;
use tracing::{debug, info, instrument, warn};

use crate::config::CoordinatorConfig;
use crate::phase::ApplyPhase;

/// Outcome of [`HighlightCoordinator::apply_highlight`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedHighlight {
    pub highlight: Highlight,
    /// Marker elements in document order.
    pub markers: Vec<NodeId>,
    pub method: ApplyMethod,
    /// Set when the highlight is rendered but its record was not saved.
    pub warning: Option<String>,
}

/// Outcome of [`HighlightCoordinator::restore_all_for_url`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    pub orphaned: usize,
    pub already_rendered: usize,
    /// Ids of records that could not be placed. They stay in the store.
    pub orphaned_ids: Vec<String>,
    /// Set when the stored records could not be loaded at all.
    pub warning: Option<String>,
}

impl RestoreReport {
    pub fn total(&self) -> usize {
        self.restored + self.orphaned + self.already_rendered
    }
}

/// Drives highlights for one page.
pub struct HighlightCoordinator {
    page_url: String,
    store: HighlightStore,
    builder: AnchorBuilder,
    locator: TextLocator,
    applier: SpanApplier,
    registry: MarkerRegistry,
    highlights: Vec<Highlight>,
}

impl HighlightCoordinator {
    pub fn new(page_url: &str, store: HighlightStore, config: CoordinatorConfig) -> Self {
        Self {
            page_url: page_key(page_url),
            store,
            builder: AnchorBuilder::new(config.builder),
            locator: TextLocator::new(config.locator),
            applier: SpanApplier::new().with_native_fallback(config.native_fallback),
            registry: MarkerRegistry::new(),
            highlights: Vec::new(),
        }
    }

    /// Page key the coordinator currently works on.
    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    pub fn store(&self) -> &HighlightStore {
        &self.store
    }

    /// Highlights known for the current page.
    pub fn highlights(&self) -> &[Highlight] {
        &self.highlights
    }

    /// First rendered marker of `highlight_id`, if any.
    pub fn marker_for<T: DocumentTree + ?Sized>(
        &mut self,
        tree: &T,
        highlight_id: &str,
    ) -> Option<NodeId> {
        self.registry
            .resolve(tree, highlight_id)
            .and_then(|group| group.markers.first().copied())
    }

    /// Anchor, render, and persist a new highlight for `selection`.
    ///
    /// Fails with [`Error::EmptySelection`] or [`Error::NoContentRoot`] when
    /// no anchor can be built, and [`Error::Apply`] when no marker could be
    /// rendered. Nothing is stored in either case.
    #[instrument(skip(self, tree, selection, note), fields(
        subsystem = "coordinator",
        component = "coordinator",
        op = "apply_highlight",
        url = %self.page_url,
        color = color.as_str(),
    ))]
    pub async fn apply_highlight<T: DocumentTree + ?Sized>(
        &mut self,
        tree: &mut T,
        selection: &Selection,
        color: HighlightColor,
        note: Option<String>,
    ) -> Result<AppliedHighlight> {
        let mut phase = ApplyPhase::Idle;
        phase.advance(ApplyPhase::Building);
        let anchor = match self.builder.build(&*tree, &selection.range, &selection.text) {
            Ok(anchor) => anchor,
            Err(e) => {
                phase.advance(ApplyPhase::Failed);
                return Err(e);
            }
        };

        let highlight = Highlight::new(&self.page_url, color, note, anchor);
        let marker = MarkerSpec::new(highlight.id.clone(), color, highlight.note.clone());
        let applied = self.render(tree, &selection.range, &marker, &mut phase)?;

        self.registry.insert(applied.to_group());
        self.highlights.push(highlight.clone());

        let warning = match self.store.save(&highlight).await {
            Ok(()) => None,
            Err(e) => {
                warn!(
                    highlight_id = %highlight.id,
                    error = %e,
                    "Highlight rendered but not persisted"
                );
                Some(e.to_string())
            }
        };

        info!(
            highlight_id = %highlight.id,
            marker_count = applied.markers.len(),
            method = applied.method.as_str(),
            "Highlight applied"
        );
        Ok(AppliedHighlight {
            highlight,
            markers: applied.markers,
            method: applied.method,
            warning,
        })
    }

    /// Remove the highlight owning `marker`: every marker of the group and
    /// exactly one stored record. Returns false when nothing was removed.
    #[instrument(skip(self, tree), fields(
        subsystem = "coordinator",
        component = "coordinator",
        op = "remove_highlight",
    ))]
    pub async fn remove_highlight<T: DocumentTree + ?Sized>(
        &mut self,
        tree: &mut T,
        marker: NodeId,
    ) -> bool {
        let Some(group) = self.group_of(&*tree, marker) else {
            debug!("Node is not inside a marker");
            return false;
        };
        let id = group.highlight_id.clone();
        let removed = match self.applier.remove(tree, &group) {
            Ok(0) => {
                debug!(highlight_id = %id, "Highlight already removed");
                return false;
            }
            Ok(count) => count,
            Err(e) => {
                warn!(highlight_id = %id, error = %e, "Could not remove markers");
                return false;
            }
        };
        self.registry.remove(&id);
        self.highlights.retain(|h| h.id != id);

        match self.store.delete(&id).await {
            Ok(true) => {}
            Ok(false) => debug!(highlight_id = %id, "No stored record to delete"),
            Err(e) => warn!(highlight_id = %id, error = %e, "Stored record not deleted"),
        }
        info!(highlight_id = %id, marker_count = removed, "Highlight removed");
        true
    }

    /// Set or clear the note of the highlight owning `marker`. Blank notes
    /// clear it.
    pub async fn update_note<T: DocumentTree + ?Sized>(
        &mut self,
        tree: &mut T,
        marker: NodeId,
        note: Option<String>,
    ) -> bool {
        let Some(group) = self.group_of(&*tree, marker) else {
            return false;
        };
        let id = group.highlight_id.as_str();
        let note = note.filter(|n| !n.trim().is_empty());
        match self.applier.set_note(tree, &group, note.as_deref()) {
            Ok(0) => return false,
            Ok(_) => {}
            Err(e) => {
                warn!(highlight_id = %id, error = %e, "Could not update note on markers");
                return false;
            }
        }
        self.patch_record(id, HighlightPatch::note(note)).await;
        info!(highlight_id = %id, "Highlight note updated");
        true
    }

    /// Recolor every marker of the highlight owning `marker`.
    pub async fn change_color<T: DocumentTree + ?Sized>(
        &mut self,
        tree: &mut T,
        marker: NodeId,
        color: HighlightColor,
    ) -> bool {
        let Some(group) = self.group_of(&*tree, marker) else {
            return false;
        };
        let id = group.highlight_id.as_str();
        match self.applier.recolor(tree, &group, color) {
            Ok(0) => return false,
            Ok(_) => {}
            Err(e) => {
                warn!(highlight_id = %id, error = %e, "Could not recolor markers");
                return false;
            }
        }
        self.patch_record(id, HighlightPatch::color(color)).await;
        info!(highlight_id = %id, color = color.as_str(), "Highlight recolored");
        true
    }

    /// Render every stored highlight for `url`.
    ///
    /// Each record is handled on its own: a record that cannot be located
    /// or rendered is counted as orphaned and left in the store. Records
    /// whose markers are already in the tree are skipped.
    #[instrument(skip(self, tree), fields(
        subsystem = "coordinator",
        component = "coordinator",
        op = "restore",
    ))]
    pub async fn restore_all_for_url<T: DocumentTree + ?Sized>(
        &mut self,
        tree: &mut T,
        url: &str,
    ) -> RestoreReport {
        let key = page_key(url);
        if key != self.page_url {
            debug!(from = %self.page_url, to = %key, "Switching page");
            self.page_url = key;
            self.registry.refresh(&*tree);
            self.highlights.clear();
        }

        let mut report = RestoreReport::default();
        let stored = match self.store.list(url).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Could not load highlights");
                report.warning = Some(e.to_string());
                return report;
            }
        };

        for highlight in &stored {
            if self.registry.resolve(&*tree, &highlight.id).is_some() {
                report.already_rendered += 1;
                continue;
            }
            match self.restore_one(tree, highlight) {
                Ok(applied) => {
                    self.registry.insert(applied.to_group());
                    report.restored += 1;
                }
                Err(e) if e.is_orphaning() => {
                    warn!(highlight_id = %highlight.id, error = %e, "Highlight orphaned");
                    report.orphaned += 1;
                    report.orphaned_ids.push(highlight.id.clone());
                }
                Err(e) => {
                    warn!(highlight_id = %highlight.id, error = %e, "Highlight could not be restored");
                    report.orphaned += 1;
                    report.orphaned_ids.push(highlight.id.clone());
                }
            }
        }

        // keep rendered highlights whose save failed earlier
        let unsaved: Vec<Highlight> = self
            .highlights
            .drain(..)
            .filter(|h| !stored.iter().any(|s| s.id == h.id))
            .collect();
        self.highlights = stored;
        for highlight in unsaved {
            if self.registry.resolve(&*tree, &highlight.id).is_some() {
                self.highlights.push(highlight);
            }
        }

        info!(
            restored = report.restored,
            orphaned = report.orphaned,
            already_rendered = report.already_rendered,
            "Restore finished"
        );
        report
    }

    /// Group of the highlight owning `node`, rescanned if stale.
    fn group_of<T: DocumentTree + ?Sized>(&mut self, tree: &T, node: NodeId) -> Option<MarkerGroup> {
        let id = self.registry.highlight_of(tree, node)?;
        self.registry.resolve(tree, &id).cloned()
    }

    fn restore_one<T: DocumentTree + ?Sized>(
        &self,
        tree: &mut T,
        highlight: &Highlight,
    ) -> Result<AppliedMarkers> {
        let mut phase = ApplyPhase::Idle;
        phase.advance(ApplyPhase::Building);
        let resolution = match self.locator.locate(&*tree, &highlight.anchor) {
            Ok(resolution) => resolution,
            Err(e) => {
                phase.advance(ApplyPhase::Failed);
                return Err(e);
            }
        };
        debug!(
            highlight_id = %highlight.id,
            strategy = resolution.strategy.as_str(),
            "Anchor resolved"
        );
        let marker = MarkerSpec::new(highlight.id.clone(), highlight.color, highlight.note.clone());
        self.render(tree, &resolution.selection, &marker, &mut phase)
    }

    /// Try each application method in turn, advancing `phase` per attempt.
    fn render<T: DocumentTree + ?Sized>(
        &self,
        tree: &mut T,
        range: &SelectionRange,
        marker: &MarkerSpec,
        phase: &mut ApplyPhase,
    ) -> Result<AppliedMarkers> {
        let methods: &[ApplyMethod] = if self.applier.native_fallback() {
            &[ApplyMethod::Direct, ApplyMethod::Native]
        } else {
            &[ApplyMethod::Direct]
        };
        let mut failures = Vec::new();
        for (attempt, method) in (1u8..).zip(methods) {
            phase.advance(ApplyPhase::Applying { attempt });
            let result = match method {
                ApplyMethod::Direct => self.applier.apply_direct(tree, range, marker),
                ApplyMethod::Native => self.applier.apply_native(tree, range, marker),
            };
            match result {
                Ok(applied) => {
                    phase.advance(ApplyPhase::Applied);
                    return Ok(applied);
                }
                Err(e) => {
                    warn!(
                        highlight_id = %marker.highlight_id,
                        method = method.as_str(),
                        attempt,
                        error = %e,
                        "Marker application failed"
                    );
                    failures.push(format!("{}: {}", method.as_str(), e));
                }
            }
        }
        phase.advance(ApplyPhase::Failed);
        Err(Error::Apply(failures.join("; ")))
    }

    /// Patch the in-memory copy, then the stored record.
    async fn patch_record(&mut self, id: &str, patch: HighlightPatch) {
        let local = self.highlights.iter_mut().find(|h| h.id == id);
        if let Some(highlight) = local {
            highlight.apply_patch(&patch);
        }
        match self.store.update(id, &patch).await {
            Ok(_) => {}
            Err(Error::NotFound(_)) => {
                // never saved, e.g. an earlier write failed
                if let Some(highlight) = self.highlights.iter().find(|h| h.id == id) {
                    if let Err(e) = self.store.save(highlight).await {
                        warn!(highlight_id = %id, error = %e, "Highlight change not persisted");
                    }
                }
            }
            Err(e) => warn!(highlight_id = %id, error = %e, "Highlight change not persisted"),
        }
    }
}
