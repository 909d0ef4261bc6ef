//! # marginalia-coordinator
//!
//! Orchestrates the anchor builder, locator, span applier, and store into
//! the user-facing flows: highlight a selection, restore a page, change a
//! color or note, and remove a highlight.
//!
//! ```ignore
//! use marginalia_coordinator::{CoordinatorConfig, HighlightCoordinator};
//! use marginalia_store::{HighlightStore, MemoryBackend, StoreConfig};
//!
//! let store = HighlightStore::new(MemoryBackend::new(), StoreConfig::default());
//! let mut coordinator =
//!     HighlightCoordinator::new("https://example.com/post", store, CoordinatorConfig::default());
//! let report = coordinator.restore_all_for_url(&mut doc, "https://example.com/post").await;
//! ```

pub mod config;
pub mod coordinator;
pub mod phase;

pub use config::CoordinatorConfig;
pub use coordinator::{AppliedHighlight, HighlightCoordinator, RestoreReport};
pub use phase::ApplyPhase;
