//! # marginalia-render
//!
//! Wraps resolved ranges in marker elements and manages them afterwards.
//!
//! - [`SpanApplier`] splits text nodes and wraps every piece of a range,
//!   falling back to the host's native highlight command, and unwraps,
//!   recolors, or annotates all markers of one highlight.
//! - [`MarkerRegistry`] maps a highlight id to its [`MarkerGroup`].

pub mod applier;
pub mod group;

pub use applier::{ApplyMethod, AppliedMarkers, SpanApplier};
pub use group::{MarkerGroup, MarkerRegistry};
