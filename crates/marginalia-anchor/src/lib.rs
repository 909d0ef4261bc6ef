//! # marginalia-anchor
//!
//! Turns a live selection into an [`AnchorDescriptor`] and resolves a
//! descriptor back into a selection on a possibly different tree.
//!
//! Matching happens in the content root's whitespace-normalized flattened
//! text ([`TextIndex`]); only the final step maps a character range back
//! onto `(text node, offset)` boundaries.
//!
//! [`AnchorDescriptor`]: marginalia_core::AnchorDescriptor

pub mod builder;
pub mod index;
pub mod locator;

pub use builder::{AnchorBuilder, BuilderConfig};
pub use index::{NodeSpan, TextIndex};
pub use locator::{LocateContext, LocateStrategy, LocatorConfig, Resolution, StructuralHint, TextLocator};
