//! # marginalia-core
//!
//! Core types, traits, and tree/text utilities for marginalia.
//!
//! This crate provides the data model shared by every other marginalia crate
//! (highlights, anchor descriptors, selections), the host document-tree
//! interface, the error type, and the centralized defaults.

pub mod defaults;
pub mod error;
pub mod ids;
pub mod logging;
pub mod marker;
pub mod models;
pub mod script;
pub mod text;
pub mod traits;
pub mod tree;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use ids::{is_highlight_id, new_highlight_id};
pub use marker::MarkerSpec;
pub use models::*;
pub use script::{detect_script, is_logographic, DetectedScript, ScriptDetection};
pub use text::{char_len, char_slice, is_blank, normalize_whitespace};
pub use traits::{DocumentTree, NodeKind};
