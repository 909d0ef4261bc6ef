//! # marginalia-store
//!
//! Persists highlight records as one JSON array under a single key of a
//! key-value [`StorageBackend`]. Every call reads and writes the whole
//! array; per-page counts are small.
//!
//! ## Example
//!
//! ```rust,ignore
//! use marginalia_store::{FilesystemBackend, HighlightStore, StoreConfig};
//!
//! let store = HighlightStore::new(FilesystemBackend::new("/var/marginalia"), StoreConfig::from_env());
//! let highlights = store.list("https://example.com/post").await?;
//! ```

pub mod backend;
pub mod config;
pub mod store;

pub use backend::{FilesystemBackend, MemoryBackend, StorageBackend};
pub use config::StoreConfig;
pub use store::HighlightStore;
