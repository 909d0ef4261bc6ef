//! Error types for marginalia.

use thiserror::Error;

/// Result type alias using marginalia's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for marginalia operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Selection was collapsed, empty, or whitespace-only
    #[error("Empty selection")]
    EmptySelection,

    /// No element usable as a content root could be located
    #[error("No content root found")]
    NoContentRoot,

    /// Every locator strategy failed for a stored anchor
    #[error("Unresolvable anchor: {0}")]
    Unresolvable(String),

    /// Wrapping or unwrapping highlight markup failed
    #[error("Apply error: {0}")]
    Apply(String),

    /// The host document tree rejected an operation
    #[error("Host error: {0}")]
    Host(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Key-value storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// True for errors that mean "this highlight cannot be rendered right now"
    /// rather than a broken request. Such highlights stay in storage.
    pub fn is_orphaning(&self) -> bool {
        matches!(self, Error::Unresolvable(_) | Error::Apply(_) | Error::Host(_))
    }
}
