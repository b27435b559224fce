use crate::link::LinkId;
use thiserror::Error;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A short code that does not map back to an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid character '{character}' at position {position}")]
    InvalidCharacter { position: usize, character: char },
    #[error("short code does not fit in 64 bits: {0}")]
    Overflow(String),
}

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("link already exists: {0}")]
    Conflict(LinkId),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
}

impl StorageError {
    /// Whether retrying the same operation later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}
