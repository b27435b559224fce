use jiff::Timestamp;
use lynx_core::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShortenerError>;

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    /// The requested expiration is not in the future.
    #[error("expiration {0} is already in the past")]
    Expired(Timestamp),
    /// Unknown, expired or already consumed. The cause is deliberately
    /// not exposed.
    #[error("link not found")]
    NotFound,
    #[error("no free id found after {attempts} attempts")]
    Exhausted { attempts: u32 },
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ShortenerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
