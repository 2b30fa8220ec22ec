use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    #[error("invalid owner id: {0}")]
    InvalidOwner(String),
}

/// Errors surfaced by every storage backend.
///
/// `Conflict`, `NotFound` and `Gone` are expected outcomes that callers map to
/// user-facing answers. The remaining variants mean the backend itself failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("original url already shortened: {0}")]
    Conflict(String),
    #[error("short code already taken: {0}")]
    CodeCollision(String),
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("short code was deleted: {0}")]
    Gone(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage io failed: {0}")]
    Io(String),
}

impl StorageError {
    /// Returns `true` for outcomes that describe the data rather than a
    /// broken backend.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StorageError::Conflict(_) | StorageError::NotFound(_) | StorageError::Gone(_)
        )
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}
