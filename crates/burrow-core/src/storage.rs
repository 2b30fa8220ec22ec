use crate::error::Result;
use crate::owner::OwnerId;
use crate::record::{DeletionRequest, NewUrl, OwnedUrl, ServiceStats};
use crate::shortcode::ShortCode;
use async_trait::async_trait;

/// A read-only view of a storage backend.
///
/// Reads never observe soft-deleted records as live: [`ReadStorage::get_url`]
/// reports them as [`StorageError::Gone`](crate::StorageError::Gone).
#[async_trait]
pub trait ReadStorage: Send + Sync + 'static {
    /// Resolves a short code to its original URL.
    ///
    /// Returns `NotFound` for unknown codes and `Gone` for deleted ones.
    async fn get_url(&self, code: &ShortCode) -> Result<String>;

    /// Reverse lookup used to answer a `Conflict` with the existing code.
    async fn short_code_for(&self, original_url: &str) -> Result<ShortCode>;

    /// Lists every mapping created by `owner`. Empty when there are none.
    async fn list_urls_for_owner(&self, owner: &OwnerId) -> Result<Vec<OwnedUrl>>;

    /// Counts active records and distinct owners.
    async fn stats(&self) -> Result<ServiceStats>;

    /// Verifies the backend is reachable.
    async fn health_check(&self) -> Result<()>;
}

/// The storage contract shared by the memory, file and relational backends.
///
/// Backends never retry internally; a failed call is reported to the caller
/// as-is.
#[async_trait]
pub trait Storage: ReadStorage {
    /// Prepares persistent structures. Safe to call more than once.
    async fn init(&self) -> Result<()>;

    /// Inserts a new mapping.
    ///
    /// Returns `Conflict` when the backend enforces original URL uniqueness
    /// and the URL is already stored, and `CodeCollision` when `code` is taken.
    async fn save_url(&self, original_url: &str, code: &ShortCode, owner: &OwnerId) -> Result<()>;

    /// Inserts many mappings for one owner. Either all rows are stored or an
    /// error is returned and none are.
    async fn bulk_save_urls(&self, records: &[NewUrl], owner: &OwnerId) -> Result<()>;

    /// Marks every `(short_code, owner_id)` pair named by `requests` as deleted.
    ///
    /// Codes not owned by the requesting owner are skipped silently.
    async fn soft_delete(&self, requests: &[DeletionRequest]) -> Result<()>;
}
