use crate::journal::{Journal, JournalMode};
use crate::memory::InMemoryStorage;
use async_trait::async_trait;
use burrow_core::error::Result;
use burrow_core::{
    DeletionRequest, NewUrl, OwnedUrl, OwnerId, ReadStorage, ServiceStats, ShortCode, Storage,
};
use std::path::{Path, PathBuf};

/// File-journaled storage.
///
/// Serves from an [`InMemoryStorage`] whose journal is mandatory: `init`
/// fails if the file cannot be opened or parsed, and every mutation fails if
/// the journal cannot be rewritten.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    inner: InMemoryStorage,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            inner: InMemoryStorage::with_journal(Journal::new(&path, JournalMode::Required)),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReadStorage for FileStorage {
    async fn get_url(&self, code: &ShortCode) -> Result<String> {
        self.inner.get_url(code).await
    }

    async fn short_code_for(&self, original_url: &str) -> Result<ShortCode> {
        self.inner.short_code_for(original_url).await
    }

    async fn list_urls_for_owner(&self, owner: &OwnerId) -> Result<Vec<OwnedUrl>> {
        self.inner.list_urls_for_owner(owner).await
    }

    async fn stats(&self) -> Result<ServiceStats> {
        self.inner.stats().await
    }

    async fn health_check(&self) -> Result<()> {
        self.inner.health_check().await
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn init(&self) -> Result<()> {
        self.inner.init().await
    }

    async fn save_url(&self, original_url: &str, code: &ShortCode, owner: &OwnerId) -> Result<()> {
        self.inner.save_url(original_url, code, owner).await
    }

    async fn bulk_save_urls(&self, records: &[NewUrl], owner: &OwnerId) -> Result<()> {
        self.inner.bulk_save_urls(records, owner).await
    }

    async fn soft_delete(&self, requests: &[DeletionRequest]) -> Result<()> {
        self.inner.soft_delete(requests).await
    }
}
