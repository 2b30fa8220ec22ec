use crate::journal::{Journal, JournalMode, Snapshot};
use async_trait::async_trait;
use burrow_core::error::Result;
use burrow_core::{
    DeletionRequest, NewUrl, OwnedUrl, OwnerId, ReadStorage, ServiceStats, ShortCode, Storage,
    StorageError, UrlRecord,
};
use dashmap::DashMap;
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// In-memory implementation of the [`Storage`] trait using DashMap.
///
/// All mutating calls are serialized behind a single mutex, so concurrent
/// writers are strictly ordered. Reads go straight to the sharded map and are
/// never blocked by that mutex.
///
/// Original URLs are not required to be unique here, so [`Storage::save_url`]
/// never returns `Conflict`.
#[derive(Debug)]
pub struct InMemoryStorage {
    entries: DashMap<ShortCode, UrlRecord>,
    write_lock: Mutex<()>,
    journal: Option<Journal>,
}

impl InMemoryStorage {
    /// Creates a new purely in-memory storage.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            write_lock: Mutex::new(()),
            journal: None,
        }
    }

    /// Creates an in-memory storage that mirrors its state to `journal`
    /// after every mutation and reloads it on [`Storage::init`].
    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal: Some(journal),
            ..Self::new()
        }
    }

    /// Shorthand for a best-effort journal at `path`.
    pub fn journaled(path: impl Into<PathBuf>) -> Self {
        Self::with_journal(Journal::new(path, JournalMode::BestEffort))
    }

    pub fn journal(&self) -> Option<&Journal> {
        self.journal.as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn snapshot(&self) -> Snapshot {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Journals `updates` on top of the current state, then applies them to
    /// the map. A strict journal that fails leaves the map untouched.
    /// Callers must hold `write_lock` so snapshots are taken in mutation
    /// order.
    async fn commit(&self, updates: Vec<(ShortCode, UrlRecord)>) -> Result<()> {
        if let Some(journal) = &self.journal {
            let mut next = self.snapshot();
            next.extend(updates.iter().cloned());

            match journal.write(&next).await {
                Ok(()) => {}
                Err(err) if journal.mode() == JournalMode::BestEffort => {
                    warn!(path = %journal.path().display(), error = %err, "failed to write journal");
                }
                Err(err) => return Err(err),
            }
        }

        for (code, record) in updates {
            self.entries.insert(code, record);
        }
        Ok(())
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadStorage for InMemoryStorage {
    async fn get_url(&self, code: &ShortCode) -> Result<String> {
        let Some(entry) = self.entries.get(code) else {
            return Err(StorageError::NotFound(code.to_string()));
        };

        if entry.deleted {
            return Err(StorageError::Gone(code.to_string()));
        }

        Ok(entry.original_url.clone())
    }

    async fn short_code_for(&self, original_url: &str) -> Result<ShortCode> {
        self.entries
            .iter()
            .find(|entry| !entry.deleted && entry.original_url == original_url)
            .map(|entry| entry.key().clone())
            .ok_or_else(|| StorageError::NotFound(original_url.to_string()))
    }

    async fn list_urls_for_owner(&self, owner: &OwnerId) -> Result<Vec<OwnedUrl>> {
        let mut owned: Vec<_> = self
            .entries
            .iter()
            .filter(|entry| &entry.owner_id == owner)
            .map(|entry| (entry.created_at, entry.key().clone(), entry.original_url.clone()))
            .collect();
        owned.sort();

        Ok(owned
            .into_iter()
            .map(|(_, short_code, original_url)| OwnedUrl {
                short_code,
                original_url,
            })
            .collect())
    }

    async fn stats(&self) -> Result<ServiceStats> {
        let mut owners = HashSet::new();
        let mut urls = 0u64;
        for entry in self.entries.iter() {
            if !entry.deleted {
                urls += 1;
            }
            owners.insert(entry.owner_id.clone());
        }

        Ok(ServiceStats {
            urls,
            users: owners.len() as u64,
        })
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn init(&self) -> Result<()> {
        let Some(journal) = &self.journal else {
            return Ok(());
        };

        let _guard = self.write_lock.lock().await;
        let snapshot = match journal.load().await {
            Ok(snapshot) => snapshot,
            Err(err) if journal.mode() == JournalMode::BestEffort => {
                warn!(
                    path = %journal.path().display(),
                    error = %err,
                    "ignoring unreadable journal, starting empty"
                );
                Snapshot::new()
            }
            Err(err) => return Err(err),
        };

        self.entries.clear();
        for (code, record) in snapshot {
            self.entries.insert(code, record);
        }
        info!(path = %journal.path().display(), records = self.entries.len(), "loaded journal");
        Ok(())
    }

    async fn save_url(&self, original_url: &str, code: &ShortCode, owner: &OwnerId) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if self.entries.contains_key(code) {
            return Err(StorageError::CodeCollision(code.to_string()));
        }
        self.commit(vec![(code.clone(), UrlRecord::new(original_url, owner.clone()))])
            .await
    }

    async fn bulk_save_urls(&self, records: &[NewUrl], owner: &OwnerId) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;

        // Validate the whole batch before touching the map.
        let mut seen = HashSet::with_capacity(records.len());
        for record in records {
            if !seen.insert(&record.short_code) || self.entries.contains_key(&record.short_code) {
                return Err(StorageError::CodeCollision(record.short_code.to_string()));
            }
        }

        let updates = records
            .iter()
            .map(|record| {
                (
                    record.short_code.clone(),
                    UrlRecord::new(record.original_url.clone(), owner.clone()),
                )
            })
            .collect();

        self.commit(updates).await
    }

    async fn soft_delete(&self, requests: &[DeletionRequest]) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut updates: Vec<(ShortCode, UrlRecord)> = Vec::new();
        for request in requests {
            for code in &request.short_codes {
                if updates.iter().any(|(marked, _)| marked == code) {
                    continue;
                }
                let Some(entry) = self.entries.get(code) else {
                    continue;
                };
                if entry.owner_id == request.owner_id && !entry.deleted {
                    let mut record = entry.value().clone();
                    record.deleted = true;
                    updates.push((code.clone(), record));
                }
            }
        }

        let marked = updates.len();
        if marked == 0 {
            debug!(requests = requests.len(), "soft delete matched nothing");
            return Ok(());
        }
        self.commit(updates).await?;
        debug!(requests = requests.len(), marked, "soft delete applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn owner(s: &str) -> OwnerId {
        OwnerId::new(s).unwrap()
    }

    #[tokio::test]
    async fn save_and_get() {
        let storage = InMemoryStorage::new();

        storage
            .save_url("http://example.com/a", &code("Ab3dE9"), &owner("u1"))
            .await
            .unwrap();

        let url = storage.get_url(&code("Ab3dE9")).await.unwrap();
        assert_eq!(url, "http://example.com/a");
    }

    #[tokio::test]
    async fn get_nonexistent() {
        let storage = InMemoryStorage::new();

        let err = storage.get_url(&code("nope")).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_original_url_is_not_a_conflict() {
        let storage = InMemoryStorage::new();

        storage
            .save_url("https://example.com", &code("aaaaaa"), &owner("u1"))
            .await
            .unwrap();
        storage
            .save_url("https://example.com", &code("bbbbbb"), &owner("u2"))
            .await
            .unwrap();

        assert_eq!(storage.len(), 2);
    }

    #[tokio::test]
    async fn taken_code_is_rejected() {
        let storage = InMemoryStorage::new();

        storage
            .save_url("https://one.example", &code("abc123"), &owner("u1"))
            .await
            .unwrap();

        let err = storage
            .save_url("https://two.example", &code("abc123"), &owner("u1"))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::CodeCollision(_)));
        assert_eq!(
            storage.get_url(&code("abc123")).await.unwrap(),
            "https://one.example"
        );
    }

    #[tokio::test]
    async fn short_code_for_scans_values() {
        let storage = InMemoryStorage::new();

        storage
            .save_url("https://example.com", &code("abc123"), &owner("u1"))
            .await
            .unwrap();

        assert_eq!(
            storage.short_code_for("https://example.com").await.unwrap(),
            code("abc123")
        );
        assert!(matches!(
            storage.short_code_for("https://missing.example").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn soft_delete_marks_gone() {
        let storage = InMemoryStorage::new();

        storage
            .save_url("http://example.com/a", &code("Ab3dE9"), &owner("u1"))
            .await
            .unwrap();
        assert_eq!(
            storage.get_url(&code("Ab3dE9")).await.unwrap(),
            "http://example.com/a"
        );

        storage
            .soft_delete(&[DeletionRequest::new(owner("u1"), vec![code("Ab3dE9")])])
            .await
            .unwrap();

        let err = storage.get_url(&code("Ab3dE9")).await.unwrap_err();
        assert!(matches!(err, StorageError::Gone(_)));
    }

    #[tokio::test]
    async fn soft_delete_skips_codes_of_other_owners() {
        let storage = InMemoryStorage::new();

        storage
            .save_url("https://example.com", &code("abc123"), &owner("u1"))
            .await
            .unwrap();

        storage
            .soft_delete(&[DeletionRequest::new(owner("intruder"), vec![code("abc123")])])
            .await
            .unwrap();

        assert_eq!(
            storage.get_url(&code("abc123")).await.unwrap(),
            "https://example.com"
        );
    }

    #[tokio::test]
    async fn soft_delete_ignores_unknown_codes() {
        let storage = InMemoryStorage::new();

        storage
            .soft_delete(&[DeletionRequest::new(owner("u1"), vec![code("nope")])])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn bulk_save_stores_every_record() {
        let storage = InMemoryStorage::new();
        let records = vec![
            NewUrl {
                short_code: code("first1"),
                original_url: "https://one.example".to_string(),
            },
            NewUrl {
                short_code: code("second"),
                original_url: "https://two.example".to_string(),
            },
        ];

        storage.bulk_save_urls(&records, &owner("u1")).await.unwrap();

        assert_eq!(
            storage.get_url(&code("first1")).await.unwrap(),
            "https://one.example"
        );
        assert_eq!(
            storage.get_url(&code("second")).await.unwrap(),
            "https://two.example"
        );
    }

    #[tokio::test]
    async fn bulk_save_is_all_or_nothing() {
        let storage = InMemoryStorage::new();
        storage
            .save_url("https://taken.example", &code("taken1"), &owner("u1"))
            .await
            .unwrap();

        let records = vec![
            NewUrl {
                short_code: code("fresh1"),
                original_url: "https://fresh.example".to_string(),
            },
            NewUrl {
                short_code: code("taken1"),
                original_url: "https://other.example".to_string(),
            },
        ];

        let err = storage.bulk_save_urls(&records, &owner("u1")).await.unwrap_err();
        assert!(matches!(err, StorageError::CodeCollision(_)));
        assert!(matches!(
            storage.get_url(&code("fresh1")).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_urls_for_owner_filters_by_owner() {
        let storage = InMemoryStorage::new();

        storage
            .save_url("https://one.example", &code("one111"), &owner("u1"))
            .await
            .unwrap();
        storage
            .save_url("https://two.example", &code("two222"), &owner("u2"))
            .await
            .unwrap();

        let listed = storage.list_urls_for_owner(&owner("u1")).await.unwrap();
        assert_eq!(
            listed,
            vec![OwnedUrl {
                short_code: code("one111"),
                original_url: "https://one.example".to_string(),
            }]
        );

        assert!(storage
            .list_urls_for_owner(&owner("nobody"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn stats_count_active_urls_and_owners() {
        let storage = InMemoryStorage::new();

        storage
            .save_url("https://one.example", &code("one111"), &owner("u1"))
            .await
            .unwrap();
        storage
            .save_url("https://two.example", &code("two222"), &owner("u1"))
            .await
            .unwrap();
        storage
            .save_url("https://three.example", &code("three3"), &owner("u2"))
            .await
            .unwrap();
        storage
            .soft_delete(&[DeletionRequest::new(owner("u1"), vec![code("one111")])])
            .await
            .unwrap();

        let stats = storage.stats().await.unwrap();
        assert_eq!(stats, ServiceStats { urls: 2, users: 2 });
    }

    #[tokio::test]
    async fn journal_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.json");

        let storage = InMemoryStorage::journaled(&path);
        storage.init().await.unwrap();
        storage
            .save_url("https://example.com", &code("abc123"), &owner("u1"))
            .await
            .unwrap();
        storage
            .save_url("https://deleted.example", &code("del456"), &owner("u1"))
            .await
            .unwrap();
        storage
            .soft_delete(&[DeletionRequest::new(owner("u1"), vec![code("del456")])])
            .await
            .unwrap();

        let reopened = InMemoryStorage::journaled(&path);
        reopened.init().await.unwrap();

        assert_eq!(
            reopened.get_url(&code("abc123")).await.unwrap(),
            "https://example.com"
        );
        assert!(matches!(
            reopened.get_url(&code("del456")).await,
            Err(StorageError::Gone(_))
        ));
    }

    #[tokio::test]
    async fn best_effort_journal_tolerates_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.json");
        std::fs::write(&path, "garbage").unwrap();

        let storage = InMemoryStorage::journaled(&path);
        storage.init().await.unwrap();

        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = InMemoryStorage::journaled(dir.path().join("urls.json"));

        storage.init().await.unwrap();
        storage
            .save_url("https://example.com", &code("abc123"), &owner("u1"))
            .await
            .unwrap();
        storage.init().await.unwrap();

        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_writers() {
        let storage = Arc::new(InMemoryStorage::new());
        let mut handles = vec![];

        for i in 0..10u64 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                let c = ShortCode::new_unchecked(format!("code-{:03}", i));
                storage
                    .save_url(&format!("https://example{}.com", i), &c, &owner("u1"))
                    .await
                    .unwrap();
            }));
        }

        for i in 0..10u64 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                let c = ShortCode::new_unchecked(format!("code-{:03}", i));
                let _ = storage.get_url(&c).await;
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        for i in 0..10u64 {
            let c = ShortCode::new_unchecked(format!("code-{:03}", i));
            assert_eq!(
                storage.get_url(&c).await.unwrap(),
                format!("https://example{}.com", i)
            );
        }
    }
}
