use burrow_core::error::Result;
use burrow_core::{ShortCode, StorageError, UrlRecord};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Serialized state of a journaled store: short code to record.
pub type Snapshot = BTreeMap<ShortCode, UrlRecord>;

/// How a journal failure affects the store that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalMode {
    /// Load and write failures are logged and the store keeps serving from
    /// memory.
    BestEffort,
    /// Load and write failures are returned to the caller.
    Required,
}

/// Whole-state JSON journal.
///
/// Every write replaces the file with the full snapshot. The snapshot is
/// first written to a sibling `.tmp` file and then renamed over the target,
/// so a crash mid-write leaves the previous state in place.
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
    mode: JournalMode,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>, mode: JournalMode) -> Self {
        Self {
            path: path.into(),
            mode,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> JournalMode {
        self.mode
    }

    /// Reads the journal.
    ///
    /// A missing file yields an empty snapshot in `BestEffort` mode. In
    /// `Required` mode the file is created if absent, so an unwritable
    /// location fails here rather than on the first mutation.
    pub async fn load(&self) -> Result<Snapshot> {
        let contents = match self.mode {
            JournalMode::Required => {
                fs::OpenOptions::new()
                    .read(true)
                    .append(true)
                    .create(true)
                    .open(&self.path)
                    .await
                    .map_err(|e| io_error(&self.path, e))?;
                fs::read_to_string(&self.path)
                    .await
                    .map_err(|e| io_error(&self.path, e))?
            }
            JournalMode::BestEffort => match fs::read_to_string(&self.path).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Snapshot::new()),
                Err(e) => return Err(io_error(&self.path, e)),
            },
        };

        if contents.trim().is_empty() {
            return Ok(Snapshot::new());
        }

        serde_json::from_str(&contents).map_err(|e| {
            StorageError::InvalidData(format!(
                "journal '{}' is malformed: {e}",
                self.path.display()
            ))
        })
    }

    /// Replaces the journal contents with `snapshot`.
    pub async fn write(&self, snapshot: &Snapshot) -> Result<()> {
        let bytes = serde_json::to_vec(snapshot).map_err(|e| {
            StorageError::InvalidData(format!("failed to serialize journal: {e}"))
        })?;

        let tmp = self.tmp_path();
        fs::write(&tmp, bytes)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error(&self.path, e))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

fn io_error(path: &Path, err: std::io::Error) -> StorageError {
    StorageError::Io(format!("{}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_core::OwnerId;

    fn snapshot() -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.insert(
            ShortCode::new_unchecked("Ab3dE9"),
            UrlRecord::new("http://example.com/a", OwnerId::new("u1").unwrap()),
        );
        snapshot
    }

    #[tokio::test]
    async fn write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(dir.path().join("urls.json"), JournalMode::Required);

        journal.write(&snapshot()).await.unwrap();

        let loaded = journal.load().await.unwrap();
        assert_eq!(loaded, snapshot());
        assert!(!journal.tmp_path().exists());
    }

    #[tokio::test]
    async fn best_effort_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(dir.path().join("missing.json"), JournalMode::BestEffort);

        assert!(journal.load().await.unwrap().is_empty());
        assert!(!journal.path().exists());
    }

    #[tokio::test]
    async fn required_mode_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(dir.path().join("urls.json"), JournalMode::Required);

        assert!(journal.load().await.unwrap().is_empty());
        assert!(journal.path().exists());
    }

    #[tokio::test]
    async fn required_mode_fails_on_unopenable_path() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(
            dir.path().join("no-such-dir").join("urls.json"),
            JournalMode::Required,
        );

        let err = journal.load().await.unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }

    #[tokio::test]
    async fn malformed_contents_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.json");
        std::fs::write(&path, "{not json").unwrap();

        for mode in [JournalMode::Required, JournalMode::BestEffort] {
            let err = Journal::new(&path, mode).load().await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidData(_)));
        }
    }
}
