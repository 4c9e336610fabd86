use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{KeyValueStore, StoreError, StoreWrite};

/// Store file name in the data directory
pub const STORE_FILE: &str = "store.json";

/// All keys live in one JSON object on disk.
///
/// Every write rewrites the whole document through a temp file and a rename,
/// so a batch either lands completely or not at all.
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store at `<dir>/store.json`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(STORE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), keys = entries.len(), "Store file written");
        Ok(())
    }

    fn apply(&self, writes: Vec<StoreWrite>) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        // A corrupt document is replaced rather than blocking every write,
        // including the removals that clear stale credentials.
        let (mut entries, mut changed) = match self.read_all() {
            Ok(entries) => (entries, false),
            Err(StoreError::Corrupt(e)) => {
                warn!(path = %self.path.display(), error = %e, "Store file is corrupt, starting over");
                (BTreeMap::new(), true)
            }
            Err(e) => return Err(e),
        };
        for write in writes {
            match write {
                StoreWrite::Set(key, value) => {
                    if entries.get(&key) != Some(&value) {
                        entries.insert(key, value);
                        changed = true;
                    }
                }
                StoreWrite::Remove(key) => {
                    changed |= entries.remove(&key).is_some();
                }
            }
        }
        if changed {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_all()?.remove(key))
    }

    async fn set_string(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.apply(vec![StoreWrite::set(key, value)])
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.apply(vec![StoreWrite::remove(key)])
    }

    async fn write_batch(&self, writes: Vec<StoreWrite>) -> Result<(), StoreError> {
        self.apply(writes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        assert_eq!(store.get_string("username").await.unwrap(), None);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = JsonFileStore::in_dir(dir.path());
            store.set_string("serverAddress", "https://example.org").await.unwrap();
            store.set_string("username", "alice").await.unwrap();
        }

        let reopened = JsonFileStore::in_dir(dir.path());
        assert_eq!(
            reopened.get_string("serverAddress").await.unwrap().as_deref(),
            Some("https://example.org")
        );
        assert_eq!(reopened.get_string("username").await.unwrap().as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_batch_removal_of_missing_keys_does_not_create_file() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        store
            .write_batch(vec![StoreWrite::remove("a"), StoreWrite::remove("b")])
            .await
            .unwrap();
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_writes_recover_from_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        std::fs::write(store.path(), r#"{"serverAddress":"https://a","#).unwrap();

        store
            .write_batch(vec![StoreWrite::remove("serverAddress"), StoreWrite::remove("username")])
            .await
            .unwrap();
        assert_eq!(store.get_string("serverAddress").await.unwrap(), None);

        store.set_string("username", "alice").await.unwrap();
        assert_eq!(store.get_string("username").await.unwrap().as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(
            store.get_string("username").await,
            Err(StoreError::Corrupt(_))
        ));
    }
}
