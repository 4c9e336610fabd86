use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{KeyValueStore, StoreError, StoreWrite};

/// Non-durable store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set_string(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock().remove(key);
        Ok(())
    }

    async fn write_batch(&self, writes: Vec<StoreWrite>) -> Result<(), StoreError> {
        let mut entries = self.lock();
        for write in writes {
            match write {
                StoreWrite::Set(key, value) => {
                    entries.insert(key, value);
                }
                StoreWrite::Remove(key) => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_key_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get_string("username").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStore::new();
        store.set_string("username", "alice").await.unwrap();
        assert_eq!(store.get_string("username").await.unwrap().as_deref(), Some("alice"));

        store.remove("username").await.unwrap();
        assert_eq!(store.get_string("username").await.unwrap(), None);

        // Removing again is fine
        store.remove("username").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_write_batch_applies_in_order() {
        let store = MemoryStore::new();
        store
            .write_batch(vec![
                StoreWrite::set("a", "1"),
                StoreWrite::set("b", "2"),
                StoreWrite::remove("a"),
            ])
            .await
            .unwrap();
        assert_eq!(store.get_string("a").await.unwrap(), None);
        assert_eq!(store.get_string("b").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.len(), 1);
    }
}
