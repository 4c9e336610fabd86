//! Persistent key/value storage for identity data.
//!
//! This module provides:
//! - `KeyValueStore`: the async string store the credential vault writes through
//! - `MemoryStore`: in-process map, handy for tests and embedding
//! - `JsonFileStore`: a single JSON document on disk
//! - `KeyringStore`: one OS keychain entry per key
//! - `EncryptedStore`: encrypts values at rest on top of any other store

pub mod encrypted;
pub mod error;
pub mod file;
pub mod keychain;
pub mod memory;

use async_trait::async_trait;

pub use encrypted::EncryptedStore;
pub use error::StoreError;
pub use file::JsonFileStore;
pub use keychain::KeyringStore;
pub use memory::MemoryStore;

/// A single mutation applied as part of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    Set(String, String),
    Remove(String),
}

impl StoreWrite {
    pub fn set(key: &str, value: impl Into<String>) -> Self {
        StoreWrite::Set(key.to_string(), value.into())
    }

    pub fn remove(key: &str) -> Self {
        StoreWrite::Remove(key.to_string())
    }
}

/// Durable string storage that survives process restarts.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key is not stored.
    async fn get_string(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set_string(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Apply several writes as one logical operation.
    ///
    /// The default applies them in order and stops at the first failure.
    /// Adapters that can commit atomically override this.
    async fn write_batch(&self, writes: Vec<StoreWrite>) -> Result<(), StoreError> {
        for write in writes {
            match write {
                StoreWrite::Set(key, value) => self.set_string(&key, &value).await?,
                StoreWrite::Remove(key) => self.remove(&key).await?,
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    async fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get_string(key).await
    }

    async fn set_string(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set_string(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key).await
    }

    async fn write_batch(&self, writes: Vec<StoreWrite>) -> Result<(), StoreError> {
        (**self).write_batch(writes).await
    }
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    async fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get_string(key).await
    }

    async fn set_string(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set_string(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key).await
    }

    async fn write_batch(&self, writes: Vec<StoreWrite>) -> Result<(), StoreError> {
        (**self).write_batch(writes).await
    }
}
