//! At-rest encryption for any `KeyValueStore`.
//!
//! Values are sealed with ChaCha20-Poly1305 under a key derived from a
//! passphrase with Argon2. The random salt lives in the wrapped store under
//! `SALT_KEY`, so the same passphrase opens the same store after a restart.
//! Each value carries its own nonce: `base64(nonce || ciphertext)`.

use argon2::Argon2;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use tokio::sync::OnceCell;
use tracing::debug;

use super::{KeyValueStore, StoreError, StoreWrite};

/// Key under which the key-derivation salt is kept in the wrapped store
pub const SALT_KEY: &str = "vaultSalt";

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

pub struct EncryptedStore<S> {
    inner: S,
    passphrase: String,
    cipher: OnceCell<ChaCha20Poly1305>,
}

impl<S: KeyValueStore> EncryptedStore<S> {
    pub fn new(inner: S, passphrase: impl Into<String>) -> Self {
        Self {
            inner,
            passphrase: passphrase.into(),
            cipher: OnceCell::new(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn cipher(&self) -> Result<&ChaCha20Poly1305, StoreError> {
        self.cipher
            .get_or_try_init(|| async {
                let salt = self.load_or_create_salt().await?;
                let mut key = [0u8; KEY_LEN];
                Argon2::default()
                    .hash_password_into(self.passphrase.as_bytes(), &salt, &mut key)
                    .map_err(|e| StoreError::Crypto(format!("key derivation failed: {}", e)))?;
                debug!("Store encryption key derived");
                Ok::<_, StoreError>(ChaCha20Poly1305::new(Key::from_slice(&key)))
            })
            .await
    }

    async fn load_or_create_salt(&self) -> Result<Vec<u8>, StoreError> {
        if let Some(encoded) = self.inner.get_string(SALT_KEY).await? {
            return STANDARD
                .decode(encoded)
                .map_err(|e| StoreError::Crypto(format!("invalid salt encoding: {}", e)));
        }
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        self.inner.set_string(SALT_KEY, &STANDARD.encode(salt)).await?;
        Ok(salt.to_vec())
    }

    async fn seal(&self, plaintext: &str) -> Result<String, StoreError> {
        let cipher = self.cipher().await?;
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| StoreError::Crypto("encryption failed".to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(sealed))
    }

    async fn open(&self, sealed: &str) -> Result<String, StoreError> {
        let cipher = self.cipher().await?;
        let bytes = STANDARD
            .decode(sealed)
            .map_err(|e| StoreError::Crypto(format!("invalid value encoding: {}", e)))?;
        if bytes.len() < NONCE_LEN {
            return Err(StoreError::Crypto("sealed value too short".to_string()));
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| StoreError::Crypto("decryption failed (wrong passphrase?)".to_string()))?;
        String::from_utf8(plaintext)
            .map_err(|_| StoreError::Crypto("decrypted value is not UTF-8".to_string()))
    }
}

#[async_trait]
impl<S: KeyValueStore> KeyValueStore for EncryptedStore<S> {
    async fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.inner.get_string(key).await? {
            Some(sealed) => Ok(Some(self.open(&sealed).await?)),
            None => Ok(None),
        }
    }

    async fn set_string(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let sealed = self.seal(value).await?;
        self.inner.set_string(key, &sealed).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key).await
    }

    async fn write_batch(&self, writes: Vec<StoreWrite>) -> Result<(), StoreError> {
        let mut sealed = Vec::with_capacity(writes.len());
        for write in writes {
            sealed.push(match write {
                StoreWrite::Set(key, value) => {
                    let value = self.seal(&value).await?;
                    StoreWrite::Set(key, value)
                }
                remove @ StoreWrite::Remove(_) => remove,
            });
        }
        self.inner.write_batch(sealed).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_values_are_not_stored_in_plaintext() {
        let inner = Arc::new(MemoryStore::new());
        let store = EncryptedStore::new(inner.clone(), "correct horse");

        store.set_string("password", "hunter2").await.unwrap();

        let raw = inner.get_string("password").await.unwrap().unwrap();
        assert_ne!(raw, "hunter2");
        assert!(inner.get_string(SALT_KEY).await.unwrap().is_some());
        assert_eq!(store.get_string("password").await.unwrap().as_deref(), Some("hunter2"));
    }

    #[tokio::test]
    async fn test_same_passphrase_reopens_store() {
        let inner = Arc::new(MemoryStore::new());
        EncryptedStore::new(inner.clone(), "pass")
            .write_batch(vec![StoreWrite::set("username", "alice"), StoreWrite::remove("sessionCookie")])
            .await
            .unwrap();

        let reopened = EncryptedStore::new(inner.clone(), "pass");
        assert_eq!(reopened.get_string("username").await.unwrap().as_deref(), Some("alice"));
        assert_eq!(reopened.get_string("sessionCookie").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_wrong_passphrase_fails_to_decrypt() {
        let inner = Arc::new(MemoryStore::new());
        EncryptedStore::new(inner.clone(), "right")
            .set_string("username", "alice")
            .await
            .unwrap();

        let wrong = EncryptedStore::new(inner, "wrong");
        assert!(matches!(
            wrong.get_string("username").await,
            Err(StoreError::Crypto(_))
        ));
    }
}
