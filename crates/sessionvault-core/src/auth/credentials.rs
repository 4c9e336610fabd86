use std::fmt;

use tracing::debug;

use super::VaultError;
use crate::store::{KeyValueStore, StoreWrite};

/// Role assumed when the server does not send one
pub const DEFAULT_ROLE: &str = "Viewer";

/// Store keys owned by the vault
pub mod keys {
    pub const SERVER_ADDRESS: &str = "serverAddress";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const ROLE: &str = "userRole";
    pub const SESSION_COOKIE: &str = "sessionCookie";

    pub const ALL: [&str; 5] = [SERVER_ADDRESS, USERNAME, PASSWORD, ROLE, SESSION_COOKIE];
}

/// The persisted identity bundle.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub server_address: String,
    pub username: String,
    pub password: String,
    pub role: String,
    /// `Some("")` is treated as no token: `save` removes the token key and
    /// `load` returns `None`. Use `with_session_token` to normalise up front.
    pub session_token: Option<String>,
}

impl CredentialRecord {
    pub fn new(
        server_address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            server_address: server_address.into(),
            username: username.into(),
            password: password.into(),
            role: role.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: Option<String>) -> Self {
        self.session_token = token.filter(|t| !t.is_empty());
        self
    }

    /// First required field that is empty, if any
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            (keys::SERVER_ADDRESS, &self.server_address),
            (keys::USERNAME, &self.username),
            (keys::PASSWORD, &self.password),
            (keys::ROLE, &self.role),
        ]
        .into_iter()
        .find(|(_, value)| value.is_empty())
        .map(|(key, _)| key)
    }

    pub fn is_complete(&self) -> bool {
        self.missing_field().is_none()
    }
}

// Secrets stay out of logs and panic messages.
impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("server_address", &self.server_address)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Owns the identity keys in the underlying store.
pub struct CredentialVault<S> {
    store: S,
}

impl<S: KeyValueStore> CredentialVault<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the saved record. Partial data counts as nothing saved.
    pub async fn load(&self) -> Result<Option<CredentialRecord>, VaultError> {
        let server_address = self.read(keys::SERVER_ADDRESS).await?;
        let username = self.read(keys::USERNAME).await?;
        let password = self.read(keys::PASSWORD).await?;
        let role = self.read(keys::ROLE).await?;
        let session_token = self.read(keys::SESSION_COOKIE).await?;

        match (server_address, username, password, role) {
            (Some(server_address), Some(username), Some(password), Some(role)) => Ok(Some(
                CredentialRecord::new(server_address, username, password, role)
                    .with_session_token(session_token),
            )),
            _ => {
                debug!("No complete credential record stored");
                Ok(None)
            }
        }
    }

    /// Persist every field in one batch. An absent token removes the token key.
    ///
    /// The role key is removed first and written last. A store that applies
    /// the batch entry by entry and fails partway leaves an incomplete record,
    /// which loads as nothing, rather than old fields mixed with new ones.
    pub async fn save(&self, record: &CredentialRecord) -> Result<(), VaultError> {
        if let Some(field) = record.missing_field() {
            return Err(VaultError::Incomplete(field));
        }

        let token = match record.session_token.as_deref() {
            Some(token) if !token.is_empty() => StoreWrite::set(keys::SESSION_COOKIE, token),
            _ => StoreWrite::remove(keys::SESSION_COOKIE),
        };

        self.store
            .write_batch(vec![
                StoreWrite::remove(keys::ROLE),
                token,
                StoreWrite::set(keys::SERVER_ADDRESS, record.server_address.as_str()),
                StoreWrite::set(keys::USERNAME, record.username.as_str()),
                StoreWrite::set(keys::PASSWORD, record.password.as_str()),
                StoreWrite::set(keys::ROLE, record.role.as_str()),
            ])
            .await?;
        debug!(
            username = %record.username,
            has_token = record.session_token.as_deref().is_some_and(|t| !t.is_empty()),
            "Credentials saved"
        );
        Ok(())
    }

    /// Remove every identity key. Safe to call when nothing is stored.
    pub async fn clear(&self) -> Result<(), VaultError> {
        self.store
            .write_batch(keys::ALL.iter().map(|key| StoreWrite::remove(key)).collect())
            .await?;
        debug!("Credentials cleared");
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<String>, VaultError> {
        Ok(self.store.get_string(key).await?.filter(|v| !v.is_empty()))
    }
}
