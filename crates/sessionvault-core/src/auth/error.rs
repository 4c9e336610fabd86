use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Credential record is incomplete: {0} is missing")]
    Incomplete(&'static str),
}

/// Input rejected before any network call was made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Server address is required")]
    MissingServerAddress,

    #[error("Username is required")]
    MissingUsername,

    #[error("Password is required")]
    MissingPassword,
}

impl ValidationError {
    /// Check the login form fields in display order.
    pub fn check(server_address: &str, username: &str, password: &str) -> Result<(), Self> {
        if server_address.trim().is_empty() {
            Err(ValidationError::MissingServerAddress)
        } else if username.trim().is_empty() {
            Err(ValidationError::MissingUsername)
        } else if password.is_empty() {
            Err(ValidationError::MissingPassword)
        } else {
            Ok(())
        }
    }
}
