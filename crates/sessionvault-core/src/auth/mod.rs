//! Authentication module for managing saved credentials and sessions.
//!
//! This module provides:
//! - `CredentialVault`: the saved identity bundle and its lifecycle
//! - `SessionAuthenticator`: the form-encoded login exchange
//! - `SessionController`: startup auto-login, interactive login and logout
//!
//! Failed auto-logins purge the vault so stale credentials never linger.

pub mod controller;
pub mod credentials;
pub mod error;
pub mod session;

pub use controller::{
    AutoLoginResult, AutoLoginState, Destination, LoginReport, Resolution, SessionController,
};
pub use credentials::{CredentialRecord, CredentialVault, DEFAULT_ROLE};
pub use error::{ValidationError, VaultError};
pub use session::{Authenticator, LoginOutcome, SessionAuthenticator};
