//! SessionVault core - saved credentials, startup auto-login and update checks.
//!
//! The pieces are built once at startup and handed to the front end:
//!
//! - `store`: durable key/value adapters (file, keychain, encrypted)
//! - `auth`: credential vault, login exchange, auto-login controller
//! - `update`: release feed and version comparison gate
//! - `config`: on-disk settings

pub mod auth;
pub mod config;
pub mod store;
pub mod update;

pub use auth::{
    Authenticator, AutoLoginResult, CredentialRecord, CredentialVault, Destination, LoginOutcome,
    LoginReport, SessionAuthenticator, SessionController,
};
pub use config::Config;
pub use store::{KeyValueStore, StoreError};
pub use update::{check_after_delay, check_for_update, ReleaseFeed, UpdateDecision};
