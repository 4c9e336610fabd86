//! Startup auto-login and interactive login.
//!
//! `SessionController` ties the credential vault to an authenticator. It is
//! built once at startup and handed to the front end by reference; the
//! front end only reacts to the returned destinations.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::credentials::{CredentialRecord, CredentialVault};
use super::session::{Authenticator, LoginOutcome};
use super::{ValidationError, VaultError};
use crate::store::{KeyValueStore, StoreError};

/// Shown when an interactive login arrives while another attempt is pending
const LOGIN_PENDING_MESSAGE: &str = "A login is already in progress. Please wait.";

/// Where the front end should go next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Destination {
    /// Interactive login surface
    Login,
    /// Normal authenticated landing surface
    Landing,
    /// Authenticated, but the server asked for setup first
    Setup,
}

impl Destination {
    fn after_success(redirect_to_setup: bool) -> Self {
        if redirect_to_setup {
            Destination::Setup
        } else {
            Destination::Landing
        }
    }
}

/// How an auto-login attempt resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Success,
    Rejected,
    Error,
}

/// Progress of the startup auto-login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoLoginState {
    Idle,
    CheckingStore,
    Authenticating,
    Resolved(Resolution),
    Terminal,
}

/// What the caller of `auto_login` should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoLoginResult {
    /// No complete credential record was stored
    NotAttempted,
    /// Another attempt was already in flight; nothing was done
    Ignored,
    /// Stored credentials were accepted and refreshed
    SignedIn { destination: Destination, role: String },
    /// Stored credentials failed and were purged
    SignedOut,
}

impl AutoLoginResult {
    /// `None` when the call was ignored and the caller should not navigate
    pub fn destination(&self) -> Option<Destination> {
        match self {
            AutoLoginResult::NotAttempted | AutoLoginResult::SignedOut => Some(Destination::Login),
            AutoLoginResult::SignedIn { destination, .. } => Some(*destination),
            AutoLoginResult::Ignored => None,
        }
    }
}

/// Result of a user-driven login. The message is always meant for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LoginReport {
    pub destination: Destination,
    pub message: String,
}

/// Clears the in-flight flag when the attempt finishes, however it finishes.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SessionController<S, A> {
    vault: CredentialVault<S>,
    authenticator: A,
    in_flight: AtomicBool,
    state: watch::Sender<AutoLoginState>,
}

impl<S: KeyValueStore, A: Authenticator> SessionController<S, A> {
    pub fn new(vault: CredentialVault<S>, authenticator: A) -> Self {
        let (state, _) = watch::channel(AutoLoginState::Idle);
        Self {
            vault,
            authenticator,
            in_flight: AtomicBool::new(false),
            state,
        }
    }

    pub fn vault(&self) -> &CredentialVault<S> {
        &self.vault
    }

    pub fn authenticator(&self) -> &A {
        &self.authenticator
    }

    pub fn state(&self) -> AutoLoginState {
        *self.state.borrow()
    }

    /// Watch auto-login progress
    pub fn subscribe(&self) -> watch::Receiver<AutoLoginState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: AutoLoginState) {
        debug!(?state, "Auto-login state");
        self.state.send_replace(state);
    }

    /// Claim the single in-flight slot shared by auto and interactive login
    fn begin(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(&self.in_flight))
    }

    /// Re-authenticate with stored credentials, without user interaction.
    ///
    /// A call made while another is pending returns `Ignored`. Failures are
    /// only logged; the vault is purged and the caller stays on login.
    pub async fn auto_login(&self) -> AutoLoginResult {
        let Some(_in_flight) = self.begin() else {
            debug!("Login already in flight, ignoring auto-login");
            return AutoLoginResult::Ignored;
        };

        self.set_state(AutoLoginState::CheckingStore);
        let record = match self.vault.load().await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("No saved credentials, skipping auto-login");
                self.set_state(AutoLoginState::Terminal);
                return AutoLoginResult::NotAttempted;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read saved credentials, skipping auto-login");
                if matches!(e, VaultError::Store(StoreError::Corrupt(_))) {
                    self.purge().await;
                }
                self.set_state(AutoLoginState::Terminal);
                return AutoLoginResult::NotAttempted;
            }
        };

        self.set_state(AutoLoginState::Authenticating);
        let outcome = self
            .authenticator
            .authenticate(&record.server_address, &record.username, &record.password)
            .await;

        let result = match outcome {
            LoginOutcome::Success {
                role,
                session_token,
                redirect_to_setup,
                ..
            } => {
                self.set_state(AutoLoginState::Resolved(Resolution::Success));
                let refreshed = CredentialRecord {
                    role: role.clone(),
                    ..record
                }
                .with_session_token(session_token);
                self.persist(&refreshed).await;
                info!(username = %refreshed.username, role = %role, "Auto-login succeeded");
                AutoLoginResult::SignedIn {
                    destination: Destination::after_success(redirect_to_setup),
                    role,
                }
            }
            LoginOutcome::Rejected { message } => {
                self.set_state(AutoLoginState::Resolved(Resolution::Rejected));
                warn!(username = %record.username, reason = %message, "Auto-login rejected, clearing saved credentials");
                self.purge().await;
                AutoLoginResult::SignedOut
            }
            LoginOutcome::TransportError { detail } => {
                self.set_state(AutoLoginState::Resolved(Resolution::Error));
                warn!(username = %record.username, error = %detail, "Auto-login failed, clearing saved credentials");
                self.purge().await;
                AutoLoginResult::SignedOut
            }
        };

        self.set_state(AutoLoginState::Terminal);
        result
    }

    /// Log in with credentials typed by the user.
    ///
    /// Missing fields are rejected before any request is sent, and so is a
    /// login made while another attempt is pending. On success the record is
    /// saved; on failure the vault is left as it was.
    pub async fn login_interactive(
        &self,
        server_address: &str,
        username: &str,
        password: &str,
    ) -> LoginReport {
        if let Err(e) = ValidationError::check(server_address, username, password) {
            return LoginReport {
                destination: Destination::Login,
                message: e.to_string(),
            };
        }

        let Some(_in_flight) = self.begin() else {
            debug!("Login already in flight, ignoring interactive login");
            return LoginReport {
                destination: Destination::Login,
                message: LOGIN_PENDING_MESSAGE.to_string(),
            };
        };

        let server_address = server_address.trim().trim_end_matches('/');
        let username = username.trim();
        let outcome = self
            .authenticator
            .authenticate(server_address, username, password)
            .await;
        let message = outcome.user_message();

        match outcome {
            LoginOutcome::Success {
                role,
                session_token,
                redirect_to_setup,
                ..
            } => {
                let record = CredentialRecord::new(server_address, username, password, role)
                    .with_session_token(session_token);
                self.persist(&record).await;
                info!(username = %username, "Login succeeded");
                LoginReport {
                    destination: Destination::after_success(redirect_to_setup),
                    message,
                }
            }
            LoginOutcome::Rejected { .. } | LoginOutcome::TransportError { .. } => {
                warn!(username = %username, reason = %message, "Login failed");
                LoginReport {
                    destination: Destination::Login,
                    message,
                }
            }
        }
    }

    /// Forget the saved identity.
    pub async fn logout(&self) -> Result<(), VaultError> {
        self.vault.clear().await?;
        info!("Logged out");
        Ok(())
    }

    async fn persist(&self, record: &CredentialRecord) {
        if let Err(e) = self.vault.save(record).await {
            warn!(error = %e, "Failed to save credentials");
        }
    }

    async fn purge(&self) {
        if let Err(e) = self.vault.clear().await {
            warn!(error = %e, "Failed to clear saved credentials");
        }
    }
}
