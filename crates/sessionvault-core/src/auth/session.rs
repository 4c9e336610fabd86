//! The login exchange with the remote server.
//!
//! `SessionAuthenticator` posts form-encoded credentials to
//! `{server}/login`, lifts the session cookie out of the response and folds
//! every result, including transport failures, into a `LoginOutcome`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::credentials::DEFAULT_ROLE;

/// Path appended to the server address for the login exchange
const LOGIN_PATH: &str = "login";

/// Shown when a 2xx response carries no usable message
const FALLBACK_REJECTED_MESSAGE: &str = "Login failed. Please check your credentials and try again.";

const FALLBACK_SUCCESS_MESSAGE: &str = "Login successful";

/// Maximum length for response bodies quoted in log lines
const MAX_LOGGED_BODY_LENGTH: usize = 200;

/// Result of one authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum LoginOutcome {
    Success {
        role: String,
        session_token: Option<String>,
        redirect_to_setup: bool,
        message: String,
    },
    Rejected {
        message: String,
    },
    TransportError {
        detail: String,
    },
}

impl LoginOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LoginOutcome::Success { .. })
    }

    /// Text to show the user for an interactive attempt
    pub fn user_message(&self) -> String {
        match self {
            LoginOutcome::Success { message, .. } | LoginOutcome::Rejected { message } => {
                message.clone()
            }
            LoginOutcome::TransportError { detail } => {
                format!("Unable to reach the server: {}", detail)
            }
        }
    }
}

/// Anything that can run the login exchange.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Must resolve every failure into an outcome variant.
    async fn authenticate(&self, server_address: &str, username: &str, password: &str)
        -> LoginOutcome;
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    user_role: Option<String>,
    #[serde(default)]
    redirect_to_setup: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// HTTP implementation of `Authenticator`.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct SessionAuthenticator {
    client: Client,
}

impl SessionAuthenticator {
    /// Create an authenticator whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// `{server_address}/login`, without doubling a trailing slash
    pub fn login_url(server_address: &str) -> String {
        format!("{}/{}", server_address.trim_end_matches('/'), LOGIN_PATH)
    }

    /// The `name=value` pair of the first `set-cookie` header, attributes dropped
    fn session_token(response: &Response) -> Option<String> {
        let raw = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
        let pair = raw.split(';').next()?.trim();
        if pair.is_empty() {
            None
        } else {
            Some(pair.to_string())
        }
    }

    fn truncate_body(body: &str) -> &str {
        match body.char_indices().nth(MAX_LOGGED_BODY_LENGTH) {
            Some((idx, _)) => &body[..idx],
            None => body,
        }
    }

    fn classify_success(session_token: Option<String>, body: &str) -> LoginOutcome {
        let parsed: LoginResponse = match serde_json::from_str(body) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, body = Self::truncate_body(body), "Undecodable login response");
                return LoginOutcome::Rejected {
                    message: FALLBACK_REJECTED_MESSAGE.to_string(),
                };
            }
        };

        let message = parsed.message.filter(|m| !m.trim().is_empty());
        if !parsed.success {
            return LoginOutcome::Rejected {
                message: message.unwrap_or_else(|| FALLBACK_REJECTED_MESSAGE.to_string()),
            };
        }

        LoginOutcome::Success {
            role: parsed
                .user_role
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            session_token,
            redirect_to_setup: parsed.redirect_to_setup.unwrap_or(false),
            message: message.unwrap_or_else(|| FALLBACK_SUCCESS_MESSAGE.to_string()),
        }
    }

    fn classify_failure(status: StatusCode, body: &str) -> LoginOutcome {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("Login failed (HTTP {})", status.as_u16()));
        LoginOutcome::Rejected { message }
    }
}

#[async_trait]
impl Authenticator for SessionAuthenticator {
    async fn authenticate(
        &self,
        server_address: &str,
        username: &str,
        password: &str,
    ) -> LoginOutcome {
        let url = Self::login_url(server_address);
        debug!(url = %url, username = %username, "Sending login request");

        let response = match self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .form(&[("username", username), ("password", password)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "Login request failed");
                return LoginOutcome::TransportError {
                    detail: e.to_string(),
                };
            }
        };

        let status = response.status();
        let session_token = Self::session_token(&response);

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %url, status = status.as_u16(), error = %e, "Failed to read login response");
                return LoginOutcome::TransportError {
                    detail: e.to_string(),
                };
            }
        };

        let outcome = if status.is_success() {
            Self::classify_success(session_token, &body)
        } else {
            Self::classify_failure(status, &body)
        };
        debug!(status = status.as_u16(), success = outcome.is_success(), "Login response classified");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_url() {
        assert_eq!(
            SessionAuthenticator::login_url("https://fleet.example.org"),
            "https://fleet.example.org/login"
        );
        assert_eq!(
            SessionAuthenticator::login_url("https://fleet.example.org/"),
            "https://fleet.example.org/login"
        );
    }

    #[test]
    fn test_classify_success_defaults() {
        let outcome = SessionAuthenticator::classify_success(None, r#"{"success":true}"#);
        assert_eq!(
            outcome,
            LoginOutcome::Success {
                role: DEFAULT_ROLE.to_string(),
                session_token: None,
                redirect_to_setup: false,
                message: FALLBACK_SUCCESS_MESSAGE.to_string(),
            }
        );
    }

    #[test]
    fn test_classify_success_with_setup_redirect() {
        let outcome = SessionAuthenticator::classify_success(
            Some("sid=1".to_string()),
            r#"{"success":true,"message":"ok","user_role":"Operator","redirect_to_setup":true}"#,
        );
        assert_eq!(
            outcome,
            LoginOutcome::Success {
                role: "Operator".to_string(),
                session_token: Some("sid=1".to_string()),
                redirect_to_setup: true,
                message: "ok".to_string(),
            }
        );
    }

    #[test]
    fn test_classify_rejected_body() {
        let outcome = SessionAuthenticator::classify_success(
            None,
            r#"{"success":false,"message":"bad password"}"#,
        );
        assert_eq!(
            outcome,
            LoginOutcome::Rejected {
                message: "bad password".to_string()
            }
        );
    }

    #[test]
    fn test_classify_undecodable_body() {
        for body in ["", "<html>", r#"{"message":"no flag"}"#] {
            assert_eq!(
                SessionAuthenticator::classify_success(None, body),
                LoginOutcome::Rejected {
                    message: FALLBACK_REJECTED_MESSAGE.to_string()
                },
                "body {:?}",
                body
            );
        }
    }

    #[test]
    fn test_classify_failure_status() {
        assert_eq!(
            SessionAuthenticator::classify_failure(
                StatusCode::UNAUTHORIZED,
                r#"{"message":"account locked"}"#
            ),
            LoginOutcome::Rejected {
                message: "account locked".to_string()
            }
        );
        assert_eq!(
            SessionAuthenticator::classify_failure(StatusCode::BAD_GATEWAY, "upstream down"),
            LoginOutcome::Rejected {
                message: "Login failed (HTTP 502)".to_string()
            }
        );
    }

    #[test]
    fn test_user_message_for_transport_error() {
        let outcome = LoginOutcome::TransportError {
            detail: "connection refused".to_string(),
        };
        assert_eq!(
            outcome.user_message(),
            "Unable to reach the server: connection refused"
        );
    }
}
