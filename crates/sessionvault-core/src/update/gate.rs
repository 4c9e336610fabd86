use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::version::is_newer;

/// Latest published release as reported by the feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseDescriptor {
    pub tag_name: String,
    pub html_url: String,
}

/// Whether to show the upgrade prompt, and what to point it at.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UpdateDecision {
    pub should_prompt: bool,
    /// Tag of the latest release without its `v` prefix; `None` when the check failed
    pub latest_version: Option<String>,
    pub url: Option<String>,
}

impl UpdateDecision {
    fn skipped() -> Self {
        Self::default()
    }
}

/// Compare the running version against the latest release.
///
/// Best effort: a failed fetch is logged and yields `should_prompt = false`.
pub async fn check_for_update<F, Fut>(current_version: &str, fetch_latest: F) -> UpdateDecision
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<ReleaseDescriptor>>,
{
    let release = match fetch_latest().await {
        Ok(release) => release,
        Err(e) => {
            warn!(error = %format!("{:#}", e), "Update check failed");
            return UpdateDecision::skipped();
        }
    };

    let latest_version = release
        .tag_name
        .strip_prefix('v')
        .unwrap_or(&release.tag_name)
        .to_string();
    let should_prompt = is_newer(&release.tag_name, current_version);

    if should_prompt {
        info!(current = %current_version, latest = %latest_version, "Update available");
    } else {
        debug!(current = %current_version, latest = %latest_version, "Already up to date");
    }

    UpdateDecision {
        should_prompt,
        latest_version: Some(latest_version),
        url: Some(release.html_url),
    }
}

/// Wait out the startup delay, then run the check once.
pub async fn check_after_delay<F, Fut>(
    delay: Duration,
    current_version: &str,
    fetch_latest: F,
) -> UpdateDecision
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<ReleaseDescriptor>>,
{
    tokio::time::sleep(delay).await;
    check_for_update(current_version, fetch_latest).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(tag: &str) -> ReleaseDescriptor {
        ReleaseDescriptor {
            tag_name: tag.to_string(),
            html_url: format!("https://example.org/releases/{}", tag),
        }
    }

    #[tokio::test]
    async fn test_newer_minor_prompts() {
        let decision = check_for_update("1.9.0", || async { Ok(release("v1.10.0")) }).await;
        assert_eq!(
            decision,
            UpdateDecision {
                should_prompt: true,
                latest_version: Some("1.10.0".to_string()),
                url: Some("https://example.org/releases/v1.10.0".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_padded_equal_does_not_prompt() {
        let decision = check_for_update("2.0.0", || async { Ok(release("v2.0")) }).await;
        assert!(!decision.should_prompt);
        assert_eq!(decision.latest_version.as_deref(), Some("2.0"));
    }

    #[tokio::test]
    async fn test_older_release_does_not_prompt() {
        let decision = check_for_update("1.0.0", || async { Ok(release("v0.9.9")) }).await;
        assert!(!decision.should_prompt);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_silent() {
        let decision =
            check_for_update("1.0.0", || async { Err(anyhow::anyhow!("dns failure")) }).await;
        assert_eq!(decision, UpdateDecision::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_waits_for_delay() {
        let started = tokio::time::Instant::now();
        let decision = check_after_delay(Duration::from_secs(3), "1.0.0", || async {
            Ok(release("v1.0.1"))
        })
        .await;
        assert!(decision.should_prompt);
        assert!(started.elapsed() >= Duration::from_secs(3));
    }
}
