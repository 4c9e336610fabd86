use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client};
use tracing::debug;

use super::gate::ReleaseDescriptor;

/// Fetches the latest release descriptor from a GitHub-style release endpoint.
#[derive(Clone)]
pub struct ReleaseFeed {
    client: Client,
    url: String,
}

impl ReleaseFeed {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("sessionvault/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch_latest(&self) -> Result<ReleaseDescriptor> {
        debug!(url = %self.url, "Fetching latest release");
        let response = self
            .client
            .get(&self.url)
            .header(header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .with_context(|| format!("Failed to fetch release info from {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Release feed returned HTTP {}", status.as_u16());
        }

        response
            .json()
            .await
            .context("Failed to parse release descriptor")
    }
}
