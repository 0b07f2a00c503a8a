//! Release update checker backed by the GitHub releases API.

use std::cmp::Ordering;
use std::sync::Arc;

use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const GITHUB_API_URL: &str = "https://api.github.com";

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("Invalid update URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Update server returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Failed to decode release: {0}")]
    Decode(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl UpdateError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> &'static str {
        match self {
            UpdateError::InvalidUrl(_) => "The update server address is invalid.",
            UpdateError::Http { status, .. } if *status == 404 => "No published release found.",
            UpdateError::Http { .. } => "Could not check for updates. Please try again later.",
            UpdateError::Decode(_) => "The update server sent an unexpected response.",
            UpdateError::Network(_) => "Network error. Check your connection.",
        }
    }
}

/// Latest release as returned by `GET /repos/{owner}/{repo}/releases/latest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

/// A newer release than the running one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    pub version: String,
    pub release_notes: String,
    pub download_url: String,
}

impl UpdateInfo {
    fn from_release(release: GitHubRelease, version: String) -> Self {
        let download_url = release
            .assets
            .iter()
            .find(|a| a.name.ends_with(".dmg"))
            .map(|a| a.browser_download_url.clone())
            .unwrap_or(release.html_url);
        Self {
            version,
            release_notes: release.body.unwrap_or_default(),
            download_url,
        }
    }
}

/// Checks a GitHub repository for a release newer than the running version.
#[derive(Debug, Clone)]
pub struct UpdateChecker {
    base_url: Url,
    client: Arc<Client>,
    repository: String,
    current_version: String,
}

impl UpdateChecker {
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        repository: impl Into<String>,
        current_version: impl Into<String>,
    ) -> Result<Self, UpdateError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self {
            base_url: Url::parse(base_url)?,
            client: Arc::new(client),
            repository: repository.into(),
            current_version: current_version.into(),
        })
    }

    /// Fetch the latest release.
    ///
    /// # Errors
    /// Returns an error on network failure, a non-success status, or an undecodable body.
    pub async fn latest_release(&self) -> Result<GitHubRelease, UpdateError> {
        let url = self
            .base_url
            .join(&format!("repos/{}/releases/latest", self.repository))?;
        tracing::debug!("Checking for updates at {}", url);

        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header(header::USER_AGENT, "reportbuddy")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UpdateError::Http {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| UpdateError::Decode(e.to_string()))
    }

    /// Return the latest release when it is newer than the running version.
    ///
    /// # Errors
    /// Propagates [`UpdateChecker::latest_release`] failures.
    pub async fn check_for_updates(&self) -> Result<Option<UpdateInfo>, UpdateError> {
        let release = self.latest_release().await?;
        let latest = release.tag_name.replace('v', "");

        if compare_versions(&latest, &self.current_version) == Ordering::Greater {
            tracing::info!("Update available: {} -> {}", self.current_version, latest);
            Ok(Some(UpdateInfo::from_release(release, latest)))
        } else {
            tracing::debug!("Running version {} is up to date", self.current_version);
            Ok(None)
        }
    }
}

/// Compare dot-separated numeric versions. Missing components count as 0 and
/// non-numeric components are ignored.
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> { v.split('.').filter_map(|c| c.parse().ok()).collect() };
    let left = parse(left);
    let right = parse(right);

    let len = left.len().max(right.len());
    (0..len)
        .map(|i| {
            let l = left.get(i).copied().unwrap_or(0);
            let r = right.get(i).copied().unwrap_or(0);
            l.cmp(&r)
        })
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}
