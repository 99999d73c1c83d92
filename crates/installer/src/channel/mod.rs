//! Channel resolution
//!
//! Maps a user-selected [`Channel`] to a concrete archive URL:
//!
//! - `LatestNightly` is a fixed continuous-build URL. It is deterministic,
//!   but the artifact may not exist yet, so it is checked before use.
//! - `LatestRelease` walks the project's releases listing and takes the
//!   first asset whose name contains the configured build target.

pub mod github;

use reqwest::Client;
use std::str::FromStr;
use tracing::{debug, info};

use crate::config::InstallerConfig;
use crate::error::{InstallError, Result};

pub use github::{GithubAsset, GithubRelease};

/// Named update track chosen once per run by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Channel {
    #[default]
    LatestRelease,
    LatestNightly,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::LatestRelease => write!(f, "Latest Release"),
            Channel::LatestNightly => write!(f, "Latest Nightly"),
        }
    }
}

impl FromStr for Channel {
    type Err = InstallError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace([' ', '_'], "-").as_str() {
            "release" | "latest-release" | "stable" => Ok(Channel::LatestRelease),
            "nightly" | "latest-nightly" => Ok(Channel::LatestNightly),
            other => Err(InstallError::configuration(
                "channel",
                format!("unknown channel '{}' (expected 'release' or 'nightly')", other),
            )),
        }
    }
}

/// A fetchable archive URL, produced per install attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub url: String,
}

impl ResolvedSource {
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self { url: url.into() }
    }

    /// File name to stage the download under, taken from the last URL segment
    pub fn file_name(&self) -> String {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|url| {
                url.path_segments()
                    .and_then(|mut segments| segments.next_back().map(str::to_string))
            })
            .filter(|segment| !segment.is_empty())
            .unwrap_or_else(|| "download".to_string())
    }
}

/// Resolves channels against the configured project
#[derive(Debug, Clone)]
pub struct ChannelResolver {
    client: Client,
    releases_url: String,
    nightly_url: String,
    build_target: String,
}

impl ChannelResolver {
    pub fn new(client: Client, config: &InstallerConfig) -> Self {
        Self {
            client,
            releases_url: config.releases_url(),
            nightly_url: config.nightly_url.clone(),
            build_target: config.build_target.clone(),
        }
    }

    /// Resolve `channel` to a URL that answered with a success status
    pub async fn resolve(&self, channel: Channel) -> Result<ResolvedSource> {
        let source = match channel {
            Channel::LatestNightly => ResolvedSource::new(self.nightly_url.clone()),
            Channel::LatestRelease => self.resolve_latest_release().await?,
        };

        self.verify_reachable(&source.url).await?;
        info!("Resolved {} to {}", channel, source.url);
        Ok(source)
    }

    async fn resolve_latest_release(&self) -> Result<ResolvedSource> {
        let releases = github::list_releases(&self.client, &self.releases_url).await?;

        let (release, asset) = github::find_asset(&releases, |name| name.contains(&self.build_target))
            .ok_or_else(|| InstallError::NoMatchingAsset {
                listing_url: self.releases_url.clone(),
                pattern: self.build_target.clone(),
            })?;

        debug!("Selected asset {} from release {}", asset.name, release.tag_name);
        Ok(ResolvedSource::new(asset.browser_download_url.clone()))
    }

    /// GET and inspect only the status line. The nightly host does not
    /// answer HEAD reliably; the body is dropped unread.
    async fn verify_reachable(&self, url: &str) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| InstallError::unreachable(url, e))?;

        if !response.status().is_success() {
            return Err(InstallError::bad_status(url, response.status()));
        }

        debug!("{} answered {}", url, response.status());
        Ok(())
    }
}
