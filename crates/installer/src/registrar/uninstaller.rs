//! Fetches the standalone uninstaller into the install directory

use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::channel::github;
use crate::config::{InstallerConfig, UninstallerSource};
use crate::downloader::{DownloadJob, Downloader};
use crate::error::{FileOperation, InstallError, Result};
use crate::install_dir::move_entry;

#[derive(Debug, Clone)]
pub struct UninstallerFetcher {
    client: Client,
    releases_url: String,
    asset_name: String,
    downloader: Downloader,
}

impl UninstallerFetcher {
    pub fn new(client: Client, config: &InstallerConfig, source: &UninstallerSource) -> Self {
        Self {
            releases_url: source.repo.releases_url(&config.github_api_url),
            asset_name: source.asset_name.clone(),
            downloader: Downloader::new(client.clone(), config),
            client,
        }
    }

    /// `None` when no uninstaller is configured
    pub fn from_config(client: Client, config: &InstallerConfig) -> Option<Self> {
        config
            .uninstaller
            .as_ref()
            .map(|source| Self::new(client, config, source))
    }

    /// Download the newest published uninstaller to `<install_dir>/<asset name>`.
    ///
    /// The file is staged next to its destination and only moved into place
    /// once the transfer verified, so a failed fetch leaves nothing behind.
    pub async fn fetch(&self, install_dir: &Path) -> Result<PathBuf> {
        let releases = github::list_releases(&self.client, &self.releases_url).await?;

        let (release, asset) = github::find_asset(&releases, |name| name == self.asset_name).ok_or_else(|| {
            InstallError::NoMatchingAsset {
                listing_url: self.releases_url.clone(),
                pattern: self.asset_name.clone(),
            }
        })?;
        debug!("Uninstaller from release {}", release.tag_name);

        tokio::fs::create_dir_all(install_dir)
            .await
            .map_err(|e| InstallError::write_failed(install_dir, FileOperation::CreateDir, e))?;
        let staging = tempfile::Builder::new()
            .prefix(".uninstaller-")
            .tempdir_in(install_dir)
            .map_err(|e| InstallError::write_failed(install_dir, FileOperation::CreateDir, e))?;
        let staged = staging.path().join(&self.asset_name);

        let job = self
            .downloader
            .fetch(DownloadJob::new(asset.browser_download_url.clone(), &staged))
            .await?;

        let destination = install_dir.join(&self.asset_name);
        move_entry(&staged, &destination)?;

        info!("Fetched uninstaller ({} bytes) to {}", job.bytes_received, destination.display());
        Ok(destination)
    }
}
