//! GitHub release listing

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{InstallError, Result};

/// GitHub release metadata from the API
#[derive(Deserialize, Debug, Clone)]
pub struct GithubRelease {
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<GithubAsset>,
}

/// GitHub release asset metadata
#[derive(Deserialize, Debug, Clone)]
pub struct GithubAsset {
    pub name: String,
    pub browser_download_url: String,
}

/// Fetch the releases listing, in the order the endpoint returns it.
///
/// GitHub currently lists newest first. Nothing here relies on that beyond
/// "first match wins" in [`find_asset`].
pub async fn list_releases(client: &Client, listing_url: &str) -> Result<Vec<GithubRelease>> {
    debug!("Fetching release listing: {}", listing_url);

    let response = client
        .get(listing_url)
        .header(reqwest::header::ACCEPT, "application/vnd.github+json")
        .send()
        .await
        .map_err(|e| InstallError::unreachable(listing_url, e))?;

    if !response.status().is_success() {
        return Err(InstallError::bad_status(listing_url, response.status()));
    }

    let releases: Vec<GithubRelease> = response
        .json()
        .await
        .map_err(|e| InstallError::unreachable(listing_url, e))?;

    debug!("Listing returned {} releases", releases.len());
    Ok(releases)
}

/// First asset, across releases in listing order, whose name satisfies `matches`
pub fn find_asset<'a, F>(releases: &'a [GithubRelease], matches: F) -> Option<(&'a GithubRelease, &'a GithubAsset)>
where
    F: Fn(&str) -> bool,
{
    releases.iter().find_map(|release| {
        release
            .assets
            .iter()
            .find(|asset| matches(&asset.name))
            .map(|asset| (release, asset))
    })
}
