//! Configuration types for the install pipeline

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{InstallError, Result};

/// Prefix for environment overrides read by [`InstallerConfig::from_env`]
pub const ENV_PREFIX: &str = "LEMONADE_";

/// A GitHub `owner/repo` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubRepo {
    pub owner: String,
    pub repo: String,
}

impl GithubRepo {
    pub fn new<S: Into<String>>(owner: S, repo: S) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Releases listing endpoint for this repository
    pub fn releases_url(&self, api_base: &str) -> String {
        format!(
            "{}/repos/{}/{}/releases",
            api_base.trim_end_matches('/'),
            self.owner,
            self.repo
        )
    }
}

impl FromStr for GithubRepo {
    type Err = InstallError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
                Ok(Self::new(owner, repo))
            }
            _ => Err(InstallError::configuration(
                "project",
                format!("'{}' is not of the form owner/repo", s),
            )),
        }
    }
}

impl std::fmt::Display for GithubRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Where the standalone uninstaller is published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallerSource {
    pub repo: GithubRepo,
    /// Exact asset name to look for in the release listing
    pub asset_name: String,
}

/// Configuration for install pipeline runs
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Base URL of the GitHub REST API
    pub github_api_url: String,
    /// Project whose releases are installed
    pub project: GithubRepo,
    /// Platform/build identifier, used to pick release assets and to
    /// recognise a wrapped build folder inside the archive
    pub build_target: String,
    /// Continuous-build artifact for the nightly channel
    pub nightly_url: String,
    /// Extension that marks an entry as an archive
    pub archive_extension: String,
    /// Installation directory owned by the pipeline
    pub install_dir: PathBuf,
    /// Where the downloaded archive is staged; system temp when `None`
    pub temp_dir: Option<PathBuf>,
    /// Main executable, relative to `install_dir`
    pub executable_name: String,
    pub uninstaller: Option<UninstallerSource>,
    /// Bytes written (and reported) per progress step
    pub chunk_size: usize,
    /// Capacity of the download progress channel
    pub progress_buffer: usize,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        let install_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Lemonade");

        Self {
            github_api_url: "https://api.github.com".to_string(),
            project: GithubRepo::new("Lemonade-emu", "Lemonade"),
            build_target: "windows-msvc".to_string(),
            nightly_url: "https://nightly.link/Lemonade-emu/Lemonade/workflows/build/master/windows-msvc.zip"
                .to_string(),
            archive_extension: ".zip".to_string(),
            install_dir,
            temp_dir: None,
            executable_name: "lemonade-qt.exe".to_string(),
            uninstaller: Some(UninstallerSource {
                repo: GithubRepo::new("Lemonade-emu", "Lemonade-installer"),
                asset_name: "uninstaller.exe".to_string(),
            }),
            chunk_size: 8192,
            progress_buffer: 16,
            timeout: Duration::from_secs(600), // whole transfer, archives can be large
            connect_timeout: Duration::from_secs(30),
            user_agent: concat!("lemonade-installer/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl InstallerConfig {
    pub fn builder() -> InstallerConfigBuilder {
        InstallerConfigBuilder::new()
    }

    /// Defaults with `LEMONADE_*` environment overrides applied
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key/value lookup.
    ///
    /// Recognised keys (all prefixed with `LEMONADE_`): `INSTALL_DIR`,
    /// `TEMP_DIR`, `PROJECT`, `BUILD_TARGET`, `NIGHTLY_URL`,
    /// `GITHUB_API_URL`, `USER_AGENT`, `TIMEOUT_SECS`, `CHUNK_SIZE`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(dir) = get("INSTALL_DIR") {
            self.install_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("TEMP_DIR") {
            self.temp_dir = Some(PathBuf::from(dir));
        }
        if let Some(project) = get("PROJECT") {
            self.project = project.parse()?;
        }
        if let Some(target) = get("BUILD_TARGET") {
            self.build_target = target;
        }
        if let Some(url) = get("NIGHTLY_URL") {
            self.nightly_url = url;
        }
        if let Some(url) = get("GITHUB_API_URL") {
            self.github_api_url = url;
        }
        if let Some(agent) = get("USER_AGENT") {
            self.user_agent = agent;
        }
        if let Some(secs) = get("TIMEOUT_SECS") {
            let secs = secs.parse::<u64>().map_err(|e| {
                InstallError::configuration("timeout", format!("'{}' is not a number of seconds: {}", secs, e))
            })?;
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(size) = get("CHUNK_SIZE") {
            self.chunk_size = size.parse::<usize>().map_err(|e| {
                InstallError::configuration("chunk_size", format!("'{}' is not a byte count: {}", size, e))
            })?;
        }

        Ok(self)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.github_api_url).map_err(|e| {
            InstallError::configuration("github_api_url", format!("'{}': {}", self.github_api_url, e))
        })?;
        url::Url::parse(&self.nightly_url).map_err(|e| {
            InstallError::configuration("nightly_url", format!("'{}': {}", self.nightly_url, e))
        })?;

        if self.chunk_size == 0 {
            return Err(InstallError::configuration("chunk_size", "must be greater than zero"));
        }
        if self.progress_buffer == 0 {
            return Err(InstallError::configuration("progress_buffer", "must be greater than zero"));
        }
        if self.build_target.trim().is_empty() {
            return Err(InstallError::configuration("build_target", "must not be empty"));
        }
        if !self.archive_extension.starts_with('.') {
            return Err(InstallError::configuration(
                "archive_extension",
                format!("'{}' must start with a dot", self.archive_extension),
            ));
        }
        if self.install_dir.as_os_str().is_empty() {
            return Err(InstallError::configuration("install_dir", "must not be empty"));
        }

        Ok(())
    }

    /// Releases listing endpoint of the installed project
    pub fn releases_url(&self) -> String {
        self.project.releases_url(&self.github_api_url)
    }

    /// Where the main executable lands after a successful install
    pub fn executable_path(&self) -> PathBuf {
        self.install_dir.join(&self.executable_name)
    }

    /// Directory the downloaded archive is staged under
    pub fn staging_root(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Fluent builder for [`InstallerConfig`]
#[derive(Debug, Clone, Default)]
pub struct InstallerConfigBuilder {
    config: InstallerConfig,
}

impl InstallerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn github_api_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.github_api_url = url.into();
        self
    }

    pub fn project(mut self, project: GithubRepo) -> Self {
        self.config.project = project;
        self
    }

    pub fn build_target<S: Into<String>>(mut self, target: S) -> Self {
        self.config.build_target = target.into();
        self
    }

    pub fn nightly_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.nightly_url = url.into();
        self
    }

    pub fn install_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.config.install_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn temp_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.config.temp_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn executable_name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.executable_name = name.into();
        self
    }

    pub fn uninstaller(mut self, source: Option<UninstallerSource>) -> Self {
        self.config.uninstaller = source;
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn progress_buffer(mut self, capacity: usize) -> Self {
        self.config.progress_buffer = capacity;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, agent: S) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    pub fn build(self) -> InstallerConfig {
        self.config
    }
}
