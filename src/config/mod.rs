//! Updater configuration.
//!
//! Everything the pipeline needs to know about the installed application lives
//! in one [`UpdaterConfig`] value. It is loaded once at startup (TOML file +
//! command-line overrides), resolved, and then only ever read.
//!
//! # Location
//!
//! 1. `--config <path>` (or the `APPUP_CONFIG` environment variable)
//! 2. `<config dir>/appup/config.toml` (`~/.config/appup/config.toml` on Linux)
//!
//! A missing file is not an error: every field has a default.
//!
//! # Example
//!
//! ```toml
//! repository = "acme/widget-studio"
//! app_name = "WidgetStudio"
//! install_dir = "~/Applications/WidgetStudio"
//! target_name = "widget-studio.exe"
//! asset_pattern = '(?i)-win64\.exe$'
//! backup_policy = "abort"
//! ```
//!
//! Relative `version_file` and `backup_dir` are resolved against `install_dir`.
//! `~` and `$VAR` are expanded in every path.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::core::UpdateError;
use crate::utils::fs::with_suffix;

/// Default release API host.
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Default asset pattern: Windows executables.
pub const DEFAULT_ASSET_PATTERN: &str = r"(?i)\.exe$";

/// What to do when the installed artifact cannot be backed up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupPolicy {
    /// Stop the update; nothing is changed.
    #[default]
    Abort,
    /// Install anyway, without a rollback copy.
    ///
    /// The installed artifact is removed before the new one is moved in. If
    /// that move then fails, there is no copy to restore and the target is left
    /// missing until the next successful update.
    Proceed,
}

/// Immutable settings for one updater run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Release feed repository as `owner/repo`.
    pub repository: String,
    /// Base URL of the release API.
    pub api_base_url: String,
    /// Application name, used in the user agent and the version record header.
    pub app_name: String,
    /// Directory holding the installed artifact.
    pub install_dir: PathBuf,
    /// File name of the installed artifact inside `install_dir`.
    pub target_name: String,
    /// Version record; relative paths are inside `install_dir`.
    pub version_file: PathBuf,
    /// Backup directory; relative paths are inside `install_dir`.
    pub backup_dir: PathBuf,
    /// Regex matched against release asset names; first match is installed.
    pub asset_pattern: String,
    /// Behaviour when the backup fails.
    pub backup_policy: BackupPolicy,
    /// Verify the download against a published SHA-256 digest when one exists.
    pub verify_checksum: bool,
    /// Optional API token sent as a bearer token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            repository: String::new(),
            api_base_url: GITHUB_API_BASE.to_string(),
            app_name: "App".to_string(),
            install_dir: PathBuf::from("."),
            target_name: format!("app{}", std::env::consts::EXE_SUFFIX),
            version_file: PathBuf::from("version.txt"),
            backup_dir: PathBuf::from("backups"),
            asset_pattern: DEFAULT_ASSET_PATTERN.to_string(),
            backup_policy: BackupPolicy::Abort,
            verify_checksum: true,
            token: None,
        }
    }
}

/// Values from the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub repository: Option<String>,
    pub install_dir: Option<PathBuf>,
    pub asset_pattern: Option<String>,
    pub token: Option<String>,
}

impl UpdaterConfig {
    /// Load from `path`, or from [`default_path`](Self::default_path) when `None`.
    ///
    /// A missing default file yields the defaults. A missing file that was
    /// asked for explicitly is an error.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Configuration file {} does not exist", path.display());
                }
                path.to_path_buf()
            }
            None => Self::default_path()?,
        };

        if !path.exists() {
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration from {}", path.display()))
    }

    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine the configuration directory"))?;
        Ok(config_dir.join("appup").join("config.toml"))
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(repository) = overrides.repository {
            self.repository = repository;
        }
        if let Some(install_dir) = overrides.install_dir {
            self.install_dir = install_dir;
        }
        if let Some(asset_pattern) = overrides.asset_pattern {
            self.asset_pattern = asset_pattern;
        }
        if overrides.token.is_some() {
            self.token = overrides.token;
        }
        self
    }

    /// Expand `~`/`$VAR` in paths and anchor relative record/backup paths at `install_dir`.
    pub fn resolve(mut self) -> Result<Self, UpdateError> {
        self.install_dir = expand(&self.install_dir)?;
        self.version_file = self.install_dir.join(expand(&self.version_file)?);
        self.backup_dir = self.install_dir.join(expand(&self.backup_dir)?);
        Ok(self)
    }

    /// Check the settings that would otherwise fail halfway through an update.
    pub fn validate(&self) -> Result<(), UpdateError> {
        validate_repository(&self.repository)?;

        if self.target_name.is_empty()
            || self.target_name.contains(['/', '\\'])
            || self.target_name == "."
            || self.target_name == ".."
        {
            return Err(UpdateError::Config {
                message: format!("target_name must be a plain file name, got '{}'", self.target_name),
            });
        }

        regex::Regex::new(&self.asset_pattern).map_err(|e| UpdateError::Config {
            message: format!("invalid asset_pattern '{}': {e}", self.asset_pattern),
        })?;
        Ok(())
    }

    /// Full path of the installed artifact.
    #[must_use]
    pub fn target_path(&self) -> PathBuf {
        self.install_dir.join(&self.target_name)
    }

    /// Where an in-flight download is written; same directory as the target so the final move is a rename.
    #[must_use]
    pub fn partial_download_path(&self) -> PathBuf {
        with_suffix(&self.install_dir.join(format!(".{}", self.target_name)), ".part")
    }

    /// Lock file guarding the install directory.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        with_suffix(&self.install_dir.join(format!(".{}", self.target_name)), ".lock")
    }

    /// `User-Agent` sent with every request: `<app>-Updater/<updater-version>`.
    #[must_use]
    pub fn user_agent(&self) -> String {
        format!("{}-Updater/{}", self.app_name, env!("CARGO_PKG_VERSION"))
    }
}

/// `owner/repo` with non-empty halves and no whitespace.
pub fn validate_repository(repository: &str) -> Result<(), UpdateError> {
    let valid = match repository.split_once('/') {
        Some((owner, repo)) => {
            !owner.is_empty()
                && !repo.is_empty()
                && !repo.contains('/')
                && !repository.contains(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(())
    } else if repository.is_empty() {
        Err(UpdateError::Config {
            message: "no repository configured; set `repository = \"owner/repo\"`".to_string(),
        })
    } else {
        Err(UpdateError::Config {
            message: format!("repository must be 'owner/repo', got '{repository}'"),
        })
    }
}

fn expand(path: &Path) -> Result<PathBuf, UpdateError> {
    let raw = path.to_string_lossy();
    shellexpand::full(&raw)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|e| UpdateError::Config {
            message: format!("cannot expand path '{raw}': {e}"),
        })
}
