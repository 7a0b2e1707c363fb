//! Swapping a downloaded artifact into place.
//!
//! The install is a fixed sequence where each step runs only if the previous
//! one succeeded:
//!
//! 1. back up the installed artifact (subject to [`BackupPolicy`])
//! 2. remove the installed artifact
//! 3. rename the download onto the target path
//! 4. record the new version
//!
//! Failing at step 1 or 2 leaves the old artifact untouched. Failing at step 3
//! or 4 restores it from the backup taken in step 1, so the version record and
//! the artifact never disagree.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::config::{BackupPolicy, UpdaterConfig};
use crate::core::{InstallStage, Result, UpdateError};
use crate::upgrade::backup::{BackupManager, BackupOutcome, BackupRecord};
use crate::utils::fs::with_suffix;
use crate::version::{Version, VersionStore};

/// A completed install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub version: Version,
    pub target: PathBuf,
    pub backup: BackupOutcome,
    /// The backup failure that [`BackupPolicy::Proceed`] let through, if any.
    pub skipped_backup: Option<UpdateError>,
}

#[derive(Debug, Clone)]
pub struct Installer {
    install_dir: PathBuf,
    target_name: String,
    backups: BackupManager,
    version_store: VersionStore,
    backup_policy: BackupPolicy,
}

impl Installer {
    pub fn new(
        install_dir: impl Into<PathBuf>,
        target_name: impl Into<String>,
        backups: BackupManager,
        version_store: VersionStore,
        backup_policy: BackupPolicy,
    ) -> Self {
        Self {
            install_dir: install_dir.into(),
            target_name: target_name.into(),
            backups,
            version_store,
            backup_policy,
        }
    }

    /// Installer for the artifact described by a resolved configuration.
    #[must_use]
    pub fn from_config(config: &UpdaterConfig) -> Self {
        Self::new(
            &config.install_dir,
            &config.target_name,
            BackupManager::new(&config.install_dir, &config.backup_dir),
            VersionStore::new(&config.version_file, &config.app_name),
            config.backup_policy,
        )
    }

    #[must_use]
    pub fn target_path(&self) -> PathBuf {
        self.install_dir.join(&self.target_name)
    }

    /// Replace the installed artifact with `downloaded` and record `new_version`.
    ///
    /// `downloaded` is consumed: it is either moved to the target path or
    /// deleted.
    pub async fn install(&self, downloaded: &Path, new_version: &Version) -> Result<InstallOutcome> {
        let target = self.target_path();
        let result = self.swap(downloaded, &target, new_version).await;

        if result.is_err() {
            discard(downloaded).await;
        }
        result
    }

    async fn swap(
        &self,
        downloaded: &Path,
        target: &Path,
        new_version: &Version,
    ) -> Result<InstallOutcome> {
        let (backup, skipped_backup) = match self.backups.backup(&self.target_name).await {
            Ok(outcome) => (outcome, None),
            Err(e) => match self.backup_policy {
                BackupPolicy::Abort => return Err(e),
                BackupPolicy::Proceed => {
                    warn!("Continuing without a backup: {}", e);
                    (BackupOutcome::NoOp, Some(e))
                }
            },
        };

        if fs::try_exists(target).await.unwrap_or(false) {
            fs::remove_file(target)
                .await
                .map_err(|e| UpdateError::filesystem(InstallStage::RemoveExisting, target, e))?;
            debug!("Removed {}", target.display());
        }

        if let Err(e) = move_into_place(downloaded, target).await {
            let err = UpdateError::filesystem(InstallStage::MoveIntoPlace, target, e);
            self.roll_back(backup.record(), target).await;
            return Err(err);
        }
        make_executable(target).await;

        if let Err(e) = self.version_store.write(new_version).await {
            self.roll_back(backup.record(), target).await;
            return Err(e);
        }

        info!("Installed {} at {}", new_version, target.display());
        Ok(InstallOutcome {
            version: new_version.clone(),
            target: target.to_path_buf(),
            backup,
            skipped_backup,
        })
    }

    async fn roll_back(&self, record: Option<&BackupRecord>, target: &Path) {
        match record {
            Some(record) => {
                if let Err(e) = self.backups.restore(record, target).await {
                    error!("Rollback failed, previous artifact is at {}: {}", record.path.display(), e);
                }
            }
            None => warn!("No backup to roll back {} from", target.display()),
        }
    }
}

/// Rename `from` onto `to`. Only when the platform refuses the rename (another
/// filesystem) is the file copied next to `to` and renamed from there.
async fn move_into_place(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if matches!(e.kind(), io::ErrorKind::CrossesDevices | io::ErrorKind::Unsupported) => {
            debug!("Rename not possible ({}), copying {} instead", e, from.display());
            let staging = with_suffix(to, ".tmp");
            fs::copy(from, &staging).await?;
            if let Err(e) = fs::rename(&staging, to).await {
                let _ = fs::remove_file(&staging).await;
                return Err(e);
            }
            fs::remove_file(from).await
        }
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
async fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Err(e) = fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await {
        warn!("Failed to mark {} executable: {}", path.display(), e);
    }
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) {}

async fn discard(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}
