use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::core::{Result, UpdateError};
use crate::utils::fs::ensure_dir;

/// Timestamp suffix of backup file names.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A backup that was written. Used for naming and for an immediate restore;
/// backups are not indexed anywhere afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    /// File name of the artifact that was copied.
    pub source_name: String,
    pub created_at: DateTime<Local>,
    /// Where the copy was written.
    pub path: PathBuf,
}

/// Result of [`BackupManager::backup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    Created(BackupRecord),
    /// There was nothing to back up.
    NoOp,
}

impl BackupOutcome {
    #[must_use]
    pub fn record(&self) -> Option<&BackupRecord> {
        match self {
            Self::Created(record) => Some(record),
            Self::NoOp => None,
        }
    }
}

/// Copies the installed artifact to `<backup_dir>/<name>.<YYYYMMDD_HHMMSS>`
/// before it is replaced.
///
/// Backups are full byte copies, never moves or links, so the installed file
/// is untouched until the installer removes it. Old backups are never
/// overwritten or pruned: a second backup within the same second gets a `-N`
/// suffix.
///
/// # Examples
///
/// ```rust,no_run
/// use appup_cli::upgrade::backup::{BackupManager, BackupOutcome};
///
/// # async fn example() -> appup_cli::core::Result<()> {
/// let manager = BackupManager::new("/opt/widget", "/opt/widget/backups");
/// if let BackupOutcome::Created(record) = manager.backup("widget.exe").await? {
///     println!("Backed up to {}", record.path.display());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BackupManager {
    source_dir: PathBuf,
    backup_dir: PathBuf,
}

impl BackupManager {
    /// Back up files from `source_dir` into `backup_dir`.
    pub fn new(source_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            backup_dir: backup_dir.into(),
        }
    }

    /// Copy `filename` from the source directory into the backup directory.
    ///
    /// A missing source file is not an error: the result is
    /// [`BackupOutcome::NoOp`] and nothing is created.
    pub async fn backup(&self, filename: &str) -> Result<BackupOutcome> {
        self.backup_at(filename, Local::now()).await
    }

    pub(crate) async fn backup_at(
        &self,
        filename: &str,
        now: DateTime<Local>,
    ) -> Result<BackupOutcome> {
        let source = self.source_dir.join(filename);
        let backup_error = |path: &Path, e: std::io::Error| UpdateError::BackupError {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        ensure_dir(&self.backup_dir).map_err(|e| backup_error(&self.backup_dir, e))?;

        if !fs::try_exists(&source).await.unwrap_or(false) {
            debug!("Nothing to back up at {}", source.display());
            return Ok(BackupOutcome::NoOp);
        }

        let path = self.unused_backup_path(filename, &now);
        info!("Backing up {} to {}", source.display(), path.display());
        fs::copy(&source, &path).await.map_err(|e| backup_error(&source, e))?;

        #[cfg(unix)]
        {
            let permissions =
                fs::metadata(&source).await.map_err(|e| backup_error(&source, e))?.permissions();
            fs::set_permissions(&path, permissions).await.map_err(|e| backup_error(&path, e))?;
        }

        Ok(BackupOutcome::Created(BackupRecord {
            source_name: filename.to_string(),
            created_at: now,
            path,
        }))
    }

    /// Copy a backup over `target`, replacing whatever is there.
    ///
    /// Retries a few times, since on Windows the target may still be held
    /// open briefly by an exiting process.
    pub async fn restore(&self, record: &BackupRecord, target: &Path) -> Result<()> {
        const MAX_ATTEMPTS: u32 = 3;

        warn!("Restoring {} from {}", target.display(), record.path.display());
        let mut attempt = 1;
        loop {
            match attempt_restore(&record.path, target).await {
                Ok(()) => {
                    info!("Restored {}", target.display());
                    return Ok(());
                }
                Err(e) if attempt < MAX_ATTEMPTS => {
                    warn!("Restore attempt {} failed: {}. Retrying...", attempt, e);
                    tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(UpdateError::BackupError {
                        path: record.path.display().to_string(),
                        reason: format!("restore failed: {e}"),
                    });
                }
            }
        }
    }

    fn unused_backup_path(&self, filename: &str, now: &DateTime<Local>) -> PathBuf {
        let base = format!("{filename}.{}", now.format(BACKUP_TIMESTAMP_FORMAT));
        let mut candidate = self.backup_dir.join(&base);
        let mut n = 1;
        while candidate.exists() {
            candidate = self.backup_dir.join(format!("{base}-{n}"));
            n += 1;
        }
        candidate
    }
}

async fn attempt_restore(backup: &Path, target: &Path) -> std::io::Result<()> {
    if fs::try_exists(target).await? {
        fs::remove_file(target).await?;
    }
    fs::copy(backup, target).await?;

    #[cfg(unix)]
    {
        let permissions = fs::metadata(backup).await?.permissions();
        fs::set_permissions(target, permissions).await?;
    }
    Ok(())
}
