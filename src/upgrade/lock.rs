//! Inter-process lock on the install directory.
//!
//! Two updater processes pointed at the same installation would otherwise race
//! on the partial download, the backup and the swap. The lock is an fs4
//! exclusive lock on `<install_dir>/.<target>.lock`, held from the start of the
//! download until the version record is written, and released on drop.

use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::{InstallStage, Result, UpdateError};
use crate::utils::fs::ensure_dir;

/// Exclusive lock held for the lifetime of the value.
#[derive(Debug)]
pub struct InstallLock {
    file: File,
    path: PathBuf,
}

impl InstallLock {
    /// Block (off the async runtime) until the lock at `path` is ours.
    pub async fn acquire(path: &Path) -> Result<Self> {
        let lock_path = path.to_path_buf();

        let file = tokio::task::spawn_blocking(move || -> std::io::Result<File> {
            if let Some(parent) = lock_path.parent()
                && !parent.as_os_str().is_empty()
            {
                ensure_dir(parent)?;
            }

            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&lock_path)?;

            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(|e| UpdateError::filesystem(InstallStage::Lock, path, e))?
        .map_err(|e| UpdateError::filesystem(InstallStage::Lock, path, e))?;

        debug!("Acquired install lock {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        #[allow(unstable_name_collisions)]
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to unlock {}: {}", self.path.display(), e);
        } else {
            debug!("Released install lock {}", self.path.display());
        }
    }
}
