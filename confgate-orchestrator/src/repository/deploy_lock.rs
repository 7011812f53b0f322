//! Cross-process deploy lock
//!
//! An exclusive advisory lock on a file next to the backups. Held for the
//! whole deploy sequence so two processes never interleave backup and write
//! steps on the same live configuration.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the lock file inside the backup directory
pub const LOCK_FILE_NAME: &str = ".deploy.lock";

/// Guard for an acquired deploy lock; released on drop
#[derive(Debug)]
pub struct DeployLock {
    file: File,
    path: PathBuf,
}

impl DeployLock {
    /// Blocks until the lock at `path` is acquired
    pub fn acquire(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        file.lock_exclusive()?;

        debug!("Acquired deploy lock {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Acquires the lock only if no one else holds it
    pub fn try_acquire(path: &Path) -> io::Result<Option<Self>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                file,
                path: path.to_path_buf(),
            })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Drop for DeployLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to release deploy lock {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_excludes_second_holder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backups").join(LOCK_FILE_NAME);

        let held = DeployLock::acquire(&path).unwrap();
        assert!(path.exists());
        assert!(DeployLock::try_acquire(&path).unwrap().is_none());

        drop(held);
        assert!(DeployLock::try_acquire(&path).unwrap().is_some());
    }
}
