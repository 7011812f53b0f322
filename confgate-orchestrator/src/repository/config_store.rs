//! Configuration Store
//!
//! Owns the live pipeline configuration file and its backup directory.
//!
//! Crash-safety rules:
//! - A backup is fully written and synced before the live file is touched
//! - The live file is only ever replaced by renaming a synced temp file over
//!   it, so readers see either the old or the new content, never a mix
//! - Backups are created exclusively and never overwritten or deleted

use chrono::{DateTime, Utc};
use confgate_core::domain::backup::{Backup, BackupId};
use confgate_core::domain::document::ConfigurationDocument;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{StoreError, StoreOperation, StoreResult};

/// Access to the single live configuration and its backups
pub trait ConfigStore: Send + Sync {
    /// Location of the live configuration file
    fn pipeline_path(&self) -> &Path;

    /// Returns the live content, or an empty string if nothing was ever written
    fn read(&self) -> StoreResult<String>;

    /// Returns the live content together with its location and modification time
    fn document(&self) -> StoreResult<ConfigurationDocument>;

    /// Backs up the current content (if any), then replaces it
    ///
    /// Returns the backup taken, or `None` when there was no live document.
    fn write(&self, content: &str) -> StoreResult<Option<Backup>>;

    /// Restores the live file from a backup
    ///
    /// Idempotent, and never creates a backup of its own.
    fn rollback(&self, backup: &Backup) -> StoreResult<()>;

    /// Removes the live file, restoring the "never written" state
    fn discard(&self) -> StoreResult<()>;

    /// Lists backups of the live file, oldest first
    fn list_backups(&self) -> StoreResult<Vec<Backup>>;
}

/// Filesystem implementation of [`ConfigStore`]
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    pipeline_path: PathBuf,
    backup_dir: PathBuf,
}

impl FileConfigStore {
    /// Creates a store for the paths in `config`
    pub fn new(config: &Config) -> Self {
        Self::with_paths(config.pipeline_path.clone(), config.backup_dir.clone())
    }

    pub fn with_paths(pipeline_path: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            pipeline_path: pipeline_path.into(),
            backup_dir: backup_dir.into(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    fn live_name(&self) -> String {
        self.pipeline_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pipeline.conf".to_string())
    }

    /// Reads the live file, `None` if it does not exist
    fn read_live(&self) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(&self.pipeline_path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::new(StoreOperation::Read, &self.pipeline_path, e)),
        }
    }

    /// Picks an id strictly greater than every existing backup
    fn next_backup_id(&self) -> StoreResult<BackupId> {
        let now = BackupId::now();
        let latest = self.list_backups()?.into_iter().map(|b| b.id).max();

        Ok(match latest {
            Some(latest) if latest >= now => latest.next(),
            _ => now,
        })
    }

    /// Writes `bytes` into a new backup file and syncs it
    fn create_backup(&self, bytes: &[u8]) -> StoreResult<Backup> {
        fs::create_dir_all(&self.backup_dir)
            .map_err(|e| StoreError::new(StoreOperation::Backup, &self.backup_dir, e))?;

        let live_name = self.live_name();
        let mut id = self.next_backup_id()?;

        loop {
            let path = self.backup_dir.join(id.file_name(&live_name));

            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!("Backup {} already exists, trying next id", path.display());
                    id = id.next();
                    continue;
                }
                Err(e) => return Err(StoreError::new(StoreOperation::Backup, &path, e)),
            };

            if let Err(e) = file.write_all(bytes).and_then(|_| file.sync_all()) {
                // A truncated backup is worse than none
                drop(file);
                let _ = fs::remove_file(&path);
                return Err(StoreError::new(StoreOperation::Backup, &path, e));
            }

            sync_dir(&self.backup_dir);
            return Ok(Backup { id, path });
        }
    }

    /// Atomically replaces the live file with `bytes`
    fn replace_live(&self, bytes: &[u8], operation: StoreOperation) -> StoreResult<()> {
        let path = &self.pipeline_path;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let err = |e: io::Error| StoreError::new(operation, path, e);

        fs::create_dir_all(&dir).map_err(err)?;

        let mut temp = tempfile::Builder::new()
            .prefix(&format!(".{}.", self.live_name()))
            .suffix(".tmp")
            .tempfile_in(&dir)
            .map_err(err)?;

        temp.write_all(bytes).map_err(err)?;
        temp.as_file().sync_all().map_err(err)?;

        // Keep the live file's mode; temp files are created owner-only
        match fs::metadata(path) {
            Ok(meta) => fs::set_permissions(temp.path(), meta.permissions()).map_err(err)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => set_default_permissions(temp.path()).map_err(err)?,
            Err(e) => return Err(err(e)),
        }

        temp.persist(path).map_err(|e| err(e.error))?;
        sync_dir(&dir);
        Ok(())
    }
}

impl ConfigStore for FileConfigStore {
    fn pipeline_path(&self) -> &Path {
        &self.pipeline_path
    }

    fn read(&self) -> StoreResult<String> {
        match fs::read_to_string(&self.pipeline_path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(StoreError::new(StoreOperation::Read, &self.pipeline_path, e)),
        }
    }

    fn document(&self) -> StoreResult<ConfigurationDocument> {
        let last_modified = match fs::metadata(&self.pipeline_path) {
            Ok(meta) => {
                let modified = meta
                    .modified()
                    .map_err(|e| StoreError::new(StoreOperation::Read, &self.pipeline_path, e))?;
                Some(DateTime::<Utc>::from(modified))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(StoreError::new(StoreOperation::Read, &self.pipeline_path, e)),
        };

        Ok(ConfigurationDocument {
            path: self.pipeline_path.clone(),
            content: self.read()?,
            last_modified,
        })
    }

    fn write(&self, content: &str) -> StoreResult<Option<Backup>> {
        let backup = match self.read_live()? {
            Some(current) => {
                let backup = self.create_backup(&current)?;
                info!("Backed up {} to {}", self.pipeline_path.display(), backup.path.display());
                Some(backup)
            }
            None => {
                info!(
                    "No existing configuration at {}, skipping backup",
                    self.pipeline_path.display()
                );
                None
            }
        };

        self.replace_live(content.as_bytes(), StoreOperation::Write)?;
        info!(
            "Wrote {} bytes to {}",
            content.len(),
            self.pipeline_path.display()
        );

        Ok(backup)
    }

    fn rollback(&self, backup: &Backup) -> StoreResult<()> {
        let bytes = fs::read(&backup.path)
            .map_err(|e| StoreError::new(StoreOperation::Rollback, &backup.path, e))?;

        self.replace_live(&bytes, StoreOperation::Rollback)?;
        info!(
            "Restored {} from backup {}",
            self.pipeline_path.display(),
            backup.id
        );
        Ok(())
    }

    fn discard(&self) -> StoreResult<()> {
        match fs::remove_file(&self.pipeline_path) {
            Ok(()) => {
                info!("Removed {}", self.pipeline_path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::new(StoreOperation::Discard, &self.pipeline_path, e)),
        }
    }

    fn list_backups(&self) -> StoreResult<Vec<Backup>> {
        let entries = match fs::read_dir(&self.backup_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::new(StoreOperation::List, &self.backup_dir, e)),
        };

        let live_name = self.live_name();
        let mut backups = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| StoreError::new(StoreOperation::List, &self.backup_dir, e))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };

            if let Some(id) = BackupId::from_file_name(&live_name, file_name) {
                backups.push(Backup {
                    id,
                    path: entry.path(),
                });
            }
        }

        backups.sort_by_key(|backup| backup.id);
        Ok(backups)
    }
}

/// Flushes directory entries so a rename or create survives a crash
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        warn!("Failed to sync directory {}: {}", dir.display(), e);
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

#[cfg(unix)]
fn set_default_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_default_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FileConfigStore {
        FileConfigStore::with_paths(
            dir.path().join("pipeline").join("logstash.conf"),
            dir.path().join("backups"),
        )
    }

    #[test]
    fn test_read_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert_eq!(store.read().unwrap(), "");
        let document = store.document().unwrap();
        assert!(!document.exists());
        assert_eq!(document.content, "");
    }

    #[test]
    fn test_first_write_takes_no_backup() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let backup = store.write("input { stdin {} }").unwrap();

        assert!(backup.is_none());
        assert_eq!(store.read().unwrap(), "input { stdin {} }");
        assert!(store.list_backups().unwrap().is_empty());
        assert!(store.document().unwrap().exists());
    }

    #[test]
    fn test_write_backs_up_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.write("A").unwrap();

        let backup = store.write("B").unwrap().expect("backup of A");

        assert_eq!(store.read().unwrap(), "B");
        assert_eq!(fs::read_to_string(&backup.path).unwrap(), "A");
        assert!(backup.path.starts_with(store.backup_dir()));
        assert!(backup.file_name().starts_with("logstash.conf."));
        assert!(backup.file_name().ends_with(".bak"));
    }

    #[test]
    fn test_backups_are_write_once_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.write("v1").unwrap();

        // Several writes within the same second must not overwrite each other
        let b1 = store.write("v2").unwrap().unwrap();
        let b2 = store.write("v3").unwrap().unwrap();
        let b3 = store.write("v4").unwrap().unwrap();

        assert!(b1.id < b2.id && b2.id < b3.id);
        assert_eq!(fs::read_to_string(&b1.path).unwrap(), "v1");
        assert_eq!(fs::read_to_string(&b2.path).unwrap(), "v2");
        assert_eq!(fs::read_to_string(&b3.path).unwrap(), "v3");

        let listed: Vec<_> = store.list_backups().unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(listed, vec![b1.id, b2.id, b3.id]);
    }

    #[test]
    fn test_rollback_restores_bytes_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.write("original\r\nwith crlf\n").unwrap();
        let backup = store.write("replacement").unwrap().unwrap();

        store.rollback(&backup).unwrap();
        let first = store.read().unwrap();
        store.rollback(&backup).unwrap();
        let second = store.read().unwrap();

        assert_eq!(first, "original\r\nwith crlf\n");
        assert_eq!(first, second);
        assert_eq!(store.list_backups().unwrap().len(), 1);
    }

    #[test]
    fn test_rollback_from_missing_backup_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.write("live").unwrap();

        let missing = Backup {
            id: BackupId::now(),
            path: dir.path().join("backups").join("gone.bak"),
        };
        let err = store.rollback(&missing).unwrap_err();

        assert_eq!(err.operation, StoreOperation::Rollback);
        assert_eq!(store.read().unwrap(), "live");
    }

    #[test]
    fn test_discard_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.write("temporary").unwrap();

        store.discard().unwrap();
        store.discard().unwrap();

        assert_eq!(store.read().unwrap(), "");
        assert!(!store.document().unwrap().exists());
    }

    #[test]
    fn test_list_ignores_unrelated_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.write("one").unwrap();
        store.write("two").unwrap();

        fs::write(store.backup_dir().join(".deploy.lock"), "").unwrap();
        fs::write(store.backup_dir().join("other.conf.20250101-000000.bak"), "x").unwrap();
        fs::write(store.backup_dir().join("notes.txt"), "x").unwrap();

        assert_eq!(store.list_backups().unwrap().len(), 1);
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.write("a").unwrap();
        store.write("b").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path().join("pipeline"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["logstash.conf".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.write("a").unwrap();
        fs::set_permissions(store.pipeline_path(), fs::Permissions::from_mode(0o640)).unwrap();

        store.write("b").unwrap();

        let mode = fs::metadata(store.pipeline_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[cfg(unix)]
    #[test]
    fn test_unwritable_backup_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the backup directory should be
        let blocker = dir.path().join("backups");
        fs::write(&blocker, "not a directory").unwrap();
        let store = FileConfigStore::with_paths(dir.path().join("logstash.conf"), &blocker);
        store.write("A").unwrap();

        let err = store.write("B").unwrap_err();

        assert_eq!(err.operation, StoreOperation::Backup);
        assert_eq!(store.read().unwrap(), "A");
    }
}
