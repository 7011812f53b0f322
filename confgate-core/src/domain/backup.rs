//! Backup domain types
//!
//! A backup is a write-once snapshot of the live configuration taken right
//! before it is overwritten. Backups are identified by the second they were
//! taken, plus a sequence number for backups taken within the same second.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
const BACKUP_EXTENSION: &str = "bak";

/// Identifier of a backup
///
/// Ordered by timestamp first, then sequence, so ids taken later always
/// compare greater. Rendered as `20251127-205921`, or `20251127-205921-2` for
/// the third backup taken within that second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BackupId {
    timestamp: DateTime<Utc>,
    sequence: u32,
}

impl BackupId {
    /// Creates an id for the given instant, truncated to whole seconds
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            timestamp: at.with_nanosecond(0).unwrap_or(at),
            sequence: 0,
        }
    }

    /// Creates an id for the current instant
    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    /// Next id within the same second
    pub fn next(&self) -> Self {
        Self {
            timestamp: self.timestamp,
            sequence: self.sequence + 1,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// File name of this backup for a live file named `live_name`
    pub fn file_name(&self, live_name: &str) -> String {
        format!("{}.{}.{}", live_name, self, BACKUP_EXTENSION)
    }

    /// Parses a backup file name produced by [`BackupId::file_name`]
    ///
    /// Returns `None` for files that belong to another live file or are not
    /// backups at all.
    pub fn from_file_name(live_name: &str, file_name: &str) -> Option<Self> {
        let rest = file_name.strip_prefix(live_name)?.strip_prefix('.')?;
        let id = rest
            .strip_suffix(BACKUP_EXTENSION)?
            .strip_suffix('.')?;
        id.parse().ok()
    }
}

impl fmt::Display for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.timestamp.format(TIMESTAMP_FORMAT))?;
        if self.sequence > 0 {
            write!(f, "-{}", self.sequence)?;
        }
        Ok(())
    }
}

/// Error returned when a string is not a valid backup id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseBackupIdError(String);

impl fmt::Display for ParseBackupIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid backup id '{}'", self.0)
    }
}

impl std::error::Error for ParseBackupIdError {}

impl FromStr for BackupId {
    type Err = ParseBackupIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseBackupIdError(s.to_string());

        // "YYYYmmdd-HHMMSS" is 15 characters; anything after is "-<sequence>"
        let (stamp, sequence) = match s.get(..15) {
            Some(stamp) if s.len() == 15 => (stamp, 0),
            Some(stamp) => {
                let seq = s[15..].strip_prefix('-').ok_or_else(err)?;
                let seq: u32 = seq.parse().map_err(|_| err())?;
                if seq == 0 {
                    return Err(err());
                }
                (stamp, seq)
            }
            None => return Err(err()),
        };

        let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
            .map_err(|_| err())?
            .and_utc();

        Ok(Self {
            timestamp,
            sequence,
        })
    }
}

impl TryFrom<String> for BackupId {
    type Error = ParseBackupIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BackupId> for String {
    fn from(id: BackupId) -> Self {
        id.to_string()
    }
}

/// A snapshot of the live configuration stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backup {
    pub id: BackupId,

    /// Location of the backup file
    pub path: PathBuf,
}

impl Backup {
    /// File name of the backup, for operator-facing messages
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}
