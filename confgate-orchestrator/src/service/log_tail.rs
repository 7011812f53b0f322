//! Log tail query
//!
//! Shows the end of the dependent service's log so an operator can see why a
//! validation or restart failed. Read-only.

use anyhow::{Context, Result};
use std::fmt;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::Config;

/// Alternate log names searched next to a missing log file, in order
pub const FALLBACK_LOG_NAMES: &[&str] = &[
    "logstash-plain.log",
    "logstash.log",
    "logstash-plain.json",
    "logstash.json",
];

/// What the log tail query found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTail {
    /// Tail of a log file; `fallback` is set when an alternate name was used
    Content {
        path: PathBuf,
        text: String,
        fallback: bool,
    },

    /// The log file exists but has no content yet
    Empty { path: PathBuf, fallback: bool },

    /// No log file; lists the regular files found in its directory
    Missing {
        path: PathBuf,
        directory: PathBuf,
        files: Vec<String>,
    },

    /// Neither the log file nor its directory exist
    DirectoryMissing { path: PathBuf },

    /// No log path configured
    NotConfigured,
}

impl fmt::Display for LogTail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogTail::Content {
                path,
                text,
                fallback,
            } => {
                if *fallback {
                    writeln!(f, "Note: using alternate log file {}", path.display())?;
                    writeln!(f)?;
                }
                write!(f, "{}", text)
            }
            LogTail::Empty { path, .. } => write!(
                f,
                "Log file {} exists but is empty.\n\nThe service may have just started and not logged anything yet.",
                path.display()
            ),
            LogTail::Missing {
                path,
                directory,
                files,
            } => {
                writeln!(f, "Log file not found: {}", path.display())?;
                writeln!(f)?;
                if files.is_empty() {
                    writeln!(f, "Directory {} is empty.", directory.display())?;
                } else {
                    writeln!(f, "Files in {}:", directory.display())?;
                    for file in files {
                        writeln!(f, "  - {}", file)?;
                    }
                }
                writeln!(f)?;
                writeln!(f, "Hints:")?;
                writeln!(f, "1. Check that the service is running")?;
                writeln!(f, "2. Check the service's logging configuration and log mount")?;
                write!(f, "3. A freshly started service may not have written its log yet")
            }
            LogTail::DirectoryMissing { path } => write!(
                f,
                "Log file not found: {}\n\nCheck CONFGATE_LOG_PATH and that the log directory is mounted.",
                path.display()
            ),
            LogTail::NotConfigured => write!(f, "No log file configured (set CONFGATE_LOG_PATH)."),
        }
    }
}

/// Reads the tail of the configured log file
#[derive(Debug, Clone)]
pub struct LogTailService {
    log_path: Option<PathBuf>,
    max_bytes: u64,
}

impl LogTailService {
    pub fn new(config: &Config) -> Self {
        Self {
            log_path: config.log_path.clone(),
            max_bytes: config.log_max_bytes,
        }
    }

    /// Returns the last `max_bytes` bytes of the log, or a diagnostic
    pub fn tail(&self) -> Result<LogTail> {
        let Some(path) = &self.log_path else {
            return Ok(LogTail::NotConfigured);
        };

        if path.is_file() {
            return read_tail(path, self.max_bytes, false)
                .with_context(|| format!("Failed to read log file {}", path.display()));
        }

        let directory = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !directory.is_dir() {
            return Ok(LogTail::DirectoryMissing { path: path.clone() });
        }

        for name in FALLBACK_LOG_NAMES {
            let candidate = directory.join(name);
            if !candidate.is_file() {
                continue;
            }
            match read_tail(&candidate, self.max_bytes, true) {
                Ok(tail) => return Ok(tail),
                Err(e) => debug!("Skipping unreadable log {}: {}", candidate.display(), e),
            }
        }

        let mut files = Vec::new();
        let entries = fs::read_dir(&directory)
            .with_context(|| format!("Failed to list log directory {}", directory.display()))?;
        for entry in entries {
            let entry = entry
                .with_context(|| format!("Failed to list log directory {}", directory.display()))?;
            if entry.path().is_file() {
                files.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        files.sort();

        Ok(LogTail::Missing {
            path: path.clone(),
            directory,
            files,
        })
    }
}

fn read_tail(path: &Path, max_bytes: u64, fallback: bool) -> std::io::Result<LogTail> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();

    if size == 0 {
        return Ok(LogTail::Empty {
            path: path.to_path_buf(),
            fallback,
        });
    }

    file.seek(SeekFrom::Start(size.saturating_sub(max_bytes)))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    Ok(LogTail::Content {
        path: path.to_path_buf(),
        text: String::from_utf8_lossy(&bytes).into_owned(),
        fallback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(log_path: Option<PathBuf>, max_bytes: u64) -> LogTailService {
        LogTailService {
            log_path,
            max_bytes,
        }
    }

    #[test]
    fn test_not_configured() {
        assert_eq!(service(None, 10).tail().unwrap(), LogTail::NotConfigured);
    }

    #[test]
    fn test_returns_last_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logstash-plain.log");
        fs::write(&path, "line one\nline two\n").unwrap();

        let tail = service(Some(path.clone()), 9).tail().unwrap();

        assert_eq!(
            tail,
            LogTail::Content {
                path,
                text: "line two\n".to_string(),
                fallback: false,
            }
        );
    }

    #[test]
    fn test_small_file_is_returned_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "short").unwrap();

        let tail = service(Some(path), 200_000).tail().unwrap();
        assert_eq!(tail.to_string(), "short");
    }

    #[test]
    fn test_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "").unwrap();

        let tail = service(Some(path.clone()), 100).tail().unwrap();
        assert_eq!(
            tail,
            LogTail::Empty {
                path,
                fallback: false
            }
        );
    }

    #[test]
    fn test_falls_back_to_alternate_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("logstash.json"), "{\"level\":\"INFO\"}").unwrap();
        fs::write(dir.path().join("logstash.log"), "plain log").unwrap();

        let tail = service(Some(dir.path().join("missing.log")), 100)
            .tail()
            .unwrap();

        // logstash.log comes before logstash.json in the search order
        assert_eq!(
            tail,
            LogTail::Content {
                path: dir.path().join("logstash.log"),
                text: "plain log".to_string(),
                fallback: true,
            }
        );
        assert!(tail.to_string().starts_with("Note: using alternate log file"));
    }

    #[test]
    fn test_lists_directory_when_nothing_matches() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("gc.log"), "x").unwrap();
        fs::write(dir.path().join("audit.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("archive")).unwrap();

        let tail = service(Some(dir.path().join("missing.log")), 100)
            .tail()
            .unwrap();

        match &tail {
            LogTail::Missing { files, .. } => {
                assert_eq!(files, &vec!["audit.txt".to_string(), "gc.log".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(tail.to_string().contains("  - gc.log"));
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("app.log");

        let tail = service(Some(path.clone()), 100).tail().unwrap();
        assert_eq!(tail, LogTail::DirectoryMissing { path });
    }
}
