//! Error types for the orchestrator

use std::path::PathBuf;
use thiserror::Error;

/// Storage operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Read,
    Backup,
    Write,
    Rollback,
    Discard,
    List,
}

impl std::fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StoreOperation::Read => "read",
            StoreOperation::Backup => "back up",
            StoreOperation::Write => "write",
            StoreOperation::Rollback => "roll back",
            StoreOperation::Discard => "discard",
            StoreOperation::List => "list",
        };
        f.write_str(name)
    }
}

/// Errors raised by the configuration store
#[derive(Debug, Error)]
#[error("failed to {operation} {}: {source}", .path.display())]
pub struct StoreError {
    pub operation: StoreOperation,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl StoreError {
    pub fn new(operation: StoreOperation, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors that abort a deploy attempt
///
/// Command failures are not errors: they end up in the
/// [`DeploymentOutcome`](confgate_core::domain::deployment::DeploymentOutcome).
#[derive(Debug, Error)]
pub enum DeployError {
    /// Submitted content is empty or whitespace only; nothing was written
    #[error("configuration content is empty, nothing was saved")]
    EmptyContent,

    /// Storage failed; the attempt stopped where it was
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// The deploy lock could not be acquired
    #[error("failed to acquire deploy lock {}: {source}", .path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DeployError {
    /// Whether the caller submitted bad input, as opposed to an environment failure
    pub fn is_input_error(&self) -> bool {
        matches!(self, DeployError::EmptyContent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_store_error_message_names_path_and_operation() {
        let err = StoreError::new(
            StoreOperation::Backup,
            "/srv/backups/logstash.conf.20250101-000000.bak",
            io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        );
        assert_eq!(
            err.to_string(),
            "failed to back up /srv/backups/logstash.conf.20250101-000000.bak: permission denied"
        );
    }

    #[test]
    fn test_storage_error_is_transparent() {
        let err: DeployError = StoreError::new(
            StoreOperation::Write,
            "/srv/logstash.conf",
            io::Error::other("disk full"),
        )
        .into();
        assert_eq!(err.to_string(), "failed to write /srv/logstash.conf: disk full");
        assert!(!err.is_input_error());
        assert!(DeployError::EmptyContent.is_input_error());
    }
}
