//! Deployment domain types
//!
//! A deployment outcome records how one deploy attempt ended and which
//! command results led there.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::backup::BackupId;
use crate::domain::command::CommandResult;

/// Final state of a deploy attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Content saved; no restart command configured
    ValidationSkippedAndSaved,

    /// Validation passed (or was skipped) and the service restarted
    ValidationPassedAndRestarted,

    /// Validation passed but the restart command failed; content kept
    ValidationPassedRestartFailed,

    /// Validation failed; the previous content was restored
    ValidationFailedRolledBack,
}

impl DeploymentStatus {
    /// How the presentation layer should present this status
    pub fn level(&self) -> OutcomeLevel {
        match self {
            DeploymentStatus::ValidationSkippedAndSaved
            | DeploymentStatus::ValidationPassedAndRestarted => OutcomeLevel::Success,
            DeploymentStatus::ValidationPassedRestartFailed => OutcomeLevel::Warning,
            DeploymentStatus::ValidationFailedRolledBack => OutcomeLevel::Error,
        }
    }
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeploymentStatus::ValidationSkippedAndSaved => write!(f, "saved"),
            DeploymentStatus::ValidationPassedAndRestarted => write!(f, "restarted"),
            DeploymentStatus::ValidationPassedRestartFailed => write!(f, "restart failed"),
            DeploymentStatus::ValidationFailedRolledBack => write!(f, "rolled back"),
        }
    }
}

/// Severity of an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeLevel {
    Success,
    Warning,
    Error,
}

/// Result of one deploy attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentOutcome {
    /// Identifier of the attempt, also attached to its log span
    pub attempt_id: Uuid,
    pub status: DeploymentStatus,

    /// Operator-facing summary
    pub message: String,

    /// Result of the validation step (`Skipped` when no test command is set)
    pub validation: CommandResult,

    /// Result of the restart step, if one ran
    pub restart: Option<CommandResult>,

    /// Backup taken by this attempt; `None` on a first-ever write
    pub backup: Option<BackupId>,

    /// Backup the live document was restored from after a failed validation
    pub restored_from: Option<BackupId>,

    pub finished_at: DateTime<Utc>,
}

impl DeploymentOutcome {
    pub fn level(&self) -> OutcomeLevel {
        self.status.level()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        assert_eq!(
            DeploymentStatus::ValidationSkippedAndSaved.level(),
            OutcomeLevel::Success
        );
        assert_eq!(
            DeploymentStatus::ValidationPassedAndRestarted.level(),
            OutcomeLevel::Success
        );
        assert_eq!(
            DeploymentStatus::ValidationPassedRestartFailed.level(),
            OutcomeLevel::Warning
        );
        assert_eq!(
            DeploymentStatus::ValidationFailedRolledBack.level(),
            OutcomeLevel::Error
        );
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&DeploymentStatus::ValidationPassedRestartFailed).unwrap();
        assert_eq!(json, "\"validation_passed_restart_failed\"");
    }
}
