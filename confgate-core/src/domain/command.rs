//! Command execution domain types
//!
//! Every external command (validation or restart) yields a [`CommandResult`].
//! Failures are values, not errors: the orchestrator branches on the status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of running one external command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub status: CommandStatus,
    /// Combined output, error stream first
    pub output: String,
}

impl CommandResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Ok,
            output: output.into(),
        }
    }

    pub fn failed(failure: CommandFailure, output: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Failed(failure),
            output: output.into(),
        }
    }

    pub fn skipped(output: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Skipped,
            output: output.into(),
        }
    }

    /// True for every `Failed(_)` status
    pub fn is_failed(&self) -> bool {
        self.status.is_failed()
    }
}

/// Closed set of command statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum CommandStatus {
    /// Command ran and exited with status 0
    Ok,

    /// Command was rejected, failed to run, or exited non-zero
    Failed(CommandFailure),

    /// No command was configured
    Skipped,
}

impl CommandStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, CommandStatus::Failed(_))
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandStatus::Ok => write!(f, "ok"),
            CommandStatus::Failed(failure) => write!(f, "failed ({})", failure),
            CommandStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Why a command counts as failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandFailure {
    /// Process exited with a non-zero code (-1 when killed by a signal)
    ExitCode(i32),

    /// Command string was rejected before execution
    InvalidCommand,

    /// Process exceeded the runner timeout and was killed
    Timeout,

    /// The execution mechanism itself failed (spawn, wait, pipes)
    Exception,
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandFailure::ExitCode(code) => write!(f, "exit code {}", code),
            CommandFailure::InvalidCommand => write!(f, "invalid command"),
            CommandFailure::Timeout => write!(f, "timeout"),
            CommandFailure::Exception => write!(f, "exception"),
        }
    }
}
