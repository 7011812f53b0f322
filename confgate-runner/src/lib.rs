//! Confgate Runner
//!
//! Executes the external commands a deployment depends on: the validation
//! command that checks a candidate configuration and the restart command
//! that makes the dependent service pick it up.
//!
//! The runner has no error type. Skipped, rejected, timed-out and failed
//! commands are all reported as a [`CommandResult`] so callers branch on
//! a closed set of statuses.
//!
//! [`CommandResult`]: confgate_core::domain::command::CommandResult

pub mod shell;

pub use shell::{CommandRunner, DEFAULT_TIMEOUT, ShellRunner};
