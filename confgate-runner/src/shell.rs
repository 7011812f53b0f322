//! Shell command execution
//!
//! Runs operator-configured command strings (validation and restart hooks)
//! through the platform shell:
//! - Rejecting unset and degenerate commands without spawning anything
//! - Bounding each run with a wall-clock timeout, killing the child on expiry
//! - Folding stderr and stdout into one report, errors first

use async_trait::async_trait;
use confgate_core::domain::command::{CommandFailure, CommandResult};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Default wall-clock limit for one command
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Syntactically empty shell fragments that are never executed
const DEGENERATE_COMMANDS: &[&str] = &[":", ";;", "&&", "||"];

/// Commands shorter than this are rejected as misconfiguration
const MIN_COMMAND_LEN: usize = 2;

const NO_OUTPUT: &str = "(no output)";

/// Runs a command string and reports how it went
///
/// Implementations never return an error: every failure mode is encoded in
/// the returned [`CommandResult`]. One call spawns at most one process and
/// never retries.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> CommandResult;
}

#[cfg(unix)]
const DEFAULT_SHELL: (&str, &str) = ("sh", "-c");

#[cfg(windows)]
const DEFAULT_SHELL: (&str, &str) = ("cmd", "/C");

/// Runs commands through `sh -c` (`cmd /C` on Windows)
#[derive(Debug, Clone)]
pub struct ShellRunner {
    timeout: Duration,
    shell: String,
    shell_flag: String,
}

impl ShellRunner {
    /// Creates a runner with the given timeout
    pub fn new(timeout: Duration) -> Self {
        let (shell, shell_flag) = DEFAULT_SHELL;
        Self {
            timeout,
            shell: shell.to_string(),
            shell_flag: shell_flag.to_string(),
        }
    }

    /// Uses another shell, invoked as `<shell> <flag> <command>`
    #[cfg(test)]
    fn with_shell(mut self, shell: impl Into<String>, flag: impl Into<String>) -> Self {
        self.shell = shell.into();
        self.shell_flag = flag.into();
        self
    }

    async fn execute(&self, command: &str) -> CommandResult {
        debug!("Spawning {} {} {}", self.shell, self.shell_flag, command);

        let mut child = Command::new(&self.shell);
        child
            .arg(&self.shell_flag)
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match child.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to spawn '{}': {}", command, e);
                return CommandResult::failed(
                    CommandFailure::Exception,
                    format!("Failed to execute command: {}", e),
                );
            }
        };

        // Dropping the wait future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!("Failed to wait for '{}': {}", command, e);
                return CommandResult::failed(
                    CommandFailure::Exception,
                    format!("Failed to execute command: {}", e),
                );
            }
            Err(_) => {
                warn!("Command '{}' timed out after {:?}", command, self.timeout);
                return CommandResult::failed(
                    CommandFailure::Timeout,
                    format!("Command timed out after {:?}", self.timeout),
                );
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let combined = combine_output(&stdout, &stderr);

        if output.status.success() {
            debug!("Command '{}' completed successfully", command);
            CommandResult::ok(combined)
        } else {
            let exit_code = output.status.code().unwrap_or(-1);
            warn!("Command '{}' failed with exit code {}", command, exit_code);
            CommandResult::failed(CommandFailure::ExitCode(exit_code), combined)
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> CommandResult {
        match screen_command(command) {
            Ok(command) => self.execute(command).await,
            Err(verdict) => verdict,
        }
    }
}

/// Decides whether a command string may be executed
///
/// Returns the trimmed command to run, or the result to report without
/// running anything: `Skipped` for an unset command, `Failed(InvalidCommand)`
/// for a degenerate one.
pub fn screen_command(command: &str) -> Result<&str, CommandResult> {
    let command = command.trim();

    if command.is_empty() {
        return Err(CommandResult::skipped("No command configured, skipped."));
    }

    if DEGENERATE_COMMANDS.contains(&command) || command.chars().count() < MIN_COMMAND_LEN {
        warn!("Rejecting degenerate command '{}'", command);
        return Err(CommandResult::failed(
            CommandFailure::InvalidCommand,
            format!(
                "Invalid command: {}\n\nCheck the configured test and restart commands.",
                command
            ),
        ));
    }

    Ok(command)
}

/// Combines captured streams into one report
///
/// The labeled stderr section comes first so operators see errors before
/// regular output. Empty streams are omitted.
pub fn combine_output(stdout: &str, stderr: &str) -> String {
    let mut sections = Vec::with_capacity(2);

    let stderr = stderr.trim();
    if !stderr.is_empty() {
        sections.push(format!("[stderr]\n{}", stderr));
    }

    let stdout = stdout.trim();
    if !stdout.is_empty() {
        sections.push(format!("[stdout]\n{}", stdout));
    }

    if sections.is_empty() {
        NO_OUTPUT.to_string()
    } else {
        sections.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confgate_core::domain::command::CommandStatus;

    #[test]
    fn test_blank_commands_are_skipped() {
        for command in ["", " ", "\t\n"] {
            let verdict = screen_command(command).unwrap_err();
            assert_eq!(verdict.status, CommandStatus::Skipped);
        }
    }

    #[test]
    fn test_degenerate_commands_are_rejected() {
        for command in [";;", ":", "&&", "||", " || ", "x"] {
            let verdict = screen_command(command).unwrap_err();
            assert_eq!(
                verdict.status,
                CommandStatus::Failed(CommandFailure::InvalidCommand),
                "command {:?}",
                command
            );
            assert!(verdict.output.contains(command.trim()));
        }
    }

    #[test]
    fn test_real_commands_are_trimmed() {
        assert_eq!(screen_command("  ls -la \n").unwrap(), "ls -la");
    }

    #[test]
    fn test_combine_output_puts_stderr_first() {
        let output = combine_output("all good\n", "warning: deprecated\n");
        assert_eq!(output, "[stderr]\nwarning: deprecated\n\n[stdout]\nall good");
    }

    #[test]
    fn test_combine_output_omits_empty_streams() {
        assert_eq!(combine_output("done", "  "), "[stdout]\ndone");
        assert_eq!(combine_output("", "oops"), "[stderr]\noops");
        assert_eq!(combine_output("", ""), NO_OUTPUT);
    }

    #[tokio::test]
    async fn test_run_skips_without_spawning() {
        let runner = ShellRunner::default();
        let result = runner.run("   ").await;
        assert_eq!(result.status, CommandStatus::Skipped);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_success() {
        let runner = ShellRunner::default();
        let result = runner.run("echo hello").await;
        assert_eq!(result.status, CommandStatus::Ok);
        assert_eq!(result.output, "[stdout]\nhello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_nonzero_exit() {
        let runner = ShellRunner::default();
        let result = runner.run("echo bad config >&2; exit 3").await;
        assert_eq!(
            result.status,
            CommandStatus::Failed(CommandFailure::ExitCode(3))
        );
        assert_eq!(result.output, "[stderr]\nbad config");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_timeout() {
        let runner = ShellRunner::new(Duration::from_millis(200));
        let started = std::time::Instant::now();
        let result = runner.run("sleep 5").await;

        assert_eq!(result.status, CommandStatus::Failed(CommandFailure::Timeout));
        assert!(result.output.contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_missing_binary_is_exit_code() {
        // The shell itself starts fine and reports 127
        let runner = ShellRunner::default();
        let result = runner.run("definitely-not-a-real-binary-xyz").await;
        assert_eq!(
            result.status,
            CommandStatus::Failed(CommandFailure::ExitCode(127))
        );
    }

    #[tokio::test]
    async fn test_unstartable_shell_is_exception() {
        let runner = ShellRunner::default().with_shell("/nonexistent/confgate-shell", "-c");
        let result = runner.run("echo hello").await;

        assert_eq!(
            result.status,
            CommandStatus::Failed(CommandFailure::Exception)
        );
        assert!(result.output.starts_with("Failed to execute command: "));
        assert!(result.output.len() > "Failed to execute command: ".len());
    }
}
