//! Deployment configuration
//!
//! Defines where the live pipeline configuration and its backups live, which
//! commands validate and restart, and where the dependent service logs.
//! Built once at startup and passed by reference to the store and services.

use anyhow::Context;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_LOG_MAX_BYTES: u64 = 200_000;
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Deployment configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Live pipeline configuration file
    pub pipeline_path: PathBuf,

    /// Directory holding timestamped backups of the pipeline file
    pub backup_dir: PathBuf,

    /// Validation command template, e.g.
    /// `/usr/share/logstash/bin/logstash --config.test_and_exit -f {config}`
    pub test_command: Option<String>,

    /// Restart command, e.g. `systemctl restart logstash`
    pub restart_command: Option<String>,

    /// Log file of the dependent service, shown by the log tail query
    pub log_path: Option<PathBuf>,

    /// Maximum number of bytes returned by the log tail query
    pub log_max_bytes: u64,

    /// Wall-clock limit for each validation or restart command
    pub command_timeout: Duration,
}

impl Config {
    /// Creates a configuration with defaults for everything but the pipeline path
    ///
    /// Backups go to a `backups` directory next to the pipeline file.
    pub fn new(pipeline_path: impl Into<PathBuf>) -> Self {
        let pipeline_path = pipeline_path.into();
        let backup_dir = default_backup_dir(&pipeline_path);

        Self {
            pipeline_path,
            backup_dir,
            test_command: None,
            restart_command: None,
            log_path: None,
            log_max_bytes: DEFAULT_LOG_MAX_BYTES,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - CONFGATE_PIPELINE_PATH (required)
    /// - CONFGATE_BACKUP_DIR (optional, default: `<pipeline dir>/backups`)
    /// - CONFGATE_TEST_CMD (optional, `{config}` is replaced by the pipeline path)
    /// - CONFGATE_RESTART_CMD (optional)
    /// - CONFGATE_LOG_PATH (optional)
    /// - CONFGATE_LOG_MAX_BYTES (optional, default: 200000)
    /// - CONFGATE_COMMAND_TIMEOUT (optional, seconds, default: 60)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pipeline_path = lookup("CONFGATE_PIPELINE_PATH")
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("CONFGATE_PIPELINE_PATH environment variable not set"))?;

        let mut config = Self::new(pipeline_path);

        if let Some(dir) = lookup("CONFGATE_BACKUP_DIR").filter(|v| !v.trim().is_empty()) {
            config = config.with_backup_dir(dir);
        }
        if let Some(command) = lookup("CONFGATE_TEST_CMD") {
            config = config.with_test_command(command);
        }
        if let Some(command) = lookup("CONFGATE_RESTART_CMD") {
            config = config.with_restart_command(command);
        }
        config.log_path = lookup("CONFGATE_LOG_PATH")
            .and_then(non_blank)
            .map(PathBuf::from);

        if let Some(value) = lookup("CONFGATE_LOG_MAX_BYTES") {
            config.log_max_bytes = value
                .trim()
                .parse()
                .with_context(|| format!("CONFGATE_LOG_MAX_BYTES is not a number: '{}'", value))?;
        }

        if let Some(value) = lookup("CONFGATE_COMMAND_TIMEOUT") {
            let secs: u64 = value
                .trim()
                .parse()
                .with_context(|| format!("CONFGATE_COMMAND_TIMEOUT is not a number: '{}'", value))?;
            config.command_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Sets the validation command template
    pub fn with_test_command(mut self, command: impl Into<String>) -> Self {
        self.test_command = non_blank(command.into());
        self
    }

    /// Sets the restart command
    pub fn with_restart_command(mut self, command: impl Into<String>) -> Self {
        self.restart_command = non_blank(command.into());
        self
    }

    pub fn with_backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = dir.into();
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.pipeline_path.as_os_str().is_empty() {
            anyhow::bail!("pipeline_path cannot be empty");
        }

        if self.pipeline_path.file_name().is_none() {
            anyhow::bail!(
                "pipeline_path must name a file: {}",
                self.pipeline_path.display()
            );
        }

        if self.backup_dir.as_os_str().is_empty() {
            anyhow::bail!("backup_dir cannot be empty");
        }

        if self.command_timeout.is_zero() {
            anyhow::bail!("command_timeout must be greater than 0");
        }

        if self.log_max_bytes == 0 {
            anyhow::bail!("log_max_bytes must be greater than 0");
        }

        Ok(())
    }
}

fn default_backup_dir(pipeline_path: &Path) -> PathBuf {
    pipeline_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("backups")
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::new("/etc/logstash/conf.d/pipeline.conf");
        assert_eq!(
            config.backup_dir,
            PathBuf::from("/etc/logstash/conf.d/backups")
        );
        assert_eq!(config.command_timeout, Duration::from_secs(60));
        assert_eq!(config.log_max_bytes, 200_000);
        assert!(config.test_command.is_none());
        assert!(config.restart_command.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pipeline_path_is_required() {
        assert!(Config::from_lookup(lookup_from(&[])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("CONFGATE_PIPELINE_PATH", "  ")])).is_err());
    }

    #[test]
    fn test_from_lookup_reads_everything() {
        let config = Config::from_lookup(lookup_from(&[
            ("CONFGATE_PIPELINE_PATH", "/srv/pipeline/logstash.conf"),
            ("CONFGATE_BACKUP_DIR", "/var/backups/logstash"),
            ("CONFGATE_TEST_CMD", "logstash -t -f {config}"),
            ("CONFGATE_RESTART_CMD", " systemctl restart logstash "),
            ("CONFGATE_LOG_PATH", "/var/log/logstash/logstash-plain.log"),
            ("CONFGATE_LOG_MAX_BYTES", "4096"),
            ("CONFGATE_COMMAND_TIMEOUT", "15"),
        ]))
        .unwrap();

        assert_eq!(config.pipeline_path, PathBuf::from("/srv/pipeline/logstash.conf"));
        assert_eq!(config.backup_dir, PathBuf::from("/var/backups/logstash"));
        assert_eq!(config.test_command.as_deref(), Some("logstash -t -f {config}"));
        assert_eq!(config.restart_command.as_deref(), Some("systemctl restart logstash"));
        assert_eq!(
            config.log_path,
            Some(PathBuf::from("/var/log/logstash/logstash-plain.log"))
        );
        assert_eq!(config.log_max_bytes, 4096);
        assert_eq!(config.command_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_blank_commands_are_unset() {
        let config = Config::from_lookup(lookup_from(&[
            ("CONFGATE_PIPELINE_PATH", "/srv/logstash.conf"),
            ("CONFGATE_TEST_CMD", "   "),
            ("CONFGATE_RESTART_CMD", ""),
        ]))
        .unwrap();

        assert!(config.test_command.is_none());
        assert!(config.restart_command.is_none());
    }

    #[test]
    fn test_bad_numbers_are_errors() {
        let result = Config::from_lookup(lookup_from(&[
            ("CONFGATE_PIPELINE_PATH", "/srv/logstash.conf"),
            ("CONFGATE_LOG_MAX_BYTES", "lots"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::new("/srv/logstash.conf");
        assert!(config.validate().is_ok());

        config.command_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        config.command_timeout = Duration::from_secs(1);
        config.log_max_bytes = 0;
        assert!(config.validate().is_err());

        config.log_max_bytes = 10;
        config.pipeline_path = PathBuf::new();
        assert!(config.validate().is_err());
    }
}
