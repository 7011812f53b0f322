//! Deployment service
//!
//! Runs one deploy attempt end to end:
//! - Back up the live configuration and write the new content
//! - Validate it with the configured test command
//! - Roll back on a failed validation, otherwise run the restart command
//!
//! A restart failure never rolls back: the content has been validated, only
//! the restart mechanism failed. Deploys are serialized both within the
//! process and across processes.

use chrono::Utc;
use confgate_core::domain::backup::Backup;
use confgate_core::domain::command::{CommandFailure, CommandResult};
use confgate_core::domain::deployment::{DeploymentOutcome, DeploymentStatus};
use confgate_core::domain::document::ConfigurationDocument;
use confgate_runner::CommandRunner;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{DeployError, StoreError, StoreOperation, StoreResult};
use crate::repository::deploy_lock::LOCK_FILE_NAME;
use crate::repository::{ConfigStore, DeployLock};
use crate::service::template;

/// Orchestrates deploy attempts against one live configuration
pub struct DeploymentService {
    runner: Arc<dyn CommandRunner>,
    store: Arc<dyn ConfigStore>,
    test_command: Option<String>,
    restart_command: Option<String>,
    lock_path: PathBuf,

    /// Serializes deploys issued through this service
    in_flight: Mutex<()>,
}

impl DeploymentService {
    /// Creates a deployment service
    ///
    /// # Arguments
    /// * `config` - Commands and the backup directory holding the deploy lock
    /// * `runner` - Runs the test and restart commands
    /// * `store` - The live configuration and its backups
    pub fn new(config: &Config, runner: Arc<dyn CommandRunner>, store: Arc<dyn ConfigStore>) -> Self {
        Self {
            runner,
            store,
            test_command: config.test_command.clone(),
            restart_command: config.restart_command.clone(),
            lock_path: config.backup_dir.join(LOCK_FILE_NAME),
            in_flight: Mutex::new(()),
        }
    }

    /// The live configuration as currently on disk
    pub fn current_document(&self) -> StoreResult<ConfigurationDocument> {
        self.store.document()
    }

    /// Backups of the live configuration, oldest first
    pub fn backups(&self) -> StoreResult<Vec<Backup>> {
        self.store.list_backups()
    }

    /// Deploys new configuration content
    ///
    /// Command failures are reported in the returned outcome. Errors are
    /// reserved for empty input (nothing written) and storage failures, which
    /// abort the attempt where it stands.
    pub async fn deploy(&self, content: &str) -> Result<DeploymentOutcome, DeployError> {
        if content.trim().is_empty() {
            warn!("Rejected deploy of empty configuration");
            return Err(DeployError::EmptyContent);
        }

        let attempt_id = Uuid::new_v4();
        let span = info_span!("deploy", attempt = %attempt_id);

        async {
            let _in_flight = self.in_flight.lock().await;
            let _lock = self.acquire_lock().await?;

            info!("Deploying {} bytes", content.len());
            let backup = {
                let content = content.to_string();
                self.on_store(StoreOperation::Write, move |store| store.write(&content))
                    .await?
            };

            let validation = self.validate().await;
            if validation.is_failed() {
                return self.roll_back(attempt_id, validation, backup).await;
            }
            info!("Validation {}", validation.status);

            let (status, restart, message) = self.restart().await;
            info!("Deploy finished: {}", status);

            Ok(DeploymentOutcome {
                attempt_id,
                status,
                message,
                validation,
                restart,
                backup: backup.map(|b| b.id),
                restored_from: None,
                finished_at: Utc::now(),
            })
        }
        .instrument(span)
        .await
    }

    /// Takes the cross-process deploy lock on a blocking thread
    async fn acquire_lock(&self) -> Result<DeployLock, DeployError> {
        let path = self.lock_path.clone();
        let result = tokio::task::spawn_blocking({
            let path = path.clone();
            move || -> io::Result<DeployLock> {
                match DeployLock::try_acquire(&path)? {
                    Some(lock) => Ok(lock),
                    None => {
                        info!("Another deploy holds {}, waiting", path.display());
                        DeployLock::acquire(&path)
                    }
                }
            }
        })
        .await;

        match result {
            Ok(Ok(lock)) => Ok(lock),
            Ok(Err(source)) => Err(DeployError::Lock { path, source }),
            Err(join_error) => Err(DeployError::Lock {
                path,
                source: io::Error::other(join_error),
            }),
        }
    }

    /// Runs a store call on a blocking thread
    async fn on_store<T, F>(&self, operation: StoreOperation, call: F) -> Result<T, DeployError>
    where
        F: FnOnce(&dyn ConfigStore) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let path = store.pipeline_path().to_path_buf();

        tokio::task::spawn_blocking(move || call(store.as_ref()))
            .await
            .map_err(|e| StoreError::new(operation, path, io::Error::other(e)))?
            .map_err(DeployError::from)
    }

    /// Runs the test command against the freshly written configuration
    async fn validate(&self) -> CommandResult {
        let Some(template) = &self.test_command else {
            info!("No test command configured, skipping validation");
            return CommandResult::skipped("No test command configured, validation skipped.");
        };

        match template::render_test_command(template, self.store.pipeline_path()) {
            Ok(command) => self.runner.run(&command).await,
            Err(reason) => {
                error!("Test command template is malformed: {}", reason);
                CommandResult::failed(
                    CommandFailure::InvalidCommand,
                    format!(
                        "Malformed test command: {}\n\nCheck the test command template, e.g. \
                         logstash --config.test_and_exit -f {{config}}",
                        reason
                    ),
                )
            }
        }
    }

    /// Restores the pre-deploy state after a failed validation
    async fn roll_back(
        &self,
        attempt_id: Uuid,
        validation: CommandResult,
        backup: Option<Backup>,
    ) -> Result<DeploymentOutcome, DeployError> {
        warn!("Validation {}, rolling back", validation.status);

        let message = match &backup {
            Some(backup) => {
                let target = backup.clone();
                self.on_store(StoreOperation::Rollback, move |store| store.rollback(&target))
                    .await?;
                format!("Configuration test failed, rolled back to {}", backup.file_name())
            }
            None => {
                self.on_store(StoreOperation::Discard, |store| store.discard())
                    .await?;
                "Configuration test failed. There was no previous configuration, \
                 so the rejected file was removed."
                    .to_string()
            }
        };
        error!("{}", message);

        let backup_id = backup.map(|b| b.id);
        Ok(DeploymentOutcome {
            attempt_id,
            status: DeploymentStatus::ValidationFailedRolledBack,
            message,
            validation,
            restart: None,
            backup: backup_id,
            restored_from: backup_id,
            finished_at: Utc::now(),
        })
    }

    /// Runs the restart command, if any
    async fn restart(&self) -> (DeploymentStatus, Option<CommandResult>, String) {
        let Some(command) = &self.restart_command else {
            warn!("No restart command configured, service must be restarted manually");
            return (
                DeploymentStatus::ValidationSkippedAndSaved,
                None,
                "Configuration saved. No restart command is configured, restart the \
                 service manually for it to take effect."
                    .to_string(),
            );
        };

        let result = self.runner.run(command).await;
        if result.is_failed() {
            warn!("Restart {}", result.status);
            (
                DeploymentStatus::ValidationPassedRestartFailed,
                Some(result),
                "Restart failed, check the logs. The configuration was saved but the \
                 service must be restarted manually."
                    .to_string(),
            )
        } else {
            (
                DeploymentStatus::ValidationPassedAndRestarted,
                Some(result),
                "Configuration saved and service restarted.".to_string(),
            )
        }
    }
}
