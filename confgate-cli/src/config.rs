//! Configuration module
//!
//! Loads the deployment configuration from `CONFGATE_*` environment
//! variables.

use anyhow::{Context, Result};
use confgate_orchestrator::Config;
use tracing::debug;

/// Loads and validates the deployment configuration
pub fn load() -> Result<Config> {
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    debug!(
        "Pipeline {}, backups in {}",
        config.pipeline_path.display(),
        config.backup_dir.display()
    );

    Ok(config)
}
