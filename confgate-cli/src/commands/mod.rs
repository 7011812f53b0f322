//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod deploy;
mod logs;
mod pipeline;

use anyhow::Result;
use clap::Subcommand;
use confgate_orchestrator::{Config, DeploymentService, FileConfigStore};
use confgate_runner::ShellRunner;
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Deploy new pipeline configuration
    Deploy {
        /// File to deploy, `-` or omitted for stdin
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Print the deploy report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the live pipeline configuration
    Show {
        /// Print the document as JSON
        #[arg(long)]
        json: bool,
    },
    /// List backups of the pipeline configuration
    Backups,
    /// Show the tail of the service log
    Logs,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The deployment configuration
///
/// # Returns
/// Result indicating success or failure
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Deploy { file, json } => {
            deploy::deploy(&deployment_service(config), file, json).await
        }
        Commands::Show { json } => pipeline::show(&deployment_service(config), json),
        Commands::Backups => pipeline::list_backups(&deployment_service(config)),
        Commands::Logs => logs::show_logs(config),
    }
}

/// Wires the shell runner and file store into a deployment service
fn deployment_service(config: &Config) -> DeploymentService {
    let runner = Arc::new(ShellRunner::new(config.command_timeout));
    let store = Arc::new(FileConfigStore::new(config));
    DeploymentService::new(config, runner, store)
}
