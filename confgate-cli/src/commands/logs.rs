//! Logs command handler

use anyhow::Result;
use colored::*;
use confgate_orchestrator::{Config, LogTail, LogTailService};

/// Print the tail of the service log, or why it could not be found
pub fn show_logs(config: &Config) -> Result<()> {
    let tail = LogTailService::new(config).tail()?;

    match &tail {
        LogTail::Content { .. } => println!("{}", tail),
        LogTail::Empty { .. } | LogTail::NotConfigured => println!("{}", tail.to_string().yellow()),
        LogTail::Missing { .. } | LogTail::DirectoryMissing { .. } => {
            println!("{}", tail.to_string().red())
        }
    }

    Ok(())
}
