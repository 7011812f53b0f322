//! Pipeline command handlers
//!
//! Read-only views of the live configuration and its backups.

use anyhow::{Context, Result};
use colored::*;
use confgate_orchestrator::DeploymentService;

/// Print the live configuration
pub fn show(service: &DeploymentService, json: bool) -> Result<()> {
    let document = service
        .current_document()
        .context("Failed to read the live configuration")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    if !document.exists() {
        println!(
            "{}",
            format!("No configuration deployed yet at {}", document.path.display()).yellow()
        );
        return Ok(());
    }

    println!("{}", "Pipeline Configuration:".bold());
    println!("  File:     {}", document.path.display().to_string().cyan());
    if let Some(modified) = document.last_modified {
        println!("  Modified: {}", modified.format("%Y-%m-%d %H:%M:%S"));
    }
    println!("{}", "─".repeat(80).dimmed());
    println!("{}", document.content);
    println!("{}", "─".repeat(80).dimmed());

    Ok(())
}

/// List backups, oldest first
pub fn list_backups(service: &DeploymentService) -> Result<()> {
    let backups = service.backups().context("Failed to list backups")?;

    if backups.is_empty() {
        println!("{}", "No backups found.".yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} backup(s):", backups.len()).bold());
    println!();
    for backup in backups {
        println!("  {} {}", "▸".cyan(), backup.id.to_string().bold());
        println!(
            "    Taken: {}",
            backup
                .id
                .timestamp()
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
                .dimmed()
        );
        println!("    Path:  {}", backup.path.display().to_string().dimmed());
    }

    Ok(())
}
