//! Deploy command handler

use anyhow::{Context, Result, bail};
use colored::*;
use confgate_core::domain::command::{CommandResult, CommandStatus};
use confgate_core::domain::deployment::OutcomeLevel;
use confgate_core::dto::deploy::DeployReport;
use confgate_orchestrator::DeploymentService;
use std::io::Read;
use std::path::PathBuf;

/// Deploy a file (or stdin) and report the outcome
///
/// Fails when the content was rejected or rolled back, so scripts can
/// branch on the exit status.
pub async fn deploy(service: &DeploymentService, file: Option<PathBuf>, json: bool) -> Result<()> {
    let content = read_content(file.as_ref())?;

    let outcome = match service.deploy(&content).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_input_error() => {
            eprintln!("{}", format!("✗ Nothing deployed: {}", e).red().bold());
            bail!("Invalid input");
        }
        Err(e) => return Err(e).context("Deploy aborted"),
    };
    let document = service
        .current_document()
        .context("Failed to read the live configuration after deploy")?;

    let report = DeployReport::new(outcome, &document);
    let level = report.outcome.level();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if level == OutcomeLevel::Error {
        bail!("{}", report.outcome.status);
    }

    Ok(())
}

fn read_content(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display())),
        _ => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read configuration from stdin")?;
            Ok(content)
        }
    }
}

fn print_report(report: &DeployReport) {
    let outcome = &report.outcome;

    let headline = match outcome.level() {
        OutcomeLevel::Success => format!("✓ {}", outcome.message).green().bold(),
        OutcomeLevel::Warning => format!("! {}", outcome.message).yellow().bold(),
        OutcomeLevel::Error => format!("✗ {}", outcome.message).red().bold(),
    };
    println!("{}", headline);
    println!("  Attempt:  {}", outcome.attempt_id.to_string().dimmed());
    println!("  File:     {}", report.pipeline_path.display());
    if let Some(modified) = report.last_modified {
        println!(
            "  Modified: {}",
            modified.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }
    if let Some(backup) = &outcome.backup {
        println!("  Backup:   {}", backup.to_string().cyan());
    }
    if let Some(restored) = &outcome.restored_from {
        println!("  Restored: {}", restored.to_string().cyan());
    }

    print_command("Validation", &outcome.validation);
    if let Some(restart) = &outcome.restart {
        print_command("Restart", restart);
    }
}

fn print_command(label: &str, result: &CommandResult) {
    let status = result.status.to_string();
    let status = match result.status {
        CommandStatus::Ok => status.green(),
        CommandStatus::Failed(_) => status.red(),
        CommandStatus::Skipped => status.yellow(),
    };

    println!("\n{} {}", format!("{}:", label).bold(), status);
    println!("{}", "─".repeat(80).dimmed());
    println!("{}", result.output.trim_end());
    println!("{}", "─".repeat(80).dimmed());
}
