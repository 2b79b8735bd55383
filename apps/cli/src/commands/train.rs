//! Train command implementation.

use super::AppContext;
use bsort_training::{load_config, ExportOutcome, TrainingOrchestrator};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Execute the train command.
///
/// Exits successfully when training succeeded, even if export or tracking only produced warnings.
pub async fn execute(context: &AppContext, config: &Path) -> anyhow::Result<()> {
    println!("{}", "bsort train".bold().cyan());
    println!();

    let document = load_config(config)?;
    info!(config = %document.path().display(), "Loaded configuration");

    let orchestrator = TrainingOrchestrator::new(Arc::clone(&context.backend), Arc::clone(&context.tracker));
    let report = orchestrator.run(&document, context.progress.as_ref()).await?;

    println!();
    println!("{}", "Training complete".bold().green());
    println!("  Job:        {}", report.job_id.to_string().dimmed());
    println!("  Checkpoint: {}", report.checkpoint.display().to_string().green());
    match &report.export {
        ExportOutcome::Relocated { path } => println!("  Export:     {}", path.display().to_string().green()),
        ExportOutcome::SkippedByConfig => println!("  Export:     {}", "disabled".dimmed()),
        ExportOutcome::Failed { message } => println!("  Export:     {}", format!("failed - {message}").yellow()),
    }
    if let Some(manifest) = &report.manifest {
        println!("  Manifest:   {}", manifest.display());
    }
    if report.has_warnings() {
        println!();
        println!("{}", format!("Completed with {} warning(s)", report.warnings.len()).yellow());
    }

    Ok(())
}
