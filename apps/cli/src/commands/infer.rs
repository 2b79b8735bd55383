//! Infer command implementation.

use super::AppContext;
use bsort_training::{
    check_image, load_config, InferReport, InferRequest, InferenceOrchestrator, OutputMode, TrainingError,
};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Execute the infer command.
///
/// The image is checked before the configuration is read.
pub async fn execute(context: &AppContext, config: &Path, image: Option<PathBuf>, show: bool) -> anyhow::Result<()> {
    let image = image.ok_or_else(|| TrainingError::MissingArgument("--image".to_string()))?;
    check_image(&image)?;

    println!("{}", "bsort infer".bold().cyan());
    println!();

    let document = load_config(config)?;
    info!(config = %document.path().display(), image = %image.display(), "Loaded configuration");

    let request = InferRequest { image, mode: if show { OutputMode::Show } else { OutputMode::Save } };
    let report = InferenceOrchestrator::new(Arc::clone(&context.backend))
        .run(&request, &document, context.progress.as_ref())
        .await?;

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &InferReport) {
    println!();
    if report.detections.is_empty() {
        println!("{}", "No bottle caps detected".yellow());
    } else {
        println!("{}", format!("Detected {} bottle cap(s)", report.detections.len()).bold().green());
        for (i, detection) in report.detections.iter().enumerate() {
            let class = detection.class_name.clone().unwrap_or_else(|| format!("class {}", detection.class_id));
            let b = &detection.bbox;
            println!(
                "  {:>2}. {} {} box=({:.3}, {:.3}, {:.3}, {:.3})",
                i + 1,
                class.cyan(),
                format!("{:.2}", detection.confidence).dimmed(),
                b.x_center,
                b.y_center,
                b.width,
                b.height
            );
        }
    }
    if let Some(path) = &report.result_path {
        println!("  Result: {}", path.display().to_string().green());
    }
}
