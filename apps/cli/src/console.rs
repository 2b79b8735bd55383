//! Console rendering for progress events and errors.

use bsort_training::{ProgressEvent, ProgressSink, TrainingError};
use colored::Colorize;

/// Prints pipeline progress to the terminal. Warnings go to stderr.
#[derive(Debug, Default)]
pub struct ConsoleProgressSink;

impl ProgressSink for ConsoleProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { stage, message } => {
                println!("{} {}", format!("[{stage}]").cyan().bold(), message);
            }
            ProgressEvent::Finished { message, .. } => {
                println!("  {} {}", "✓".green(), message.green());
            }
            ProgressEvent::Notice { message } => {
                println!("  {} {}", "•".blue(), message);
            }
            ProgressEvent::Warning { message, .. } => {
                eprintln!("{} {}", "Warning:".yellow().bold(), message.yellow());
            }
        }
    }
}

/// Print a fatal error, prefixed with its kind when it is one of ours.
pub fn print_error(error: &anyhow::Error) {
    match error.downcast_ref::<TrainingError>() {
        Some(e) => eprintln!("{} {}", format!("Error [{}]:", e.code()).red().bold(), e.to_string().red()),
        None => eprintln!("{} {}", "Error:".red().bold(), format!("{error:#}").red()),
    }
}
