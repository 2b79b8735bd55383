//! bsort CLI - bottle-cap detector training and inference
//!
//! Provides the `bsort` command with `train` and `infer` subcommands driven by a YAML
//! configuration file.

mod commands;
mod console;

use bsort_models::{BackendType, TrackerType};
use bsort_training::DEFAULT_CONFIG_PATH;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// bsort - bottle-cap detection toolkit
///
/// Trains an object detector on a bottle-cap dataset and runs it on single images.
#[derive(Parser, Debug)]
#[command(name = "bsort", author, version, about = "bsort - bottle-cap detector training and inference")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Detection backend (ultralytics, mock)
    #[arg(long, default_value = "ultralytics", global = true)]
    backend: BackendType,

    /// Experiment tracker (wandb, none)
    #[arg(long, default_value = "wandb", global = true)]
    tracker: TrackerType,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Train a detector
    ///
    /// Fine-tunes the configured pretrained model, moves the best checkpoint into the
    /// output directory and optionally exports it.
    Train {
        /// Path to the YAML settings file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Run inference on one image
    ///
    /// Saves the annotated result as `<stem>_result.<ext>` next to the input unless
    /// `--show` is given.
    Infer {
        /// Path to the YAML settings file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Image to run the detector on
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Display the result instead of saving it
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber =
        FmtSubscriber::builder().with_max_level(level).without_time().with_target(false).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install log subscriber: {e}");
        return ExitCode::FAILURE;
    }

    let context = commands::AppContext::new(args.backend, args.tracker);
    match commands::dispatch(&context, args.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            console::print_error(&e);
            ExitCode::FAILURE
        }
    }
}
