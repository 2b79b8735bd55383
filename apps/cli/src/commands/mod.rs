//! Command implementations for the bsort CLI.

pub mod infer;
pub mod train;

use crate::Command;
use crate::console::ConsoleProgressSink;
use bsort_abstraction::{DetectionBackend, ExperimentTracker};
use bsort_models::{BackendConfig, BackendFactory, BackendType, TrackerFactory, TrackerType};
use bsort_training::ProgressSink;
use std::sync::Arc;
use tracing::debug;

/// Collaborators shared by every command, built once at start-up.
pub struct AppContext {
    pub backend: Arc<dyn DetectionBackend>,
    pub tracker: Arc<dyn ExperimentTracker>,
    pub progress: Arc<dyn ProgressSink>,
}

impl AppContext {
    pub fn new(backend: BackendType, tracker: TrackerType) -> Self {
        debug!(backend = ?backend, tracker = ?tracker, "Building command context");
        Self {
            backend: BackendFactory::create(BackendConfig::new(backend)),
            tracker: TrackerFactory::create(tracker),
            progress: Arc::new(ConsoleProgressSink),
        }
    }
}

/// Route a parsed command to its implementation.
pub async fn dispatch(context: &AppContext, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Train { config } => train::execute(context, &config).await,
        Command::Infer { config, image, show } => infer::execute(context, &config, image, show).await,
    }
}
