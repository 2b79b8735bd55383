//! Training orchestration: track -> train -> locate -> relocate -> export -> manifest.

use crate::artifacts::{
    make_artifact, relocate, ArtifactKind, Relocation, TrainingJobId, TrainingManifest,
};
use crate::config::ConfigDocument;
use crate::error::{TrainingError, TrainingResult};
use crate::layout::OutputLayout;
use crate::progress::{self, ProgressSink, Stage};
use crate::settings::{TrackingSettings, TrainSettings};
use bsort_abstraction::{
    BackendError, DetectionBackend, ExperimentTracker, ExportFormat, ExportRequest,
};
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Terminal states of a `train` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainState {
    Succeeded,
    FailedAtTraining,
    FailedArtifactMissing,
}

impl TrainingError {
    /// The terminal training state this error ends a run in, if it comes from a pipeline stage.
    #[must_use]
    pub const fn train_state(&self) -> Option<TrainState> {
        match self {
            Self::TrainingFailed(_) => Some(TrainState::FailedAtTraining),
            Self::ArtifactNotFound(_) => Some(TrainState::FailedArtifactMissing),
            _ => None,
        }
    }
}

/// What happened to the optional export step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExportOutcome {
    Relocated { path: PathBuf },
    SkippedByConfig,
    Failed { message: String },
}

/// Summary of a successful `train` command.
#[derive(Debug, Clone, Serialize)]
pub struct TrainReport {
    pub job_id: TrainingJobId,
    pub state: TrainState,
    pub checkpoint: PathBuf,
    pub export: ExportOutcome,
    pub manifest: Option<PathBuf>,
    /// Recoverable problems, e.g. `ExportFailed: ...`.
    pub warnings: Vec<String>,
}

impl TrainReport {
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Sequences one training run against a backend and tracker.
pub struct TrainingOrchestrator {
    backend: Arc<dyn DetectionBackend>,
    tracker: Arc<dyn ExperimentTracker>,
}

impl TrainingOrchestrator {
    #[must_use]
    pub fn new(backend: Arc<dyn DetectionBackend>, tracker: Arc<dyn ExperimentTracker>) -> Self {
        Self { backend, tracker }
    }

    /// Validate `config` and run the pipeline. Configuration errors surface before any
    /// tracker or backend call.
    pub async fn run(&self, config: &ConfigDocument, progress: &dyn ProgressSink) -> TrainingResult<TrainReport> {
        let settings = TrainSettings::from_config(config)?;
        self.run_with_settings(&settings, progress).await
    }

    pub async fn run_with_settings(
        &self,
        settings: &TrainSettings,
        progress: &dyn ProgressSink,
    ) -> TrainingResult<TrainReport> {
        let job_id = TrainingJobId::new();
        let mut warnings = Vec::new();
        info!(job_id = %job_id, backend = self.backend.id(), pretrained = %settings.pretrained, "Starting training job");

        self.init_tracking(&settings.tracking, progress, &mut warnings).await;

        progress::started(
            progress,
            Stage::Training,
            format!("Training {} on {}", settings.pretrained, settings.data_config_file.display()),
        );
        let model = self.backend.load(&settings.pretrained).await.map_err(TrainingError::TrainingFailed)?;
        let run = model.train(&settings.train_request()).await.map_err(|e| {
            error!(job_id = %job_id, error = %e, "Training failed");
            TrainingError::TrainingFailed(e)
        })?;
        drop(model);
        progress::finished(progress, Stage::Training, format!("Training finished in {}", run.save_dir.display()));

        progress::started(progress, Stage::Locate, "Locating best checkpoint");
        if !run.best_checkpoint.is_file() {
            error!(expected = %run.best_checkpoint.display(), "Best checkpoint missing, skipping export");
            return Err(TrainingError::ArtifactNotFound(run.best_checkpoint));
        }

        let layout = OutputLayout::new(settings.output_dir.clone());
        progress::started(progress, Stage::Relocate, format!("Moving checkpoint to {}", layout.root().display()));
        layout.ensure()?;
        let checkpoint = relocate(&run.best_checkpoint, layout.root())?;
        announce_relocation(&checkpoint, progress);
        progress::finished(progress, Stage::Relocate, format!("Best model moved to {}", checkpoint.to.display()));

        let export = match settings.export_format {
            None => {
                info!("Export disabled by configuration");
                ExportOutcome::SkippedByConfig
            }
            Some(format) => {
                progress::started(progress, Stage::Export, format!("Exporting model to {format}"));
                match self.export(&checkpoint.to, format, settings.imgsz, &layout, progress).await {
                    Ok(path) => {
                        progress::finished(progress, Stage::Export, format!("{format} model saved to {}", path.display()));
                        ExportOutcome::Relocated { path }
                    }
                    Err(e) => {
                        warn!(error = %e, "Export failed, checkpoint is kept");
                        let message = format!("{}: {e}", e.code());
                        progress::warning(progress, e.code(), message.clone());
                        warnings.push(message);
                        ExportOutcome::Failed { message: e.to_string() }
                    }
                }
            }
        };

        let manifest = write_manifest(&job_id, settings, &layout, &checkpoint.to, &export, progress, &mut warnings);

        info!(job_id = %job_id, warnings = warnings.len(), "Training job finished");
        Ok(TrainReport {
            job_id,
            state: TrainState::Succeeded,
            checkpoint: checkpoint.to,
            export,
            manifest,
            warnings,
        })
    }

    async fn init_tracking(
        &self,
        tracking: &TrackingSettings,
        progress: &dyn ProgressSink,
        warnings: &mut Vec<String>,
    ) {
        let Some(project) = tracking.active_project() else {
            info!("Experiment tracking not configured, skipping");
            return;
        };

        progress::started(progress, Stage::Tracking, format!("Initializing {} tracking for {project}", self.tracker.id()));
        let result = match self.tracker.login().await {
            Ok(()) => self.tracker.init(project).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => progress::finished(progress, Stage::Tracking, format!("Tracking project {project}")),
            Err(e) => {
                warn!(tracker = self.tracker.id(), error = %e, "Tracking unavailable, continuing without it");
                let message = format!("TrackingUnavailable: {e}");
                progress::warning(progress, "TrackingUnavailable", message.clone());
                warnings.push(message);
            }
        }
    }

    async fn export(
        &self,
        checkpoint: &Path,
        format: ExportFormat,
        imgsz: u32,
        layout: &OutputLayout,
        progress: &dyn ProgressSink,
    ) -> TrainingResult<PathBuf> {
        // Exports land next to the checkpoint, replacing a previous export before relocation runs.
        let in_place = format.artifact_path(checkpoint);
        let replaces_previous = in_place.is_file();

        let reference = checkpoint.to_string_lossy();
        let model = self.backend.load(&reference).await.map_err(TrainingError::ExportFailed)?;
        let exported = model
            .export(&ExportRequest { format, imgsz })
            .await
            .map_err(TrainingError::ExportFailed)?;

        let mut moved = relocate(&exported, layout.root()).map_err(|e| match e {
            TrainingError::ArtifactNotFound(path) => TrainingError::ExportFailed(BackendError::InvalidOutput(
                format!("exported artifact missing: {}", path.display()),
            )),
            other => TrainingError::ExportFailed(BackendError::Io(other.to_string())),
        })?;
        if replaces_previous && !moved.overwrote && moved.to == in_place {
            warn!(path = %in_place.display(), "Overwrote existing export");
            moved.overwrote = true;
        }
        announce_relocation(&moved, progress);
        Ok(moved.to)
    }
}

fn write_manifest(
    job_id: &TrainingJobId,
    settings: &TrainSettings,
    layout: &OutputLayout,
    checkpoint: &Path,
    export: &ExportOutcome,
    progress: &dyn ProgressSink,
    warnings: &mut Vec<String>,
) -> Option<PathBuf> {
    let build = || -> TrainingResult<PathBuf> {
        let mut artifacts = vec![make_artifact(ArtifactKind::Checkpoint, checkpoint.to_path_buf())?];
        if let ExportOutcome::Relocated { path } = export {
            artifacts.push(make_artifact(ArtifactKind::Export, path.clone())?);
        }

        let manifest = TrainingManifest {
            job_id: job_id.clone(),
            created_at: Utc::now(),
            base_model: settings.pretrained.clone(),
            data_config_file: settings.data_config_file.clone(),
            epochs: settings.epochs,
            imgsz: settings.imgsz,
            artifacts,
        };
        let path = layout.manifest_path();
        manifest.write(&path)?;
        Ok(path)
    };

    progress::started(progress, Stage::Manifest, "Writing training manifest");
    match build() {
        Ok(path) => {
            progress::finished(progress, Stage::Manifest, format!("Manifest written to {}", path.display()));
            Some(path)
        }
        Err(e) => {
            warn!(error = %e, "Failed to write training manifest");
            let message = format!("{}: failed to write training manifest: {e}", e.code());
            progress::warning(progress, e.code(), message.clone());
            warnings.push(message);
            None
        }
    }
}

fn announce_relocation(relocation: &Relocation, progress: &dyn ProgressSink) {
    if relocation.overwrote {
        progress::notice(progress, format!("Overwrote existing {}", relocation.to.display()));
    }
}
