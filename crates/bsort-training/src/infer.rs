//! Single-image inference orchestration.

use crate::artifacts::move_file;
use crate::config::ConfigDocument;
use crate::error::{TrainingError, TrainingResult};
use crate::layout::result_path;
use crate::progress::{self, ProgressSink, Stage};
use crate::settings::InferSettings;
use bsort_abstraction::{DetectionBackend, Detection};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// What to do with the annotated result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Write `<stem>_result.<ext>` next to the input image.
    #[default]
    Save,
    /// Let the backend display the result; nothing is written.
    Show,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferRequest {
    pub image: PathBuf,
    pub mode: OutputMode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferReport {
    pub image: PathBuf,
    pub model_weights: PathBuf,
    pub detections: Vec<Detection>,
    pub result_path: Option<PathBuf>,
}

/// Fails with `ImageNotFound` unless `image` is an existing file.
pub fn check_image(image: &Path) -> TrainingResult<()> {
    if image.is_file() { Ok(()) } else { Err(TrainingError::ImageNotFound(image.to_path_buf())) }
}

pub struct InferenceOrchestrator {
    backend: Arc<dyn DetectionBackend>,
}

impl InferenceOrchestrator {
    #[must_use]
    pub fn new(backend: Arc<dyn DetectionBackend>) -> Self {
        Self { backend }
    }

    /// Check preconditions (image, then model weights) and run one prediction.
    pub async fn run(
        &self,
        request: &InferRequest,
        config: &ConfigDocument,
        progress: &dyn ProgressSink,
    ) -> TrainingResult<InferReport> {
        check_image(&request.image)?;
        let settings = InferSettings::from_config(config)?;
        if !settings.model_weights.is_file() {
            return Err(TrainingError::ModelNotFound(settings.model_weights));
        }

        progress::started(progress, Stage::Predict, format!("Loading model from {}", settings.model_weights.display()));
        let model = self
            .backend
            .load(&settings.model_weights.to_string_lossy())
            .await
            .map_err(TrainingError::InferenceFailed)?;

        info!(image = %request.image.display(), backend = self.backend.id(), "Running inference");
        let show = request.mode == OutputMode::Show;
        let prediction = model
            .predict(&settings.predict_request(&request.image, show))
            .await
            .map_err(TrainingError::InferenceFailed)?;
        progress::finished(
            progress,
            Stage::Predict,
            format!("{} detection(s) in {}", prediction.detections.len(), request.image.display()),
        );

        let result_path = match (request.mode, prediction.annotated_image) {
            (OutputMode::Show, _) => None,
            (OutputMode::Save, Some(annotated)) => {
                let extension = annotated.extension().and_then(|e| e.to_str()).unwrap_or("jpg").to_string();
                let dest = result_path(&request.image, &extension);
                progress::started(progress, Stage::Persist, format!("Saving result to {}", dest.display()));
                let moved = move_file(&annotated, &dest)?;
                if moved.overwrote {
                    progress::notice(progress, format!("Overwrote existing {}", dest.display()));
                }
                progress::finished(progress, Stage::Persist, format!("Result saved to {}", dest.display()));
                Some(dest)
            }
            (OutputMode::Save, None) => {
                warn!(image = %request.image.display(), "Backend did not produce an annotated image");
                progress::notice(progress, "Backend did not produce an annotated image; nothing saved");
                None
            }
        };

        Ok(InferReport {
            image: request.image.clone(),
            model_weights: settings.model_weights,
            detections: prediction.detections,
            result_path,
        })
    }
}
