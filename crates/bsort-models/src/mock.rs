//! Mock backend for tests and dry runs.
//!
//! Produces placeholder artifacts at the same locations a real backend would, so the
//! orchestrators' file bookkeeping can be exercised without a detection library installed.

use async_trait::async_trait;
use bsort_abstraction::{
    BackendError, Detection, DetectionBackend, DetectorModel, ExportFormat, ExportRequest,
    PredictRequest, Prediction, TrainRequest, TrainRun,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Default scratch directory for mock prediction output.
pub const DEFAULT_WORK_DIR: &str = "runs/bsort-mock";

/// Behaviour switches shared by a mock backend and the models it loads.
#[derive(Debug, Clone, Default)]
struct MockBehaviour {
    fail_training: bool,
    skip_checkpoint: bool,
    fail_export: bool,
    detections: Vec<Detection>,
}

/// A mock implementation of `DetectionBackend`.
#[derive(Debug, Clone)]
pub struct MockBackend {
    behaviour: MockBehaviour,
    work_dir: PathBuf,
    loads: Arc<AtomicUsize>,
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            behaviour: MockBehaviour::default(),
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    /// Training calls fail with a process error.
    #[must_use]
    pub fn with_failing_training(mut self) -> Self {
        self.behaviour.fail_training = true;
        self
    }

    /// Training succeeds but never writes the best checkpoint.
    #[must_use]
    pub fn without_checkpoint(mut self) -> Self {
        self.behaviour.skip_checkpoint = true;
        self
    }

    /// Export calls fail with a process error.
    #[must_use]
    pub fn with_failing_export(mut self) -> Self {
        self.behaviour.fail_export = true;
        self
    }

    /// Detections every prediction returns.
    #[must_use]
    pub fn with_detections(mut self, detections: Vec<Detection>) -> Self {
        self.behaviour.detections = detections;
        self
    }

    /// Number of models loaded so far, across clones of this backend.
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DetectionBackend for MockBackend {
    fn id(&self) -> &'static str {
        "mock"
    }

    async fn load(&self, reference: &str) -> Result<Box<dyn DetectorModel>, BackendError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        debug!(reference = %reference, "MockBackend loading model");
        Ok(Box::new(MockModel {
            reference: reference.to_string(),
            work_dir: self.work_dir.clone(),
            behaviour: self.behaviour.clone(),
        }))
    }
}

/// Model handed out by `MockBackend`.
#[derive(Debug, Clone)]
pub struct MockModel {
    reference: String,
    work_dir: PathBuf,
    behaviour: MockBehaviour,
}

async fn write_placeholder(path: &Path, contents: String) -> Result<(), BackendError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    Ok(())
}

#[async_trait]
impl DetectorModel for MockModel {
    fn reference(&self) -> &str {
        &self.reference
    }

    async fn train(&self, request: &TrainRequest) -> Result<TrainRun, BackendError> {
        debug!(reference = %self.reference, request = ?request, "MockModel training");

        if self.behaviour.fail_training {
            return Err(BackendError::ProcessFailed { command: "mock train".to_string(), status: Some(1) });
        }

        let save_dir = Path::new(&request.project).join(&request.run_name);
        let best_checkpoint = save_dir.join("weights").join("best.pt");

        if self.behaviour.skip_checkpoint {
            tokio::fs::create_dir_all(save_dir.join("weights")).await?;
        } else {
            write_placeholder(
                &best_checkpoint,
                format!(
                    "mock checkpoint\nbase: {}\ndata: {}\nepochs: {}\n",
                    self.reference,
                    request.data.display(),
                    request.epochs
                ),
            )
            .await?;
        }

        Ok(TrainRun { save_dir, best_checkpoint })
    }

    async fn predict(&self, request: &PredictRequest) -> Result<Prediction, BackendError> {
        debug!(reference = %self.reference, request = ?request, "MockModel predicting");

        let annotated_image = if request.show {
            None
        } else {
            let file_name = request.source.file_name().ok_or_else(|| {
                BackendError::InvalidOutput(format!("source has no file name: {}", request.source.display()))
            })?;
            let annotated = self.work_dir.join("predict").join(file_name);
            if let Some(parent) = annotated.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(&request.source, &annotated).await?;
            Some(annotated)
        };

        Ok(Prediction { detections: self.behaviour.detections.clone(), annotated_image })
    }

    async fn export(&self, request: &ExportRequest) -> Result<PathBuf, BackendError> {
        debug!(reference = %self.reference, format = %request.format, "MockModel exporting");

        if self.behaviour.fail_export {
            return Err(BackendError::ProcessFailed { command: "mock export".to_string(), status: Some(1) });
        }
        // TensorRT engines need a GPU toolchain; the mock never has one.
        if request.format == ExportFormat::Engine {
            return Err(BackendError::Unsupported("mock backend cannot build TensorRT engines".to_string()));
        }

        let artifact = request.format.artifact_path(Path::new(&self.reference));
        write_placeholder(
            &artifact,
            format!("mock {} export of {} at imgsz {}\n", request.format, self.reference, request.imgsz),
        )
        .await?;
        Ok(artifact)
    }
}
