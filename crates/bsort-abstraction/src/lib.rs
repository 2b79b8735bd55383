//! Detection backend abstraction layer for bsort.
//!
//! This module defines the traits and value types the orchestrators use to talk to an
//! object-detection library and to an experiment tracker, without depending on either.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Represents an error that can occur when driving a detection backend.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendError {
    /// The backend executable could not be found.
    #[error("Backend binary not found: {0}")]
    BinaryNotFound(String),

    /// The backend process ran but reported failure.
    #[error("Backend command `{command}` failed{}", status.as_ref().map(|s| format!(" with exit status {s}")).unwrap_or_default())]
    ProcessFailed {
        /// The command line that was executed.
        command: String,
        /// Exit status, if the process exited normally.
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<i32>,
    },

    /// The backend finished but did not produce what it promised.
    #[error("Backend output invalid: {0}")]
    InvalidOutput(String),

    /// The requested operation is not supported by this backend.
    #[error("Unsupported backend operation: {0}")]
    Unsupported(String),

    /// An I/O error while preparing or collecting backend files.
    #[error("Backend I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Parameters for one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainRequest {
    /// Dataset descriptor (e.g. a `data.yaml` listing image folders and class names).
    pub data: PathBuf,
    pub epochs: u32,
    pub batch_size: u32,
    pub imgsz: u32,
    /// Initial learning rate. `None` keeps the backend default.
    pub learning_rate: Option<f64>,
    /// Early-stopping patience in epochs. `None` keeps the backend default.
    pub patience: Option<u32>,
    /// Project directory the backend writes runs under.
    pub project: String,
    /// Run name inside the project directory.
    pub run_name: String,
}

/// A completed training run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainRun {
    /// Directory the backend wrote the run into.
    pub save_dir: PathBuf,
    /// Path of the best checkpoint, as reported by the backend. Not guaranteed to exist.
    pub best_checkpoint: PathBuf,
}

/// Parameters for a single-image prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub source: PathBuf,
    pub confidence: f32,
    /// NMS IoU threshold. `None` keeps the backend default.
    pub iou: Option<f32>,
    pub device: Option<String>,
    pub half: bool,
    /// Display the annotated result instead of saving it.
    pub show: bool,
}

/// Axis-aligned box in normalized `xywh` form (center, width, height in `[0, 1]`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_center: f32,
    pub y_center: f32,
    pub width: f32,
    pub height: f32,
}

/// One detected object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// The outcome of a prediction. An empty detection list is a valid result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub detections: Vec<Detection>,
    /// Annotated copy of the input written by the backend, if it saved one.
    pub annotated_image: Option<PathBuf>,
}

/// Secondary model formats a checkpoint can be exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Onnx,
    TorchScript,
    /// TensorRT engine.
    Engine,
}

impl ExportFormat {
    /// Backend-facing format name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Onnx => "onnx",
            Self::TorchScript => "torchscript",
            Self::Engine => "engine",
        }
    }

    /// File extension of the exported artifact.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Onnx => "onnx",
            Self::TorchScript => "torchscript",
            Self::Engine => "engine",
        }
    }

    /// Where an export of `weights` lands: next to it, with the format's extension.
    #[must_use]
    pub fn artifact_path(self, weights: &Path) -> PathBuf {
        weights.with_extension(self.extension())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "onnx" => Ok(Self::Onnx),
            "torchscript" => Ok(Self::TorchScript),
            "engine" | "tensorrt" => Ok(Self::Engine),
            other => Err(BackendError::Unsupported(format!("export format '{other}'"))),
        }
    }
}

/// Parameters for an export call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub format: ExportFormat,
    pub imgsz: u32,
}

/// A loaded detection model.
///
/// Implementations must be `Send + Sync`; the orchestrators only ever drive one call at a time.
#[async_trait]
pub trait DetectorModel: Send + Sync {
    /// The reference (pretrained name or weights path) this model was loaded from.
    fn reference(&self) -> &str;

    /// Runs a full training session. Blocks until the backend finishes.
    ///
    /// # Errors
    /// Returns a `BackendError` if the backend fails to train.
    async fn train(&self, request: &TrainRequest) -> Result<TrainRun, BackendError>;

    /// Predicts on a single image.
    ///
    /// # Errors
    /// Returns a `BackendError` if prediction fails.
    async fn predict(&self, request: &PredictRequest) -> Result<Prediction, BackendError>;

    /// Exports the model weights to another format, returning the artifact path.
    ///
    /// # Errors
    /// Returns a `BackendError` if export fails.
    async fn export(&self, request: &ExportRequest) -> Result<PathBuf, BackendError>;
}

/// Constructs models from a reference.
#[async_trait]
pub trait DetectionBackend: Send + Sync {
    /// Short backend identifier, e.g. `ultralytics`.
    fn id(&self) -> &'static str;

    /// Loads a model from a pretrained name (e.g. `yolov8n.pt`) or a weights path.
    ///
    /// # Errors
    /// Returns a `BackendError` if the model cannot be constructed.
    async fn load(&self, reference: &str) -> Result<Box<dyn DetectorModel>, BackendError>;
}

/// Errors reported by an experiment tracker. Callers treat all of them as non-fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackerError {
    #[error("Tracker binary not found: {0}")]
    BinaryNotFound(String),

    #[error("Tracker command failed: {0}")]
    CommandFailed(String),

    #[error("Tracker I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TrackerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Experiment tracking collaborator.
#[async_trait]
pub trait ExperimentTracker: Send + Sync {
    fn id(&self) -> &'static str;

    /// Authenticates with the tracking service.
    async fn login(&self) -> Result<(), TrackerError>;

    /// Binds subsequent runs to `project`.
    async fn init(&self, project: &str) -> Result<(), TrackerError>;
}
