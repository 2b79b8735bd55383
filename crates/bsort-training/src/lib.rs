//! bsort Training
//!
//! Configuration-driven pipeline around a detection backend:
//! - Loading YAML settings and validating them per command
//! - Sequencing training (track, train, locate, relocate, export)
//! - Running single-image inference
//! - Moving artifacts into the output directory and recording a manifest

pub mod artifacts;
pub mod config;
pub mod error;
pub mod infer;
pub mod layout;
pub mod progress;
pub mod settings;
pub mod train;

pub use artifacts::{ArtifactKind, Relocation, TrainingArtifact, TrainingJobId, TrainingManifest};
pub use config::{load_config, ConfigDocument, DEFAULT_CONFIG_PATH};
pub use error::{TrainingError, TrainingResult};
pub use infer::{check_image, InferReport, InferRequest, InferenceOrchestrator, OutputMode};
pub use layout::OutputLayout;
pub use progress::{NullProgressSink, ProgressEvent, ProgressSink, Stage};
pub use settings::{InferSettings, TrackingSettings, TrainSettings};
pub use train::{ExportOutcome, TrainReport, TrainState, TrainingOrchestrator};
