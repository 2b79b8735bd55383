//! Backend and tracker factories.
//!
//! The CLI resolves `--backend` / `--tracker` strings once at start-up and hands the resulting
//! trait objects to the orchestrators.

use crate::{MockBackend, NoopTracker, UltralyticsBackend, WandbTracker};
use bsort_abstraction::{BackendError, DetectionBackend, ExperimentTracker};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Backend type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Ultralytics `yolo` CLI.
    Ultralytics,
    /// Placeholder artifacts, no detection library required.
    Mock,
}

impl FromStr for BackendType {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ultralytics" | "yolo" => Ok(Self::Ultralytics),
            "mock" => Ok(Self::Mock),
            other => Err(BackendError::Unsupported(format!("backend '{other}'"))),
        }
    }
}

/// Backend configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub backend_type: BackendType,
    /// Executable override for CLI-driven backends.
    pub binary: Option<String>,
    /// Scratch directory for prediction output.
    pub work_dir: Option<PathBuf>,
}

impl BackendConfig {
    #[must_use]
    pub fn new(backend_type: BackendType) -> Self {
        Self { backend_type, binary: None, work_dir: None }
    }

    #[must_use]
    pub fn with_binary(mut self, binary: String) -> Self {
        self.binary = Some(binary);
        self
    }

    #[must_use]
    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = Some(work_dir);
        self
    }
}

/// Factory for creating backend instances.
pub struct BackendFactory;

impl BackendFactory {
    /// Creates a backend from the given configuration.
    pub fn create(config: BackendConfig) -> Arc<dyn DetectionBackend> {
        debug!(backend_type = ?config.backend_type, binary = ?config.binary, "Creating detection backend");

        match config.backend_type {
            BackendType::Ultralytics => {
                let mut backend = UltralyticsBackend::new();
                if let Some(binary) = config.binary {
                    backend = backend.with_binary(binary);
                }
                if let Some(work_dir) = config.work_dir {
                    backend = backend.with_work_dir(work_dir);
                }
                Arc::new(backend)
            }
            BackendType::Mock => {
                let mut backend = MockBackend::new();
                if let Some(work_dir) = config.work_dir {
                    backend = backend.with_work_dir(work_dir);
                }
                Arc::new(backend)
            }
        }
    }
}

/// Tracker type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerType {
    Wandb,
    None,
}

impl FromStr for TrackerType {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wandb" => Ok(Self::Wandb),
            "none" | "off" => Ok(Self::None),
            other => Err(BackendError::Unsupported(format!("tracker '{other}'"))),
        }
    }
}

/// Factory for creating experiment trackers.
pub struct TrackerFactory;

impl TrackerFactory {
    pub fn create(tracker_type: TrackerType) -> Arc<dyn ExperimentTracker> {
        match tracker_type {
            TrackerType::Wandb => Arc::new(WandbTracker::new()),
            TrackerType::None => Arc::new(NoopTracker),
        }
    }
}
