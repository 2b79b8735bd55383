//! Backend implementations for bsort.
//!
//! This crate provides concrete implementations of the `DetectionBackend` and
//! `ExperimentTracker` traits.
//!
//! # Supported Backends
//!
//! - **Ultralytics**: the `yolo` CLI from the `ultralytics` Python package
//! - **Mock**: placeholder artifacts for testing and dry runs
//!
//! # Supported Trackers
//!
//! - **Wandb**: the Weights & Biases `wandb` CLI
//! - **None**: tracking disabled

pub mod factory;
pub mod mock;
pub mod ultralytics;
pub mod wandb;

pub use factory::{BackendConfig, BackendFactory, BackendType, TrackerFactory, TrackerType};
pub use mock::{MockBackend, MockModel};
pub use ultralytics::{UltralyticsBackend, UltralyticsModel};
pub use wandb::{NoopTracker, WandbTracker};
