//! Typed, validated settings for each command.
//!
//! Each `from_config` is the single point where a command's keys are checked. Nothing reaches
//! the backend until it has returned `Ok`.

use crate::config::ConfigDocument;
use crate::error::{TrainingError, TrainingResult};
use bsort_abstraction::{ExportFormat, PredictRequest, TrainRequest};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_IMGSZ: u32 = 640;
pub const DEFAULT_EPOCHS: u32 = 100;
pub const DEFAULT_BATCH_SIZE: u32 = 16;
pub const DEFAULT_PROJECT: &str = "runs";
pub const DEFAULT_RUN_NAME: &str = "train";
pub const DEFAULT_OUTPUT_DIR: &str = "models";
pub const DEFAULT_CONFIDENCE: f32 = 0.25;

/// Experiment tracking settings (`wandb` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackingSettings {
    pub project: Option<String>,
    pub enabled: bool,
}

impl TrackingSettings {
    pub fn from_config(config: &ConfigDocument) -> TrainingResult<Self> {
        Ok(Self {
            project: config.optional_str("wandb.project")?,
            enabled: config.optional_bool("wandb.enabled")?.unwrap_or(true),
        })
    }

    /// The project to initialize tracking for, or `None` when tracking is off.
    #[must_use]
    pub fn active_project(&self) -> Option<&str> {
        if self.enabled { self.project.as_deref() } else { None }
    }
}

/// Settings consumed by `train`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainSettings {
    pub pretrained: String,
    pub data_config_file: PathBuf,
    pub imgsz: u32,
    pub epochs: u32,
    pub batch_size: u32,
    pub learning_rate: Option<f64>,
    pub patience: Option<u32>,
    pub project: String,
    pub run_name: String,
    pub output_dir: PathBuf,
    /// `None` when export is disabled.
    pub export_format: Option<ExportFormat>,
    pub tracking: TrackingSettings,
}

impl TrainSettings {
    pub fn from_config(config: &ConfigDocument) -> TrainingResult<Self> {
        let pretrained = config.require_str("model.pretrained")?;
        let data_config_file = PathBuf::from(config.require_str("data.data_config_file")?);

        let imgsz = positive(config, "model.imgsz", DEFAULT_IMGSZ)?;
        let epochs = positive(config, "model.epochs", DEFAULT_EPOCHS)?;
        let batch_size = positive(config, "model.batch_size", DEFAULT_BATCH_SIZE)?;

        let learning_rate = config.optional_f64("model.lr")?;
        if let Some(lr) = learning_rate {
            if !lr.is_finite() || lr <= 0.0 {
                return Err(TrainingError::invalid("model.lr", "must be > 0"));
            }
        }
        let patience = config.optional_u32("model.patience")?;

        let export_enabled = config.optional_bool("train.export")?.unwrap_or(true);
        let export_format = if export_enabled {
            let raw = config
                .optional_str("train.export_format")?
                .unwrap_or_else(|| ExportFormat::Onnx.as_str().to_string());
            Some(raw.parse::<ExportFormat>().map_err(|e| TrainingError::invalid("train.export_format", e.to_string()))?)
        } else {
            None
        };

        // Backend tracking callbacks log under the run project; default it to the tracking project.
        let tracking = TrackingSettings::from_config(config)?;
        let project = match config.optional_str("train.project")? {
            Some(project) => project,
            None => tracking.active_project().unwrap_or(DEFAULT_PROJECT).to_string(),
        };

        Ok(Self {
            pretrained,
            data_config_file,
            imgsz,
            epochs,
            batch_size,
            learning_rate,
            patience,
            project,
            run_name: config.optional_str("train.run_name")?.unwrap_or_else(|| DEFAULT_RUN_NAME.to_string()),
            output_dir: config
                .optional_str("train.output_dir")?
                .map_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR), PathBuf::from),
            export_format,
            tracking,
        })
    }

    #[must_use]
    pub fn train_request(&self) -> TrainRequest {
        TrainRequest {
            data: self.data_config_file.clone(),
            epochs: self.epochs,
            batch_size: self.batch_size,
            imgsz: self.imgsz,
            learning_rate: self.learning_rate,
            patience: self.patience,
            project: self.project.clone(),
            run_name: self.run_name.clone(),
        }
    }
}

/// Settings consumed by `infer`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferSettings {
    pub model_weights: PathBuf,
    pub confidence_threshold: f32,
    pub iou_threshold: Option<f32>,
    pub device: Option<String>,
    pub half_precision: bool,
}

impl InferSettings {
    pub fn from_config(config: &ConfigDocument) -> TrainingResult<Self> {
        let model_weights = PathBuf::from(config.require_str("infer.model_weights")?);
        let confidence_threshold =
            unit_interval(config, "infer.confidence_threshold")?.unwrap_or(DEFAULT_CONFIDENCE);
        let iou_threshold = unit_interval(config, "infer.iou_threshold")?;

        Ok(Self {
            model_weights,
            confidence_threshold,
            iou_threshold,
            device: config.optional_str("infer.device")?,
            half_precision: config.optional_bool("infer.half_precision")?.unwrap_or(false),
        })
    }

    #[must_use]
    pub fn predict_request(&self, source: &Path, show: bool) -> PredictRequest {
        PredictRequest {
            source: source.to_path_buf(),
            confidence: self.confidence_threshold,
            iou: self.iou_threshold,
            device: self.device.clone(),
            half: self.half_precision,
            show,
        }
    }
}

fn positive(config: &ConfigDocument, key: &str, default: u32) -> TrainingResult<u32> {
    match config.optional_u32(key)? {
        Some(0) => Err(TrainingError::invalid(key, "must be >= 1")),
        Some(n) => Ok(n),
        None => Ok(default),
    }
}

fn unit_interval(config: &ConfigDocument, key: &str) -> TrainingResult<Option<f32>> {
    match config.optional_f64(key)? {
        Some(v) if !(0.0..=1.0).contains(&v) => Err(TrainingError::invalid(key, "must be between 0 and 1")),
        Some(v) => Ok(Some(v as f32)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(content: &str) -> ConfigDocument {
        ConfigDocument::from_yaml_str(content, Path::new("settings.yaml")).unwrap()
    }

    #[test]
    fn test_train_settings_defaults() {
        let settings = TrainSettings::from_config(&doc(
            "model:\n  pretrained: yolov8n.pt\ndata:\n  data_config_file: data.yaml\n",
        ))
        .unwrap();

        assert_eq!(settings.imgsz, DEFAULT_IMGSZ);
        assert_eq!(settings.epochs, DEFAULT_EPOCHS);
        assert_eq!(settings.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(settings.output_dir, PathBuf::from("models"));
        assert_eq!(settings.export_format, Some(ExportFormat::Onnx));
        assert_eq!(settings.tracking.active_project(), None);
        assert!(settings.learning_rate.is_none());
    }

    #[test]
    fn test_train_settings_requires_data_config_file() {
        let err = TrainSettings::from_config(&doc("model:\n  pretrained: yolov8n.pt\n")).unwrap_err();
        assert!(matches!(err, TrainingError::MissingConfigKey(k) if k == "data.data_config_file"));
    }

    #[test]
    fn test_train_settings_rejects_zero_epochs() {
        let err = TrainSettings::from_config(&doc(
            "model:\n  pretrained: yolov8n.pt\n  epochs: 0\ndata:\n  data_config_file: data.yaml\n",
        ))
        .unwrap_err();
        assert!(matches!(err, TrainingError::InvalidConfigValue { key, .. } if key == "model.epochs"));
    }

    #[test]
    fn test_train_settings_export_disabled_and_format() {
        let base = "model:\n  pretrained: yolov8n.pt\ndata:\n  data_config_file: data.yaml\n";

        let off = TrainSettings::from_config(&doc(&format!("{base}train:\n  export: false\n"))).unwrap();
        assert_eq!(off.export_format, None);

        let ts = TrainSettings::from_config(&doc(&format!("{base}train:\n  export_format: torchscript\n"))).unwrap();
        assert_eq!(ts.export_format, Some(ExportFormat::TorchScript));

        let err = TrainSettings::from_config(&doc(&format!("{base}train:\n  export_format: coreml\n"))).unwrap_err();
        assert!(matches!(err, TrainingError::InvalidConfigValue { .. }));
    }

    #[test]
    fn test_tracking_can_be_disabled() {
        let tracking = TrackingSettings::from_config(&doc("wandb:\n  project: caps\n  enabled: false\n")).unwrap();
        assert_eq!(tracking.active_project(), None);

        let tracking = TrackingSettings::from_config(&doc("wandb:\n  project: caps\n")).unwrap();
        assert_eq!(tracking.active_project(), Some("caps"));
    }

    #[test]
    fn test_run_project_defaults_to_tracking_project() {
        let base = "model:\n  pretrained: yolov8n.pt\ndata:\n  data_config_file: data.yaml\n";

        let tracked = TrainSettings::from_config(&doc(&format!("{base}wandb:\n  project: bottle-caps\n"))).unwrap();
        assert_eq!(tracked.train_request().project, "bottle-caps");

        let explicit = TrainSettings::from_config(&doc(&format!(
            "{base}train:\n  project: runs\nwandb:\n  project: bottle-caps\n"
        )))
        .unwrap();
        assert_eq!(explicit.project, "runs");

        let disabled = TrainSettings::from_config(&doc(&format!(
            "{base}wandb:\n  project: bottle-caps\n  enabled: false\n"
        )))
        .unwrap();
        assert_eq!(disabled.project, DEFAULT_PROJECT);

        let untracked = TrainSettings::from_config(&doc(base)).unwrap();
        assert_eq!(untracked.project, DEFAULT_PROJECT);
    }

    #[test]
    fn test_train_request_carries_hyperparams() {
        let settings = TrainSettings::from_config(&doc(
            "model:\n  pretrained: yolov8n.pt\n  imgsz: 320\n  epochs: 3\n  batch_size: 4\n  lr: 0.001\n\
             data:\n  data_config_file: data.yaml\ntrain:\n  project: caps\n  run_name: cli_train_run\n",
        ))
        .unwrap();
        let request = settings.train_request();

        assert_eq!(request.imgsz, 320);
        assert_eq!(request.epochs, 3);
        assert_eq!(request.batch_size, 4);
        assert_eq!(request.learning_rate, Some(0.001));
        assert_eq!(request.project, "caps");
        assert_eq!(request.run_name, "cli_train_run");
    }

    #[test]
    fn test_infer_settings() {
        let settings = InferSettings::from_config(&doc(
            "infer:\n  model_weights: models/best.pt\n  confidence_threshold: 0.4\n  iou_threshold: 0.6\n",
        ))
        .unwrap();
        assert_eq!(settings.model_weights, PathBuf::from("models/best.pt"));
        assert!((settings.confidence_threshold - 0.4).abs() < f32::EPSILON);
        assert_eq!(settings.iou_threshold, Some(0.6));

        let request = settings.predict_request(Path::new("img.jpg"), false);
        assert!(!request.show);
        assert!(!request.half);
    }

    #[test]
    fn test_infer_settings_requires_weights_and_bounds_thresholds() {
        let err = InferSettings::from_config(&doc("infer:\n  confidence_threshold: 0.4\n")).unwrap_err();
        assert!(matches!(err, TrainingError::MissingConfigKey(k) if k == "infer.model_weights"));

        let err = InferSettings::from_config(&doc(
            "infer:\n  model_weights: best.pt\n  confidence_threshold: 1.5\n",
        ))
        .unwrap_err();
        assert!(matches!(err, TrainingError::InvalidConfigValue { key, .. } if key == "infer.confidence_threshold"));
    }
}
