//! Ultralytics backend driven through the `yolo` command-line tool.
//!
//! Every operation spawns one `yolo` process with `key=value` overrides. Training output is
//! streamed straight to the terminal; artifact locations are derived from the same overrides
//! the process was given (`project`, `name`, `exist_ok=True`).

use async_trait::async_trait;
use bsort_abstraction::{
    BackendError, BoundingBox, DetectionBackend, Detection, DetectorModel, ExportRequest,
    PredictRequest, Prediction, TrainRequest, TrainRun,
};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Default executable name installed by the `ultralytics` Python package.
pub const DEFAULT_BINARY: &str = "yolo";

/// Default scratch directory for prediction output.
pub const DEFAULT_WORK_DIR: &str = "runs/bsort-predict";

/// Backend that shells out to the Ultralytics CLI.
#[derive(Debug, Clone)]
pub struct UltralyticsBackend {
    binary: String,
    work_dir: PathBuf,
}

impl UltralyticsBackend {
    #[must_use]
    pub fn new() -> Self {
        Self { binary: DEFAULT_BINARY.to_string(), work_dir: PathBuf::from(DEFAULT_WORK_DIR) }
    }

    /// Use a different `yolo` executable (e.g. one inside a virtualenv).
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Directory prediction runs are written under before the result is persisted.
    #[must_use]
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }
}

impl Default for UltralyticsBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DetectionBackend for UltralyticsBackend {
    fn id(&self) -> &'static str {
        "ultralytics"
    }

    async fn load(&self, reference: &str) -> Result<Box<dyn DetectorModel>, BackendError> {
        // The CLI loads weights per invocation; pretrained names are resolved (and downloaded)
        // by the tool itself, so there is nothing to check here.
        debug!(reference = %reference, binary = %self.binary, "Loading ultralytics model");
        Ok(Box::new(UltralyticsModel {
            binary: self.binary.clone(),
            work_dir: self.work_dir.clone(),
            reference: reference.to_string(),
        }))
    }
}

/// A model reference bound to the `yolo` executable.
#[derive(Debug, Clone)]
pub struct UltralyticsModel {
    binary: String,
    work_dir: PathBuf,
    reference: String,
}

impl UltralyticsModel {
    fn train_args(&self, request: &TrainRequest) -> Vec<String> {
        let mut args = vec![
            "detect".to_string(),
            "train".to_string(),
            format!("model={}", self.reference),
            format!("data={}", request.data.display()),
            format!("epochs={}", request.epochs),
            format!("batch={}", request.batch_size),
            format!("imgsz={}", request.imgsz),
            format!("project={}", request.project),
            format!("name={}", request.run_name),
            "exist_ok=True".to_string(),
        ];
        if let Some(lr) = request.learning_rate {
            args.push(format!("lr0={lr}"));
        }
        if let Some(patience) = request.patience {
            args.push(format!("patience={patience}"));
        }
        args
    }

    fn predict_args(&self, request: &PredictRequest) -> Vec<String> {
        let mut args = vec![
            "detect".to_string(),
            "predict".to_string(),
            format!("model={}", self.reference),
            format!("source={}", request.source.display()),
            format!("conf={}", request.confidence),
            format!("project={}", self.work_dir.display()),
            "name=predict".to_string(),
            "exist_ok=True".to_string(),
            "save_txt=True".to_string(),
            "save_conf=True".to_string(),
        ];
        if let Some(iou) = request.iou {
            args.push(format!("iou={iou}"));
        }
        if let Some(device) = &request.device {
            args.push(format!("device={device}"));
        }
        if request.half {
            args.push("half=True".to_string());
        }
        if request.show {
            args.push("show=True".to_string());
            args.push("save=False".to_string());
        } else {
            args.push("save=True".to_string());
        }
        args
    }

    fn export_args(&self, request: &ExportRequest) -> Vec<String> {
        vec![
            "export".to_string(),
            format!("model={}", self.reference),
            format!("format={}", request.format.as_str()),
            format!("imgsz={}", request.imgsz),
        ]
    }

    fn predict_dir(&self) -> PathBuf {
        self.work_dir.join("predict")
    }

    async fn run(&self, args: &[String]) -> Result<(), BackendError> {
        let rendered = render_command(&self.binary, args);
        debug!(command = %rendered, "Running ultralytics command");

        let status = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    BackendError::BinaryNotFound(self.binary.clone())
                } else {
                    BackendError::from(e)
                }
            })?;

        if !status.success() {
            return Err(BackendError::ProcessFailed { command: rendered, status: status.code() });
        }
        Ok(())
    }
}

#[async_trait]
impl DetectorModel for UltralyticsModel {
    fn reference(&self) -> &str {
        &self.reference
    }

    async fn train(&self, request: &TrainRequest) -> Result<TrainRun, BackendError> {
        self.run(&self.train_args(request)).await?;

        let save_dir = Path::new(&request.project).join(&request.run_name);
        let best_checkpoint = save_dir.join("weights").join("best.pt");
        Ok(TrainRun { save_dir, best_checkpoint })
    }

    async fn predict(&self, request: &PredictRequest) -> Result<Prediction, BackendError> {
        let file_name = request.source.file_name().ok_or_else(|| {
            BackendError::InvalidOutput(format!("source has no file name: {}", request.source.display()))
        })?;
        // Appended rather than `with_extension`, stems of exported dataset images contain dots.
        let mut label_name = request.source.file_stem().unwrap_or(file_name).to_os_string();
        label_name.push(".txt");
        let labels_path = self.predict_dir().join("labels").join(label_name);

        // `save_txt` appends to an existing label file, so clear the one from a previous run.
        match tokio::fs::remove_file(&labels_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.run(&self.predict_args(request)).await?;

        let detections = match tokio::fs::read_to_string(&labels_path).await {
            Ok(contents) => parse_labels(&contents)?,
            // No label file means nothing was detected.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let annotated_image = if request.show {
            None
        } else {
            let path = self.predict_dir().join(file_name);
            path.exists().then_some(path)
        };

        Ok(Prediction { detections, annotated_image })
    }

    async fn export(&self, request: &ExportRequest) -> Result<PathBuf, BackendError> {
        self.run(&self.export_args(request)).await?;

        let artifact = request.format.artifact_path(Path::new(&self.reference));
        if !artifact.exists() {
            return Err(BackendError::InvalidOutput(format!(
                "export reported success but {} does not exist",
                artifact.display()
            )));
        }
        Ok(artifact)
    }
}

fn render_command(binary: &str, args: &[String]) -> String {
    std::iter::once(binary).chain(args.iter().map(String::as_str)).collect::<Vec<_>>().join(" ")
}

/// Parses a YOLO label file written with `save_conf=True`.
///
/// Each non-empty line is `class x_center y_center width height confidence`, normalized.
pub fn parse_labels(contents: &str) -> Result<Vec<Detection>, BackendError> {
    let mut detections = Vec::new();

    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(BackendError::InvalidOutput(format!(
                "label line {} has {} fields, expected 6",
                idx + 1,
                fields.len()
            )));
        }

        let number = |i: usize| -> Result<f32, BackendError> {
            fields[i].parse::<f32>().map_err(|e| {
                BackendError::InvalidOutput(format!("label line {} field {}: {}", idx + 1, i + 1, e))
            })
        };

        let class = number(0)?;
        if class < 0.0 {
            return Err(BackendError::InvalidOutput(format!("label line {} has negative class", idx + 1)));
        }

        detections.push(Detection {
            class_id: class as u32,
            class_name: None,
            confidence: number(5)?,
            bbox: BoundingBox {
                x_center: number(1)?,
                y_center: number(2)?,
                width: number(3)?,
                height: number(4)?,
            },
        });
    }

    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsort_abstraction::ExportFormat;

    fn model(reference: &str) -> UltralyticsModel {
        UltralyticsModel {
            binary: DEFAULT_BINARY.to_string(),
            work_dir: PathBuf::from("scratch"),
            reference: reference.to_string(),
        }
    }

    #[test]
    fn test_parse_labels() {
        let contents = "0 0.5 0.5 0.25 0.25 0.91\n\n2 0.1 0.2 0.3 0.4 0.42\n";
        let detections = parse_labels(contents).unwrap();

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].class_id, 0);
        assert!((detections[0].confidence - 0.91).abs() < f32::EPSILON);
        assert_eq!(detections[1].class_id, 2);
        assert!((detections[1].bbox.height - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_labels_empty_is_no_detections() {
        assert!(parse_labels("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_labels_rejects_short_line() {
        let err = parse_labels("0 0.5 0.5 0.25 0.25\n").unwrap_err();
        assert!(matches!(err, BackendError::InvalidOutput(_)));
    }

    #[test]
    fn test_train_args_include_optional_overrides() {
        let request = TrainRequest {
            data: PathBuf::from("data/data.yaml"),
            epochs: 5,
            batch_size: 8,
            imgsz: 320,
            learning_rate: Some(0.001),
            patience: None,
            project: "runs".to_string(),
            run_name: "caps".to_string(),
        };
        let args = model("yolov8n.pt").train_args(&request);

        assert_eq!(&args[..2], ["detect", "train"]);
        assert!(args.contains(&"model=yolov8n.pt".to_string()));
        assert!(args.contains(&"data=data/data.yaml".to_string()));
        assert!(args.contains(&"lr0=0.001".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("patience=")));
    }

    #[test]
    fn test_predict_args_show_disables_save() {
        let request = PredictRequest {
            source: PathBuf::from("img.jpg"),
            confidence: 0.25,
            iou: Some(0.5),
            device: None,
            half: false,
            show: true,
        };
        let args = model("models/best.pt").predict_args(&request);

        assert!(args.contains(&"show=True".to_string()));
        assert!(args.contains(&"save=False".to_string()));
        assert!(args.contains(&"iou=0.5".to_string()));
    }

    #[test]
    fn test_export_args() {
        let request = ExportRequest { format: ExportFormat::Onnx, imgsz: 640 };
        let args = model("models/best.pt").export_args(&request);
        assert_eq!(args, ["export", "model=models/best.pt", "format=onnx", "imgsz=640"]);
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let backend = UltralyticsBackend::new().with_binary("nonexistent_binary_xyz123");
        let model = backend.load("yolov8n.pt").await.unwrap();
        let request = ExportRequest { format: ExportFormat::Onnx, imgsz: 640 };

        let err = model.export(&request).await.unwrap_err();
        assert_eq!(err, BackendError::BinaryNotFound("nonexistent_binary_xyz123".to_string()));
    }
}
