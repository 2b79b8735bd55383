//! YAML configuration loading.
//!
//! `load_config` only checks that the file exists and is a YAML mapping. The typed accessors
//! on `ConfigDocument` are what the settings structs use to validate the keys they consume.

use crate::error::{TrainingError, TrainingResult};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

/// Default location of the settings document, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "configs/settings.yaml";

/// A parsed settings document, preserving the document's key structure.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    path: PathBuf,
    root: Mapping,
}

/// Load a YAML settings document from `path`.
pub fn load_config(path: &Path) -> TrainingResult<ConfigDocument> {
    if !path.is_file() {
        return Err(TrainingError::ConfigNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
            TrainingError::ConfigNotFound(path.to_path_buf())
        }
        std::io::ErrorKind::InvalidData => TrainingError::ConfigParseError {
            path: path.to_path_buf(),
            message: "file is not valid UTF-8".to_string(),
        },
        _ => TrainingError::Io(e),
    })?;

    ConfigDocument::from_yaml_str(&content, path)
}

impl ConfigDocument {
    /// Parse `content`; `path` is only used for error messages.
    pub fn from_yaml_str(content: &str, path: &Path) -> TrainingResult<Self> {
        let parse_error = |message: String| TrainingError::ConfigParseError {
            path: path.to_path_buf(),
            message,
        };

        let value: Value = serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?;
        match value {
            Value::Mapping(root) => Ok(Self { path: path.to_path_buf(), root }),
            Value::Null => Err(parse_error("document is empty".to_string())),
            _ => Err(parse_error("top level must be a mapping".to_string())),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn mapping(&self) -> &Mapping {
        &self.root
    }

    /// Serialize the document back to YAML.
    pub fn to_yaml_string(&self) -> TrainingResult<String> {
        serde_yaml::to_string(&self.root).map_err(|e| TrainingError::ConfigParseError {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    /// Look up a dotted key such as `data.data_config_file`. Explicit `null` counts as absent.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        let mut segments = key.split('.');
        let mut current = self.root.get(segments.next()?)?;
        for segment in segments {
            current = current.as_mapping()?.get(segment)?;
        }
        (!current.is_null()).then_some(current)
    }

    pub fn require_str(&self, key: &str) -> TrainingResult<String> {
        self.optional_str(key)?.ok_or_else(|| TrainingError::MissingConfigKey(key.to_string()))
    }

    pub fn optional_str(&self, key: &str) -> TrainingResult<Option<String>> {
        match self.lookup(key) {
            None => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => {
                Err(TrainingError::invalid(key, "must not be empty"))
            }
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(TrainingError::invalid(key, format!("expected a string, found {}", kind(other)))),
        }
    }

    pub fn optional_u32(&self, key: &str) -> TrainingResult<Option<u32>> {
        match self.lookup(key) {
            None => Ok(None),
            Some(value) => value
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| {
                    TrainingError::invalid(key, format!("expected a non-negative integer, found {}", kind(value)))
                }),
        }
    }

    pub fn optional_f64(&self, key: &str) -> TrainingResult<Option<f64>> {
        match self.lookup(key) {
            None => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| TrainingError::invalid(key, format!("expected a number, found {}", kind(value)))),
        }
    }

    pub fn optional_bool(&self, key: &str) -> TrainingResult<Option<bool>> {
        match self.lookup(key) {
            None => Ok(None),
            Some(value) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| TrainingError::invalid(key, format!("expected true or false, found {}", kind(value)))),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SETTINGS: &str = r"
model:
  pretrained: yolov8n.pt
  imgsz: 640
  epochs: 50
  lr: 0.01
data:
  data_config_file: data/data.yaml
train:
  export: false
wandb:
  project: bottle-caps
";

    fn doc(content: &str) -> ConfigDocument {
        ConfigDocument::from_yaml_str(content, Path::new("settings.yaml")).unwrap()
    }

    #[test]
    fn test_load_missing_file_is_config_not_found() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nope.yaml");
        assert!(matches!(load_config(&path), Err(TrainingError::ConfigNotFound(p)) if p == path));
    }

    #[test]
    fn test_load_directory_is_config_not_found() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(load_config(temp.path()), Err(TrainingError::ConfigNotFound(_))));
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.yaml");
        std::fs::write(&path, "model: [unclosed\n").unwrap();
        assert!(matches!(load_config(&path), Err(TrainingError::ConfigParseError { .. })));
    }

    #[test]
    fn test_non_mapping_is_parse_error() {
        let err = ConfigDocument::from_yaml_str("- a\n- b\n", Path::new("x.yaml")).unwrap_err();
        assert!(matches!(err, TrainingError::ConfigParseError { .. }));

        let err = ConfigDocument::from_yaml_str("", Path::new("x.yaml")).unwrap_err();
        assert!(err.to_string().contains("document is empty"));
    }

    #[test]
    fn test_dump_then_load_round_trips() {
        let temp = TempDir::new().unwrap();
        let original = doc(SETTINGS);

        let path = temp.path().join("settings.yaml");
        std::fs::write(&path, original.to_yaml_string().unwrap()).unwrap();
        let reloaded = load_config(&path).unwrap();

        assert_eq!(reloaded.mapping(), original.mapping());
    }

    #[test]
    fn test_lookup_dotted_keys() {
        let doc = doc(SETTINGS);
        assert_eq!(doc.require_str("model.pretrained").unwrap(), "yolov8n.pt");
        assert_eq!(doc.optional_u32("model.epochs").unwrap(), Some(50));
        assert_eq!(doc.optional_f64("model.lr").unwrap(), Some(0.01));
        assert_eq!(doc.optional_bool("train.export").unwrap(), Some(false));
        assert!(doc.lookup("model.pretrained.extra").is_none());
        assert!(doc.lookup("infer.model_weights").is_none());
    }

    #[test]
    fn test_missing_required_key_names_it() {
        let doc = doc("model:\n  pretrained: yolov8n.pt\n");
        let err = doc.require_str("data.data_config_file").unwrap_err();
        assert!(matches!(err, TrainingError::MissingConfigKey(k) if k == "data.data_config_file"));
    }

    #[test]
    fn test_null_counts_as_missing() {
        let doc = doc("data:\n  data_config_file:\n");
        assert!(matches!(
            doc.require_str("data.data_config_file"),
            Err(TrainingError::MissingConfigKey(_))
        ));
    }

    #[test]
    fn test_wrong_types_are_invalid() {
        let doc = doc("model:\n  epochs: many\n  imgsz: -5\n  pretrained: 3\n");
        assert!(matches!(doc.optional_u32("model.epochs"), Err(TrainingError::InvalidConfigValue { .. })));
        assert!(matches!(doc.optional_u32("model.imgsz"), Err(TrainingError::InvalidConfigValue { .. })));
        assert!(matches!(doc.require_str("model.pretrained"), Err(TrainingError::InvalidConfigValue { .. })));
    }
}
