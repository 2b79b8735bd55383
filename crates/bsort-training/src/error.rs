use bsort_abstraction::BackendError;
use std::path::PathBuf;
use thiserror::Error;

pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("failed to parse configuration file {}: {message}", path.display())]
    ConfigParseError { path: PathBuf, message: String },

    #[error("missing configuration key: {0}")]
    MissingConfigKey(String),

    #[error("invalid value for configuration key {key}: {message}")]
    InvalidConfigValue { key: String, message: String },

    #[error("missing required argument: {0}")]
    MissingArgument(String),

    #[error("image file not found: {}", .0.display())]
    ImageNotFound(PathBuf),

    #[error("model weights not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("best checkpoint not found at expected path: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("training failed: {0}")]
    TrainingFailed(#[source] BackendError),

    #[error("inference failed: {0}")]
    InferenceFailed(#[source] BackendError),

    #[error("export failed: {0}")]
    ExportFailed(#[source] BackendError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl TrainingError {
    /// Stable name of the error kind, used in console messages and warnings.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ConfigNotFound(_) => "ConfigNotFound",
            Self::ConfigParseError { .. } => "ConfigParseError",
            Self::MissingConfigKey(_) => "MissingConfigKey",
            Self::InvalidConfigValue { .. } => "InvalidConfigValue",
            Self::MissingArgument(_) => "MissingArgument",
            Self::ImageNotFound(_) => "ImageNotFound",
            Self::ModelNotFound(_) => "ModelNotFound",
            Self::ArtifactNotFound(_) => "ArtifactNotFound",
            Self::TrainingFailed(_) => "TrainingFailed",
            Self::InferenceFailed(_) => "InferenceFailed",
            Self::ExportFailed(_) => "ExportFailed",
            Self::Io(_) => "Io",
            Self::Json(_) => "Json",
        }
    }

    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue { key: key.to_string(), message: message.into() }
    }
}
