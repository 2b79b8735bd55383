use crate::error::TrainingResult;
use std::path::{Path, PathBuf};

/// Canonical output location for training artifacts.
///
/// Default layout is `models/<artifact file name>` plus `models/training_manifest.json`.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("training_manifest.json")
    }

    pub fn ensure(&self) -> TrainingResult<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

/// Where an inference result for `image` is persisted: `<stem>_result.<extension>` next to it.
#[must_use]
pub fn result_path(image: &Path, extension: &str) -> PathBuf {
    let stem = image.file_stem().map_or_else(|| "image".into(), |s| s.to_string_lossy());
    image.with_file_name(format!("{stem}_result.{extension}"))
}
