use crate::error::{TrainingError, TrainingResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Identifier for one `train` invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrainingJobId(pub String);

impl TrainingJobId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for TrainingJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrainingJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Checkpoint,
    Export,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub sha256: String,
}

/// Record of the artifacts a `train` run left in the output directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingManifest {
    pub job_id: TrainingJobId,
    pub created_at: DateTime<Utc>,
    pub base_model: String,
    pub data_config_file: PathBuf,
    pub epochs: u32,
    pub imgsz: u32,
    pub artifacts: Vec<TrainingArtifact>,
}

impl TrainingManifest {
    pub fn write(&self, path: &Path) -> TrainingResult<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn read(path: &Path) -> TrainingResult<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

pub fn sha256_file(path: &Path) -> TrainingResult<String> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

pub fn make_artifact(kind: ArtifactKind, path: PathBuf) -> TrainingResult<TrainingArtifact> {
    if !path.exists() {
        return Err(TrainingError::ArtifactNotFound(path));
    }

    let hash = sha256_file(&path)?;
    Ok(TrainingArtifact { kind, path, sha256: hash })
}

/// Result of moving a file to its canonical location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub from: PathBuf,
    pub to: PathBuf,
    /// A file already existed at `to` and was replaced.
    pub overwrote: bool,
}

/// Move `source` into `dest_dir`, keeping its file name. Creates `dest_dir` if needed and
/// replaces an existing file of the same name.
pub fn relocate(source: &Path, dest_dir: &Path) -> TrainingResult<Relocation> {
    if !source.is_file() {
        return Err(TrainingError::ArtifactNotFound(source.to_path_buf()));
    }
    let file_name = source
        .file_name()
        .ok_or_else(|| TrainingError::ArtifactNotFound(source.to_path_buf()))?;

    std::fs::create_dir_all(dest_dir)?;
    let dest = dest_dir.join(file_name);
    move_file(source, &dest)
}

/// Move `source` to `dest`, replacing `dest` if present.
pub fn move_file(source: &Path, dest: &Path) -> TrainingResult<Relocation> {
    let relocation = |overwrote| Relocation { from: source.to_path_buf(), to: dest.to_path_buf(), overwrote };

    if dest.exists() && same_file(source, dest)? {
        debug!(path = %dest.display(), "Artifact already at destination");
        return Ok(relocation(false));
    }

    let overwrote = dest.exists();
    if overwrote {
        warn!(path = %dest.display(), "Overwriting existing file");
    }

    match std::fs::rename(source, dest) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices => {
            std::fs::copy(source, dest)?;
            std::fs::remove_file(source)?;
        }
        Err(e) => return Err(e.into()),
    }

    debug!(from = %source.display(), to = %dest.display(), "Moved file");
    Ok(relocation(overwrote))
}

fn same_file(a: &Path, b: &Path) -> TrainingResult<bool> {
    Ok(a.canonicalize()? == b.canonicalize()?)
}
