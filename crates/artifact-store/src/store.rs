use std::path::{Path, PathBuf};

use chrono::Utc;
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::{ArtifactErrKind, ArtifactError};
use crate::fs::{layout, writer};
use crate::model::Artifact;

#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    ready: OnceCell<()>,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ready: OnceCell::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        layout::artifact_path(&self.root, name)
    }

    /// Creates the run directory on first use. Later calls are no-ops.
    /// Existing files in the directory are left alone.
    pub fn ensure_root(&self) -> Result<(), ArtifactError> {
        self.ready
            .get_or_try_init(|| {
                let existed = self.root.is_dir();
                std::fs::create_dir_all(&self.root).map_err(ArtifactError::io)?;
                if !existed {
                    info!(
                        target: "artifact-store",
                        root = %self.root.display(),
                        "created run directory"
                    );
                }
                Ok::<(), ArtifactError>(())
            })
            .map(|_| ())
    }

    pub fn save(&self, name: &str, frame: &[u8]) -> Result<Artifact, ArtifactError> {
        let name = layout::normalize_name(name);
        layout::validate_name(name)?;
        self.ensure_root()?;

        let path = writer::write_atomic(&self.path_for(name), frame)?;
        debug!(
            target: "artifact-store",
            artifact = name,
            bytes = frame.len(),
            path = %path.display(),
            "artifact written"
        );
        Ok(Artifact {
            name: name.to_string(),
            file_path: path,
            captured_at: Utc::now(),
            bytes: frame.len(),
        })
    }

    /// Writes a pretty-printed JSON side file (e.g. the run report) next to the artifacts.
    pub fn write_json<T: Serialize>(
        &self,
        file_name: &str,
        value: &T,
    ) -> Result<PathBuf, ArtifactError> {
        layout::validate_name(file_name)?;
        self.ensure_root()?;
        let data = serde_json::to_vec_pretty(value)
            .map_err(|err| ArtifactError::new(ArtifactErrKind::Serialize(err.to_string())))?;
        Ok(writer::write_atomic(&self.root.join(file_name), &data)?)
    }

    /// Writes a text side file such as a page dump, name taken verbatim.
    pub fn write_text(&self, file_name: &str, text: &str) -> Result<PathBuf, ArtifactError> {
        layout::validate_name(file_name)?;
        self.ensure_root()?;
        let path = writer::write_atomic(&self.root.join(file_name), text.as_bytes())?;
        debug!(
            target: "artifact-store",
            file = file_name,
            bytes = text.len(),
            "side file written"
        );
        Ok(path)
    }
}
