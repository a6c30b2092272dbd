use std::path::{Path, PathBuf};

use crate::errors::{ArtifactErrKind, ArtifactError};

pub const ARTIFACT_EXT: &str = "png";
pub const MAX_NAME_LEN: usize = 128;

/// Strips one trailing `.png` so `main.png` and `main` address the same file.
pub fn normalize_name(name: &str) -> &str {
    name.strip_suffix(".png").unwrap_or(name)
}

pub fn validate_name(name: &str) -> Result<(), ArtifactError> {
    let invalid = |reason: &str| {
        ArtifactError::new(ArtifactErrKind::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };
    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("name exceeds 128 characters"));
    }
    if name.starts_with('.') {
        return Err(invalid("name must not start with '.'"));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(invalid(&format!("character '{bad}' is not allowed")));
    }
    Ok(())
}

pub fn artifact_path(root: &Path, name: &str) -> PathBuf {
    root.join(format!("{}.{ARTIFACT_EXT}", normalize_name(name)))
}

pub fn temp_path(path: &Path) -> PathBuf {
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{file}.tmp"))
}
