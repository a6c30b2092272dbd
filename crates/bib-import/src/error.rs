use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("front matter serialization failed: {0}")]
    FrontMatter(#[from] serde_yaml::Error),
}

impl ImportError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        ImportError::Parse {
            line,
            message: message.into(),
        }
    }
}
