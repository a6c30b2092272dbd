use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ArtifactErrKind {
    #[error("invalid artifact name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
    #[error("io failure: {0}")]
    Io(String),
    #[error("serialization failure: {0}")]
    Serialize(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error(transparent)]
pub struct ArtifactError(pub ArtifactErrKind);

impl ArtifactError {
    pub fn new(kind: ArtifactErrKind) -> Self {
        Self(kind)
    }

    pub fn kind(&self) -> &ArtifactErrKind {
        &self.0
    }

    pub fn io(err: std::io::Error) -> Self {
        Self(ArtifactErrKind::Io(err.to_string()))
    }
}

impl From<ArtifactErrKind> for ArtifactError {
    fn from(kind: ArtifactErrKind) -> Self {
        ArtifactError(kind)
    }
}

impl From<std::io::Error> for ArtifactError {
    fn from(err: std::io::Error) -> Self {
        ArtifactError::io(err)
    }
}
