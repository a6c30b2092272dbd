//! Maps logical artifact names onto files under a run directory.
//!
//! File names are a pure function of the artifact name, so running the same
//! scenario twice overwrites the previous captures instead of accumulating new
//! ones. Writes are atomic and never retried.

pub mod errors;
pub mod fs;
pub mod model;
mod store;

pub use errors::{ArtifactErrKind, ArtifactError};
pub use model::Artifact;
pub use store::ArtifactStore;
