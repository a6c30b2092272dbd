//! Bibliography converter.
//!
//! Turns a BibTeX export into one static content page per entry, keyed by a
//! slug of the entry title. Independent of the capture sequencer.

mod error;
pub mod page;
pub mod parser;
pub mod slug;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

pub use error::ImportError;
pub use parser::{parse, BibEntry};
pub use slug::slugify;

/// What an import produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub entries: usize,
    /// Page directories, in entry order
    pub created: Vec<PathBuf>,
    /// Keys of entries without a usable title
    pub skipped: Vec<String>,
}

/// Converts BibTeX text into pages under `out_dir`.
pub fn import_str(content: &str, out_dir: &Path) -> Result<ImportSummary, ImportError> {
    let entries = parse(content)?;
    info!(entries = entries.len(), out = %out_dir.display(), "Importing publications");

    let mut summary = ImportSummary {
        entries: entries.len(),
        ..ImportSummary::default()
    };
    let mut seen = HashSet::new();
    for entry in &entries {
        match page::write_page(entry, out_dir)? {
            Some(dir) => {
                if !seen.insert(dir.clone()) {
                    warn!(
                        key = %entry.key,
                        dir = %dir.display(),
                        "slug collision, page overwritten"
                    );
                }
                info!(key = %entry.key, dir = %dir.display(), "Created publication page");
                summary.created.push(dir);
            }
            None => {
                warn!(key = %entry.key, "entry has no usable title, skipped");
                summary.skipped.push(entry.key.clone());
            }
        }
    }
    Ok(summary)
}

pub fn import_file(path: &Path, out_dir: &Path) -> Result<ImportSummary, ImportError> {
    let content = std::fs::read_to_string(path).map_err(|source| ImportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    import_str(&content, out_dir)
}
