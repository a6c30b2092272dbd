use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use crate::config::Config;

#[derive(Args, Clone, Debug)]
pub struct ImportBibArgs {
    /// BibTeX file to convert
    pub file: PathBuf,

    /// Directory receiving one page directory per entry
    #[arg(short, long, value_name = "DIR")]
    pub out: Option<PathBuf>,
}

pub async fn cmd_import_bib(args: ImportBibArgs, config: &Config) -> Result<()> {
    let out = args
        .out
        .unwrap_or_else(|| config.publications.output_dir.clone());
    let file = args.file;

    let summary = {
        let out = out.clone();
        let src = file.clone();
        tokio::task::spawn_blocking(move || bib_import::import_file(&src, &out))
            .await
            .context("import task panicked")?
            .with_context(|| format!("importing {}", file.display()))?
    };

    info!(
        entries = summary.entries,
        created = summary.created.len(),
        skipped = summary.skipped.len(),
        "Import finished"
    );
    for dir in &summary.created {
        println!("{}", dir.display());
    }
    println!(
        "Imported {} of {} entries into {}",
        summary.created.len(),
        summary.entries,
        out.display()
    );
    if !summary.skipped.is_empty() {
        println!("Skipped (no title): {}", summary.skipped.join(", "));
    }
    Ok(())
}
