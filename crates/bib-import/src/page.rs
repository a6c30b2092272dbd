//! Publication page rendering: `index.md` front matter plus `cite.bib`.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::ImportError;
use crate::parser::BibEntry;
use crate::slug::slugify;

pub const INDEX_FILE: &str = "index.md";
pub const CITE_FILE: &str = "cite.bib";

#[derive(Debug, Serialize)]
struct ImageMeta {
    caption: String,
    focal_point: String,
    preview_only: bool,
}

#[derive(Debug, Serialize)]
struct FrontMatter {
    title: String,
    authors: Vec<String>,
    date: String,
    doi: String,
    #[serde(rename = "publishDate")]
    publish_date: String,
    publication_types: Vec<String>,
    publication: String,
    publication_short: String,
    #[serde(rename = "abstract")]
    abstract_text: String,
    summary: String,
    tags: Vec<String>,
    featured: bool,
    projects: Vec<String>,
    slides: String,
    url_pdf: String,
    url_code: String,
    url_dataset: String,
    url_poster: String,
    url_project: String,
    url_slides: String,
    url_source: String,
    url_video: String,
    image: ImageMeta,
}

pub fn publication_type(entry_type: &str) -> &'static str {
    match entry_type {
        "article" => "article-journal",
        "inproceedings" => "paper-conference",
        _ => "article",
    }
}

/// Title with its outer protective braces removed.
pub fn clean_title(entry: &BibEntry) -> String {
    entry
        .get("title")
        .unwrap_or_default()
        .trim_matches(|c| c == '{' || c == '}')
        .to_string()
}

fn field(entry: &BibEntry, name: &str) -> String {
    entry.get(name).unwrap_or_default().to_string()
}

pub fn render_index(entry: &BibEntry) -> Result<String, ImportError> {
    let year = field(entry, "year");
    let stamp = format!("{year}-01-01T00:00:00Z");
    let venue = entry
        .get("journal")
        .or_else(|| entry.get("booktitle"))
        .unwrap_or_default();

    let front = FrontMatter {
        title: clean_title(entry),
        authors: entry.authors(),
        date: stamp.clone(),
        doi: field(entry, "doi"),
        publish_date: stamp,
        publication_types: vec![publication_type(&entry.entry_type).to_string()],
        publication: if venue.is_empty() {
            String::new()
        } else {
            format!("*{venue}*")
        },
        publication_short: String::new(),
        abstract_text: String::new(),
        summary: String::new(),
        tags: Vec::new(),
        featured: false,
        projects: Vec::new(),
        slides: String::new(),
        url_pdf: field(entry, "url"),
        url_code: String::new(),
        url_dataset: String::new(),
        url_poster: String::new(),
        url_project: String::new(),
        url_slides: String::new(),
        url_source: String::new(),
        url_video: String::new(),
        image: ImageMeta {
            caption: String::new(),
            focal_point: String::new(),
            preview_only: false,
        },
    };
    Ok(format!("---\n{}---\n", serde_yaml::to_string(&front)?))
}

/// Re-emits the entry with every value brace-delimited.
pub fn render_cite(entry: &BibEntry) -> String {
    let mut out = format!("@{}{{{},\n", entry.entry_type, entry.key);
    for (name, value) in &entry.fields {
        let _ = writeln!(out, "  {name} = {{{value}}},");
    }
    out.push_str("}\n");
    out
}

/// Writes `<out_dir>/<slug>/{index.md,cite.bib}`. Returns `None` when the
/// title yields no usable slug.
pub fn write_page(entry: &BibEntry, out_dir: &Path) -> Result<Option<PathBuf>, ImportError> {
    let slug = slugify(&clean_title(entry));
    if slug.is_empty() {
        return Ok(None);
    }
    let dir = out_dir.join(&slug);
    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ImportError::Write { path, source }
    };

    fs::create_dir_all(&dir).map_err(write_err(&dir))?;
    let index = dir.join(INDEX_FILE);
    fs::write(&index, render_index(entry)?).map_err(write_err(&index))?;
    let cite = dir.join(CITE_FILE);
    fs::write(&cite, render_cite(entry)).map_err(write_err(&cite))?;
    Ok(Some(dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> BibEntry {
        BibEntry {
            entry_type: "inproceedings".into(),
            key: "lee2019".into(),
            fields: vec![
                ("title".into(), "{Estimating Effect Sizes}".into()),
                ("author".into(), "Lee, Ann and Park, Bo".into()),
                ("booktitle".into(), "Proceedings of Things".into()),
                ("year".into(), "2019".into()),
                ("url".into(), "https://example.org/paper.pdf".into()),
            ],
        }
    }

    #[test]
    fn front_matter_fields() {
        let text = render_index(&entry()).unwrap();
        assert!(text.starts_with("---\n") && text.ends_with("---\n"));
        let yaml = text.trim_start_matches("---\n").trim_end_matches("---\n");
        let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(value["title"].as_str(), Some("Estimating Effect Sizes"));
        assert_eq!(value["authors"][1].as_str(), Some("Park, Bo"));
        assert_eq!(value["date"].as_str(), Some("2019-01-01T00:00:00Z"));
        assert_eq!(value["publishDate"].as_str(), Some("2019-01-01T00:00:00Z"));
        assert_eq!(value["publication_types"][0].as_str(), Some("paper-conference"));
        assert_eq!(value["publication"].as_str(), Some("*Proceedings of Things*"));
        assert_eq!(value["url_pdf"].as_str(), Some("https://example.org/paper.pdf"));
        assert_eq!(value["featured"].as_bool(), Some(false));
    }

    #[test]
    fn publication_types_map() {
        assert_eq!(publication_type("article"), "article-journal");
        assert_eq!(publication_type("inproceedings"), "paper-conference");
        assert_eq!(publication_type("book"), "article");
    }

    #[test]
    fn cite_re_emits_fields_in_order() {
        let cite = render_cite(&entry());
        assert!(cite.starts_with("@inproceedings{lee2019,\n"));
        assert!(cite.contains("  title = {{Estimating Effect Sizes}},\n"));
        assert!(cite.find("title").unwrap() < cite.find("booktitle").unwrap());
        assert!(cite.ends_with("}\n"));
    }

    #[test]
    fn writes_page_directory() {
        let dir = tempfile::tempdir().unwrap();
        let page = write_page(&entry(), dir.path()).unwrap().unwrap();
        assert_eq!(page, dir.path().join("estimating-effect-sizes"));
        assert!(page.join(INDEX_FILE).is_file());
        assert!(page.join(CITE_FILE).is_file());
    }
}
