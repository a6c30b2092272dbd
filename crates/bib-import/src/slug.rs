use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_SLUG_LEN: usize = 50;

static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").expect("slug regex"));
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-\s]+").expect("separator regex"));

/// Directory-safe slug for a publication title.
///
/// Lowercases, drops everything but word characters, whitespace and hyphens,
/// collapses separator runs into one `-` and keeps the first 50 characters.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let cleaned = DISALLOWED.replace_all(&lowered, "");
    let joined = SEPARATORS.replace_all(&cleaned, "-");
    joined.chars().take(MAX_SLUG_LEN).collect()
}
