//! Minimal BibTeX reader.
//!
//! Understands `@type{key, field = value, ...}` with `{..}`, `".."` and bare
//! values, `#` concatenation and `@string` macros. `@comment` and
//! `@preamble` blocks are skipped, as are `%` lines between entries. Field
//! names, entry types and macro names are lowercased; field order is kept.

use std::collections::HashMap;

use crate::error::ImportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibEntry {
    pub entry_type: String,
    pub key: String,
    pub fields: Vec<(String, String)>,
}

impl BibEntry {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Author names split on ` and `, blanks dropped.
    pub fn authors(&self) -> Vec<String> {
        self.get("author")
            .unwrap_or_default()
            .split(" and ")
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}

pub fn parse(input: &str) -> Result<Vec<BibEntry>, ImportError> {
    Parser::new(input).entries()
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.' | '+' | '/' | '\'')
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    macros: HashMap<String, String>,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
            macros: HashMap::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, message: impl Into<String>) -> ImportError {
        ImportError::parse(self.line, message)
    }

    fn expect(&mut self, expected: char) -> Result<(), ImportError> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected '{expected}', found '{c}'"))),
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    fn ident(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek().filter(|c| is_ident_char(*c)) {
            out.push(c);
            self.bump();
        }
        out
    }

    fn entries(mut self) -> Result<Vec<BibEntry>, ImportError> {
        let mut entries = Vec::new();
        loop {
            // Text between entries is ignored.
            loop {
                match self.bump() {
                    Some('@') => break,
                    Some('%') => self.skip_line(),
                    Some(_) => {}
                    None => return Ok(entries),
                }
            }

            self.skip_ws();
            let entry_type = self.ident().to_lowercase();
            if entry_type.is_empty() {
                return Err(self.error("missing entry type after '@'"));
            }
            self.skip_ws();
            let close = match self.bump() {
                Some('{') => '}',
                Some('(') => ')',
                _ => return Err(self.error(format!("expected '{{' after @{entry_type}"))),
            };

            match entry_type.as_str() {
                "comment" | "preamble" => self.skip_block(close)?,
                "string" => self.string_macro(close)?,
                _ => entries.push(self.entry(entry_type, close)?),
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }
    }

    fn skip_block(&mut self, close: char) -> Result<(), ImportError> {
        let open = if close == '}' { '{' } else { '(' };
        let mut depth = 1usize;
        while let Some(c) = self.bump() {
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
        }
        Err(self.error("unterminated block"))
    }

    fn string_macro(&mut self, close: char) -> Result<(), ImportError> {
        self.skip_ws();
        let name = self.ident().to_lowercase();
        if name.is_empty() {
            return Err(self.error("@string without a name"));
        }
        self.skip_ws();
        self.expect('=')?;
        let value = self.value()?;
        self.skip_ws();
        self.expect(close)?;
        self.macros.insert(name, value);
        Ok(())
    }

    fn entry(&mut self, entry_type: String, close: char) -> Result<BibEntry, ImportError> {
        self.skip_ws();
        let mut key = String::new();
        while let Some(c) = self
            .peek()
            .filter(|c| *c != ',' && *c != close && !c.is_whitespace())
        {
            key.push(c);
            self.bump();
        }
        let mut entry = BibEntry {
            entry_type,
            key,
            fields: Vec::new(),
        };

        self.skip_ws();
        match self.bump() {
            Some(c) if c == close => return Ok(entry),
            Some(',') => {}
            _ => return Err(self.error(format!("expected ',' after key '{}'", entry.key))),
        }

        loop {
            self.skip_ws();
            match self.peek() {
                Some(c) if c == close => {
                    self.bump();
                    return Ok(entry);
                }
                None => return Err(self.error(format!("unterminated entry '{}'", entry.key))),
                _ => {}
            }

            let name = self.ident().to_lowercase();
            if name.is_empty() {
                return Err(self.error(format!("expected field name in '{}'", entry.key)));
            }
            self.skip_ws();
            self.expect('=')?;
            let value = self.value()?;
            entry.fields.push((name, value));

            self.skip_ws();
            match self.bump() {
                Some(',') => {}
                Some(c) if c == close => return Ok(entry),
                _ => return Err(self.error(format!("expected ',' in '{}'", entry.key))),
            }
        }
    }

    /// One field value, concatenation resolved and whitespace collapsed.
    fn value(&mut self) -> Result<String, ImportError> {
        let mut out = String::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some('{') => {
                    self.bump();
                    out.push_str(&self.delimited('}')?);
                }
                Some('"') => {
                    self.bump();
                    out.push_str(&self.delimited('"')?);
                }
                Some(c) if is_ident_char(c) => {
                    let word = self.ident();
                    match self.macros.get(&word.to_lowercase()) {
                        Some(expanded) => out.push_str(expanded),
                        None => out.push_str(&word),
                    }
                }
                Some(c) => return Err(self.error(format!("unexpected '{c}' in field value"))),
                None => return Err(self.error("missing field value")),
            }
            self.skip_ws();
            if self.peek() == Some('#') {
                self.bump();
            } else {
                break;
            }
        }
        Ok(out.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    /// Reads up to `end` at brace depth zero; nested braces are kept.
    fn delimited(&mut self, end: char) -> Result<String, ImportError> {
        let mut out = String::new();
        let mut depth = 0usize;
        while let Some(c) = self.bump() {
            match c {
                '{' => depth += 1,
                '}' if depth == 0 && end == '}' => return Ok(out),
                '}' => depth = depth.saturating_sub(1),
                '"' if depth == 0 && end == '"' => return Ok(out),
                _ => {}
            }
            out.push(c);
        }
        Err(self.error("unterminated field value"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
Exported from a reference manager.

@string{jap = "Journal of Applied Psychology"}

@article{smith2020study,
  title = {A Study: Of {Correlations}!},
  author = {Smith, Jane and Doe,
            John},
  journal = jap,
  year = 2020,
  doi = "10.1000/xyz"
}

@comment{ignored {nested} block}

@InProceedings(lee2019,
  Title = "Estimating " # "Effect Sizes",
  booktitle = {Proceedings of Things},
  year = {2019},
)
"#;

    #[test]
    fn parses_entries_in_order() {
        let entries = parse(SAMPLE).unwrap();
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.entry_type, "article");
        assert_eq!(first.key, "smith2020study");
        assert_eq!(first.get("title"), Some("A Study: Of {Correlations}!"));
        assert_eq!(first.authors(), vec!["Smith, Jane", "Doe, John"]);
        assert_eq!(first.get("journal"), Some("Journal of Applied Psychology"));
        assert_eq!(first.get("year"), Some("2020"));
        let names: Vec<_> = first.fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["title", "author", "journal", "year", "doi"]);

        let second = &entries[1];
        assert_eq!(second.entry_type, "inproceedings");
        assert_eq!(second.get("title"), Some("Estimating Effect Sizes"));
        assert_eq!(second.get("booktitle"), Some("Proceedings of Things"));
    }

    #[test]
    fn errors_carry_line_numbers() {
        let err = parse("@article{x,\n  title = {open\n").unwrap_err();
        assert!(matches!(err, ImportError::Parse { line: 3, .. }), "{err}");

        let err = parse("@article{x, title {y}}").unwrap_err();
        assert!(matches!(err, ImportError::Parse { line: 1, .. }));
    }

    #[test]
    fn unterminated_quoted_value_is_an_error() {
        let err = parse("@misc{q,\n  note = \"never closed,\n  year = 2001\n}\n").unwrap_err();
        match err {
            ImportError::Parse { line, ref message } => {
                assert_eq!(line, 5);
                assert!(message.contains("unterminated"), "{message}");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn string_macros_ignore_case() {
        let entries = parse(
            "@STRING{JAP = {Journal of Applied Psychology}}\n\
             @article{a, journal = Jap # { (online)}}\n",
        )
        .unwrap();
        assert_eq!(
            entries[0].get("journal"),
            Some("Journal of Applied Psychology (online)")
        );
    }

    #[test]
    fn parenthesised_entry_with_trailing_comma() {
        let entries = parse("@Book(b1, title = {Paren (Style)}, year = 1999,)").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry_type, "book");
        assert_eq!(entries[0].get("title"), Some("Paren (Style)"));
        assert_eq!(entries[0].get("year"), Some("1999"));
    }

    #[test]
    fn percent_comments_between_entries_are_skipped() {
        let input = "% exported by hand, see @misc{old} for history\n\
                     @misc{one, year = 2001}\n\
                     %% @article{commented, year = 1}\n\
                     @misc{two, year = 2002}\n";
        let keys: Vec<_> = parse(input).unwrap().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["one", "two"]);
    }

    #[test]
    fn empty_input_has_no_entries() {
        assert!(parse("no entries here").unwrap().is_empty());
    }
}
