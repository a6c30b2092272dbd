use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Upper bound for either viewport dimension (8K UHD).
pub const MAX_VIEWPORT_WIDTH: u32 = 7680;
pub const MAX_VIEWPORT_HEIGHT: u32 = 4320;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid viewport {width}x{height}: {reason}")]
    InvalidViewport {
        width: u32,
        height: u32,
        reason: String,
    },
    #[error("invalid selector: {0}")]
    InvalidSelector(String),
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How an element of the target application is located.
///
/// The target exposes stable element identifiers, so `Id` is the common case;
/// `Css` covers tag or structural lookups such as the page heading.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde-full",
    serde(tag = "by", content = "value", rename_all = "snake_case")
)]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Selector {
    Id(String),
    Css(String),
}

impl Selector {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn css(css: impl Into<String>) -> Self {
        Self::Css(css.into())
    }

    /// CSS form understood by `querySelector`.
    pub fn to_css(&self) -> String {
        match self {
            Selector::Id(id) => format!("#{}", escape_css_ident(id)),
            Selector::Css(css) => css.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), TypesError> {
        let raw = match self {
            Selector::Id(id) => id,
            Selector::Css(css) => css,
        };
        if raw.trim().is_empty() {
            return Err(TypesError::InvalidSelector(
                "selector cannot be empty".to_string(),
            ));
        }
        if let Selector::Id(id) = self {
            if id.chars().any(char::is_whitespace) {
                return Err(TypesError::InvalidSelector(format!(
                    "element id '{id}' contains whitespace"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Id(id) => write!(f, "id:{id}"),
            Selector::Css(css) => write!(f, "css:{css}"),
        }
    }
}

fn escape_css_ident(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for (idx, ch) in raw.chars().enumerate() {
        let plain = ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii();
        if plain && !(idx == 0 && ch.is_ascii_digit()) {
            out.push(ch);
        } else {
            out.push('\\');
            out.push(ch);
        }
    }
    out
}

/// Fixed browser viewport used for every capture of a run.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn validate(&self) -> Result<(), TypesError> {
        let reason = if self.width == 0 || self.height == 0 {
            Some("dimensions must be positive".to_string())
        } else if self.width > MAX_VIEWPORT_WIDTH || self.height > MAX_VIEWPORT_HEIGHT {
            Some(format!(
                "dimensions exceed {MAX_VIEWPORT_WIDTH}x{MAX_VIEWPORT_HEIGHT}"
            ))
        } else {
            None
        };
        match reason {
            Some(reason) => Err(TypesError::InvalidViewport {
                width: self.width,
                height: self.height,
                reason,
            }),
            None => Ok(()),
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl std::str::FromStr for Viewport {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TypesError::InvalidViewport {
            width: 0,
            height: 0,
            reason: format!("'{s}': {reason}"),
        };
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| invalid("expected WIDTHxHEIGHT"))?;
        let width = w.trim().parse().map_err(|_| invalid("bad width"))?;
        let height = h.trim().parse().map_err(|_| invalid("bad height"))?;
        let viewport = Viewport::new(width, height);
        viewport.validate()?;
        Ok(viewport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_selector_renders_as_css() {
        assert_eq!(Selector::id("user_correlation").to_css(), "#user_correlation");
        assert_eq!(Selector::css("h1").to_css(), "h1");
        assert_eq!(Selector::id("1st").to_css(), "#\\1st");
    }

    #[test]
    fn selector_validation_rejects_blank_and_spaced_ids() {
        assert!(Selector::id("").validate().is_err());
        assert!(Selector::id("a b").validate().is_err());
        assert!(Selector::css("div > p").validate().is_ok());
    }

    #[test]
    fn viewport_parses_and_validates() {
        let vp: Viewport = "1280x720".parse().unwrap();
        assert_eq!(vp, Viewport::new(1280, 720));
        assert!("0x720".parse::<Viewport>().is_err());
        assert!("99999x10".parse::<Viewport>().is_err());
        assert!("wide".parse::<Viewport>().is_err());
        assert_eq!(Viewport::default().to_string(), "1920x1080");
    }

    #[cfg(feature = "serde-full")]
    #[test]
    fn selector_yaml_shape() {
        let sel: Selector = serde_yaml::from_str("{by: id, value: consent_yes}").unwrap();
        assert_eq!(sel, Selector::id("consent_yes"));
        let css: Selector = serde_yaml::from_str("by: css\nvalue: h1\n").unwrap();
        assert_eq!(css, Selector::css("h1"));
    }
}
