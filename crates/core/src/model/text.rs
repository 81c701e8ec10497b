use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Longest accepted text on either side of a bilingual field.
pub const MAX_TEXT_CHARS: usize = 4000;

/// Content languages: Italian is the exam language, Arabic the study language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Italian,
    Arabic,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Italian => f.write_str("it"),
            Language::Arabic => f.write_str("ar"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TextError {
    #[error("{lang} text must not be empty")]
    Empty { lang: Language },

    #[error("{lang} text is too long ({len} > {MAX_TEXT_CHARS} chars)")]
    TooLong { lang: Language, len: usize },
}

/// Italian/Arabic pair. Both sides are trimmed and required.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BilingualText {
    it: String,
    ar: String,
}

impl BilingualText {
    /// Builds a pair where both sides must carry text.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` for a blank side and `TextError::TooLong`
    /// when a side exceeds `MAX_TEXT_CHARS`.
    pub fn new(it: impl Into<String>, ar: impl Into<String>) -> Result<Self, TextError> {
        let it = checked(Language::Italian, it.into(), true)?;
        let ar = checked(Language::Arabic, ar.into(), true)?;
        Ok(Self { it, ar })
    }

    /// Builds a pair where either side may be blank (explanations, descriptions).
    ///
    /// # Errors
    ///
    /// Returns `TextError::TooLong` when a side exceeds `MAX_TEXT_CHARS`.
    pub fn optional(it: impl Into<String>, ar: impl Into<String>) -> Result<Self, TextError> {
        let it = checked(Language::Italian, it.into(), false)?;
        let ar = checked(Language::Arabic, ar.into(), false)?;
        Ok(Self { it, ar })
    }

    /// An empty pair.
    #[must_use]
    pub fn blank() -> Self {
        Self {
            it: String::new(),
            ar: String::new(),
        }
    }

    #[must_use]
    pub fn it(&self) -> &str {
        &self.it
    }

    #[must_use]
    pub fn ar(&self) -> &str {
        &self.ar
    }

    #[must_use]
    pub fn get(&self, lang: Language) -> &str {
        match lang {
            Language::Italian => &self.it,
            Language::Arabic => &self.ar,
        }
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.it.is_empty() && self.ar.is_empty()
    }

    /// Case-insensitive substring match against either language.
    #[must_use]
    pub fn contains_ignore_case(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.it.to_lowercase().contains(&needle) || self.ar.to_lowercase().contains(&needle)
    }
}

fn checked(lang: Language, raw: String, required: bool) -> Result<String, TextError> {
    let trimmed = raw.trim();
    if required && trimmed.is_empty() {
        return Err(TextError::Empty { lang });
    }
    let len = trimmed.chars().count();
    if len > MAX_TEXT_CHARS {
        return Err(TextError::TooLong { lang, len });
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_both_sides() {
        let text = BilingualText::new("  Segnale  ", " إشارة ").unwrap();
        assert_eq!(text.it(), "Segnale");
        assert_eq!(text.ar(), "إشارة");
    }

    #[test]
    fn rejects_blank_arabic() {
        let err = BilingualText::new("Segnale", "   ").unwrap_err();
        assert_eq!(
            err,
            TextError::Empty {
                lang: Language::Arabic
            }
        );
    }

    #[test]
    fn optional_allows_blank() {
        let text = BilingualText::optional("", "").unwrap();
        assert!(text.is_blank());
    }

    #[test]
    fn rejects_overlong_text() {
        let long = "a".repeat(MAX_TEXT_CHARS + 1);
        let err = BilingualText::optional(long, "").unwrap_err();
        assert!(matches!(
            err,
            TextError::TooLong {
                lang: Language::Italian,
                ..
            }
        ));
    }

    #[test]
    fn search_matches_either_language() {
        let text = BilingualText::new("Precedenza", "أولوية").unwrap();
        assert!(text.contains_ignore_case("preced"));
        assert!(text.contains_ignore_case("أولوية"));
        assert!(!text.contains_ignore_case("sorpasso"));
    }
}
