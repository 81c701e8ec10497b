use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CategoryId, GlossaryTermId, LessonId, SignId};
use crate::model::text::{BilingualText, TextError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("invalid name: {0}")]
    InvalidName(#[source] TextError),

    #[error("invalid description: {0}")]
    InvalidDescription(#[source] TextError),

    #[error("invalid lesson content: {0}")]
    InvalidContent(#[source] TextError),

    #[error("invalid definition: {0}")]
    InvalidDefinition(#[source] TextError),

    #[error("invalid sign kind: {0}")]
    InvalidSignKind(String),
}

//
// ─── CATEGORY ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub name_it: String,
    pub name_ar: String,
    pub description_ar: String,
    pub icon: String,
    pub color: String,
    pub image_url: String,
    pub order: i32,
    pub is_published: bool,
}

impl CategoryDraft {
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidName` if either name is blank.
    pub fn validate(self, id: CategoryId, now: DateTime<Utc>) -> Result<Category, CatalogError> {
        let name =
            BilingualText::new(self.name_it, self.name_ar).map_err(CatalogError::InvalidName)?;
        Ok(Category {
            id,
            name,
            description_ar: self.description_ar.trim().to_owned(),
            icon: self.icon,
            color: self.color,
            image_url: self.image_url,
            order: self.order,
            is_published: self.is_published,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Top-level grouping of lessons (signs, rules, safety…).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: BilingualText,
    pub description_ar: String,
    pub icon: String,
    pub color: String,
    pub image_url: String,
    pub order: i32,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Replace editable fields from a draft, keeping identity and creation time.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the draft is invalid.
    pub fn apply_draft(
        &mut self,
        draft: CategoryDraft,
        now: DateTime<Utc>,
    ) -> Result<(), CatalogError> {
        let updated = draft.validate(self.id, self.created_at)?;
        *self = Category {
            updated_at: now,
            ..updated
        };
        Ok(())
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonDraft {
    pub category_id: CategoryId,
    pub title_it: String,
    pub title_ar: String,
    pub description_it: String,
    pub description_ar: String,
    pub content_it: String,
    pub content_ar: String,
    pub image_url: String,
    pub order: i32,
    pub icon: String,
    pub color: String,
    pub is_published: bool,
}

impl LessonDraft {
    /// # Errors
    ///
    /// Returns `CatalogError` if the title is blank or a text field is too long.
    pub fn validate(self, id: LessonId, now: DateTime<Utc>) -> Result<Lesson, CatalogError> {
        let title =
            BilingualText::new(self.title_it, self.title_ar).map_err(CatalogError::InvalidName)?;
        let description = BilingualText::optional(self.description_it, self.description_ar)
            .map_err(CatalogError::InvalidDescription)?;
        let content = BilingualText::optional(self.content_it, self.content_ar)
            .map_err(CatalogError::InvalidContent)?;
        Ok(Lesson {
            id,
            category_id: self.category_id,
            title,
            description,
            content,
            image_url: self.image_url,
            order: self.order,
            icon: self.icon,
            color: self.color,
            is_published: self.is_published,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub category_id: CategoryId,
    pub title: BilingualText,
    pub description: BilingualText,
    pub content: BilingualText,
    pub image_url: String,
    pub order: i32,
    pub icon: String,
    pub color: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lesson {
    /// # Errors
    ///
    /// Returns `CatalogError` if the draft is invalid.
    pub fn apply_draft(
        &mut self,
        draft: LessonDraft,
        now: DateTime<Utc>,
    ) -> Result<(), CatalogError> {
        let updated = draft.validate(self.id, self.created_at)?;
        *self = Lesson {
            updated_at: now,
            ..updated
        };
        Ok(())
    }
}

//
// ─── SIGNS ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignKind {
    Warning,
    Prohibition,
    Obligation,
    Information,
    Priority,
    Temporary,
}

impl SignKind {
    pub const ALL: [SignKind; 6] = [
        SignKind::Warning,
        SignKind::Prohibition,
        SignKind::Obligation,
        SignKind::Information,
        SignKind::Priority,
        SignKind::Temporary,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SignKind::Warning => "warning",
            SignKind::Prohibition => "prohibition",
            SignKind::Obligation => "obligation",
            SignKind::Information => "information",
            SignKind::Priority => "priority",
            SignKind::Temporary => "temporary",
        }
    }

    /// # Errors
    ///
    /// Returns `CatalogError::InvalidSignKind` for unknown values.
    pub fn parse(s: &str) -> Result<Self, CatalogError> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CatalogError::InvalidSignKind(s.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignDraft {
    pub name_it: String,
    pub name_ar: String,
    pub description_it: String,
    pub description_ar: String,
    pub kind: SignKind,
    pub emoji: String,
    pub image_url: Option<String>,
}

impl SignDraft {
    /// # Errors
    ///
    /// Returns `CatalogError` if the name is blank.
    pub fn validate(self, id: SignId, now: DateTime<Utc>) -> Result<Sign, CatalogError> {
        let name =
            BilingualText::new(self.name_it, self.name_ar).map_err(CatalogError::InvalidName)?;
        let description = BilingualText::optional(self.description_it, self.description_ar)
            .map_err(CatalogError::InvalidDescription)?;
        Ok(Sign {
            id,
            name,
            description,
            kind: self.kind,
            emoji: self.emoji,
            image_url: self.image_url.filter(|u| !u.trim().is_empty()),
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sign {
    pub id: SignId,
    pub name: BilingualText,
    pub description: BilingualText,
    pub kind: SignKind,
    pub emoji: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

//
// ─── GLOSSARY ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryDraft {
    pub term_it: String,
    pub term_ar: String,
    pub definition_it: String,
    pub definition_ar: String,
    pub category: String,
}

impl GlossaryDraft {
    /// # Errors
    ///
    /// Returns `CatalogError` if the term is blank.
    pub fn validate(
        self,
        id: GlossaryTermId,
        now: DateTime<Utc>,
    ) -> Result<GlossaryTerm, CatalogError> {
        let term =
            BilingualText::new(self.term_it, self.term_ar).map_err(CatalogError::InvalidName)?;
        let definition = BilingualText::optional(self.definition_it, self.definition_ar)
            .map_err(CatalogError::InvalidDefinition)?;
        Ok(GlossaryTerm {
            id,
            term,
            definition,
            category: self.category.trim().to_owned(),
            created_at: now,
        })
    }
}

/// Italian driving vocabulary with its Arabic translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryTerm {
    pub id: GlossaryTermId,
    pub term: BilingualText,
    pub definition: BilingualText,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

impl GlossaryTerm {
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        self.term.contains_ignore_case(query) || self.definition.contains_ignore_case(query)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn lesson_draft(title_it: &str) -> LessonDraft {
        LessonDraft {
            category_id: CategoryId::new_v4(),
            title_it: title_it.into(),
            title_ar: "درس".into(),
            description_it: String::new(),
            description_ar: String::new(),
            content_it: "Contenuto".into(),
            content_ar: "محتوى".into(),
            image_url: String::new(),
            order: 1,
            icon: "menu_book".into(),
            color: "#2563eb".into(),
            is_published: true,
        }
    }

    #[test]
    fn lesson_requires_title() {
        let err = lesson_draft(" ")
            .validate(LessonId::new_v4(), fixed_now())
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidName(_)));
    }

    #[test]
    fn lesson_update_keeps_identity_and_created_at() {
        let id = LessonId::new_v4();
        let mut lesson = lesson_draft("Precedenza").validate(id, fixed_now()).unwrap();
        let later = fixed_now() + Duration::hours(2);
        lesson.apply_draft(lesson_draft("Sorpasso"), later).unwrap();

        assert_eq!(lesson.id, id);
        assert_eq!(lesson.title.it(), "Sorpasso");
        assert_eq!(lesson.created_at, fixed_now());
        assert_eq!(lesson.updated_at, later);
    }

    #[test]
    fn sign_kind_parses_storage_names() {
        for kind in SignKind::ALL {
            assert_eq!(SignKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(SignKind::parse("circle").is_err());
    }

    #[test]
    fn sign_blank_image_url_becomes_none() {
        let sign = SignDraft {
            name_it: "Stop".into(),
            name_ar: "قف".into(),
            description_it: String::new(),
            description_ar: String::new(),
            kind: SignKind::Priority,
            emoji: "🛑".into(),
            image_url: Some("  ".into()),
        }
        .validate(SignId::new_v4(), fixed_now())
        .unwrap();
        assert_eq!(sign.image_url, None);
    }

    #[test]
    fn glossary_matches_term_or_definition() {
        let term = GlossaryDraft {
            term_it: "Sorpasso".into(),
            term_ar: "تجاوز".into(),
            definition_it: "Manovra per superare un veicolo".into(),
            definition_ar: String::new(),
            category: "manovre".into(),
        }
        .validate(GlossaryTermId::new_v4(), fixed_now())
        .unwrap();

        assert!(term.matches("SORPASSO"));
        assert!(term.matches("veicolo"));
        assert!(!term.matches("parcheggio"));
    }
}
