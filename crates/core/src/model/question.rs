use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{LessonId, QuestionId, SignId};
use crate::model::text::{BilingualText, TextError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("invalid prompt: {0}")]
    InvalidPrompt(#[source] TextError),

    #[error("invalid explanation: {0}")]
    InvalidExplanation(#[source] TextError),

    #[error("question category cannot be empty")]
    EmptyCategory,

    #[error("invalid difficulty: {0}")]
    InvalidDifficulty(String),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Parses the storage representation.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::InvalidDifficulty` for unknown values.
    pub fn parse(s: &str) -> Result<Self, QuestionError> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(QuestionError::InvalidDifficulty(other.to_owned())),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Input for creating or editing a question through content management.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub prompt_it: String,
    pub prompt_ar: String,
    pub correct_answer: bool,
    pub explanation_it: String,
    pub explanation_ar: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub lesson_id: Option<LessonId>,
    pub sign_id: Option<SignId>,
}

impl QuestionDraft {
    /// Validate the draft and stamp it with an identifier and creation time.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the prompt is blank on either side, the
    /// explanation is too long, or the category is empty.
    pub fn validate(self, id: QuestionId, now: DateTime<Utc>) -> Result<Question, QuestionError> {
        let prompt = BilingualText::new(self.prompt_it, self.prompt_ar)
            .map_err(QuestionError::InvalidPrompt)?;
        let explanation = BilingualText::optional(self.explanation_it, self.explanation_ar)
            .map_err(QuestionError::InvalidExplanation)?;
        let category = self.category.trim();
        if category.is_empty() {
            return Err(QuestionError::EmptyCategory);
        }

        Ok(Question {
            id,
            prompt,
            correct_answer: self.correct_answer,
            explanation,
            category: category.to_owned(),
            difficulty: self.difficulty,
            lesson_id: self.lesson_id,
            sign_id: self.sign_id,
            created_at: now,
        })
    }
}

/// A true/false exam question. Read-only while a session is running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    prompt: BilingualText,
    correct_answer: bool,
    explanation: BilingualText,
    category: String,
    difficulty: Difficulty,
    lesson_id: Option<LessonId>,
    sign_id: Option<SignId>,
    created_at: DateTime<Utc>,
}

impl Question {
    /// Rehydrate a question from persisted storage.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_persisted(
        id: QuestionId,
        prompt: BilingualText,
        correct_answer: bool,
        explanation: BilingualText,
        category: String,
        difficulty: Difficulty,
        lesson_id: Option<LessonId>,
        sign_id: Option<SignId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            prompt,
            correct_answer,
            explanation,
            category,
            difficulty,
            lesson_id,
            sign_id,
            created_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &BilingualText {
        &self.prompt
    }

    #[must_use]
    pub fn correct_answer(&self) -> bool {
        self.correct_answer
    }

    #[must_use]
    pub fn explanation(&self) -> &BilingualText {
        &self.explanation
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn lesson_id(&self) -> Option<LessonId> {
        self.lesson_id
    }

    #[must_use]
    pub fn sign_id(&self) -> Option<SignId> {
        self.sign_id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn draft() -> QuestionDraft {
        QuestionDraft {
            prompt_it: "Il segnale indica una curva a destra".into(),
            prompt_ar: "الإشارة تدل على منعطف لليمين".into(),
            correct_answer: true,
            explanation_it: String::new(),
            explanation_ar: "شرح".into(),
            category: "segnali".into(),
            difficulty: Difficulty::Easy,
            lesson_id: None,
            sign_id: None,
        }
    }

    #[test]
    fn valid_draft_builds_question() {
        let id = QuestionId::new_v4();
        let q = draft().validate(id, fixed_now()).unwrap();
        assert_eq!(q.id(), id);
        assert!(q.correct_answer());
        assert_eq!(q.explanation().it(), "");
        assert_eq!(q.created_at(), fixed_now());
    }

    #[test]
    fn blank_prompt_is_rejected() {
        let mut d = draft();
        d.prompt_it = "  ".into();
        let err = d.validate(QuestionId::new_v4(), fixed_now()).unwrap_err();
        assert!(matches!(err, QuestionError::InvalidPrompt(_)));
    }

    #[test]
    fn blank_category_is_rejected() {
        let mut d = draft();
        d.category = " ".into();
        let err = d.validate(QuestionId::new_v4(), fixed_now()).unwrap_err();
        assert_eq!(err, QuestionError::EmptyCategory);
    }

    #[test]
    fn difficulty_round_trips_storage_names() {
        for d in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            assert_eq!(Difficulty::parse(d.as_str()).unwrap(), d);
        }
        assert!(Difficulty::parse("extreme").is_err());
    }
}
