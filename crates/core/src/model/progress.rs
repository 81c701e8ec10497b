use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assessment::SessionMode;
use crate::model::ids::{AttemptId, LessonId, ProgressId, QuestionId, UserId};

//
// ─── QUESTION PROGRESS ─────────────────────────────────────────────────────────
//

/// Append-only fact: a user answered a question, correctly or not, at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionProgress {
    pub id: ProgressId,
    pub user_id: UserId,
    pub question_id: QuestionId,
    pub correct: bool,
    pub answered_at: DateTime<Utc>,
    pub attempt_id: Option<AttemptId>,
}

impl QuestionProgress {
    /// New record keyed by a fresh identifier.
    #[must_use]
    pub fn new(
        user_id: UserId,
        question_id: QuestionId,
        correct: bool,
        answered_at: DateTime<Utc>,
        attempt_id: Option<AttemptId>,
    ) -> Self {
        Self {
            id: ProgressId::new_v4(),
            user_id,
            question_id,
            correct,
            answered_at,
            attempt_id,
        }
    }
}

//
// ─── LESSON PROGRESS ───────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonProgress {
    pub id: ProgressId,
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub completed: bool,
    pub score: u8,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_accessed_at: DateTime<Utc>,
}

impl LessonProgress {
    /// A lesson the user opened but has not completed yet.
    #[must_use]
    pub fn started(user_id: UserId, lesson_id: LessonId, now: DateTime<Utc>) -> Self {
        Self {
            id: ProgressId::new_v4(),
            user_id,
            lesson_id,
            completed: false,
            score: 0,
            completed_at: None,
            last_accessed_at: now,
        }
    }

    /// Marks the lesson completed with a full score.
    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.completed = true;
        self.score = 100;
        self.completed_at = Some(now);
        self.last_accessed_at = now;
    }
}

//
// ─── ATTEMPTS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("score ({score}) exceeds total ({total})")]
    ScoreExceedsTotal { score: u32, total: u32 },

    #[error("too many questions for a single attempt: {len}")]
    TooManyQuestions { len: usize },
}

/// One question of a persisted attempt with the answer the user gave, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptAnswer {
    pub question_id: QuestionId,
    pub answer: Option<bool>,
}

/// Persisted outcome of a finished practice, lesson quiz, or exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamAttempt {
    id: AttemptId,
    user_id: UserId,
    mode: SessionMode,
    answers: Vec<AttemptAnswer>,
    score: u32,
    total: u32,
    passed: Option<bool>,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    time_spent_secs: u64,
}

impl ExamAttempt {
    /// Build an attempt, checking the aggregate counts agree.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` if the time range is inverted or the score
    /// exceeds the number of questions.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: AttemptId,
        user_id: UserId,
        mode: SessionMode,
        answers: Vec<AttemptAnswer>,
        score: u32,
        passed: Option<bool>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, AttemptError> {
        if completed_at < started_at {
            return Err(AttemptError::InvalidTimeRange);
        }
        let total = u32::try_from(answers.len())
            .map_err(|_| AttemptError::TooManyQuestions { len: answers.len() })?;
        if score > total {
            return Err(AttemptError::ScoreExceedsTotal { score, total });
        }
        let time_spent_secs = u64::try_from((completed_at - started_at).num_seconds()).unwrap_or(0);

        Ok(Self {
            id,
            user_id,
            mode,
            answers,
            score,
            total,
            passed,
            started_at,
            completed_at,
            time_spent_secs,
        })
    }

    #[must_use]
    pub fn id(&self) -> AttemptId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn answers(&self) -> &[AttemptAnswer] {
        &self.answers
    }

    #[must_use]
    pub fn question_ids(&self) -> Vec<QuestionId> {
        self.answers.iter().map(|a| a.question_id).collect()
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn passed(&self) -> Option<bool> {
        self.passed
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn time_spent_secs(&self) -> u64 {
        self.time_spent_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn answers(n: usize) -> Vec<AttemptAnswer> {
        (0..n)
            .map(|i| AttemptAnswer {
                question_id: QuestionId::new_v4(),
                answer: (i % 2 == 0).then_some(true),
            })
            .collect()
    }

    #[test]
    fn attempt_records_time_spent() {
        let start = fixed_now();
        let end = start + Duration::minutes(12);
        let attempt = ExamAttempt::new(
            AttemptId::new_v4(),
            UserId::new_v4(),
            SessionMode::Exam,
            answers(30),
            27,
            Some(true),
            start,
            end,
        )
        .unwrap();
        assert_eq!(attempt.total(), 30);
        assert_eq!(attempt.time_spent_secs(), 12 * 60);
        assert_eq!(attempt.question_ids().len(), 30);
    }

    #[test]
    fn attempt_rejects_inverted_times() {
        let start = fixed_now();
        let err = ExamAttempt::new(
            AttemptId::new_v4(),
            UserId::new_v4(),
            SessionMode::Practice,
            answers(3),
            1,
            None,
            start,
            start - Duration::seconds(1),
        )
        .unwrap_err();
        assert_eq!(err, AttemptError::InvalidTimeRange);
    }

    #[test]
    fn attempt_rejects_score_above_total() {
        let err = ExamAttempt::new(
            AttemptId::new_v4(),
            UserId::new_v4(),
            SessionMode::Practice,
            answers(2),
            3,
            None,
            fixed_now(),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, AttemptError::ScoreExceedsTotal { score: 3, total: 2 });
    }

    #[test]
    fn lesson_progress_completion_sets_full_score() {
        let mut progress =
            LessonProgress::started(UserId::new_v4(), LessonId::new_v4(), fixed_now());
        assert!(!progress.completed);
        let later = fixed_now() + Duration::minutes(5);
        progress.complete(later);
        assert!(progress.completed);
        assert_eq!(progress.score, 100);
        assert_eq!(progress.completed_at, Some(later));
    }
}
