use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use patente_core::Clock;
use patente_core::assessment::SessionMode;
use patente_core::model::{LessonId, LessonProgress, Question, UserId};
use storage::repository::{
    CatalogRepository, ProgressRepository, QuestionRepository, StorageError, UserRepository,
};

use crate::error::StatsServiceError;

/// Answers needed per level step.
const ANSWERS_PER_LEVEL: u64 = 20;

/// Aggregate learning statistics for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub answered: u64,
    pub correct: u64,
    pub wrong: u64,
    /// Correct answers in percent, rounded; 0 with no answers.
    pub correct_rate: u8,
    pub level: u64,
    pub exams_taken: u32,
    pub exams_passed: u32,
    pub lessons_completed: u32,
    pub total_lessons: u32,
    pub streak: u32,
}

/// Coarse recommendation derived from the correct rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StudyAdvice {
    /// Below 50%.
    FocusOnBasics,
    /// 50% up to 85%.
    ReviewMistakes,
    /// 85% and above.
    ReadyForExam,
}

impl StudyAdvice {
    #[must_use]
    pub fn for_rate(rate: u8) -> Self {
        match rate {
            0..50 => StudyAdvice::FocusOnBasics,
            50..85 => StudyAdvice::ReviewMistakes,
            _ => StudyAdvice::ReadyForExam,
        }
    }
}

#[must_use]
pub fn correct_rate(correct: u64, answered: u64) -> u8 {
    if answered == 0 {
        return 0;
    }
    let pct = (correct.min(answered) * 200 + answered) / (answered * 2);
    u8::try_from(pct).unwrap_or(100)
}

#[must_use]
pub fn level_for(answered: u64) -> u64 {
    (answered / ANSWERS_PER_LEVEL + 1).max(1)
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Read side of the learning history, plus the user-initiated reset.
#[derive(Clone)]
pub struct StatsService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    catalog: Arc<dyn CatalogRepository>,
    questions: Arc<dyn QuestionRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl StatsService {
    #[must_use]
    pub fn new(
        clock: Clock,
        users: Arc<dyn UserRepository>,
        catalog: Arc<dyn CatalogRepository>,
        questions: Arc<dyn QuestionRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            users,
            catalog,
            questions,
            progress,
        }
    }

    /// # Errors
    ///
    /// Returns `StatsServiceError::Storage` if the user is unknown or a read fails.
    pub async fn user_stats(&self, user_id: UserId) -> Result<UserStats, StatsServiceError> {
        let user = self.users.get_user(user_id).await?;
        let records = self.progress.question_progress_for_user(user_id).await?;
        let attempts = self.progress.attempts_for_user(user_id).await?;
        let lessons = self.progress.lesson_progress_for_user(user_id).await?;
        let total_lessons = self.catalog.list_lessons(None, true).await?.len();

        let answered = records.len() as u64;
        let correct = records.iter().filter(|r| r.correct).count() as u64;
        let exams: Vec<_> = attempts
            .iter()
            .filter(|a| a.mode() == SessionMode::Exam)
            .collect();

        Ok(UserStats {
            answered,
            correct,
            wrong: answered - correct,
            correct_rate: correct_rate(correct, answered),
            level: level_for(answered),
            exams_taken: count_u32(exams.len()),
            exams_passed: count_u32(exams.iter().filter(|a| a.passed() == Some(true)).count()),
            lessons_completed: count_u32(lessons.iter().filter(|l| l.completed).count()),
            total_lessons: count_u32(total_lessons),
            streak: user.streak,
        })
    }

    #[must_use]
    pub fn study_advice(stats: &UserStats) -> StudyAdvice {
        StudyAdvice::for_rate(stats.correct_rate)
    }

    /// Distinct questions the user got wrong, in the order first missed.
    ///
    /// Questions deleted since are skipped.
    ///
    /// # Errors
    ///
    /// Returns `StatsServiceError::Storage` if a read fails.
    pub async fn mistakes(&self, user_id: UserId) -> Result<Vec<Question>, StatsServiceError> {
        let records = self.progress.question_progress_for_user(user_id).await?;
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for record in records.iter().filter(|r| !r.correct) {
            if !seen.insert(record.question_id) {
                continue;
            }
            match self.questions.get_question(record.question_id).await {
                Ok(question) => out.push(question),
                Err(StorageError::NotFound) => {
                    warn!(question_id = %record.question_id, "missed question no longer exists");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(out)
    }

    /// Forget every answer, attempt and lesson completion of the user.
    ///
    /// # Errors
    ///
    /// Returns `StatsServiceError::Storage` if the delete fails.
    pub async fn reset_progress(&self, user_id: UserId) -> Result<(), StatsServiceError> {
        self.progress.reset_user_progress(user_id).await?;
        info!(%user_id, "progress reset");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StatsServiceError::Storage` if the read fails.
    pub async fn lesson_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StatsServiceError> {
        Ok(self.progress.get_lesson_progress(user_id, lesson_id).await?)
    }

    /// Record that the user finished reading a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StatsServiceError::Storage` for an unknown lesson or a failed write.
    pub async fn mark_lesson_complete(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<LessonProgress, StatsServiceError> {
        self.catalog.get_lesson(lesson_id).await?;
        let now = self.clock.now();
        let mut record = self
            .progress
            .get_lesson_progress(user_id, lesson_id)
            .await?
            .unwrap_or_else(|| LessonProgress::started(user_id, lesson_id, now));
        record.complete(now);
        self.progress.upsert_lesson_progress(&record).await?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_rounds_half_up() {
        assert_eq!(correct_rate(0, 0), 0);
        assert_eq!(correct_rate(1, 3), 33);
        assert_eq!(correct_rate(2, 3), 67);
        assert_eq!(correct_rate(1, 2), 50);
        assert_eq!(correct_rate(10, 10), 100);
    }

    #[test]
    fn level_steps_every_twenty_answers() {
        assert_eq!(level_for(0), 1);
        assert_eq!(level_for(19), 1);
        assert_eq!(level_for(20), 2);
        assert_eq!(level_for(45), 3);
    }

    #[test]
    fn advice_boundaries() {
        assert_eq!(StudyAdvice::for_rate(0), StudyAdvice::FocusOnBasics);
        assert_eq!(StudyAdvice::for_rate(49), StudyAdvice::FocusOnBasics);
        assert_eq!(StudyAdvice::for_rate(50), StudyAdvice::ReviewMistakes);
        assert_eq!(StudyAdvice::for_rate(84), StudyAdvice::ReviewMistakes);
        assert_eq!(StudyAdvice::for_rate(85), StudyAdvice::ReadyForExam);
        assert_eq!(StudyAdvice::for_rate(100), StudyAdvice::ReadyForExam);
    }
}
