use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use patente_core::Clock;
use patente_core::assessment::{AssessmentSession, ModePolicy, SamplingError, SessionMode, sample};
use patente_core::model::{LessonId, Question, UserId};
use storage::repository::{
    CatalogRepository, ProgressRepository, QuestionFilter, QuestionRepository,
};

use super::active::ActiveSession;
use super::recorder::ProgressRecorder;
use crate::config::AssessmentConfig;
use crate::error::AssessmentError;

/// Starts practice, lesson-quiz and exam sessions from the question bank.
#[derive(Clone)]
pub struct AssessmentService {
    clock: Clock,
    config: AssessmentConfig,
    questions: Arc<dyn QuestionRepository>,
    catalog: Arc<dyn CatalogRepository>,
    progress: Arc<dyn ProgressRepository>,
    recorder: ProgressRecorder,
}

impl AssessmentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        config: AssessmentConfig,
        questions: Arc<dyn QuestionRepository>,
        catalog: Arc<dyn CatalogRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        let recorder = ProgressRecorder::new(Arc::clone(&progress));
        Self {
            clock,
            config,
            questions,
            catalog,
            progress,
            recorder,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AssessmentConfig {
        &self.config
    }

    /// Recorder shared by every session this service starts.
    #[must_use]
    pub fn recorder(&self) -> &ProgressRecorder {
        &self.recorder
    }

    /// Random practice round over the filtered pool.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::Sampling` when the filter matches nothing,
    /// or `Storage` if the pool cannot be loaded.
    pub async fn start_practice(
        &self,
        user_id: UserId,
        filter: QuestionFilter,
    ) -> Result<ActiveSession, AssessmentError> {
        let pool = self.questions.list_questions(filter).await?;
        let picked = self.pick(pool, self.config.practice_questions)?;
        self.launch(user_id, SessionMode::Practice, self.config.practice_policy(), picked)
    }

    /// Quiz over every question of a lesson, in stored order.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::Storage` with `NotFound` for an unknown lesson,
    /// and `Sampling` when the lesson has no questions.
    pub async fn start_lesson_quiz(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<ActiveSession, AssessmentError> {
        self.catalog.get_lesson(lesson_id).await?;
        let questions = self
            .questions
            .list_questions(QuestionFilter::Lesson(lesson_id))
            .await?;
        if questions.is_empty() {
            return Err(SamplingError::EmptySelection.into());
        }
        self.launch(
            user_id,
            SessionMode::LessonQuiz { lesson_id },
            self.config.lesson_quiz_policy(),
            dedup_in_order(questions),
        )
    }

    /// Timed exam simulation drawn from the whole bank.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::Sampling` if the bank is empty, or `Storage`
    /// if it cannot be loaded.
    pub async fn start_exam(&self, user_id: UserId) -> Result<ActiveSession, AssessmentError> {
        let pool = self.questions.list_questions(QuestionFilter::All).await?;
        let picked = self.pick(pool, self.config.exam_questions)?;
        self.launch(user_id, SessionMode::Exam, self.config.exam_policy(), picked)
    }

    fn pick(&self, pool: Vec<Question>, target: usize) -> Result<Vec<Question>, AssessmentError> {
        let available = pool.len();
        let mut rng = rand::rng();
        let picked = sample(pool, target, &mut rng)?;
        debug!(available, target, picked = picked.len(), "questions sampled");
        Ok(picked)
    }

    fn launch(
        &self,
        user_id: UserId,
        mode: SessionMode,
        policy: ModePolicy,
        questions: Vec<Question>,
    ) -> Result<ActiveSession, AssessmentError> {
        let total = questions.len();
        let mut session = AssessmentSession::new(mode, policy);
        session.start(questions, self.clock.now())?;

        let active = ActiveSession::launch(
            user_id,
            self.clock,
            session,
            self.recorder.clone(),
            Arc::clone(&self.progress),
        );
        info!(
            attempt_id = %active.attempt_id(),
            %user_id,
            mode = mode.as_str(),
            total,
            "session started"
        );
        Ok(active)
    }
}

fn dedup_in_order(questions: Vec<Question>) -> Vec<Question> {
    let mut seen = HashSet::with_capacity(questions.len());
    questions.into_iter().filter(|q| seen.insert(q.id())).collect()
}
