use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use patente_core::Clock;
use patente_core::assessment::{
    AnswerOutcome, AssessmentSession, SessionEvent, SessionMode, SessionResult, TransitionError,
};
use patente_core::model::{
    AttemptId, BilingualText, ExamAttempt, LessonId, LessonProgress, QuestionId, QuestionProgress,
    SignId, UserId,
};
use storage::repository::ProgressRepository;

use super::recorder::ProgressRecorder;
use super::timer::ExamTimer;
use crate::error::AssessmentError;

const EVENT_CAPACITY: usize = 16;

//
// ─── SNAPSHOT ──────────────────────────────────────────────────────────────────
//

/// The question at the cursor, without its solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub position: usize,
    pub id: QuestionId,
    pub prompt: BilingualText,
    pub sign_id: Option<SignId>,
    /// Answer already given at this position (exam navigation).
    pub answer: Option<bool>,
}

/// Serializable picture of a running or finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub attempt_id: AttemptId,
    pub mode: SessionMode,
    pub total: usize,
    pub answered: usize,
    pub current: Option<QuestionView>,
    /// Submitted answer per position, `None` where unanswered.
    pub answers: Vec<Option<bool>>,
    pub remaining_secs: Option<i64>,
    pub result: Option<SessionResult>,
}

//
// ─── ACTIVE SESSION ────────────────────────────────────────────────────────────
//

struct SessionShared {
    user_id: UserId,
    attempt_id: AttemptId,
    clock: Clock,
    session: Mutex<AssessmentSession>,
    recorder: ProgressRecorder,
    progress: Arc<dyn ProgressRepository>,
    events: broadcast::Sender<SessionEvent>,
    timer: Mutex<Option<ExamTimer>>,
    finalized: AtomicBool,
}

/// Handle to a started session.
///
/// Cloning is cheap and every clone drives the same session. Calls that are
/// not valid in the current state are ignored and return `None`.
#[derive(Clone)]
pub struct ActiveSession {
    shared: Arc<SessionShared>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ActiveSession {
    /// Wrap an already started session and arm its deadline, if any.
    pub(crate) fn launch(
        user_id: UserId,
        clock: Clock,
        session: AssessmentSession,
        recorder: ProgressRecorder,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let active = Self {
            shared: Arc::new(SessionShared {
                user_id,
                attempt_id: AttemptId::new_v4(),
                clock,
                session: Mutex::new(session),
                recorder,
                progress,
                events,
                timer: Mutex::new(None),
                finalized: AtomicBool::new(false),
            }),
        };
        active.arm_timer();
        active
    }

    fn arm_timer(&self) {
        let Some(remaining) = self.remaining_time() else {
            return;
        };
        let after = remaining.to_std().unwrap_or(std::time::Duration::ZERO);
        let weak = Arc::downgrade(&self.shared);
        let timer = ExamTimer::spawn(after, async move {
            if let Some(shared) = weak.upgrade() {
                ActiveSession { shared }.on_deadline().await;
            }
        });
        *lock(&self.shared.timer) = Some(timer);
    }

    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.shared.attempt_id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.shared.user_id
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        lock(&self.shared.session).mode()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        lock(&self.shared.session).is_finished()
    }

    /// Outcome events (`TimeExpired`, then `Passed`/`Failed`/`Completed`).
    ///
    /// Subscribe before the session can finish to observe them.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Time left before the deadline; `None` for untimed modes.
    #[must_use]
    pub fn remaining_time(&self) -> Option<Duration> {
        lock(&self.shared.session).remaining(self.shared.clock.now())
    }

    /// Answer the question at the cursor.
    ///
    /// Practice and lesson-quiz answers are recorded right away. An answer
    /// arriving after the deadline finishes the session as expired instead.
    pub async fn submit_answer(&self, answer: bool) -> Option<AnswerOutcome> {
        let now = self.shared.clock.now();
        let (submitted, auto_advance) = {
            let mut session = lock(&self.shared.session);
            let auto_advance = session.policy().auto_advance();
            (session.submit_answer(answer, now), auto_advance)
        };

        match submitted {
            Ok(outcome) => {
                debug!(
                    attempt_id = %self.shared.attempt_id,
                    position = outcome.position,
                    correct = outcome.correct,
                    "answer submitted"
                );
                if auto_advance {
                    self.shared.recorder.record(QuestionProgress::new(
                        self.shared.user_id,
                        outcome.question_id,
                        outcome.correct,
                        now,
                        Some(self.shared.attempt_id),
                    ));
                }
                if outcome.finished.is_some() {
                    self.finalize(false).await;
                }
                Some(outcome)
            }
            Err(TransitionError::TimeExpired) => {
                info!(attempt_id = %self.shared.attempt_id, "answer arrived after the deadline");
                self.finalize(false).await;
                None
            }
            Err(err) => {
                debug!(attempt_id = %self.shared.attempt_id, error = %err, "answer ignored");
                None
            }
        }
    }

    pub fn advance(&self) -> Option<usize> {
        self.navigate("advance", AssessmentSession::advance)
    }

    pub fn retreat(&self) -> Option<usize> {
        self.navigate("retreat", AssessmentSession::retreat)
    }

    pub fn jump_to(&self, index: usize) -> Option<usize> {
        self.navigate("jump_to", |session| session.jump_to(index))
    }

    fn navigate<F>(&self, action: &'static str, step: F) -> Option<usize>
    where
        F: FnOnce(&mut AssessmentSession) -> Result<usize, TransitionError>,
    {
        let mut session = lock(&self.shared.session);
        match step(&mut session) {
            Ok(index) => Some(index),
            Err(err) => {
                debug!(
                    attempt_id = %self.shared.attempt_id,
                    action,
                    error = %err,
                    "navigation ignored"
                );
                None
            }
        }
    }

    /// Finish the session and persist its outcome.
    ///
    /// Calling it again returns the same result.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::Transition` if the session never started.
    pub async fn finish(&self) -> Result<SessionResult, AssessmentError> {
        let result = {
            let mut session = lock(&self.shared.session);
            session.finish(self.shared.clock.now())?
        };
        self.finalize(false).await;
        Ok(result)
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let now = self.shared.clock.now();
        let session = lock(&self.shared.session);
        let progress = session.progress();
        let answers: Vec<Option<bool>> = (0..progress.total)
            .map(|i| session.answer_at(i).map(|a| a.submitted))
            .collect();
        let current = progress.current.and_then(|position| {
            session.current_question().map(|q| QuestionView {
                position,
                id: q.id(),
                prompt: q.prompt().clone(),
                sign_id: q.sign_id(),
                answer: answers.get(position).copied().flatten(),
            })
        });

        SessionSnapshot {
            attempt_id: self.shared.attempt_id,
            mode: session.mode(),
            total: progress.total,
            answered: progress.answered,
            current,
            answers,
            remaining_secs: session.remaining(now).map(|d| d.num_seconds()),
            result: session.result().cloned(),
        }
    }

    async fn on_deadline(&self) {
        let expired = {
            let mut session = lock(&self.shared.session);
            let now = self.shared.clock.now();
            let at = session.deadline().map_or(now, |deadline| deadline.max(now));
            session.expire(at)
        };
        if expired.is_some() {
            info!(attempt_id = %self.shared.attempt_id, "exam time expired");
            self.finalize(true).await;
        }
    }

    /// Persist the finished session once, then announce the outcome.
    async fn finalize(&self, from_timer: bool) {
        if self.shared.finalized.swap(true, Ordering::SeqCst) {
            return;
        }
        let timer = lock(&self.shared.timer).take();
        if let Some(timer) = timer {
            if !from_timer {
                timer.cancel();
            }
        }

        let (result, exam_records) = {
            let session = lock(&self.shared.session);
            let Some(result) = session.result().cloned() else {
                return;
            };
            let records = if session.mode() == SessionMode::Exam {
                self.exam_records(&session, result.finished_at)
            } else {
                Vec::new()
            };
            (result, records)
        };

        self.shared.recorder.flush().await;
        if !exam_records.is_empty() {
            self.shared.recorder.record_session_result(&exam_records).await;
        }
        self.store_attempt(&result).await;
        if let SessionMode::LessonQuiz { lesson_id } = result.mode {
            if result.passed == Some(true) {
                self.complete_lesson(lesson_id, result.finished_at).await;
            }
        }

        info!(
            attempt_id = %self.shared.attempt_id,
            user_id = %self.shared.user_id,
            mode = result.mode.as_str(),
            correct = result.correct,
            total = result.total,
            passed = ?result.passed,
            reason = ?result.reason,
            "session finished"
        );
        for event in result.events() {
            // No subscribers is fine.
            let _ = self.shared.events.send(event);
        }
    }

    fn exam_records(
        &self,
        session: &AssessmentSession,
        at: DateTime<Utc>,
    ) -> Vec<QuestionProgress> {
        session
            .questions()
            .iter()
            .enumerate()
            .map(|(i, q)| {
                QuestionProgress::new(
                    self.shared.user_id,
                    q.id(),
                    session.answer_at(i).is_some_and(|a| a.correct),
                    at,
                    Some(self.shared.attempt_id),
                )
            })
            .collect()
    }

    async fn store_attempt(&self, result: &SessionResult) {
        let attempt = match ExamAttempt::new(
            self.shared.attempt_id,
            self.shared.user_id,
            result.mode,
            result.answers.clone(),
            result.correct,
            result.passed,
            result.started_at,
            result.finished_at,
        ) {
            Ok(attempt) => attempt,
            Err(err) => {
                warn!(
                    attempt_id = %self.shared.attempt_id,
                    error = %err,
                    "invalid attempt summary"
                );
                return;
            }
        };
        if let Err(err) = self.shared.recorder.record_attempt(&attempt).await {
            warn!(attempt_id = %self.shared.attempt_id, error = %err, "failed to store attempt");
        }
    }

    async fn complete_lesson(&self, lesson_id: LessonId, at: DateTime<Utc>) {
        let user_id = self.shared.user_id;
        let existing = match self.shared.progress.get_lesson_progress(user_id, lesson_id).await {
            Ok(existing) => existing,
            Err(err) => {
                warn!(%lesson_id, error = %err, "failed to load lesson progress");
                return;
            }
        };
        let mut record =
            existing.unwrap_or_else(|| LessonProgress::started(user_id, lesson_id, at));
        record.complete(at);
        if let Err(err) = self.shared.progress.upsert_lesson_progress(&record).await {
            warn!(%lesson_id, error = %err, "failed to store lesson progress");
        }
    }
}

impl fmt::Debug for ActiveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveSession")
            .field("attempt_id", &self.shared.attempt_id)
            .field("user_id", &self.shared.user_id)
            .field("finalized", &self.shared.finalized.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
