use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::assessment::evaluator::evaluate_question;
use crate::assessment::result::{FinishReason, SessionResult};
use crate::assessment::{ModePolicy, SessionMode};
use crate::model::{AttemptAnswer, Question, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// A call that is not valid in the session's current state.
///
/// These are caller contract violations; hosts are expected to disable the
/// triggering affordance and may simply ignore the error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransitionError {
    #[error("session has not started")]
    NotStarted,

    #[error("session already started")]
    AlreadyStarted,

    #[error("session already finished")]
    Finished,

    #[error("session time has expired")]
    TimeExpired,

    #[error("navigation is only available in exam mode")]
    NavigationNotAllowed,

    #[error("question index {index} out of bounds for {len} questions")]
    OutOfBounds { index: usize, len: usize },

    #[error("cannot start a session without questions")]
    EmptySession,

    #[error("question {0} appears more than once")]
    DuplicateQuestion(QuestionId),
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    InProgress { current: usize },
    Finished,
}

/// Answer recorded for one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedAnswer {
    pub submitted: bool,
    pub correct: bool,
}

/// What happened when an answer was submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub position: usize,
    pub question_id: QuestionId,
    pub submitted: bool,
    pub correct: bool,
    pub correct_answer: bool,
    /// Set when this answer completed an auto-advancing session.
    pub finished: Option<SessionResult>,
}

/// Snapshot of progress through a session, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub current: Option<usize>,
    pub is_finished: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Shared state machine behind practice, lesson quiz and exam simulation.
///
/// `NotStarted → InProgress { current } → Finished`. The mode policy decides
/// navigation freedom, pass threshold and whether a deadline applies.
pub struct AssessmentSession {
    mode: SessionMode,
    policy: ModePolicy,
    questions: Vec<Question>,
    answers: Vec<Option<RecordedAnswer>>,
    state: SessionState,
    started_at: Option<DateTime<Utc>>,
    deadline: Option<DateTime<Utc>>,
    result: Option<SessionResult>,
}

impl AssessmentSession {
    #[must_use]
    pub fn new(mode: SessionMode, policy: ModePolicy) -> Self {
        Self {
            mode,
            policy,
            questions: Vec::new(),
            answers: Vec::new(),
            state: SessionState::NotStarted,
            started_at: None,
            deadline: None,
            result: None,
        }
    }

    /// Load the question sequence and begin at position 0.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::AlreadyStarted` unless `NotStarted`,
    /// `EmptySession` for no questions, and `DuplicateQuestion` if an id repeats.
    pub fn start(
        &mut self,
        questions: Vec<Question>,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if self.state != SessionState::NotStarted {
            return Err(TransitionError::AlreadyStarted);
        }
        if questions.is_empty() {
            return Err(TransitionError::EmptySession);
        }
        let mut seen = HashSet::with_capacity(questions.len());
        for q in &questions {
            if !seen.insert(q.id()) {
                return Err(TransitionError::DuplicateQuestion(q.id()));
            }
        }

        self.answers = vec![None; questions.len()];
        self.questions = questions;
        self.state = SessionState::InProgress { current: 0 };
        self.started_at = Some(now);
        self.deadline = self.policy.time_limit.map(|limit| now + limit);
        Ok(())
    }

    /// Record an answer for the current question.
    ///
    /// Exam mode keeps the position and allows overwriting; the other modes
    /// advance and finish automatically after the last question.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::NotStarted`/`Finished` outside `InProgress`,
    /// and `TimeExpired` if the deadline has passed (the session is finished
    /// as expired before returning).
    pub fn submit_answer(
        &mut self,
        answer: bool,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome, TransitionError> {
        let current = self.in_progress_index()?;
        if self.deadline_passed(now) {
            self.expire(now);
            return Err(TransitionError::TimeExpired);
        }

        let question = &self.questions[current];
        let correct = evaluate_question(question, answer);
        let question_id = question.id();
        let correct_answer = question.correct_answer();
        self.answers[current] = Some(RecordedAnswer {
            submitted: answer,
            correct,
        });

        let mut finished = None;
        if self.policy.auto_advance() {
            let next = current + 1;
            if next >= self.questions.len() {
                finished = Some(self.complete(now, FinishReason::Completed));
            } else {
                self.state = SessionState::InProgress { current: next };
            }
        }

        Ok(AnswerOutcome {
            position: current,
            question_id,
            submitted: answer,
            correct,
            correct_answer,
            finished,
        })
    }

    /// Move to the next question (exam mode).
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` outside exam `InProgress` or past the last question.
    pub fn advance(&mut self) -> Result<usize, TransitionError> {
        let current = self.navigable_index()?;
        self.move_to(current + 1)
    }

    /// Move to the previous question (exam mode).
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` outside exam `InProgress` or before the first question.
    pub fn retreat(&mut self) -> Result<usize, TransitionError> {
        let current = self.navigable_index()?;
        let Some(prev) = current.checked_sub(1) else {
            return Err(TransitionError::OutOfBounds {
                index: 0,
                len: self.questions.len(),
            });
        };
        self.move_to(prev)
    }

    /// Jump to any question (exam mode question grid).
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` outside exam `InProgress` or for an invalid index.
    pub fn jump_to(&mut self, index: usize) -> Result<usize, TransitionError> {
        self.navigable_index()?;
        self.move_to(index)
    }

    /// Finish the session and compute its result.
    ///
    /// Idempotent: once finished, the stored result is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::NotStarted` if the session never started.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<SessionResult, TransitionError> {
        match self.state {
            SessionState::NotStarted => Err(TransitionError::NotStarted),
            SessionState::Finished => self.result.clone().ok_or(TransitionError::Finished),
            SessionState::InProgress { .. } => {
                if self.deadline_passed(now) {
                    return Ok(self.complete(now, FinishReason::TimeExpired));
                }
                let reason = if self.policy.free_navigation {
                    FinishReason::Submitted
                } else {
                    FinishReason::Completed
                };
                Ok(self.complete(now, reason))
            }
        }
    }

    /// Timer expiry. Forces `finish` if still in progress, otherwise a no-op.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Option<SessionResult> {
        match self.state {
            SessionState::InProgress { .. } => Some(self.complete(now, FinishReason::TimeExpired)),
            _ => None,
        }
    }

    fn complete(&mut self, now: DateTime<Utc>, reason: FinishReason) -> SessionResult {
        let started_at = self.started_at.unwrap_or(now);
        let mut finished_at = now.max(started_at);
        if reason == FinishReason::TimeExpired {
            if let Some(deadline) = self.deadline {
                finished_at = finished_at.min(deadline);
            }
        }

        let answers: Vec<AttemptAnswer> = self
            .questions
            .iter()
            .zip(&self.answers)
            .map(|(q, a)| AttemptAnswer {
                question_id: q.id(),
                answer: a.map(|r| r.submitted),
            })
            .collect();
        let total = count_u32(self.questions.len());
        let answered = count_u32(self.answers.iter().filter(|a| a.is_some()).count());
        let correct = count_u32(
            self.answers
                .iter()
                .filter(|a| a.is_some_and(|r| r.correct))
                .count(),
        );

        let result = SessionResult {
            mode: self.mode,
            total,
            answered,
            correct,
            passed: self.policy.pass.passed(correct, total),
            started_at,
            finished_at,
            reason,
            answers,
        };
        self.state = SessionState::Finished;
        self.result = Some(result.clone());
        result
    }

    fn in_progress_index(&self) -> Result<usize, TransitionError> {
        match self.state {
            SessionState::NotStarted => Err(TransitionError::NotStarted),
            SessionState::Finished => Err(TransitionError::Finished),
            SessionState::InProgress { current } => Ok(current),
        }
    }

    fn navigable_index(&self) -> Result<usize, TransitionError> {
        let current = self.in_progress_index()?;
        if !self.policy.free_navigation {
            return Err(TransitionError::NavigationNotAllowed);
        }
        Ok(current)
    }

    fn move_to(&mut self, index: usize) -> Result<usize, TransitionError> {
        if index >= self.questions.len() {
            return Err(TransitionError::OutOfBounds {
                index,
                len: self.questions.len(),
            });
        }
        self.state = SessionState::InProgress { current: index };
        Ok(index)
    }

    fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn policy(&self) -> &ModePolicy {
        &self.policy
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == SessionState::Finished
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            SessionState::InProgress { current } => Some(current),
            _ => None,
        }
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current_index().and_then(|i| self.questions.get(i))
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn answer_at(&self, index: usize) -> Option<RecordedAnswer> {
        self.answers.get(index).copied().flatten()
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Time left before the deadline, clamped at zero. `None` without a timer.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.deadline
            .map(|d| if now >= d { Duration::zero() } else { d - now })
    }

    #[must_use]
    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.questions.len(),
            answered: self.answers.iter().filter(|a| a.is_some()).count(),
            current: self.current_index(),
            is_finished: self.is_finished(),
        }
    }
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl fmt::Debug for AssessmentSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssessmentSession")
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("questions_len", &self.questions.len())
            .field("started_at", &self.started_at)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
