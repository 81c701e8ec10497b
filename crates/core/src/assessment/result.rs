use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::assessment::SessionMode;
use crate::model::AttemptAnswer;

/// Why a session reached `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    /// The last question was answered in an auto-advancing mode.
    Completed,
    /// The user submitted the exam.
    Submitted,
    /// The exam countdown reached zero.
    TimeExpired,
}

/// Discrete outcome signals for the surrounding UI (toasts, banners).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    Passed,
    Failed,
    /// Practice finished; only a ratio is available.
    Completed,
    TimeExpired,
}

/// Immutable outcome computed once when a session finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    pub mode: SessionMode,
    pub total: u32,
    pub answered: u32,
    pub correct: u32,
    pub passed: Option<bool>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub reason: FinishReason,
    /// Per-question answer as submitted, `None` where left unanswered.
    pub answers: Vec<AttemptAnswer>,
}

impl SessionResult {
    #[must_use]
    pub fn wrong(&self) -> u32 {
        self.total - self.correct
    }

    #[must_use]
    pub fn time_spent(&self) -> Duration {
        self.finished_at - self.started_at
    }

    /// Correct answers as a rounded percentage of the total.
    #[must_use]
    pub fn ratio_percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let (correct, total) = (u64::from(self.correct), u64::from(self.total));
        let pct = (correct * 200 + total) / (total * 2);
        u8::try_from(pct.min(100)).unwrap_or(100)
    }

    /// Events to surface, in display order.
    #[must_use]
    pub fn events(&self) -> Vec<SessionEvent> {
        let mut out = Vec::with_capacity(2);
        if self.reason == FinishReason::TimeExpired {
            out.push(SessionEvent::TimeExpired);
        }
        out.push(match self.passed {
            Some(true) => SessionEvent::Passed,
            Some(false) => SessionEvent::Failed,
            None => SessionEvent::Completed,
        });
        out
    }
}
