use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::model::LessonId;

/// Which screen a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionMode {
    /// Free practice over a lesson/category/all filter. No pass/fail.
    Practice,
    /// End-of-lesson quiz; passing completes the lesson.
    LessonQuiz { lesson_id: LessonId },
    /// Full timed exam simulation.
    Exam,
}

impl SessionMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionMode::Practice => "practice",
            SessionMode::LessonQuiz { .. } => "lesson_quiz",
            SessionMode::Exam => "exam",
        }
    }

    #[must_use]
    pub fn lesson_id(self) -> Option<LessonId> {
        match self {
            SessionMode::LessonQuiz { lesson_id } => Some(lesson_id),
            _ => None,
        }
    }
}

/// How a finished session is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassPolicy {
    /// Only a ratio is shown.
    None,
    /// `correct >= ceil(total * percent / 100)`.
    MinPercent { percent: u8 },
    /// `correct >= total - allowed` (saturating).
    MaxErrors { allowed: u32 },
}

impl PassPolicy {
    /// Minimum number of correct answers needed to pass `total` questions.
    #[must_use]
    pub fn threshold(self, total: u32) -> Option<u32> {
        match self {
            PassPolicy::None => None,
            PassPolicy::MinPercent { percent } => {
                let scaled = u64::from(total) * u64::from(percent.min(100));
                Some(u32::try_from(scaled.div_ceil(100)).unwrap_or(u32::MAX))
            }
            PassPolicy::MaxErrors { allowed } => Some(total.saturating_sub(allowed)),
        }
    }

    #[must_use]
    pub fn passed(self, correct: u32, total: u32) -> Option<bool> {
        self.threshold(total).map(|needed| correct >= needed)
    }
}

/// Mode configuration: pass policy, navigation freedom, and timer presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModePolicy {
    pub pass: PassPolicy,
    /// Exam mode lets the user move back and forth and change answers;
    /// the other modes commit the answer and auto-advance.
    pub free_navigation: bool,
    pub time_limit: Option<Duration>,
}

impl ModePolicy {
    #[must_use]
    pub fn practice() -> Self {
        Self {
            pass: PassPolicy::None,
            free_navigation: false,
            time_limit: None,
        }
    }

    #[must_use]
    pub fn lesson_quiz(pass_percent: u8) -> Self {
        Self {
            pass: PassPolicy::MinPercent {
                percent: pass_percent,
            },
            free_navigation: false,
            time_limit: None,
        }
    }

    #[must_use]
    pub fn exam(allowed_errors: u32, time_limit: Duration) -> Self {
        Self {
            pass: PassPolicy::MaxErrors {
                allowed: allowed_errors,
            },
            free_navigation: true,
            time_limit: Some(time_limit),
        }
    }

    #[must_use]
    pub fn auto_advance(&self) -> bool {
        !self.free_navigation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exam_boundary_at_thirty_questions() {
        let policy = PassPolicy::MaxErrors { allowed: 3 };
        assert_eq!(policy.threshold(30), Some(27));
        assert_eq!(policy.passed(27, 30), Some(true));
        assert_eq!(policy.passed(26, 30), Some(false));
    }

    #[test]
    fn exam_threshold_saturates_for_tiny_exams() {
        let policy = PassPolicy::MaxErrors { allowed: 3 };
        assert_eq!(policy.threshold(2), Some(0));
        assert_eq!(policy.passed(0, 2), Some(true));
    }

    #[test]
    fn lesson_quiz_boundary_at_ten_questions() {
        let policy = PassPolicy::MinPercent { percent: 70 };
        assert_eq!(policy.threshold(10), Some(7));
        assert_eq!(policy.passed(7, 10), Some(true));
        assert_eq!(policy.passed(6, 10), Some(false));
    }

    #[test]
    fn lesson_quiz_rounds_up() {
        let policy = PassPolicy::MinPercent { percent: 70 };
        // 0.7 * 3 = 2.1 -> 3
        assert_eq!(policy.threshold(3), Some(3));
        // 0.7 * 4 = 2.8 -> 3
        assert_eq!(policy.threshold(4), Some(3));
    }

    #[test]
    fn practice_has_no_verdict() {
        assert_eq!(PassPolicy::None.passed(5, 10), None);
    }

    #[test]
    fn mode_names_are_stable() {
        assert_eq!(SessionMode::Exam.as_str(), "exam");
        let lesson_id = LessonId::new_v4();
        let quiz = SessionMode::LessonQuiz { lesson_id };
        assert_eq!(quiz.as_str(), "lesson_quiz");
        assert_eq!(quiz.lesson_id(), Some(lesson_id));
        assert_eq!(SessionMode::Practice.lesson_id(), None);
    }

    #[test]
    fn only_exam_navigates_freely() {
        assert!(ModePolicy::practice().auto_advance());
        assert!(ModePolicy::lesson_quiz(70).auto_advance());
        let exam = ModePolicy::exam(3, Duration::minutes(30));
        assert!(!exam.auto_advance());
        assert_eq!(exam.time_limit, Some(Duration::minutes(30)));
    }
}
