use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use patente_core::assessment::{FinishReason, SessionEvent, SessionMode};
use patente_core::model::{
    AttemptId, CategoryDraft, CategoryId, Difficulty, ExamAttempt, LessonDraft, LessonId,
    LessonProgress, QuestionDraft, QuestionId, QuestionProgress, UserId,
};
use patente_core::time::{fixed_clock, fixed_now};
use services::{ActiveSession, AssessmentConfig, AssessmentError, AssessmentService};
use storage::repository::{
    AnswerTotals, CatalogRepository, InMemoryRepository, ProgressRepository, QuestionFilter,
    QuestionRepository, StorageError,
};

struct Bank {
    repo: InMemoryRepository,
    lesson_id: LessonId,
    answers: HashMap<QuestionId, bool>,
}

async fn seed(questions: usize) -> Bank {
    let repo = InMemoryRepository::new();
    let category = CategoryDraft {
        name_it: "Segnali di pericolo".into(),
        name_ar: "إشارات الخطر".into(),
        description_ar: String::new(),
        icon: "⚠️".into(),
        color: "#e53935".into(),
        image_url: String::new(),
        order: 1,
        is_published: true,
    }
    .validate(CategoryId::new_v4(), fixed_now())
    .unwrap();
    repo.upsert_category(&category).await.unwrap();

    let lesson = LessonDraft {
        category_id: category.id,
        title_it: "Curve pericolose".into(),
        title_ar: "منعطفات خطرة".into(),
        description_it: String::new(),
        description_ar: String::new(),
        content_it: "Il segnale preannuncia una curva.".into(),
        content_ar: "الإشارة تنبه إلى منعطف.".into(),
        image_url: String::new(),
        order: 1,
        icon: String::new(),
        color: String::new(),
        is_published: true,
    }
    .validate(LessonId::new_v4(), fixed_now())
    .unwrap();
    repo.upsert_lesson(&lesson).await.unwrap();

    let mut answers = HashMap::new();
    for n in 0..questions {
        let correct_answer = n % 3 != 0;
        let question = QuestionDraft {
            prompt_it: format!("Domanda {n}"),
            prompt_ar: format!("سؤال {n}"),
            correct_answer,
            explanation_it: String::new(),
            explanation_ar: String::new(),
            category: "pericolo".into(),
            difficulty: Difficulty::Medium,
            lesson_id: Some(lesson.id),
            sign_id: None,
        }
        .validate(
            QuestionId::new_v4(),
            fixed_now() + chrono::Duration::seconds(i64::try_from(n).unwrap()),
        )
        .unwrap();
        answers.insert(question.id(), correct_answer);
        repo.upsert_question(&question).await.unwrap();
    }

    Bank {
        repo,
        lesson_id: lesson.id,
        answers,
    }
}

fn service(bank: &Bank) -> AssessmentService {
    AssessmentService::new(
        fixed_clock(),
        AssessmentConfig::default(),
        Arc::new(bank.repo.clone()),
        Arc::new(bank.repo.clone()),
        Arc::new(bank.repo.clone()),
    )
}

/// Reads from the wrapped store; every write fails.
struct ReadOnlyProgress {
    inner: InMemoryRepository,
}

fn write_failed() -> StorageError {
    StorageError::Connection("database is locked".into())
}

#[async_trait]
impl ProgressRepository for ReadOnlyProgress {
    async fn append_question_progress(
        &self,
        _record: &QuestionProgress,
    ) -> Result<(), StorageError> {
        Err(write_failed())
    }

    async fn question_progress_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<QuestionProgress>, StorageError> {
        self.inner.question_progress_for_user(user).await
    }

    async fn answer_totals(&self) -> Result<AnswerTotals, StorageError> {
        self.inner.answer_totals().await
    }

    async fn upsert_lesson_progress(&self, _record: &LessonProgress) -> Result<(), StorageError> {
        Err(write_failed())
    }

    async fn get_lesson_progress(
        &self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        self.inner.get_lesson_progress(user, lesson).await
    }

    async fn lesson_progress_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        self.inner.lesson_progress_for_user(user).await
    }

    async fn append_attempt(&self, _attempt: &ExamAttempt) -> Result<(), StorageError> {
        Err(write_failed())
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<ExamAttempt, StorageError> {
        self.inner.get_attempt(id).await
    }

    async fn attempts_for_user(&self, user: UserId) -> Result<Vec<ExamAttempt>, StorageError> {
        self.inner.attempts_for_user(user).await
    }

    async fn list_attempts(&self) -> Result<Vec<ExamAttempt>, StorageError> {
        self.inner.list_attempts().await
    }

    async fn reset_user_progress(&self, _user: UserId) -> Result<(), StorageError> {
        Err(write_failed())
    }
}

impl Bank {
    fn answer_for(&self, session: &ActiveSession, right: bool) -> bool {
        let current = session.snapshot().current.expect("a current question");
        let correct = self.answers[&current.id];
        if right { correct } else { !correct }
    }
}

/// Answer every question of an auto-advancing session, the first `right` correctly.
async fn run_through(bank: &Bank, session: &ActiveSession, right: usize) {
    let mut n = 0;
    while !session.is_finished() {
        let answer = bank.answer_for(session, n < right);
        session.submit_answer(answer).await.expect("answer accepted");
        n += 1;
    }
}

/// Answer exam questions through the grid, the first `right` correctly.
async fn answer_exam(bank: &Bank, session: &ActiveSession, total: usize, right: usize) {
    for i in 0..total {
        assert_eq!(session.jump_to(i), Some(i));
        let answer = bank.answer_for(session, i < right);
        let outcome = session.submit_answer(answer).await.expect("answer accepted");
        assert_eq!(outcome.position, i);
        assert!(outcome.finished.is_none());
    }
}

#[tokio::test]
async fn practice_uses_whole_pool_when_smaller_than_target() {
    let bank = seed(5).await;
    let user = UserId::new_v4();
    let session = service(&bank)
        .start_practice(user, QuestionFilter::All)
        .await
        .unwrap();

    let snapshot = session.snapshot();
    assert_eq!(snapshot.total, 5);
    assert_eq!(snapshot.remaining_secs, None);

    run_through(&bank, &session, 3).await;
    let result = session.finish().await.unwrap();
    assert_eq!(result.mode, SessionMode::Practice);
    assert_eq!(result.correct, 3);
    assert_eq!(result.passed, None);
    assert_eq!(result.reason, FinishReason::Completed);

    let records = bank.repo.question_progress_for_user(user).await.unwrap();
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| r.attempt_id == Some(session.attempt_id())));
    let attempts = bank.repo.attempts_for_user(user).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].score(), 3);
}

#[tokio::test]
async fn practice_is_capped_at_configured_size() {
    let bank = seed(25).await;
    let session = service(&bank)
        .start_practice(UserId::new_v4(), QuestionFilter::Lesson(bank.lesson_id))
        .await
        .unwrap();
    assert_eq!(session.snapshot().total, 10);
}

#[tokio::test]
async fn wrong_answer_is_recorded_as_incorrect() {
    let bank = seed(3).await;
    let session = service(&bank)
        .start_practice(UserId::new_v4(), QuestionFilter::All)
        .await
        .unwrap();

    let current = session.snapshot().current.unwrap();
    let truth = bank.answers[&current.id];
    let outcome = session.submit_answer(!truth).await.unwrap();
    assert!(!outcome.correct);
    assert_eq!(outcome.correct_answer, truth);
    assert_eq!(outcome.question_id, current.id);
}

#[tokio::test]
async fn lesson_quiz_passes_at_seventy_percent_and_completes_lesson() {
    let bank = seed(10).await;
    let user = UserId::new_v4();
    let session = service(&bank)
        .start_lesson_quiz(user, bank.lesson_id)
        .await
        .unwrap();
    let mut events = session.subscribe();

    let stored: Vec<QuestionId> = bank
        .repo
        .list_questions(QuestionFilter::Lesson(bank.lesson_id))
        .await
        .unwrap()
        .iter()
        .map(|q| q.id())
        .collect();
    assert_eq!(session.snapshot().current.unwrap().id, stored[0]);

    run_through(&bank, &session, 7).await;
    let result = session.finish().await.unwrap();
    assert_eq!(result.correct, 7);
    assert_eq!(result.passed, Some(true));
    assert_eq!(events.recv().await.unwrap(), SessionEvent::Passed);

    let progress = bank
        .repo
        .get_lesson_progress(user, bank.lesson_id)
        .await
        .unwrap()
        .expect("lesson progress stored");
    assert!(progress.completed);
    assert_eq!(progress.score, 100);
}

#[tokio::test]
async fn lesson_quiz_fails_below_threshold() {
    let bank = seed(10).await;
    let user = UserId::new_v4();
    let session = service(&bank)
        .start_lesson_quiz(user, bank.lesson_id)
        .await
        .unwrap();
    let mut events = session.subscribe();

    run_through(&bank, &session, 6).await;
    let result = session.finish().await.unwrap();
    assert_eq!(result.passed, Some(false));
    assert_eq!(events.recv().await.unwrap(), SessionEvent::Failed);
    assert!(bank.repo.get_lesson_progress(user, bank.lesson_id).await.unwrap().is_none());
}

#[tokio::test]
async fn exam_passes_with_three_errors_and_fails_with_four() {
    let bank = seed(40).await;
    let svc = service(&bank);

    let user = UserId::new_v4();
    let exam = svc.start_exam(user).await.unwrap();
    assert_eq!(exam.snapshot().total, 30);
    answer_exam(&bank, &exam, 30, 27).await;
    let passed = exam.finish().await.unwrap();
    assert_eq!(passed.correct, 27);
    assert_eq!(passed.passed, Some(true));
    assert_eq!(passed.reason, FinishReason::Submitted);

    let records = bank.repo.question_progress_for_user(user).await.unwrap();
    assert_eq!(records.len(), 30);
    assert_eq!(records.iter().filter(|r| r.correct).count(), 27);

    let other = UserId::new_v4();
    let exam = svc.start_exam(other).await.unwrap();
    answer_exam(&bank, &exam, 30, 26).await;
    let failed = exam.finish().await.unwrap();
    assert_eq!(failed.passed, Some(false));

    let attempts = bank.repo.attempts_for_user(other).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].total(), 30);
    assert_eq!(attempts[0].passed(), Some(false));
}

#[tokio::test]
async fn exam_navigation_and_overwrite() {
    let bank = seed(30).await;
    let exam = service(&bank).start_exam(UserId::new_v4()).await.unwrap();

    assert_eq!(exam.retreat(), None);
    assert_eq!(exam.advance(), Some(1));
    assert_eq!(exam.jump_to(29), Some(29));
    assert_eq!(exam.advance(), None);
    assert_eq!(exam.jump_to(30), None);

    let first = bank.answer_for(&exam, false);
    exam.submit_answer(first).await.unwrap();
    let fixed = bank.answer_for(&exam, true);
    let outcome = exam.submit_answer(fixed).await.unwrap();
    assert!(outcome.correct);

    let snapshot = exam.snapshot();
    assert_eq!(snapshot.answered, 1);
    assert_eq!(snapshot.current.unwrap().answer, Some(fixed));
    assert_eq!(snapshot.remaining_secs, Some(30 * 60));
}

#[tokio::test]
async fn finish_is_idempotent_and_later_calls_are_ignored() {
    let bank = seed(4).await;
    let user = UserId::new_v4();
    let session = service(&bank)
        .start_practice(user, QuestionFilter::All)
        .await
        .unwrap();

    assert_eq!(session.advance(), None);
    session.submit_answer(true).await.unwrap();

    let first = session.finish().await.unwrap();
    let second = session.finish().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.answered, 1);
    assert_eq!(first.total, 4);

    assert!(session.submit_answer(true).await.is_none());
    assert_eq!(bank.repo.attempts_for_user(user).await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn exam_expires_when_the_timer_runs_out() {
    let bank = seed(30).await;
    let user = UserId::new_v4();
    let exam = service(&bank).start_exam(user).await.unwrap();
    let mut events = exam.subscribe();

    answer_exam(&bank, &exam, 3, 3).await;
    tokio::time::advance(Duration::from_secs(30 * 60 + 1)).await;

    assert_eq!(events.recv().await.unwrap(), SessionEvent::TimeExpired);
    assert_eq!(events.recv().await.unwrap(), SessionEvent::Failed);
    assert!(exam.is_finished());

    let result = exam.snapshot().result.expect("result after expiry");
    assert_eq!(result.reason, FinishReason::TimeExpired);
    assert_eq!(result.answered, 3);
    assert_eq!(result.correct, 3);
    assert_eq!(result.wrong(), 27);
    assert_eq!(result.time_spent(), chrono::Duration::minutes(30));

    let again = exam.finish().await.unwrap();
    assert_eq!(again, result);
    assert_eq!(exam.finish().await.unwrap(), result);
    assert_eq!(bank.repo.attempts_for_user(user).await.unwrap().len(), 1);
    assert_eq!(bank.repo.question_progress_for_user(user).await.unwrap().len(), 30);
}

#[tokio::test]
async fn empty_selections_are_reported() {
    let bank = seed(0).await;
    let svc = service(&bank);

    let err = svc
        .start_practice(UserId::new_v4(), QuestionFilter::All)
        .await
        .unwrap_err();
    assert!(err.is_empty_selection());

    let err = svc.start_exam(UserId::new_v4()).await.unwrap_err();
    assert!(err.is_empty_selection());

    let err = svc
        .start_lesson_quiz(UserId::new_v4(), bank.lesson_id)
        .await
        .unwrap_err();
    assert!(err.is_empty_selection());

    let err = svc
        .start_lesson_quiz(UserId::new_v4(), LessonId::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AssessmentError::Storage(StorageError::NotFound)));
}

#[tokio::test]
async fn failed_writes_leave_the_outcome_intact() {
    let bank = seed(10).await;
    let svc = AssessmentService::new(
        fixed_clock(),
        AssessmentConfig::default(),
        Arc::new(bank.repo.clone()),
        Arc::new(bank.repo.clone()),
        Arc::new(ReadOnlyProgress {
            inner: bank.repo.clone(),
        }),
    );
    let user = UserId::new_v4();
    let session = svc.start_lesson_quiz(user, bank.lesson_id).await.unwrap();
    let mut events = session.subscribe();

    run_through(&bank, &session, 10).await;
    let result = session.finish().await.unwrap();
    assert_eq!(result.correct, 10);
    assert_eq!(result.passed, Some(true));
    assert_eq!(result.reason, FinishReason::Completed);
    assert_eq!(events.recv().await.unwrap(), SessionEvent::Passed);
    assert_eq!(session.finish().await.unwrap(), result);

    assert!(bank.repo.question_progress_for_user(user).await.unwrap().is_empty());
    assert!(bank.repo.attempts_for_user(user).await.unwrap().is_empty());
    assert!(bank.repo.get_lesson_progress(user, bank.lesson_id).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn submitted_exam_cancels_the_countdown() {
    let bank = seed(30).await;
    let user = UserId::new_v4();
    let exam = service(&bank).start_exam(user).await.unwrap();
    let mut events = exam.subscribe();

    answer_exam(&bank, &exam, 5, 5).await;
    let result = exam.finish().await.unwrap();
    assert_eq!(result.reason, FinishReason::Submitted);
    assert_eq!(result.passed, Some(false));

    tokio::time::advance(Duration::from_secs(60 * 60)).await;
    tokio::task::yield_now().await;

    assert_eq!(events.recv().await.unwrap(), SessionEvent::Failed);
    assert!(matches!(
        events.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
    assert_eq!(exam.snapshot().result.unwrap().reason, FinishReason::Submitted);
    assert_eq!(bank.repo.attempts_for_user(user).await.unwrap().len(), 1);
}
