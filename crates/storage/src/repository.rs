use async_trait::async_trait;
use patente_core::model::{
    AdminLogEntry, AttemptId, Category, CategoryId, Comment, CommentId, Email, ExamAttempt,
    GlossaryTerm, GlossaryTermId, Lesson, LessonId, LessonProgress, Like, Notification, Post,
    PostId, Question, QuestionId, QuestionProgress, Report, ReportId, ReportStatus, Sign, SignId,
    SignKind, User, UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Which questions form the candidate pool for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionFilter {
    All,
    Lesson(LessonId),
    /// Questions attached to any lesson of the category.
    Category(CategoryId),
}

/// Aggregate answer counts across all users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnswerTotals {
    pub answered: u64,
    pub correct: u64,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist or update a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_question(&self, id: QuestionId) -> Result<Question, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError>;

    /// Questions matching the filter, in stored order (creation time, then id).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn list_questions(&self, filter: QuestionFilter) -> Result<Vec<Question>, StorageError>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the category cannot be stored.
    async fn upsert_category(&self, category: &Category) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_category(&self, id: CategoryId) -> Result<Category, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn delete_category(&self, id: CategoryId) -> Result<(), StorageError>;

    /// Categories ordered by their `order` field.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn list_categories(&self, published_only: bool) -> Result<Vec<Category>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the lesson cannot be stored.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_lesson(&self, id: LessonId) -> Result<Lesson, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn delete_lesson(&self, id: LessonId) -> Result<(), StorageError>;

    /// Lessons ordered by their `order` field, optionally limited to one category.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn list_lessons(
        &self,
        category: Option<CategoryId>,
        published_only: bool,
    ) -> Result<Vec<Lesson>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the sign cannot be stored.
    async fn upsert_sign(&self, sign: &Sign) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn delete_sign(&self, id: SignId) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn list_signs(&self, kind: Option<SignKind>) -> Result<Vec<Sign>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the term cannot be stored.
    async fn upsert_glossary_term(&self, term: &GlossaryTerm) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn delete_glossary_term(&self, id: GlossaryTermId) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn list_glossary(&self) -> Result<Vec<GlossaryTerm>, StorageError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id or email is already taken.
    async fn insert_user(&self, user: &User) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    async fn update_user(&self, user: &User) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_user(&self, id: UserId) -> Result<User, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn list_users(&self) -> Result<Vec<User>, StorageError>;
}

/// Progress records. Question progress and attempts are append-only; the only
/// removal path is an explicit per-user reset.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn append_question_progress(&self, record: &QuestionProgress) -> Result<(), StorageError>;

    /// A user's answer records, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn question_progress_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<QuestionProgress>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn answer_totals(&self) -> Result<AnswerTotals, StorageError>;

    /// Insert or replace the record for `(user, lesson)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_lesson_progress(&self, record: &LessonProgress) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn get_lesson_progress(
        &self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn lesson_progress_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<LessonProgress>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if an attempt with the same id exists.
    async fn append_attempt(&self, attempt: &ExamAttempt) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_attempt(&self, id: AttemptId) -> Result<ExamAttempt, StorageError>;

    /// A user's attempts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn attempts_for_user(&self, user: UserId) -> Result<Vec<ExamAttempt>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn list_attempts(&self) -> Result<Vec<ExamAttempt>, StorageError>;

    /// Drop every progress record and attempt of one user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn reset_user_progress(&self, user: UserId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait CommunityRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` on duplicate ids.
    async fn insert_post(&self, post: &Post) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the post does not exist.
    async fn update_post(&self, post: &Post) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_post(&self, id: PostId) -> Result<Post, StorageError>;

    /// All posts, soft-deleted included, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn list_posts(&self) -> Result<Vec<Post>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` on duplicate ids.
    async fn insert_comment(&self, comment: &Comment) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the comment does not exist.
    async fn update_comment(&self, comment: &Comment) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_comment(&self, id: CommentId) -> Result<Comment, StorageError>;

    /// Comments on a post, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn comments_for_post(&self, post: PostId) -> Result<Vec<Comment>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn find_like(&self, post: PostId, user: UserId) -> Result<Option<Like>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the user already likes the post.
    async fn insert_like(&self, like: &Like) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the like does not exist.
    async fn delete_like(&self, post: PostId, user: UserId) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` on duplicate ids.
    async fn insert_report(&self, report: &Report) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the report does not exist.
    async fn update_report(&self, report: &Report) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_report(&self, id: ReportId) -> Result<Report, StorageError>;

    /// Reports newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn list_reports(&self, status: Option<ReportStatus>) -> Result<Vec<Report>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the notification cannot be stored.
    async fn insert_notification(&self, notification: &Notification) -> Result<(), StorageError>;

    /// A user's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn notifications_for_user(&self, user: UserId)
    -> Result<Vec<Notification>, StorageError>;

    /// Mark all of a user's notifications read; returns how many changed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn mark_notifications_read(&self, user: UserId) -> Result<u64, StorageError>;
}

#[async_trait]
pub trait AdminLogRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    async fn append_log(&self, entry: &AdminLogEntry) -> Result<(), StorageError>;

    /// Most recent entries first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn recent_logs(&self, limit: u32) -> Result<Vec<AdminLogEntry>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Append-only tables are kept as vectors so insertion order doubles as the
/// tie-breaker for equal timestamps.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<HashMap<QuestionId, Question>>>,
    categories: Arc<Mutex<HashMap<CategoryId, Category>>>,
    lessons: Arc<Mutex<HashMap<LessonId, Lesson>>>,
    signs: Arc<Mutex<HashMap<SignId, Sign>>>,
    glossary: Arc<Mutex<HashMap<GlossaryTermId, GlossaryTerm>>>,
    users: Arc<Mutex<HashMap<UserId, User>>>,
    question_progress: Arc<Mutex<Vec<QuestionProgress>>>,
    lesson_progress: Arc<Mutex<HashMap<(UserId, LessonId), LessonProgress>>>,
    attempts: Arc<Mutex<Vec<ExamAttempt>>>,
    posts: Arc<Mutex<Vec<Post>>>,
    comments: Arc<Mutex<Vec<Comment>>>,
    likes: Arc<Mutex<Vec<Like>>>,
    reports: Arc<Mutex<Vec<Report>>>,
    notifications: Arc<Mutex<Vec<Notification>>>,
    admin_logs: Arc<Mutex<Vec<AdminLogEntry>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

fn remove_keyed<K, V>(map: &mut HashMap<K, V>, key: &K) -> Result<(), StorageError>
where
    K: std::hash::Hash + Eq,
{
    map.remove(key).map(|_| ()).ok_or(StorageError::NotFound)
}

fn replace_where<T>(
    items: &mut [T],
    value: &T,
    same: impl Fn(&T) -> bool,
) -> Result<(), StorageError>
where
    T: Clone,
{
    let slot = items.iter_mut().find(|item| same(item)).ok_or(StorageError::NotFound)?;
    *slot = value.clone();
    Ok(())
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        lock(&self.questions)?.insert(question.id(), question.clone());
        Ok(())
    }

    async fn get_question(&self, id: QuestionId) -> Result<Question, StorageError> {
        lock(&self.questions)?
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError> {
        remove_keyed(&mut *lock(&self.questions)?, &id)
    }

    async fn list_questions(&self, filter: QuestionFilter) -> Result<Vec<Question>, StorageError> {
        let category_lessons: Option<Vec<LessonId>> = match filter {
            QuestionFilter::Category(category) => Some(
                lock(&self.lessons)?
                    .values()
                    .filter(|l| l.category_id == category)
                    .map(|l| l.id)
                    .collect(),
            ),
            _ => None,
        };

        let guard = lock(&self.questions)?;
        let mut found: Vec<Question> = guard
            .values()
            .filter(|q| match filter {
                QuestionFilter::All => true,
                QuestionFilter::Lesson(lesson) => q.lesson_id() == Some(lesson),
                QuestionFilter::Category(_) => q.lesson_id().is_some_and(|lesson| {
                    category_lessons
                        .as_ref()
                        .is_some_and(|ids| ids.contains(&lesson))
                }),
            })
            .cloned()
            .collect();
        found.sort_by_key(|q| (q.created_at(), q.id()));
        Ok(found)
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn upsert_category(&self, category: &Category) -> Result<(), StorageError> {
        lock(&self.categories)?.insert(category.id, category.clone());
        Ok(())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Category, StorageError> {
        lock(&self.categories)?
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), StorageError> {
        remove_keyed(&mut *lock(&self.categories)?, &id)
    }

    async fn list_categories(&self, published_only: bool) -> Result<Vec<Category>, StorageError> {
        let mut found: Vec<Category> = lock(&self.categories)?
            .values()
            .filter(|c| !published_only || c.is_published)
            .cloned()
            .collect();
        found.sort_by_key(|c| (c.order, c.created_at, c.id));
        Ok(found)
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        lock(&self.lessons)?.insert(lesson.id, lesson.clone());
        Ok(())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Lesson, StorageError> {
        lock(&self.lessons)?
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn delete_lesson(&self, id: LessonId) -> Result<(), StorageError> {
        remove_keyed(&mut *lock(&self.lessons)?, &id)
    }

    async fn list_lessons(
        &self,
        category: Option<CategoryId>,
        published_only: bool,
    ) -> Result<Vec<Lesson>, StorageError> {
        let mut found: Vec<Lesson> = lock(&self.lessons)?
            .values()
            .filter(|l| category.is_none_or(|c| l.category_id == c))
            .filter(|l| !published_only || l.is_published)
            .cloned()
            .collect();
        found.sort_by_key(|l| (l.order, l.created_at, l.id));
        Ok(found)
    }

    async fn upsert_sign(&self, sign: &Sign) -> Result<(), StorageError> {
        lock(&self.signs)?.insert(sign.id, sign.clone());
        Ok(())
    }

    async fn delete_sign(&self, id: SignId) -> Result<(), StorageError> {
        remove_keyed(&mut *lock(&self.signs)?, &id)
    }

    async fn list_signs(&self, kind: Option<SignKind>) -> Result<Vec<Sign>, StorageError> {
        let mut found: Vec<Sign> = lock(&self.signs)?
            .values()
            .filter(|s| kind.is_none_or(|k| s.kind == k))
            .cloned()
            .collect();
        found.sort_by_key(|s| (s.created_at, s.id));
        Ok(found)
    }

    async fn upsert_glossary_term(&self, term: &GlossaryTerm) -> Result<(), StorageError> {
        lock(&self.glossary)?.insert(term.id, term.clone());
        Ok(())
    }

    async fn delete_glossary_term(&self, id: GlossaryTermId) -> Result<(), StorageError> {
        remove_keyed(&mut *lock(&self.glossary)?, &id)
    }

    async fn list_glossary(&self) -> Result<Vec<GlossaryTerm>, StorageError> {
        let mut found: Vec<GlossaryTerm> = lock(&self.glossary)?.values().cloned().collect();
        found.sort_by(|a, b| a.term.it().cmp(b.term.it()).then(a.id.cmp(&b.id)));
        Ok(found)
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn insert_user(&self, user: &User) -> Result<(), StorageError> {
        let mut guard = lock(&self.users)?;
        if guard.contains_key(&user.id) || guard.values().any(|u| u.email == user.email) {
            return Err(StorageError::Conflict);
        }
        guard.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), StorageError> {
        let mut guard = lock(&self.users)?;
        let slot = guard.get_mut(&user.id).ok_or(StorageError::NotFound)?;
        *slot = user.clone();
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<User, StorageError> {
        lock(&self.users)?
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, StorageError> {
        Ok(lock(&self.users)?
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let mut found: Vec<User> = lock(&self.users)?.values().cloned().collect();
        found.sort_by_key(|u| (u.created_at, u.id));
        Ok(found)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn append_question_progress(
        &self,
        record: &QuestionProgress,
    ) -> Result<(), StorageError> {
        let mut guard = lock(&self.question_progress)?;
        if guard.iter().any(|r| r.id == record.id) {
            return Err(StorageError::Conflict);
        }
        guard.push(record.clone());
        Ok(())
    }

    async fn question_progress_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<QuestionProgress>, StorageError> {
        let mut found: Vec<QuestionProgress> = lock(&self.question_progress)?
            .iter()
            .filter(|r| r.user_id == user)
            .cloned()
            .collect();
        // stable: equal timestamps keep insertion order
        found.sort_by_key(|r| r.answered_at);
        Ok(found)
    }

    async fn answer_totals(&self) -> Result<AnswerTotals, StorageError> {
        let guard = lock(&self.question_progress)?;
        Ok(AnswerTotals {
            answered: guard.len() as u64,
            correct: guard.iter().filter(|r| r.correct).count() as u64,
        })
    }

    async fn upsert_lesson_progress(&self, record: &LessonProgress) -> Result<(), StorageError> {
        lock(&self.lesson_progress)?.insert((record.user_id, record.lesson_id), record.clone());
        Ok(())
    }

    async fn get_lesson_progress(
        &self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        Ok(lock(&self.lesson_progress)?.get(&(user, lesson)).cloned())
    }

    async fn lesson_progress_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let mut found: Vec<LessonProgress> = lock(&self.lesson_progress)?
            .values()
            .filter(|r| r.user_id == user)
            .cloned()
            .collect();
        found.sort_by_key(|r| (r.last_accessed_at, r.lesson_id));
        Ok(found)
    }

    async fn append_attempt(&self, attempt: &ExamAttempt) -> Result<(), StorageError> {
        let mut guard = lock(&self.attempts)?;
        if guard.iter().any(|a| a.id() == attempt.id()) {
            return Err(StorageError::Conflict);
        }
        guard.push(attempt.clone());
        Ok(())
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<ExamAttempt, StorageError> {
        lock(&self.attempts)?
            .iter()
            .find(|a| a.id() == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn attempts_for_user(&self, user: UserId) -> Result<Vec<ExamAttempt>, StorageError> {
        let mut found: Vec<ExamAttempt> = lock(&self.attempts)?
            .iter()
            .rev()
            .filter(|a| a.user_id() == user)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.completed_at().cmp(&a.completed_at()));
        Ok(found)
    }

    async fn list_attempts(&self) -> Result<Vec<ExamAttempt>, StorageError> {
        Ok(lock(&self.attempts)?.clone())
    }

    async fn reset_user_progress(&self, user: UserId) -> Result<(), StorageError> {
        lock(&self.question_progress)?.retain(|r| r.user_id != user);
        lock(&self.lesson_progress)?.retain(|(u, _), _| *u != user);
        lock(&self.attempts)?.retain(|a| a.user_id() != user);
        Ok(())
    }
}

#[async_trait]
impl CommunityRepository for InMemoryRepository {
    async fn insert_post(&self, post: &Post) -> Result<(), StorageError> {
        let mut guard = lock(&self.posts)?;
        if guard.iter().any(|p| p.id == post.id) {
            return Err(StorageError::Conflict);
        }
        guard.push(post.clone());
        Ok(())
    }

    async fn update_post(&self, post: &Post) -> Result<(), StorageError> {
        replace_where(&mut lock(&self.posts)?, post, |p| p.id == post.id)
    }

    async fn get_post(&self, id: PostId) -> Result<Post, StorageError> {
        lock(&self.posts)?
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_posts(&self) -> Result<Vec<Post>, StorageError> {
        let mut found: Vec<Post> = lock(&self.posts)?.iter().rev().cloned().collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<(), StorageError> {
        let mut guard = lock(&self.comments)?;
        if guard.iter().any(|c| c.id == comment.id) {
            return Err(StorageError::Conflict);
        }
        guard.push(comment.clone());
        Ok(())
    }

    async fn update_comment(&self, comment: &Comment) -> Result<(), StorageError> {
        replace_where(&mut lock(&self.comments)?, comment, |c| c.id == comment.id)
    }

    async fn get_comment(&self, id: CommentId) -> Result<Comment, StorageError> {
        lock(&self.comments)?
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn comments_for_post(&self, post: PostId) -> Result<Vec<Comment>, StorageError> {
        let mut found: Vec<Comment> = lock(&self.comments)?
            .iter()
            .filter(|c| c.post_id == post)
            .cloned()
            .collect();
        found.sort_by_key(|c| c.created_at);
        Ok(found)
    }

    async fn find_like(&self, post: PostId, user: UserId) -> Result<Option<Like>, StorageError> {
        Ok(lock(&self.likes)?
            .iter()
            .find(|l| l.post_id == post && l.user_id == user)
            .cloned())
    }

    async fn insert_like(&self, like: &Like) -> Result<(), StorageError> {
        let mut guard = lock(&self.likes)?;
        if guard
            .iter()
            .any(|l| l.id == like.id || (l.post_id == like.post_id && l.user_id == like.user_id))
        {
            return Err(StorageError::Conflict);
        }
        guard.push(like.clone());
        Ok(())
    }

    async fn delete_like(&self, post: PostId, user: UserId) -> Result<(), StorageError> {
        let mut guard = lock(&self.likes)?;
        let before = guard.len();
        guard.retain(|l| !(l.post_id == post && l.user_id == user));
        if guard.len() == before {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn insert_report(&self, report: &Report) -> Result<(), StorageError> {
        let mut guard = lock(&self.reports)?;
        if guard.iter().any(|r| r.id == report.id) {
            return Err(StorageError::Conflict);
        }
        guard.push(report.clone());
        Ok(())
    }

    async fn update_report(&self, report: &Report) -> Result<(), StorageError> {
        replace_where(&mut lock(&self.reports)?, report, |r| r.id == report.id)
    }

    async fn get_report(&self, id: ReportId) -> Result<Report, StorageError> {
        lock(&self.reports)?
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_reports(
        &self,
        status: Option<ReportStatus>,
    ) -> Result<Vec<Report>, StorageError> {
        let mut found: Vec<Report> = lock(&self.reports)?
            .iter()
            .rev()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), StorageError> {
        lock(&self.notifications)?.push(notification.clone());
        Ok(())
    }

    async fn notifications_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<Notification>, StorageError> {
        let mut found: Vec<Notification> = lock(&self.notifications)?
            .iter()
            .rev()
            .filter(|n| n.user_id == user)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn mark_notifications_read(&self, user: UserId) -> Result<u64, StorageError> {
        let mut changed = 0;
        for n in lock(&self.notifications)?
            .iter_mut()
            .filter(|n| n.user_id == user && !n.read)
        {
            n.read = true;
            changed += 1;
        }
        Ok(changed)
    }
}

#[async_trait]
impl AdminLogRepository for InMemoryRepository {
    async fn append_log(&self, entry: &AdminLogEntry) -> Result<(), StorageError> {
        lock(&self.admin_logs)?.push(entry.clone());
        Ok(())
    }

    async fn recent_logs(&self, limit: u32) -> Result<Vec<AdminLogEntry>, StorageError> {
        let mut found: Vec<AdminLogEntry> = lock(&self.admin_logs)?.iter().rev().cloned().collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.truncate(limit as usize);
        Ok(found)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub users: Arc<dyn UserRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub community: Arc<dyn CommunityRepository>,
    pub admin_logs: Arc<dyn AdminLogRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repo(InMemoryRepository::new())
    }

    /// Bundle one repository that implements every contract.
    pub fn from_repo<R>(repo: R) -> Self
    where
        R: QuestionRepository
            + CatalogRepository
            + UserRepository
            + ProgressRepository
            + CommunityRepository
            + AdminLogRepository
            + Clone
            + 'static,
    {
        Self {
            questions: Arc::new(repo.clone()),
            catalog: Arc::new(repo.clone()),
            users: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            community: Arc::new(repo.clone()),
            admin_logs: Arc::new(repo),
        }
    }
}
