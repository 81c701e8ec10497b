use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use patente_core::assessment::SessionMode;
use patente_core::model::{
    AdminLogEntry, AttemptAnswer, BilingualText, Category, Comment, Difficulty, Email,
    ExamAttempt, GlossaryTerm, Lesson, LessonProgress, Like, Notification, NotificationKind,
    PasswordDigest, Post, Question, QuestionProgress, Report, ReportStatus, ReportTarget, Role,
    Sign, SignKind, User,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Unique-constraint violations become `Conflict`, everything else a connection error.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => conn(e),
    }
}

pub(crate) fn id_from<T>(row: &SqliteRow, column: &str) -> Result<T, StorageError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    row.try_get::<String, _>(column)
        .map_err(ser)?
        .parse::<T>()
        .map_err(ser)
}

pub(crate) fn opt_id_from<T>(row: &SqliteRow, column: &str) -> Result<Option<T>, StorageError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    row.try_get::<Option<String>, _>(column)
        .map_err(ser)?
        .map(|s| s.parse::<T>().map_err(ser))
        .transpose()
}

fn u32_from(row: &SqliteRow, column: &'static str) -> Result<u32, StorageError> {
    let v: i64 = row.try_get(column).map_err(ser)?;
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {column}: {v}")))
}

fn flag(row: &SqliteRow, column: &str) -> Result<bool, StorageError> {
    Ok(row.try_get::<i64, _>(column).map_err(ser)? != 0)
}

fn text_pair(row: &SqliteRow, it: &str, ar: &str) -> Result<BilingualText, StorageError> {
    BilingualText::optional(
        row.try_get::<String, _>(it).map_err(ser)?,
        row.try_get::<String, _>(ar).map_err(ser)?,
    )
    .map_err(ser)
}

//
// ─── CONTENT ───────────────────────────────────────────────────────────────────
//

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let difficulty: String = row.try_get("difficulty").map_err(ser)?;
    Ok(Question::from_persisted(
        id_from(row, "id")?,
        text_pair(row, "prompt_it", "prompt_ar")?,
        flag(row, "correct_answer")?,
        text_pair(row, "explanation_it", "explanation_ar")?,
        row.try_get("category").map_err(ser)?,
        Difficulty::parse(&difficulty).map_err(ser)?,
        opt_id_from(row, "lesson_id")?,
        opt_id_from(row, "sign_id")?,
        row.try_get("created_at").map_err(ser)?,
    ))
}

pub(crate) fn map_category_row(row: &SqliteRow) -> Result<Category, StorageError> {
    Ok(Category {
        id: id_from(row, "id")?,
        name: text_pair(row, "name_it", "name_ar")?,
        description_ar: row.try_get("description_ar").map_err(ser)?,
        icon: row.try_get("icon").map_err(ser)?,
        color: row.try_get("color").map_err(ser)?,
        image_url: row.try_get("image_url").map_err(ser)?,
        order: row.try_get("sort_order").map_err(ser)?,
        is_published: flag(row, "is_published")?,
        created_at: row.try_get("created_at").map_err(ser)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<Lesson, StorageError> {
    Ok(Lesson {
        id: id_from(row, "id")?,
        category_id: id_from(row, "category_id")?,
        title: text_pair(row, "title_it", "title_ar")?,
        description: text_pair(row, "description_it", "description_ar")?,
        content: text_pair(row, "content_it", "content_ar")?,
        image_url: row.try_get("image_url").map_err(ser)?,
        order: row.try_get("sort_order").map_err(ser)?,
        icon: row.try_get("icon").map_err(ser)?,
        color: row.try_get("color").map_err(ser)?,
        is_published: flag(row, "is_published")?,
        created_at: row.try_get("created_at").map_err(ser)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

pub(crate) fn map_sign_row(row: &SqliteRow) -> Result<Sign, StorageError> {
    let kind: String = row.try_get("kind").map_err(ser)?;
    Ok(Sign {
        id: id_from(row, "id")?,
        name: text_pair(row, "name_it", "name_ar")?,
        description: text_pair(row, "description_it", "description_ar")?,
        kind: SignKind::parse(&kind).map_err(ser)?,
        emoji: row.try_get("emoji").map_err(ser)?,
        image_url: row.try_get("image_url").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_glossary_row(row: &SqliteRow) -> Result<GlossaryTerm, StorageError> {
    Ok(GlossaryTerm {
        id: id_from(row, "id")?,
        term: text_pair(row, "term_it", "term_ar")?,
        definition: text_pair(row, "definition_it", "definition_ar")?,
        category: row.try_get("category").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

//
// ─── USERS & PROGRESS ──────────────────────────────────────────────────────────
//

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<User, StorageError> {
    let email: String = row.try_get("email").map_err(ser)?;
    let role: String = row.try_get("role").map_err(ser)?;
    let last_active_date: Option<NaiveDate> = row.try_get("last_active_date").map_err(ser)?;
    Ok(User {
        id: id_from(row, "id")?,
        email: Email::parse(&email).map_err(ser)?,
        name: row.try_get("name").map_err(ser)?,
        role: Role::parse(&role).map_err(ser)?,
        banned: flag(row, "banned")?,
        streak: u32_from(row, "streak")?,
        last_active_date,
        last_login: row.try_get("last_login").map_err(ser)?,
        password: PasswordDigest::new(row.try_get::<String, _>("password").map_err(ser)?),
        created_at: row.try_get("created_at").map_err(ser)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

pub(crate) fn map_question_progress_row(row: &SqliteRow) -> Result<QuestionProgress, StorageError> {
    Ok(QuestionProgress {
        id: id_from(row, "id")?,
        user_id: id_from(row, "user_id")?,
        question_id: id_from(row, "question_id")?,
        correct: flag(row, "correct")?,
        answered_at: row.try_get("answered_at").map_err(ser)?,
        attempt_id: opt_id_from(row, "attempt_id")?,
    })
}

pub(crate) fn map_lesson_progress_row(row: &SqliteRow) -> Result<LessonProgress, StorageError> {
    let score = u32_from(row, "score")?;
    Ok(LessonProgress {
        id: id_from(row, "id")?,
        user_id: id_from(row, "user_id")?,
        lesson_id: id_from(row, "lesson_id")?,
        completed: flag(row, "completed")?,
        score: u8::try_from(score)
            .map_err(|_| StorageError::Serialization(format!("invalid score: {score}")))?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
        last_accessed_at: row.try_get("last_accessed_at").map_err(ser)?,
    })
}

/// Storage encoding of a session mode: a kind tag plus the lesson for quizzes.
pub(crate) fn mode_to_columns(mode: SessionMode) -> (&'static str, Option<String>) {
    (mode.as_str(), mode.lesson_id().map(|id| id.to_string()))
}

pub(crate) fn mode_from_columns(
    kind: &str,
    lesson_id: Option<String>,
) -> Result<SessionMode, StorageError> {
    match (kind, lesson_id) {
        ("practice", _) => Ok(SessionMode::Practice),
        ("exam", _) => Ok(SessionMode::Exam),
        ("lesson_quiz", Some(id)) => Ok(SessionMode::LessonQuiz {
            lesson_id: id.parse().map_err(ser)?,
        }),
        (other, _) => Err(StorageError::Serialization(format!(
            "invalid session mode: {other}"
        ))),
    }
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<ExamAttempt, StorageError> {
    let kind: String = row.try_get("mode").map_err(ser)?;
    let lesson_id: Option<String> = row.try_get("lesson_id").map_err(ser)?;
    let answers_json: String = row.try_get("answers").map_err(ser)?;
    let answers: Vec<AttemptAnswer> = serde_json::from_str(&answers_json).map_err(ser)?;
    let passed: Option<i64> = row.try_get("passed").map_err(ser)?;
    let started_at: DateTime<Utc> = row.try_get("started_at").map_err(ser)?;
    let completed_at: DateTime<Utc> = row.try_get("completed_at").map_err(ser)?;

    ExamAttempt::new(
        id_from(row, "id")?,
        id_from(row, "user_id")?,
        mode_from_columns(&kind, lesson_id)?,
        answers,
        u32_from(row, "score")?,
        passed.map(|p| p != 0),
        started_at,
        completed_at,
    )
    .map_err(ser)
}

//
// ─── COMMUNITY ─────────────────────────────────────────────────────────────────
//

pub(crate) fn map_post_row(row: &SqliteRow) -> Result<Post, StorageError> {
    Ok(Post {
        id: id_from(row, "id")?,
        user_id: id_from(row, "user_id")?,
        user_name: row.try_get("user_name").map_err(ser)?,
        content: row.try_get("content").map_err(ser)?,
        likes_count: u32_from(row, "likes_count")?,
        comments_count: u32_from(row, "comments_count")?,
        is_deleted: flag(row, "is_deleted")?,
        created_at: row.try_get("created_at").map_err(ser)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

pub(crate) fn map_comment_row(row: &SqliteRow) -> Result<Comment, StorageError> {
    Ok(Comment {
        id: id_from(row, "id")?,
        post_id: id_from(row, "post_id")?,
        user_id: id_from(row, "user_id")?,
        user_name: row.try_get("user_name").map_err(ser)?,
        content: row.try_get("content").map_err(ser)?,
        is_deleted: flag(row, "is_deleted")?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_like_row(row: &SqliteRow) -> Result<Like, StorageError> {
    Ok(Like {
        id: id_from(row, "id")?,
        post_id: id_from(row, "post_id")?,
        user_id: id_from(row, "user_id")?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_report_row(row: &SqliteRow) -> Result<Report, StorageError> {
    let target: String = row.try_get("target").map_err(ser)?;
    let status: String = row.try_get("status").map_err(ser)?;
    Ok(Report {
        id: id_from(row, "id")?,
        reporter_id: id_from(row, "reporter_id")?,
        target: ReportTarget::parse(&target).map_err(ser)?,
        target_id: row.try_get("target_id").map_err(ser)?,
        reason: row.try_get("reason").map_err(ser)?,
        status: ReportStatus::parse(&status).map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
        reviewed_at: row.try_get("reviewed_at").map_err(ser)?,
    })
}

pub(crate) fn map_notification_row(row: &SqliteRow) -> Result<Notification, StorageError> {
    let kind: String = row.try_get("kind").map_err(ser)?;
    Ok(Notification {
        id: id_from(row, "id")?,
        user_id: id_from(row, "user_id")?,
        kind: NotificationKind::parse(&kind).map_err(ser)?,
        title: row.try_get("title").map_err(ser)?,
        message: row.try_get("message").map_err(ser)?,
        read: flag(row, "read")?,
        created_at: row.try_get("created_at").map_err(ser)?,
        related_id: row.try_get("related_id").map_err(ser)?,
    })
}

pub(crate) fn map_admin_log_row(row: &SqliteRow) -> Result<AdminLogEntry, StorageError> {
    Ok(AdminLogEntry {
        id: id_from(row, "id")?,
        admin_id: id_from(row, "admin_id")?,
        action: row.try_get("action").map_err(ser)?,
        target_type: row.try_get("target_type").map_err(ser)?,
        target_id: row.try_get("target_id").map_err(ser)?,
        details: row.try_get("details").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}
