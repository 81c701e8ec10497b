use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS categories (
        id TEXT PRIMARY KEY,
        name_it TEXT NOT NULL,
        name_ar TEXT NOT NULL,
        description_ar TEXT NOT NULL,
        icon TEXT NOT NULL,
        color TEXT NOT NULL,
        image_url TEXT NOT NULL,
        sort_order INTEGER NOT NULL,
        is_published INTEGER NOT NULL CHECK (is_published IN (0, 1)),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS lessons (
        id TEXT PRIMARY KEY,
        category_id TEXT NOT NULL,
        title_it TEXT NOT NULL,
        title_ar TEXT NOT NULL,
        description_it TEXT NOT NULL,
        description_ar TEXT NOT NULL,
        content_it TEXT NOT NULL,
        content_ar TEXT NOT NULL,
        image_url TEXT NOT NULL,
        sort_order INTEGER NOT NULL,
        icon TEXT NOT NULL,
        color TEXT NOT NULL,
        is_published INTEGER NOT NULL CHECK (is_published IN (0, 1)),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS signs (
        id TEXT PRIMARY KEY,
        name_it TEXT NOT NULL,
        name_ar TEXT NOT NULL,
        description_it TEXT NOT NULL,
        description_ar TEXT NOT NULL,
        kind TEXT NOT NULL,
        emoji TEXT NOT NULL,
        image_url TEXT,
        created_at TEXT NOT NULL
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS questions (
        id TEXT PRIMARY KEY,
        prompt_it TEXT NOT NULL,
        prompt_ar TEXT NOT NULL,
        correct_answer INTEGER NOT NULL CHECK (correct_answer IN (0, 1)),
        explanation_it TEXT NOT NULL,
        explanation_ar TEXT NOT NULL,
        category TEXT NOT NULL,
        difficulty TEXT NOT NULL,
        lesson_id TEXT,
        sign_id TEXT,
        created_at TEXT NOT NULL
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS glossary_terms (
        id TEXT PRIMARY KEY,
        term_it TEXT NOT NULL,
        term_ar TEXT NOT NULL,
        definition_it TEXT NOT NULL,
        definition_ar TEXT NOT NULL,
        category TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        role TEXT NOT NULL,
        banned INTEGER NOT NULL CHECK (banned IN (0, 1)),
        streak INTEGER NOT NULL CHECK (streak >= 0),
        last_active_date TEXT,
        last_login TEXT,
        password TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS question_progress (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        question_id TEXT NOT NULL,
        correct INTEGER NOT NULL CHECK (correct IN (0, 1)),
        answered_at TEXT NOT NULL,
        attempt_id TEXT
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS lesson_progress (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        lesson_id TEXT NOT NULL,
        completed INTEGER NOT NULL CHECK (completed IN (0, 1)),
        score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
        completed_at TEXT,
        last_accessed_at TEXT NOT NULL,
        UNIQUE (user_id, lesson_id)
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS attempts (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        mode TEXT NOT NULL,
        lesson_id TEXT,
        answers TEXT NOT NULL,
        score INTEGER NOT NULL CHECK (score >= 0),
        total INTEGER NOT NULL CHECK (total >= 0),
        passed INTEGER,
        started_at TEXT NOT NULL,
        completed_at TEXT NOT NULL,
        time_spent_secs INTEGER NOT NULL CHECK (time_spent_secs >= 0)
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS posts (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        user_name TEXT NOT NULL,
        content TEXT NOT NULL,
        likes_count INTEGER NOT NULL CHECK (likes_count >= 0),
        comments_count INTEGER NOT NULL CHECK (comments_count >= 0),
        is_deleted INTEGER NOT NULL CHECK (is_deleted IN (0, 1)),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS comments (
        id TEXT PRIMARY KEY,
        post_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        user_name TEXT NOT NULL,
        content TEXT NOT NULL,
        is_deleted INTEGER NOT NULL CHECK (is_deleted IN (0, 1)),
        created_at TEXT NOT NULL,
        FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS likes (
        id TEXT PRIMARY KEY,
        post_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE (post_id, user_id)
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS reports (
        id TEXT PRIMARY KEY,
        reporter_id TEXT NOT NULL,
        target TEXT NOT NULL,
        target_id TEXT NOT NULL,
        reason TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        reviewed_at TEXT
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS notifications (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        kind TEXT NOT NULL,
        title TEXT NOT NULL,
        message TEXT NOT NULL,
        read INTEGER NOT NULL CHECK (read IN (0, 1)),
        created_at TEXT NOT NULL,
        related_id TEXT
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS admin_logs (
        id TEXT PRIMARY KEY,
        admin_id TEXT NOT NULL,
        action TEXT NOT NULL,
        target_type TEXT NOT NULL,
        target_id TEXT NOT NULL,
        details TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    ",
    r"CREATE INDEX IF NOT EXISTS idx_lessons_category_order ON lessons (category_id, sort_order);",
    r"CREATE INDEX IF NOT EXISTS idx_questions_lesson_created ON questions (lesson_id, created_at);",
    r"CREATE INDEX IF NOT EXISTS idx_question_progress_user ON question_progress (user_id, answered_at);",
    r"CREATE INDEX IF NOT EXISTS idx_attempts_user_completed ON attempts (user_id, completed_at);",
    r"CREATE INDEX IF NOT EXISTS idx_comments_post_created ON comments (post_id, created_at);",
    r"CREATE INDEX IF NOT EXISTS idx_notifications_user_created ON notifications (user_id, created_at);",
];

/// Runs versioned migrations, recording each applied version in `schema_migrations`.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        for &statement in SCHEMA_V1 {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
