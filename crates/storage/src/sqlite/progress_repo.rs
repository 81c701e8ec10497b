use patente_core::model::{
    AttemptId, ExamAttempt, LessonId, LessonProgress, QuestionProgress, UserId,
};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    conn, map_attempt_row, map_lesson_progress_row, map_question_progress_row, mode_to_columns,
    ser, write_err,
};
use crate::repository::{AnswerTotals, ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn append_question_progress(
        &self,
        record: &QuestionProgress,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO question_progress (id, user_id, question_id, correct, answered_at, attempt_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(record.id.to_string())
        .bind(record.user_id.to_string())
        .bind(record.question_id.to_string())
        .bind(i64::from(record.correct))
        .bind(record.answered_at)
        .bind(record.attempt_id.map(|id| id.to_string()))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn question_progress_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<QuestionProgress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT * FROM question_progress
            WHERE user_id = ?1
            ORDER BY answered_at ASC, rowid ASC
            ",
        )
        .bind(user.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_question_progress_row).collect()
    }

    async fn answer_totals(&self) -> Result<AnswerTotals, StorageError> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) AS answered, COALESCE(SUM(correct), 0) AS correct
            FROM question_progress
            ",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;
        let answered: i64 = row.try_get("answered").map_err(ser)?;
        let correct: i64 = row.try_get("correct").map_err(ser)?;
        Ok(AnswerTotals {
            answered: u64::try_from(answered).map_err(ser)?,
            correct: u64::try_from(correct).map_err(ser)?,
        })
    }

    async fn upsert_lesson_progress(&self, record: &LessonProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lesson_progress (id, user_id, lesson_id, completed, score, completed_at, last_accessed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(user_id, lesson_id) DO UPDATE SET
                completed = excluded.completed,
                score = excluded.score,
                completed_at = excluded.completed_at,
                last_accessed_at = excluded.last_accessed_at
            ",
        )
        .bind(record.id.to_string())
        .bind(record.user_id.to_string())
        .bind(record.lesson_id.to_string())
        .bind(i64::from(record.completed))
        .bind(i64::from(record.score))
        .bind(record.completed_at)
        .bind(record.last_accessed_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn get_lesson_progress(
        &self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let row = sqlx::query("SELECT * FROM lesson_progress WHERE user_id = ?1 AND lesson_id = ?2")
            .bind(user.to_string())
            .bind(lesson.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(map_lesson_progress_row).transpose()
    }

    async fn lesson_progress_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT * FROM lesson_progress
            WHERE user_id = ?1
            ORDER BY last_accessed_at ASC, lesson_id ASC
            ",
        )
        .bind(user.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_lesson_progress_row).collect()
    }

    async fn append_attempt(&self, attempt: &ExamAttempt) -> Result<(), StorageError> {
        let (mode, lesson_id) = mode_to_columns(attempt.mode());
        let answers = serde_json::to_string(attempt.answers()).map_err(ser)?;
        let time_spent = i64::try_from(attempt.time_spent_secs()).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO attempts (id, user_id, mode, lesson_id, answers, score, total, passed, started_at, completed_at, time_spent_secs)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )
        .bind(attempt.id().to_string())
        .bind(attempt.user_id().to_string())
        .bind(mode)
        .bind(lesson_id)
        .bind(answers)
        .bind(i64::from(attempt.score()))
        .bind(i64::from(attempt.total()))
        .bind(attempt.passed().map(i64::from))
        .bind(attempt.started_at())
        .bind(attempt.completed_at())
        .bind(time_spent)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<ExamAttempt, StorageError> {
        let row = sqlx::query("SELECT * FROM attempts WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        map_attempt_row(&row)
    }

    async fn attempts_for_user(&self, user: UserId) -> Result<Vec<ExamAttempt>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT * FROM attempts
            WHERE user_id = ?1
            ORDER BY completed_at DESC, rowid DESC
            ",
        )
        .bind(user.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_attempt_row).collect()
    }

    async fn list_attempts(&self) -> Result<Vec<ExamAttempt>, StorageError> {
        let rows = sqlx::query("SELECT * FROM attempts ORDER BY rowid ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        rows.iter().map(map_attempt_row).collect()
    }

    async fn reset_user_progress(&self, user: UserId) -> Result<(), StorageError> {
        let id = user.to_string();
        let mut tx = self.pool.begin().await.map_err(conn)?;
        for sql in [
            "DELETE FROM question_progress WHERE user_id = ?1",
            "DELETE FROM lesson_progress WHERE user_id = ?1",
            "DELETE FROM attempts WHERE user_id = ?1",
        ] {
            sqlx::query(sql)
                .bind(&id)
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
        }
        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
