use patente_core::model::{Question, QuestionId};

use super::SqliteRepository;
use super::mapping::{conn, map_question_row};
use crate::repository::{QuestionFilter, QuestionRepository, StorageError};

const SELECT_COLUMNS: &str = r"
    SELECT q.id, q.prompt_it, q.prompt_ar, q.correct_answer, q.explanation_it, q.explanation_ar,
           q.category, q.difficulty, q.lesson_id, q.sign_id, q.created_at
    FROM questions q
";

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO questions (id, prompt_it, prompt_ar, correct_answer, explanation_it, explanation_ar, category, difficulty, lesson_id, sign_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                prompt_it = excluded.prompt_it,
                prompt_ar = excluded.prompt_ar,
                correct_answer = excluded.correct_answer,
                explanation_it = excluded.explanation_it,
                explanation_ar = excluded.explanation_ar,
                category = excluded.category,
                difficulty = excluded.difficulty,
                lesson_id = excluded.lesson_id,
                sign_id = excluded.sign_id
            ",
        )
        .bind(question.id().to_string())
        .bind(question.prompt().it())
        .bind(question.prompt().ar())
        .bind(i64::from(question.correct_answer()))
        .bind(question.explanation().it())
        .bind(question.explanation().ar())
        .bind(question.category())
        .bind(question.difficulty().as_str())
        .bind(question.lesson_id().map(|id| id.to_string()))
        .bind(question.sign_id().map(|id| id.to_string()))
        .bind(question.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn get_question(&self, id: QuestionId) -> Result<Question, StorageError> {
        let sql = format!("{SELECT_COLUMNS} WHERE q.id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        map_question_row(&row)
    }

    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM questions WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_questions(&self, filter: QuestionFilter) -> Result<Vec<Question>, StorageError> {
        let order = "ORDER BY q.created_at ASC, q.id ASC";
        let rows = match filter {
            QuestionFilter::All => {
                let sql = format!("{SELECT_COLUMNS} {order}");
                sqlx::query(&sql).fetch_all(&self.pool).await
            }
            QuestionFilter::Lesson(lesson) => {
                let sql = format!("{SELECT_COLUMNS} WHERE q.lesson_id = ?1 {order}");
                sqlx::query(&sql)
                    .bind(lesson.to_string())
                    .fetch_all(&self.pool)
                    .await
            }
            QuestionFilter::Category(category) => {
                let sql = format!(
                    "{SELECT_COLUMNS} JOIN lessons l ON l.id = q.lesson_id WHERE l.category_id = ?1 {order}"
                );
                sqlx::query(&sql)
                    .bind(category.to_string())
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(conn)?;

        rows.iter().map(map_question_row).collect()
    }
}
