use patente_core::model::{
    Category, CategoryId, GlossaryTerm, GlossaryTermId, Lesson, LessonId, Sign, SignId, SignKind,
};

use super::SqliteRepository;
use super::mapping::{conn, map_category_row, map_glossary_row, map_lesson_row, map_sign_row};
use crate::repository::{CatalogRepository, StorageError};

async fn delete_by_id(
    repo: &SqliteRepository,
    table: &'static str,
    id: String,
) -> Result<(), StorageError> {
    let sql = format!("DELETE FROM {table} WHERE id = ?1");
    let res = sqlx::query(&sql)
        .bind(id)
        .execute(&repo.pool)
        .await
        .map_err(conn)?;
    if res.rows_affected() == 0 {
        return Err(StorageError::NotFound);
    }
    Ok(())
}

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn upsert_category(&self, category: &Category) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO categories (id, name_it, name_ar, description_ar, icon, color, image_url, sort_order, is_published, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                name_it = excluded.name_it,
                name_ar = excluded.name_ar,
                description_ar = excluded.description_ar,
                icon = excluded.icon,
                color = excluded.color,
                image_url = excluded.image_url,
                sort_order = excluded.sort_order,
                is_published = excluded.is_published,
                updated_at = excluded.updated_at
            ",
        )
        .bind(category.id.to_string())
        .bind(category.name.it())
        .bind(category.name.ar())
        .bind(&category.description_ar)
        .bind(&category.icon)
        .bind(&category.color)
        .bind(&category.image_url)
        .bind(category.order)
        .bind(i64::from(category.is_published))
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Category, StorageError> {
        let row = sqlx::query("SELECT * FROM categories WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        map_category_row(&row)
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), StorageError> {
        delete_by_id(self, "categories", id.to_string()).await
    }

    async fn list_categories(&self, published_only: bool) -> Result<Vec<Category>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT * FROM categories
            WHERE (?1 = 0 OR is_published = 1)
            ORDER BY sort_order ASC, created_at ASC, id ASC
            ",
        )
        .bind(i64::from(published_only))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_category_row).collect()
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lessons (id, category_id, title_it, title_ar, description_it, description_ar, content_it, content_ar, image_url, sort_order, icon, color, is_published, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ON CONFLICT(id) DO UPDATE SET
                category_id = excluded.category_id,
                title_it = excluded.title_it,
                title_ar = excluded.title_ar,
                description_it = excluded.description_it,
                description_ar = excluded.description_ar,
                content_it = excluded.content_it,
                content_ar = excluded.content_ar,
                image_url = excluded.image_url,
                sort_order = excluded.sort_order,
                icon = excluded.icon,
                color = excluded.color,
                is_published = excluded.is_published,
                updated_at = excluded.updated_at
            ",
        )
        .bind(lesson.id.to_string())
        .bind(lesson.category_id.to_string())
        .bind(lesson.title.it())
        .bind(lesson.title.ar())
        .bind(lesson.description.it())
        .bind(lesson.description.ar())
        .bind(lesson.content.it())
        .bind(lesson.content.ar())
        .bind(&lesson.image_url)
        .bind(lesson.order)
        .bind(&lesson.icon)
        .bind(&lesson.color)
        .bind(i64::from(lesson.is_published))
        .bind(lesson.created_at)
        .bind(lesson.updated_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Lesson, StorageError> {
        let row = sqlx::query("SELECT * FROM lessons WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        map_lesson_row(&row)
    }

    async fn delete_lesson(&self, id: LessonId) -> Result<(), StorageError> {
        delete_by_id(self, "lessons", id.to_string()).await
    }

    async fn list_lessons(
        &self,
        category: Option<CategoryId>,
        published_only: bool,
    ) -> Result<Vec<Lesson>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT * FROM lessons
            WHERE (?1 IS NULL OR category_id = ?1)
              AND (?2 = 0 OR is_published = 1)
            ORDER BY sort_order ASC, created_at ASC, id ASC
            ",
        )
        .bind(category.map(|c| c.to_string()))
        .bind(i64::from(published_only))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_lesson_row).collect()
    }

    async fn upsert_sign(&self, sign: &Sign) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO signs (id, name_it, name_ar, description_it, description_ar, kind, emoji, image_url, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                name_it = excluded.name_it,
                name_ar = excluded.name_ar,
                description_it = excluded.description_it,
                description_ar = excluded.description_ar,
                kind = excluded.kind,
                emoji = excluded.emoji,
                image_url = excluded.image_url
            ",
        )
        .bind(sign.id.to_string())
        .bind(sign.name.it())
        .bind(sign.name.ar())
        .bind(sign.description.it())
        .bind(sign.description.ar())
        .bind(sign.kind.as_str())
        .bind(&sign.emoji)
        .bind(sign.image_url.as_deref())
        .bind(sign.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn delete_sign(&self, id: SignId) -> Result<(), StorageError> {
        delete_by_id(self, "signs", id.to_string()).await
    }

    async fn list_signs(&self, kind: Option<SignKind>) -> Result<Vec<Sign>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT * FROM signs
            WHERE (?1 IS NULL OR kind = ?1)
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(kind.map(SignKind::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_sign_row).collect()
    }

    async fn upsert_glossary_term(&self, term: &GlossaryTerm) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO glossary_terms (id, term_it, term_ar, definition_it, definition_ar, category, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                term_it = excluded.term_it,
                term_ar = excluded.term_ar,
                definition_it = excluded.definition_it,
                definition_ar = excluded.definition_ar,
                category = excluded.category
            ",
        )
        .bind(term.id.to_string())
        .bind(term.term.it())
        .bind(term.term.ar())
        .bind(term.definition.it())
        .bind(term.definition.ar())
        .bind(&term.category)
        .bind(term.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn delete_glossary_term(&self, id: GlossaryTermId) -> Result<(), StorageError> {
        delete_by_id(self, "glossary_terms", id.to_string()).await
    }

    async fn list_glossary(&self) -> Result<Vec<GlossaryTerm>, StorageError> {
        let rows = sqlx::query("SELECT * FROM glossary_terms ORDER BY term_it ASC, id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        rows.iter().map(map_glossary_row).collect()
    }
}
