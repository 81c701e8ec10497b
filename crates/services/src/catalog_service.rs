use std::collections::HashSet;
use std::sync::Arc;

use patente_core::model::{
    Category, CategoryId, GlossaryTerm, Lesson, LessonId, Question, Sign, SignKind, UserId,
};
use storage::repository::{
    CatalogRepository, ProgressRepository, QuestionFilter, QuestionRepository,
};

use crate::error::CatalogServiceError;

/// A published category with the user's completion count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryOverview {
    pub category: Category,
    pub lesson_count: usize,
    pub completed_lessons: usize,
}

impl CategoryOverview {
    /// Completion in whole percent, rounded down.
    #[must_use]
    pub fn percent_complete(&self) -> u8 {
        if self.lesson_count == 0 {
            return 0;
        }
        let pct = self.completed_lessons.min(self.lesson_count) * 100 / self.lesson_count;
        u8::try_from(pct).unwrap_or(100)
    }
}

/// Read-only browsing of the study material.
#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
    questions: Arc<dyn QuestionRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        questions: Arc<dyn QuestionRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            catalog,
            questions,
            progress,
        }
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` on repository failures.
    pub async fn published_categories(&self) -> Result<Vec<Category>, CatalogServiceError> {
        Ok(self.catalog.list_categories(true).await?)
    }

    /// Published lessons of one category, by display order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` on repository failures.
    pub async fn lessons_in_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Lesson>, CatalogServiceError> {
        Ok(self.catalog.list_lessons(Some(category_id), true).await?)
    }

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) for an unknown lesson.
    pub async fn lesson(&self, id: LessonId) -> Result<Lesson, CatalogServiceError> {
        Ok(self.catalog.get_lesson(id).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` on repository failures.
    pub async fn lesson_questions(
        &self,
        id: LessonId,
    ) -> Result<Vec<Question>, CatalogServiceError> {
        Ok(self.questions.list_questions(QuestionFilter::Lesson(id)).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` on repository failures.
    pub async fn signs(&self, kind: Option<SignKind>) -> Result<Vec<Sign>, CatalogServiceError> {
        Ok(self.catalog.list_signs(kind).await?)
    }

    /// Glossary terms, optionally narrowed by a case-insensitive search in
    /// either language. A blank query returns everything.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` on repository failures.
    pub async fn glossary(
        &self,
        query: Option<&str>,
    ) -> Result<Vec<GlossaryTerm>, CatalogServiceError> {
        let terms = self.catalog.list_glossary().await?;
        let query = query.map(str::trim).filter(|q| !q.is_empty());
        Ok(match query {
            Some(q) => terms.into_iter().filter(|t| t.matches(q)).collect(),
            None => terms,
        })
    }

    /// Published categories with per-user lesson completion.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` on repository failures.
    pub async fn category_overview(
        &self,
        user_id: UserId,
    ) -> Result<Vec<CategoryOverview>, CatalogServiceError> {
        let completed: HashSet<LessonId> = self
            .progress
            .lesson_progress_for_user(user_id)
            .await?
            .into_iter()
            .filter(|p| p.completed)
            .map(|p| p.lesson_id)
            .collect();

        let mut out = Vec::new();
        for category in self.catalog.list_categories(true).await? {
            let lessons = self.catalog.list_lessons(Some(category.id), true).await?;
            let completed_lessons = lessons.iter().filter(|l| completed.contains(&l.id)).count();
            out.push(CategoryOverview {
                lesson_count: lessons.len(),
                completed_lessons,
                category,
            });
        }
        Ok(out)
    }
}
