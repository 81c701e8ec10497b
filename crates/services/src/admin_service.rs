use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use patente_core::Clock;
use patente_core::assessment::SessionMode;
use patente_core::model::{
    AdminLogEntry, Category, CategoryDraft, CategoryId, GlossaryDraft, GlossaryTerm,
    GlossaryTermId, Lesson, LessonDraft, LessonId, PostId, Question, QuestionDraft, QuestionId,
    Report, ReportId, ReportStatus, Sign, SignDraft, SignId, User, UserId,
};
use storage::repository::{
    AdminLogRepository, CatalogRepository, CommunityRepository, ProgressRepository,
    QuestionFilter, QuestionRepository, Storage, StorageError, UserRepository,
};

use crate::error::AdminServiceError;
use crate::stats_service::correct_rate;

/// Platform-wide counters for the admin home screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub users: usize,
    pub active_today: usize,
    pub categories: usize,
    pub lessons: usize,
    pub questions: usize,
    pub signs: usize,
    pub glossary_terms: usize,
    pub posts: usize,
    pub exams: usize,
    pub exams_passed: usize,
    /// Passed exams in percent, rounded.
    pub exam_pass_rate: u8,
    pub pending_reports: usize,
    pub answers: u64,
    pub correct_answers: u64,
}

/// Content management and moderation. Every call is checked against the
/// acting user's role and every mutation is written to the audit log.
#[derive(Clone)]
pub struct AdminService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    catalog: Arc<dyn CatalogRepository>,
    questions: Arc<dyn QuestionRepository>,
    progress: Arc<dyn ProgressRepository>,
    community: Arc<dyn CommunityRepository>,
    admin_logs: Arc<dyn AdminLogRepository>,
}

impl AdminService {
    #[must_use]
    pub fn new(clock: Clock, storage: &Storage) -> Self {
        Self {
            clock,
            users: Arc::clone(&storage.users),
            catalog: Arc::clone(&storage.catalog),
            questions: Arc::clone(&storage.questions),
            progress: Arc::clone(&storage.progress),
            community: Arc::clone(&storage.community),
            admin_logs: Arc::clone(&storage.admin_logs),
        }
    }

    async fn require_admin(&self, admin: UserId) -> Result<User, AdminServiceError> {
        let user = match self.users.get_user(admin).await {
            Ok(user) => user,
            Err(StorageError::NotFound) => return Err(AdminServiceError::Forbidden),
            Err(err) => return Err(err.into()),
        };
        if !user.is_admin() || user.banned {
            warn!(user_id = %admin, "admin action refused");
            return Err(AdminServiceError::Forbidden);
        }
        Ok(user)
    }

    async fn log(
        &self,
        admin: UserId,
        action: &str,
        target_type: &str,
        target_id: impl ToString,
        details: serde_json::Value,
    ) -> Result<(), AdminServiceError> {
        let entry = AdminLogEntry::new(
            admin,
            action,
            target_type,
            target_id.to_string(),
            details.to_string(),
            self.clock.now(),
        );
        self.admin_logs.append_log(&entry).await?;
        info!(admin_id = %admin, action, target_type, target_id = %entry.target_id, "admin action");
        Ok(())
    }

    //
    // ─── CATEGORIES ────────────────────────────────────────────────────────────
    //

    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden` for non-admins and `Catalog`
    /// for an invalid draft.
    pub async fn create_category(
        &self,
        admin: UserId,
        draft: CategoryDraft,
    ) -> Result<Category, AdminServiceError> {
        self.require_admin(admin).await?;
        let category = draft.validate(CategoryId::new_v4(), self.clock.now())?;
        self.catalog.upsert_category(&category).await?;
        self.log(admin, "create", "category", category.id, json!({ "name": category.name.it() }))
            .await?;
        Ok(category)
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden`, `Catalog`, or `Storage` with
    /// `NotFound` for an unknown id.
    pub async fn update_category(
        &self,
        admin: UserId,
        id: CategoryId,
        draft: CategoryDraft,
    ) -> Result<Category, AdminServiceError> {
        self.require_admin(admin).await?;
        let mut category = self.catalog.get_category(id).await?;
        category.apply_draft(draft, self.clock.now())?;
        self.catalog.upsert_category(&category).await?;
        self.log(admin, "update", "category", id, json!({ "name": category.name.it() }))
            .await?;
        Ok(category)
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden` or `Storage` with `NotFound`.
    pub async fn set_category_published(
        &self,
        admin: UserId,
        id: CategoryId,
        is_published: bool,
    ) -> Result<Category, AdminServiceError> {
        self.require_admin(admin).await?;
        let mut category = self.catalog.get_category(id).await?;
        category.is_published = is_published;
        category.updated_at = self.clock.now();
        self.catalog.upsert_category(&category).await?;
        self.log(admin, "publish", "category", id, json!({ "is_published": is_published }))
            .await?;
        Ok(category)
    }

    /// Lessons and questions that point at the category are left in place.
    ///
    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden` or `Storage` with `NotFound`.
    pub async fn delete_category(
        &self,
        admin: UserId,
        id: CategoryId,
    ) -> Result<(), AdminServiceError> {
        self.require_admin(admin).await?;
        self.catalog.delete_category(id).await?;
        self.log(admin, "delete", "category", id, json!({})).await
    }

    //
    // ─── LESSONS ───────────────────────────────────────────────────────────────
    //

    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden`, `Catalog`, or `Storage` with
    /// `NotFound` if the category does not exist.
    pub async fn create_lesson(
        &self,
        admin: UserId,
        draft: LessonDraft,
    ) -> Result<Lesson, AdminServiceError> {
        self.require_admin(admin).await?;
        self.catalog.get_category(draft.category_id).await?;
        let lesson = draft.validate(LessonId::new_v4(), self.clock.now())?;
        self.catalog.upsert_lesson(&lesson).await?;
        self.log(
            admin,
            "create",
            "lesson",
            lesson.id,
            json!({ "title": lesson.title.it(), "category_id": lesson.category_id.to_string() }),
        )
        .await?;
        Ok(lesson)
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden`, `Catalog`, or `Storage` with
    /// `NotFound` for an unknown id.
    pub async fn update_lesson(
        &self,
        admin: UserId,
        id: LessonId,
        draft: LessonDraft,
    ) -> Result<Lesson, AdminServiceError> {
        self.require_admin(admin).await?;
        let mut lesson = self.catalog.get_lesson(id).await?;
        lesson.apply_draft(draft, self.clock.now())?;
        self.catalog.upsert_lesson(&lesson).await?;
        self.log(admin, "update", "lesson", id, json!({ "title": lesson.title.it() }))
            .await?;
        Ok(lesson)
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden` or `Storage` with `NotFound`.
    pub async fn set_lesson_published(
        &self,
        admin: UserId,
        id: LessonId,
        is_published: bool,
    ) -> Result<Lesson, AdminServiceError> {
        self.require_admin(admin).await?;
        let mut lesson = self.catalog.get_lesson(id).await?;
        lesson.is_published = is_published;
        lesson.updated_at = self.clock.now();
        self.catalog.upsert_lesson(&lesson).await?;
        self.log(admin, "publish", "lesson", id, json!({ "is_published": is_published }))
            .await?;
        Ok(lesson)
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden` or `Storage` with `NotFound`.
    pub async fn delete_lesson(
        &self,
        admin: UserId,
        id: LessonId,
    ) -> Result<(), AdminServiceError> {
        self.require_admin(admin).await?;
        self.catalog.delete_lesson(id).await?;
        self.log(admin, "delete", "lesson", id, json!({})).await
    }

    //
    // ─── QUESTIONS ─────────────────────────────────────────────────────────────
    //

    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden` or `Question` for an invalid draft.
    pub async fn create_question(
        &self,
        admin: UserId,
        draft: QuestionDraft,
    ) -> Result<Question, AdminServiceError> {
        self.require_admin(admin).await?;
        let question = draft.validate(QuestionId::new_v4(), self.clock.now())?;
        self.questions.upsert_question(&question).await?;
        self.log(
            admin,
            "create",
            "question",
            question.id(),
            json!({ "correct_answer": question.correct_answer(), "category": question.category() }),
        )
        .await?;
        Ok(question)
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden`, `Question`, or `Storage` with
    /// `NotFound` for an unknown id.
    pub async fn update_question(
        &self,
        admin: UserId,
        id: QuestionId,
        draft: QuestionDraft,
    ) -> Result<Question, AdminServiceError> {
        self.require_admin(admin).await?;
        let existing = self.questions.get_question(id).await?;
        let question = draft.validate(id, existing.created_at())?;
        self.questions.upsert_question(&question).await?;
        self.log(
            admin,
            "update",
            "question",
            id,
            json!({ "correct_answer": question.correct_answer(), "category": question.category() }),
        )
        .await?;
        Ok(question)
    }

    /// Answer history that references the question is kept.
    ///
    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden` or `Storage` with `NotFound`.
    pub async fn delete_question(
        &self,
        admin: UserId,
        id: QuestionId,
    ) -> Result<(), AdminServiceError> {
        self.require_admin(admin).await?;
        self.questions.delete_question(id).await?;
        self.log(admin, "delete", "question", id, json!({})).await
    }

    /// Every question, including those outside any lesson.
    ///
    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden` or `Storage`.
    pub async fn questions(&self, admin: UserId) -> Result<Vec<Question>, AdminServiceError> {
        self.require_admin(admin).await?;
        Ok(self.questions.list_questions(QuestionFilter::All).await?)
    }

    //
    // ─── SIGNS & GLOSSARY ──────────────────────────────────────────────────────
    //

    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden` or `Catalog` for an invalid draft.
    pub async fn create_sign(
        &self,
        admin: UserId,
        draft: SignDraft,
    ) -> Result<Sign, AdminServiceError> {
        self.require_admin(admin).await?;
        let sign = draft.validate(SignId::new_v4(), self.clock.now())?;
        self.catalog.upsert_sign(&sign).await?;
        let details = json!({ "name": sign.name.it(), "kind": sign.kind.as_str() });
        self.log(admin, "create", "sign", sign.id, details).await?;
        Ok(sign)
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden`, `Catalog`, or `Storage` with
    /// `NotFound` for an unknown id.
    pub async fn update_sign(
        &self,
        admin: UserId,
        id: SignId,
        draft: SignDraft,
    ) -> Result<Sign, AdminServiceError> {
        self.require_admin(admin).await?;
        let existing = self
            .catalog
            .list_signs(None)
            .await?
            .into_iter()
            .find(|s| s.id == id)
            .ok_or(StorageError::NotFound)?;
        let sign = draft.validate(id, existing.created_at)?;
        self.catalog.upsert_sign(&sign).await?;
        let details = json!({ "name": sign.name.it(), "kind": sign.kind.as_str() });
        self.log(admin, "update", "sign", id, details).await?;
        Ok(sign)
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden` or `Storage` with `NotFound`.
    pub async fn delete_sign(&self, admin: UserId, id: SignId) -> Result<(), AdminServiceError> {
        self.require_admin(admin).await?;
        self.catalog.delete_sign(id).await?;
        self.log(admin, "delete", "sign", id, json!({})).await
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden` or `Catalog` for an invalid draft.
    pub async fn create_glossary_term(
        &self,
        admin: UserId,
        draft: GlossaryDraft,
    ) -> Result<GlossaryTerm, AdminServiceError> {
        self.require_admin(admin).await?;
        let term = draft.validate(GlossaryTermId::new_v4(), self.clock.now())?;
        self.catalog.upsert_glossary_term(&term).await?;
        self.log(admin, "create", "glossary", term.id, json!({ "term": term.term.it() }))
            .await?;
        Ok(term)
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden`, `Catalog`, or `Storage` with
    /// `NotFound` for an unknown id.
    pub async fn update_glossary_term(
        &self,
        admin: UserId,
        id: GlossaryTermId,
        draft: GlossaryDraft,
    ) -> Result<GlossaryTerm, AdminServiceError> {
        self.require_admin(admin).await?;
        let existing = self
            .catalog
            .list_glossary()
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or(StorageError::NotFound)?;
        let term = draft.validate(id, existing.created_at)?;
        self.catalog.upsert_glossary_term(&term).await?;
        self.log(admin, "update", "glossary", id, json!({ "term": term.term.it() }))
            .await?;
        Ok(term)
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden` or `Storage` with `NotFound`.
    pub async fn delete_glossary_term(
        &self,
        admin: UserId,
        id: GlossaryTermId,
    ) -> Result<(), AdminServiceError> {
        self.require_admin(admin).await?;
        self.catalog.delete_glossary_term(id).await?;
        self.log(admin, "delete", "glossary", id, json!({})).await
    }

    //
    // ─── MODERATION ────────────────────────────────────────────────────────────
    //

    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden` or `Storage`.
    pub async fn users(&self, admin: UserId) -> Result<Vec<User>, AdminServiceError> {
        self.require_admin(admin).await?;
        Ok(self.users.list_users().await?)
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::CannotBanAdmin` if the target is an admin.
    pub async fn ban_user(&self, admin: UserId, target: UserId) -> Result<User, AdminServiceError> {
        self.set_banned(admin, target, true).await
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden` or `Storage` with `NotFound`.
    pub async fn unban_user(
        &self,
        admin: UserId,
        target: UserId,
    ) -> Result<User, AdminServiceError> {
        self.set_banned(admin, target, false).await
    }

    async fn set_banned(
        &self,
        admin: UserId,
        target: UserId,
        banned: bool,
    ) -> Result<User, AdminServiceError> {
        self.require_admin(admin).await?;
        let mut user = self.users.get_user(target).await?;
        if banned && user.is_admin() {
            return Err(AdminServiceError::CannotBanAdmin);
        }
        user.banned = banned;
        user.updated_at = self.clock.now();
        self.users.update_user(&user).await?;
        let action = if banned { "ban" } else { "unban" };
        self.log(admin, action, "user", target, json!({ "email": user.email.as_str() }))
            .await?;
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden` or `Storage`.
    pub async fn reports(
        &self,
        admin: UserId,
        status: Option<ReportStatus>,
    ) -> Result<Vec<Report>, AdminServiceError> {
        self.require_admin(admin).await?;
        Ok(self.community.list_reports(status).await?)
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden` or `Storage` with `NotFound`.
    pub async fn review_report(
        &self,
        admin: UserId,
        id: ReportId,
    ) -> Result<Report, AdminServiceError> {
        self.set_report_status(admin, id, ReportStatus::Reviewed).await
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden` or `Storage` with `NotFound`.
    pub async fn resolve_report(
        &self,
        admin: UserId,
        id: ReportId,
    ) -> Result<Report, AdminServiceError> {
        self.set_report_status(admin, id, ReportStatus::Resolved).await
    }

    async fn set_report_status(
        &self,
        admin: UserId,
        id: ReportId,
        status: ReportStatus,
    ) -> Result<Report, AdminServiceError> {
        self.require_admin(admin).await?;
        let mut report = self.community.get_report(id).await?;
        report.set_status(status, self.clock.now());
        self.community.update_report(&report).await?;
        self.log(admin, status.as_str(), "report", id, json!({ "target": report.target.as_str() }))
            .await?;
        Ok(report)
    }

    /// Soft-delete any post.
    ///
    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden` or `Storage` with `NotFound`.
    pub async fn delete_post(&self, admin: UserId, id: PostId) -> Result<(), AdminServiceError> {
        self.require_admin(admin).await?;
        let mut post = self.community.get_post(id).await?;
        post.is_deleted = true;
        post.updated_at = self.clock.now();
        self.community.update_post(&post).await?;
        self.log(admin, "delete", "post", id, json!({ "author": post.user_id.to_string() }))
            .await
    }

    /// Newest first.
    ///
    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden` or `Storage`.
    pub async fn audit_log(
        &self,
        admin: UserId,
        limit: u32,
    ) -> Result<Vec<AdminLogEntry>, AdminServiceError> {
        self.require_admin(admin).await?;
        Ok(self.admin_logs.recent_logs(limit).await?)
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::Forbidden` or `Storage`.
    pub async fn dashboard(&self, admin: UserId) -> Result<Dashboard, AdminServiceError> {
        self.require_admin(admin).await?;
        let today = self.clock.today();

        let users = self.users.list_users().await?;
        let categories = self.catalog.list_categories(false).await?.len();
        let lessons = self.catalog.list_lessons(None, false).await?.len();
        let signs = self.catalog.list_signs(None).await?.len();
        let glossary_terms = self.catalog.list_glossary().await?.len();
        let questions = self.questions.list_questions(QuestionFilter::All).await?.len();
        let posts = self
            .community
            .list_posts()
            .await?
            .iter()
            .filter(|p| !p.is_deleted)
            .count();
        let pending_reports = self
            .community
            .list_reports(Some(ReportStatus::Pending))
            .await?
            .len();
        let exams: Vec<_> = self
            .progress
            .list_attempts()
            .await?
            .into_iter()
            .filter(|a| a.mode() == SessionMode::Exam)
            .collect();
        let exams_passed = exams.iter().filter(|a| a.passed() == Some(true)).count();
        let totals = self.progress.answer_totals().await?;

        Ok(Dashboard {
            active_today: users
                .iter()
                .filter(|u| u.last_active_date == Some(today))
                .count(),
            users: users.len(),
            categories,
            lessons,
            questions,
            signs,
            glossary_terms,
            posts,
            exams: exams.len(),
            exams_passed,
            exam_pass_rate: correct_rate(exams_passed as u64, exams.len() as u64),
            pending_reports,
            answers: totals.answered,
            correct_answers: totals.correct,
        })
    }
}
