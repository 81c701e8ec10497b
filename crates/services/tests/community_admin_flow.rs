use patente_core::model::{
    CategoryDraft, Difficulty, LessonDraft, NotificationKind, QuestionDraft, ReportStatus,
    ReportTarget, User,
};
use patente_core::time::fixed_clock;
use services::{
    AccountError, AdminServiceError, AppConfig, AppServices, CommunityServiceError, StudyAdvice,
};
use storage::repository::{InMemoryRepository, QuestionFilter, Storage};

struct World {
    app: AppServices,
    admin: User,
    sara: User,
    luca: User,
}

async fn world() -> World {
    let storage = Storage::from_repo(InMemoryRepository::new());
    let app = AppServices::with_storage(AppConfig::default(), fixed_clock(), &storage);
    let accounts = app.accounts();
    let admin = accounts
        .register("admin@patente.com", "admin-pass", "Admin")
        .await
        .unwrap();
    let sara = accounts
        .register("sara@example.com", "secret1", "Sara")
        .await
        .unwrap();
    let luca = accounts
        .register("luca@example.com", "secret2", "Luca")
        .await
        .unwrap();
    World {
        app,
        admin,
        sara,
        luca,
    }
}

#[tokio::test]
async fn comments_and_likes_notify_the_author() {
    let w = world().await;
    let community = w.app.community();

    let post = community
        .create_post(w.sara.id, "Qualcuno ha consigli per l'esame?")
        .await
        .unwrap();
    community
        .comment(w.luca.id, post.id, "Ripassa gli errori ogni giorno.")
        .await
        .unwrap();
    community
        .comment(w.sara.id, post.id, "Grazie!")
        .await
        .unwrap();

    let liked = community.toggle_like(w.luca.id, post.id).await.unwrap();
    assert!(liked.liked);
    assert_eq!(liked.likes_count, 1);

    let feed = community.feed(w.luca.id).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].comments.len(), 2);
    assert_eq!(feed[0].post.comments_count, 2);
    assert!(feed[0].liked_by_viewer);
    assert!(!community.feed(w.sara.id).await.unwrap()[0].liked_by_viewer);

    let unliked = community.toggle_like(w.luca.id, post.id).await.unwrap();
    assert!(!unliked.liked);
    assert_eq!(unliked.likes_count, 0);

    // own comment does not notify
    let notes = community.notifications(w.sara.id).await.unwrap();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes.iter().filter(|n| n.kind == NotificationKind::Comment).count(), 1);
    assert_eq!(notes.iter().filter(|n| n.kind == NotificationKind::Like).count(), 1);
    assert!(notes.iter().all(|n| n.related_id.as_deref() == Some(post.id.to_string().as_str())));

    assert_eq!(community.unread_count(w.sara.id).await.unwrap(), 2);
    assert_eq!(community.mark_notifications_read(w.sara.id).await.unwrap(), 2);
    assert_eq!(community.unread_count(w.sara.id).await.unwrap(), 0);
    assert!(community.notifications(w.luca.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn only_authors_and_admins_delete() {
    let w = world().await;
    let community = w.app.community();

    let post = community.create_post(w.sara.id, "Segnale nuovo?").await.unwrap();
    let comment = community
        .comment(w.luca.id, post.id, "Non l'ho mai visto.")
        .await
        .unwrap();

    assert!(matches!(
        community.delete_post(w.luca.id, post.id).await,
        Err(CommunityServiceError::NotAllowed)
    ));
    assert!(matches!(
        community.delete_comment(w.sara.id, comment.id).await,
        Err(CommunityServiceError::NotAllowed)
    ));

    community.delete_comment(w.admin.id, comment.id).await.unwrap();
    let feed = community.feed(w.sara.id).await.unwrap();
    assert!(feed[0].comments.is_empty());
    assert_eq!(feed[0].post.comments_count, 0);

    community.delete_post(w.sara.id, post.id).await.unwrap();
    assert!(community.feed(w.sara.id).await.unwrap().is_empty());
    assert!(matches!(
        community.comment(w.luca.id, post.id, "ciao").await,
        Err(CommunityServiceError::PostDeleted)
    ));
    assert!(matches!(
        community.toggle_like(w.luca.id, post.id).await,
        Err(CommunityServiceError::PostDeleted)
    ));
}

#[tokio::test]
async fn moderation_bans_and_resolves_reports() {
    let w = world().await;
    let community = w.app.community();
    let admin = w.app.admin();

    let post = community.create_post(w.luca.id, "spam spam spam").await.unwrap();
    let report = community
        .report(w.sara.id, ReportTarget::Post, post.id.to_string(), "Spam")
        .await
        .unwrap();
    assert_eq!(report.status, ReportStatus::Pending);

    assert!(matches!(
        admin.reports(w.sara.id, None).await,
        Err(AdminServiceError::Forbidden)
    ));
    assert!(matches!(
        admin.ban_user(w.admin.id, w.admin.id).await,
        Err(AdminServiceError::CannotBanAdmin)
    ));

    let pending = admin.reports(w.admin.id, Some(ReportStatus::Pending)).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(admin.dashboard(w.admin.id).await.unwrap().pending_reports, 1);

    admin.delete_post(w.admin.id, post.id).await.unwrap();
    let resolved = admin.resolve_report(w.admin.id, report.id).await.unwrap();
    assert_eq!(resolved.status, ReportStatus::Resolved);
    assert!(resolved.reviewed_at.is_some());

    let banned = admin.ban_user(w.admin.id, w.luca.id).await.unwrap();
    assert!(banned.banned);
    assert!(matches!(
        community.create_post(w.luca.id, "sono tornato").await,
        Err(CommunityServiceError::Banned)
    ));
    assert!(matches!(
        w.app.accounts().login("luca@example.com", "secret2").await,
        Err(AccountError::Banned)
    ));

    admin.unban_user(w.admin.id, w.luca.id).await.unwrap();
    assert!(w.app.accounts().login("luca@example.com", "secret2").await.is_ok());

    let log = admin.audit_log(w.admin.id, 10).await.unwrap();
    let actions: Vec<(&str, &str)> = log
        .iter()
        .map(|e| (e.action.as_str(), e.target_type.as_str()))
        .collect();
    assert_eq!(
        actions,
        vec![
            ("unban", "user"),
            ("ban", "user"),
            ("resolved", "report"),
            ("delete", "post"),
        ]
    );
    assert!(log.iter().all(|e| e.admin_id == w.admin.id));
    assert_eq!(admin.audit_log(w.admin.id, 1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn practice_feeds_stats_mistakes_and_dashboard() {
    let w = world().await;
    let admin = w.app.admin();

    let category = admin
        .create_category(
            w.admin.id,
            CategoryDraft {
                name_it: "Precedenza".into(),
                name_ar: "الأولوية".into(),
                description_ar: String::new(),
                icon: String::new(),
                color: String::new(),
                image_url: String::new(),
                order: 1,
                is_published: true,
            },
        )
        .await
        .unwrap();
    let lesson = admin
        .create_lesson(
            w.admin.id,
            LessonDraft {
                category_id: category.id,
                title_it: "Incroci".into(),
                title_ar: "التقاطعات".into(),
                description_it: String::new(),
                description_ar: String::new(),
                content_it: "Dare la precedenza a destra.".into(),
                content_ar: "أعط الأولوية لليمين.".into(),
                image_url: String::new(),
                order: 1,
                icon: String::new(),
                color: String::new(),
                is_published: true,
            },
        )
        .await
        .unwrap();

    let mut created = Vec::new();
    for (n, correct_answer) in [true, false, true].into_iter().enumerate() {
        let question = admin
            .create_question(
                w.admin.id,
                QuestionDraft {
                    prompt_it: format!("Domanda {n}"),
                    prompt_ar: format!("سؤال {n}"),
                    correct_answer,
                    explanation_it: String::new(),
                    explanation_ar: String::new(),
                    category: "precedenza".into(),
                    difficulty: Difficulty::Easy,
                    lesson_id: Some(lesson.id),
                    sign_id: None,
                },
            )
            .await
            .unwrap();
        created.push(question);
    }
    assert!(matches!(
        admin.questions(w.sara.id).await,
        Err(AdminServiceError::Forbidden)
    ));
    assert_eq!(admin.questions(w.admin.id).await.unwrap().len(), 3);

    let session = w
        .app
        .assessment()
        .start_practice(w.sara.id, QuestionFilter::Lesson(lesson.id))
        .await
        .unwrap();
    while !session.is_finished() {
        session.submit_answer(true).await.unwrap();
    }
    let result = session.finish().await.unwrap();
    assert_eq!(result.correct, 2);

    let stats = w.app.stats();
    let sara_stats = stats.user_stats(w.sara.id).await.unwrap();
    assert_eq!(sara_stats.answered, 3);
    assert_eq!(sara_stats.correct, 2);
    assert_eq!(sara_stats.wrong, 1);
    assert_eq!(sara_stats.correct_rate, 67);
    assert_eq!(sara_stats.level, 1);
    assert_eq!(sara_stats.exams_taken, 0);
    assert_eq!(sara_stats.total_lessons, 1);
    assert_eq!(sara_stats.streak, 1);
    assert_eq!(
        services::StatsService::study_advice(&sara_stats),
        StudyAdvice::ReviewMistakes
    );

    let mistakes = stats.mistakes(w.sara.id).await.unwrap();
    assert_eq!(mistakes.len(), 1);
    assert_eq!(mistakes[0].id(), created[1].id());

    let overview = w.app.catalog().category_overview(w.sara.id).await.unwrap();
    assert_eq!(overview.len(), 1);
    assert_eq!(overview[0].lesson_count, 1);
    assert_eq!(overview[0].completed_lessons, 0);
    stats.mark_lesson_complete(w.sara.id, lesson.id).await.unwrap();
    let overview = w.app.catalog().category_overview(w.sara.id).await.unwrap();
    assert_eq!(overview[0].percent_complete(), 100);

    let dashboard = admin.dashboard(w.admin.id).await.unwrap();
    assert_eq!(dashboard.users, 3);
    assert_eq!(dashboard.active_today, 3);
    assert_eq!(dashboard.categories, 1);
    assert_eq!(dashboard.lessons, 1);
    assert_eq!(dashboard.questions, 3);
    assert_eq!(dashboard.answers, 3);
    assert_eq!(dashboard.correct_answers, 2);
    assert_eq!(dashboard.exams, 0);
    assert_eq!(dashboard.exam_pass_rate, 0);

    stats.reset_progress(w.sara.id).await.unwrap();
    let cleared = stats.user_stats(w.sara.id).await.unwrap();
    assert_eq!(cleared.answered, 0);
    assert_eq!(cleared.lessons_completed, 0);
    assert!(stats.mistakes(w.sara.id).await.unwrap().is_empty());
}
