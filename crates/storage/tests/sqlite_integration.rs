use chrono::Duration;
use patente_core::assessment::SessionMode;
use patente_core::model::{
    AttemptAnswer, AttemptId, CategoryDraft, CategoryId, Comment, Difficulty, Email, ExamAttempt,
    LessonDraft, LessonId, LessonProgress, Like, LikeId, Notification, NotificationKind,
    PasswordDigest, Post, Question, QuestionDraft, QuestionId, QuestionProgress, Role, User,
    UserId,
};
use patente_core::time::fixed_now;
use storage::repository::{
    CatalogRepository, CommunityRepository, ProgressRepository, QuestionFilter,
    QuestionRepository, StorageError, UserRepository,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn build_question(lesson_id: Option<LessonId>, correct_answer: bool, offset_secs: i64) -> Question {
    QuestionDraft {
        prompt_it: "Il segnale indica pericolo".into(),
        prompt_ar: "الإشارة تدل على خطر".into(),
        correct_answer,
        explanation_it: "Triangolo rosso".into(),
        explanation_ar: String::new(),
        category: "segnali".into(),
        difficulty: Difficulty::Easy,
        lesson_id,
        sign_id: None,
    }
    .validate(QuestionId::new_v4(), fixed_now() + Duration::seconds(offset_secs))
    .unwrap()
}

fn build_user(email: &str) -> User {
    User::new(
        UserId::new_v4(),
        Email::parse(email).unwrap(),
        "Karim",
        Role::User,
        PasswordDigest::new("salt$digest"),
        fixed_now(),
    )
}

#[tokio::test]
async fn sqlite_questions_round_trip_and_filter() {
    let repo = connect("memdb_questions").await;

    let category = CategoryDraft {
        name_it: "Segnali".into(),
        name_ar: "إشارات".into(),
        description_ar: String::new(),
        icon: "⚠️".into(),
        color: "#f00".into(),
        image_url: String::new(),
        order: 1,
        is_published: true,
    }
    .validate(CategoryId::new_v4(), fixed_now())
    .unwrap();
    repo.upsert_category(&category).await.unwrap();

    let lesson = LessonDraft {
        category_id: category.id,
        title_it: "Pericolo".into(),
        title_ar: "خطر".into(),
        description_it: String::new(),
        description_ar: String::new(),
        content_it: "Testo".into(),
        content_ar: "نص".into(),
        image_url: String::new(),
        order: 1,
        icon: String::new(),
        color: String::new(),
        is_published: true,
    }
    .validate(LessonId::new_v4(), fixed_now())
    .unwrap();
    repo.upsert_lesson(&lesson).await.unwrap();

    let late = build_question(Some(lesson.id), false, 10);
    let early = build_question(Some(lesson.id), true, 0);
    let loose = build_question(None, true, 5);
    for q in [&late, &early, &loose] {
        repo.upsert_question(q).await.unwrap();
    }

    let fetched = repo.get_question(late.id()).await.unwrap();
    assert_eq!(fetched, late);

    let in_lesson = repo
        .list_questions(QuestionFilter::Lesson(lesson.id))
        .await
        .unwrap();
    let ids: Vec<_> = in_lesson.iter().map(Question::id).collect();
    assert_eq!(ids, vec![early.id(), late.id()]);

    let in_category = repo
        .list_questions(QuestionFilter::Category(category.id))
        .await
        .unwrap();
    assert_eq!(in_category.len(), 2);
    assert_eq!(repo.list_questions(QuestionFilter::All).await.unwrap().len(), 3);

    repo.delete_question(loose.id()).await.unwrap();
    assert!(matches!(
        repo.get_question(loose.id()).await,
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        repo.delete_question(loose.id()).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_users_are_unique_by_email() {
    let repo = connect("memdb_users").await;
    let mut user = build_user("karim@example.it");
    repo.insert_user(&user).await.unwrap();

    let twin = build_user("karim@example.it");
    assert!(matches!(
        repo.insert_user(&twin).await,
        Err(StorageError::Conflict)
    ));

    user.touch_streak(fixed_now().date_naive());
    user.last_login = Some(fixed_now());
    repo.update_user(&user).await.unwrap();

    let found = repo
        .find_user_by_email(&user.email)
        .await
        .unwrap()
        .expect("user exists");
    assert_eq!(found, user);
    assert_eq!(found.streak, 1);
}

#[tokio::test]
async fn sqlite_progress_attempts_and_reset() {
    let repo = connect("memdb_progress").await;
    let user = UserId::new_v4();
    let other = UserId::new_v4();
    let attempt_id = AttemptId::new_v4();

    let q1 = QuestionId::new_v4();
    let q2 = QuestionId::new_v4();
    repo.append_question_progress(&QuestionProgress::new(
        user,
        q1,
        true,
        fixed_now(),
        Some(attempt_id),
    ))
        .await
        .unwrap();
    repo.append_question_progress(&QuestionProgress::new(
        user,
        q2,
        false,
        fixed_now(),
        Some(attempt_id),
    ))
        .await
        .unwrap();
    repo.append_question_progress(&QuestionProgress::new(other, q1, true, fixed_now(), None))
        .await
        .unwrap();

    let records = repo.question_progress_for_user(user).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].question_id, q1);
    assert_eq!(records[1].attempt_id, Some(attempt_id));

    let totals = repo.answer_totals().await.unwrap();
    assert_eq!(totals.answered, 3);
    assert_eq!(totals.correct, 2);

    let attempt = ExamAttempt::new(
        attempt_id,
        user,
        SessionMode::Exam,
        vec![
            AttemptAnswer { question_id: q1, answer: Some(true) },
            AttemptAnswer { question_id: q2, answer: None },
        ],
        1,
        Some(false),
        fixed_now(),
        fixed_now() + Duration::minutes(30),
    )
    .unwrap();
    repo.append_attempt(&attempt).await.unwrap();
    assert!(matches!(
        repo.append_attempt(&attempt).await,
        Err(StorageError::Conflict)
    ));

    let stored = repo.get_attempt(attempt_id).await.unwrap();
    assert_eq!(stored, attempt);
    assert_eq!(stored.time_spent_secs(), 1800);

    let lesson = LessonId::new_v4();
    let mut progress = LessonProgress::started(user, lesson, fixed_now());
    repo.upsert_lesson_progress(&progress).await.unwrap();
    progress.complete(fixed_now() + Duration::minutes(1));
    repo.upsert_lesson_progress(&progress).await.unwrap();
    let stored = repo
        .get_lesson_progress(user, lesson)
        .await
        .unwrap()
        .expect("progress");
    assert!(stored.completed);
    assert_eq!(stored.score, 100);
    assert_eq!(repo.lesson_progress_for_user(user).await.unwrap().len(), 1);

    repo.reset_user_progress(user).await.unwrap();
    assert!(repo.question_progress_for_user(user).await.unwrap().is_empty());
    assert!(repo.attempts_for_user(user).await.unwrap().is_empty());
    assert!(repo.get_lesson_progress(user, lesson).await.unwrap().is_none());
    assert_eq!(repo.question_progress_for_user(other).await.unwrap().len(), 1);
}

#[tokio::test]
async fn sqlite_community_feed_likes_and_notifications() {
    let repo = connect("memdb_community").await;
    let author = UserId::new_v4();
    let reader = UserId::new_v4();

    let first = Post::new(author, "Sara", "Prima domanda", fixed_now()).unwrap();
    let second =
        Post::new(author, "Sara", "Seconda domanda", fixed_now() + Duration::minutes(1)).unwrap();
    repo.insert_post(&first).await.unwrap();
    repo.insert_post(&second).await.unwrap();

    let feed = repo.list_posts().await.unwrap();
    assert_eq!(feed[0].id, second.id);
    assert_eq!(feed[1].id, first.id);

    let comment = Comment::new(first.id, reader, "Omar", "Grazie!", fixed_now()).unwrap();
    repo.insert_comment(&comment).await.unwrap();
    assert_eq!(repo.comments_for_post(first.id).await.unwrap(), vec![comment]);

    let like = Like {
        id: LikeId::new_v4(),
        post_id: first.id,
        user_id: reader,
        created_at: fixed_now(),
    };
    repo.insert_like(&like).await.unwrap();
    let dup = Like {
        id: LikeId::new_v4(),
        ..like.clone()
    };
    assert!(matches!(repo.insert_like(&dup).await, Err(StorageError::Conflict)));
    assert_eq!(repo.find_like(first.id, reader).await.unwrap(), Some(like));
    repo.delete_like(first.id, reader).await.unwrap();
    assert!(repo.find_like(first.id, reader).await.unwrap().is_none());

    let note = Notification::new(
        author,
        NotificationKind::Like,
        "Nuovo like",
        "Omar ha messo like",
        Some(first.id.to_string()),
        fixed_now(),
    );
    repo.insert_notification(&note).await.unwrap();
    assert_eq!(repo.mark_notifications_read(author).await.unwrap(), 1);
    assert_eq!(repo.mark_notifications_read(author).await.unwrap(), 0);
    let notes = repo.notifications_for_user(author).await.unwrap();
    assert!(notes[0].read);
}
