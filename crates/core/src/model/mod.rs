mod catalog;
mod community;
mod ids;
mod progress;
mod question;
mod text;
mod user;

pub use ids::{
    AdminLogId, AttemptId, CategoryId, CommentId, GlossaryTermId, LessonId, LikeId,
    NotificationId, ParseIdError, PostId, ProgressId, QuestionId, ReportId, SignId, UserId,
};
pub use text::{BilingualText, Language, MAX_TEXT_CHARS, TextError};

pub use catalog::{
    CatalogError, Category, CategoryDraft, GlossaryDraft, GlossaryTerm, Lesson, LessonDraft, Sign,
    SignDraft, SignKind,
};
pub use community::{
    AdminLogEntry, Comment, CommunityError, Like, MAX_POST_CHARS, Notification, NotificationKind,
    Post, Report, ReportStatus, ReportTarget,
};
pub use progress::{
    AttemptAnswer, AttemptError, ExamAttempt, LessonProgress, QuestionProgress,
};
pub use question::{Difficulty, Question, QuestionDraft, QuestionError};
pub use user::{
    Email, MIN_PASSWORD_LEN, PasswordDigest, Role, User, UserError, check_password,
};
