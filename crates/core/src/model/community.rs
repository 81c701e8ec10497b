use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{
    AdminLogId, CommentId, LikeId, NotificationId, PostId, ReportId, UserId,
};

/// Longest accepted post or comment body.
pub const MAX_POST_CHARS: usize = 2000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CommunityError {
    #[error("content cannot be empty")]
    EmptyContent,

    #[error("content is too long ({len} > {MAX_POST_CHARS} chars)")]
    ContentTooLong { len: usize },

    #[error("report reason cannot be empty")]
    EmptyReason,

    #[error("invalid {field}: {value}")]
    InvalidEnum { field: &'static str, value: String },
}

fn checked_body(raw: &str) -> Result<String, CommunityError> {
    let body = raw.trim();
    if body.is_empty() {
        return Err(CommunityError::EmptyContent);
    }
    let len = body.chars().count();
    if len > MAX_POST_CHARS {
        return Err(CommunityError::ContentTooLong { len });
    }
    Ok(body.to_owned())
}

//
// ─── POSTS & COMMENTS ──────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub user_id: UserId,
    pub user_name: String,
    pub content: String,
    pub likes_count: u32,
    pub comments_count: u32,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// # Errors
    ///
    /// Returns `CommunityError` if the body is blank or too long.
    pub fn new(
        user_id: UserId,
        user_name: impl Into<String>,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, CommunityError> {
        Ok(Self {
            id: PostId::new_v4(),
            user_id,
            user_name: user_name.into(),
            content: checked_body(content)?,
            likes_count: 0,
            comments_count: 0,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub user_id: UserId,
    pub user_name: String,
    pub content: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// # Errors
    ///
    /// Returns `CommunityError` if the body is blank or too long.
    pub fn new(
        post_id: PostId,
        user_id: UserId,
        user_name: impl Into<String>,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, CommunityError> {
        Ok(Self {
            id: CommentId::new_v4(),
            post_id,
            user_id,
            user_name: user_name.into(),
            content: checked_body(content)?,
            is_deleted: false,
            created_at: now,
        })
    }
}

/// A like is unique per (post, user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    pub id: LikeId,
    pub post_id: PostId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

//
// ─── REPORTS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportTarget {
    Post,
    Comment,
    User,
}

impl ReportTarget {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ReportTarget::Post => "post",
            ReportTarget::Comment => "comment",
            ReportTarget::User => "user",
        }
    }

    /// # Errors
    ///
    /// Returns `CommunityError::InvalidEnum` for unknown values.
    pub fn parse(s: &str) -> Result<Self, CommunityError> {
        match s {
            "post" => Ok(ReportTarget::Post),
            "comment" => Ok(ReportTarget::Comment),
            "user" => Ok(ReportTarget::User),
            other => Err(CommunityError::InvalidEnum {
                field: "report target",
                value: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Resolved,
}

impl ReportStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Reviewed => "reviewed",
            ReportStatus::Resolved => "resolved",
        }
    }

    /// # Errors
    ///
    /// Returns `CommunityError::InvalidEnum` for unknown values.
    pub fn parse(s: &str) -> Result<Self, CommunityError> {
        match s {
            "pending" => Ok(ReportStatus::Pending),
            "reviewed" => Ok(ReportStatus::Reviewed),
            "resolved" => Ok(ReportStatus::Resolved),
            other => Err(CommunityError::InvalidEnum {
                field: "report status",
                value: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub reporter_id: UserId,
    pub target: ReportTarget,
    pub target_id: String,
    pub reason: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Report {
    /// # Errors
    ///
    /// Returns `CommunityError::EmptyReason` if no reason is given.
    pub fn new(
        reporter_id: UserId,
        target: ReportTarget,
        target_id: impl Into<String>,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, CommunityError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CommunityError::EmptyReason);
        }
        Ok(Self {
            id: ReportId::new_v4(),
            reporter_id,
            target,
            target_id: target_id.into(),
            reason: reason.to_owned(),
            status: ReportStatus::Pending,
            created_at: now,
            reviewed_at: None,
        })
    }

    pub fn set_status(&mut self, status: ReportStatus, now: DateTime<Utc>) {
        self.status = status;
        self.reviewed_at = Some(now);
    }
}

//
// ─── NOTIFICATIONS ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    Like,
    Comment,
    Report,
    System,
    Achievement,
}

impl NotificationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
            NotificationKind::Report => "report",
            NotificationKind::System => "system",
            NotificationKind::Achievement => "achievement",
        }
    }

    /// # Errors
    ///
    /// Returns `CommunityError::InvalidEnum` for unknown values.
    pub fn parse(s: &str) -> Result<Self, CommunityError> {
        match s {
            "like" => Ok(NotificationKind::Like),
            "comment" => Ok(NotificationKind::Comment),
            "report" => Ok(NotificationKind::Report),
            "system" => Ok(NotificationKind::System),
            "achievement" => Ok(NotificationKind::Achievement),
            other => Err(CommunityError::InvalidEnum {
                field: "notification kind",
                value: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub related_id: Option<String>,
}

impl Notification {
    #[must_use]
    pub fn new(
        user_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        related_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new_v4(),
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            read: false,
            created_at: now,
            related_id,
        }
    }
}

//
// ─── ADMIN AUDIT ───────────────────────────────────────────────────────────────
//

/// Audit trail entry written for every admin mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminLogEntry {
    pub id: AdminLogId,
    pub admin_id: UserId,
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

impl AdminLogEntry {
    #[must_use]
    pub fn new(
        admin_id: UserId,
        action: impl Into<String>,
        target_type: impl Into<String>,
        target_id: impl Into<String>,
        details: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AdminLogId::new_v4(),
            admin_id,
            action: action.into(),
            target_type: target_type.into(),
            target_id: target_id.into(),
            details: details.into(),
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn post_body_is_trimmed_and_required() {
        let post = Post::new(UserId::new_v4(), "Sara", "  ciao  ", fixed_now()).unwrap();
        assert_eq!(post.content, "ciao");
        assert_eq!(post.likes_count, 0);

        let err = Post::new(UserId::new_v4(), "Sara", "   ", fixed_now()).unwrap_err();
        assert_eq!(err, CommunityError::EmptyContent);
    }

    #[test]
    fn overlong_comment_is_rejected() {
        let body = "x".repeat(MAX_POST_CHARS + 1);
        let err = Comment::new(PostId::new_v4(), UserId::new_v4(), "Ali", &body, fixed_now())
            .unwrap_err();
        assert_eq!(
            err,
            CommunityError::ContentTooLong {
                len: MAX_POST_CHARS + 1
            }
        );
    }

    #[test]
    fn report_starts_pending_and_tracks_review_time() {
        let mut report = Report::new(
            UserId::new_v4(),
            ReportTarget::Post,
            "p1",
            "spam",
            fixed_now(),
        )
        .unwrap();
        assert_eq!(report.status, ReportStatus::Pending);
        report.set_status(ReportStatus::Resolved, fixed_now());
        assert_eq!(report.status, ReportStatus::Resolved);
        assert_eq!(report.reviewed_at, Some(fixed_now()));
    }

    #[test]
    fn enum_storage_names_parse_back() {
        for kind in [
            NotificationKind::Like,
            NotificationKind::Comment,
            NotificationKind::Report,
            NotificationKind::System,
            NotificationKind::Achievement,
        ] {
            assert_eq!(NotificationKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(ReportTarget::parse("lesson").is_err());
        assert_eq!(ReportStatus::parse("reviewed").unwrap(), ReportStatus::Reviewed);
    }
}
