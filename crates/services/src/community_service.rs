use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use patente_core::Clock;
use patente_core::model::{
    Comment, CommentId, Like, LikeId, Notification, NotificationKind, Post, PostId, Report,
    ReportTarget, User, UserId,
};
use storage::repository::{CommunityRepository, StorageError, UserRepository};

use crate::error::CommunityServiceError;

/// A visible post with its visible comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    pub post: Post,
    pub comments: Vec<Comment>,
    pub liked_by_viewer: bool,
}

/// State of a post's like after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeToggle {
    pub liked: bool,
    pub likes_count: u32,
}

/// Posts, comments, likes, reports and the notification inbox.
#[derive(Clone)]
pub struct CommunityService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    community: Arc<dyn CommunityRepository>,
}

impl CommunityService {
    #[must_use]
    pub fn new(
        clock: Clock,
        users: Arc<dyn UserRepository>,
        community: Arc<dyn CommunityRepository>,
    ) -> Self {
        Self {
            clock,
            users,
            community,
        }
    }

    async fn active_user(&self, id: UserId) -> Result<User, CommunityServiceError> {
        let user = self.users.get_user(id).await?;
        if user.banned {
            return Err(CommunityServiceError::Banned);
        }
        Ok(user)
    }

    async fn live_post(&self, id: PostId) -> Result<Post, CommunityServiceError> {
        let post = self.community.get_post(id).await?;
        if post.is_deleted {
            return Err(CommunityServiceError::PostDeleted);
        }
        Ok(post)
    }

    /// Non-deleted posts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CommunityServiceError::Storage` if a read fails.
    pub async fn feed(&self, viewer: UserId) -> Result<Vec<FeedItem>, CommunityServiceError> {
        let posts = self.community.list_posts().await?;
        let mut out = Vec::new();
        for post in posts.into_iter().filter(|p| !p.is_deleted) {
            let comments = self
                .community
                .comments_for_post(post.id)
                .await?
                .into_iter()
                .filter(|c| !c.is_deleted)
                .collect();
            let liked_by_viewer = self.community.find_like(post.id, viewer).await?.is_some();
            out.push(FeedItem {
                post,
                comments,
                liked_by_viewer,
            });
        }
        Ok(out)
    }

    /// # Errors
    ///
    /// Returns `CommunityServiceError::Banned` for banned authors and
    /// `Community` for blank or oversized content.
    pub async fn create_post(
        &self,
        author: UserId,
        content: &str,
    ) -> Result<Post, CommunityServiceError> {
        let user = self.active_user(author).await?;
        let post = Post::new(user.id, user.name, content, self.clock.now())?;
        self.community.insert_post(&post).await?;
        info!(post_id = %post.id, %author, "post created");
        Ok(post)
    }

    /// Comment on a post and notify its author.
    ///
    /// # Errors
    ///
    /// Returns `CommunityServiceError::Banned`, `PostDeleted`, or `Community`
    /// for invalid content.
    pub async fn comment(
        &self,
        author: UserId,
        post_id: PostId,
        content: &str,
    ) -> Result<Comment, CommunityServiceError> {
        let user = self.active_user(author).await?;
        let mut post = self.live_post(post_id).await?;
        let now = self.clock.now();

        let comment = Comment::new(post.id, user.id, user.name.clone(), content, now)?;
        self.community.insert_comment(&comment).await?;
        post.comments_count = post.comments_count.saturating_add(1);
        post.updated_at = now;
        self.community.update_post(&post).await?;

        if post.user_id != user.id {
            let note = Notification::new(
                post.user_id,
                NotificationKind::Comment,
                "Nuovo commento",
                format!("{} ha commentato il tuo post", user.name),
                Some(post.id.to_string()),
                now,
            );
            self.community.insert_notification(&note).await?;
        }
        Ok(comment)
    }

    /// Like the post, or remove the like if already given.
    ///
    /// # Errors
    ///
    /// Returns `CommunityServiceError::Banned` or `PostDeleted`.
    pub async fn toggle_like(
        &self,
        user_id: UserId,
        post_id: PostId,
    ) -> Result<LikeToggle, CommunityServiceError> {
        let user = self.active_user(user_id).await?;
        let mut post = self.live_post(post_id).await?;
        let now = self.clock.now();

        let liked = if self.community.find_like(post.id, user.id).await?.is_some() {
            self.community.delete_like(post.id, user.id).await?;
            post.likes_count = post.likes_count.saturating_sub(1);
            false
        } else {
            let like = Like {
                id: LikeId::new_v4(),
                post_id: post.id,
                user_id: user.id,
                created_at: now,
            };
            match self.community.insert_like(&like).await {
                // Lost a race with another toggle; the like exists either way.
                Err(StorageError::Conflict) => {
                    return Ok(LikeToggle {
                        liked: true,
                        likes_count: post.likes_count,
                    });
                }
                other => other?,
            }
            post.likes_count = post.likes_count.saturating_add(1);
            if post.user_id != user.id {
                let note = Notification::new(
                    post.user_id,
                    NotificationKind::Like,
                    "Nuovo like",
                    format!("A {} piace il tuo post", user.name),
                    Some(post.id.to_string()),
                    now,
                );
                self.community.insert_notification(&note).await?;
            }
            true
        };

        self.community.update_post(&post).await?;
        debug!(%post_id, %user_id, liked, "like toggled");
        Ok(LikeToggle {
            liked,
            likes_count: post.likes_count,
        })
    }

    /// Soft-delete a post. Allowed for its author and for admins.
    ///
    /// # Errors
    ///
    /// Returns `CommunityServiceError::NotAllowed` for anyone else.
    pub async fn delete_post(
        &self,
        actor: UserId,
        post_id: PostId,
    ) -> Result<(), CommunityServiceError> {
        let user = self.users.get_user(actor).await?;
        let mut post = self.community.get_post(post_id).await?;
        if post.user_id != user.id && !user.is_admin() {
            return Err(CommunityServiceError::NotAllowed);
        }
        if post.is_deleted {
            return Ok(());
        }
        post.is_deleted = true;
        post.updated_at = self.clock.now();
        self.community.update_post(&post).await?;
        info!(%post_id, %actor, "post deleted");
        Ok(())
    }

    /// Soft-delete a comment. Allowed for its author and for admins.
    ///
    /// # Errors
    ///
    /// Returns `CommunityServiceError::NotAllowed` for anyone else.
    pub async fn delete_comment(
        &self,
        actor: UserId,
        comment_id: CommentId,
    ) -> Result<(), CommunityServiceError> {
        let user = self.users.get_user(actor).await?;
        let mut comment = self.community.get_comment(comment_id).await?;
        if comment.user_id != user.id && !user.is_admin() {
            return Err(CommunityServiceError::NotAllowed);
        }
        if comment.is_deleted {
            return Ok(());
        }
        comment.is_deleted = true;
        self.community.update_comment(&comment).await?;

        let mut post = self.community.get_post(comment.post_id).await?;
        post.comments_count = post.comments_count.saturating_sub(1);
        self.community.update_post(&post).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CommunityServiceError::Community` for an empty reason.
    pub async fn report(
        &self,
        reporter: UserId,
        target: ReportTarget,
        target_id: impl Into<String>,
        reason: &str,
    ) -> Result<Report, CommunityServiceError> {
        let user = self.users.get_user(reporter).await?;
        let report = Report::new(user.id, target, target_id, reason, self.clock.now())?;
        self.community.insert_report(&report).await?;
        info!(report_id = %report.id, target = target.as_str(), "report filed");
        Ok(report)
    }

    /// Newest first.
    ///
    /// # Errors
    ///
    /// Returns `CommunityServiceError::Storage` if the read fails.
    pub async fn notifications(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Notification>, CommunityServiceError> {
        Ok(self.community.notifications_for_user(user_id).await?)
    }

    /// # Errors
    ///
    /// Returns `CommunityServiceError::Storage` if the read fails.
    pub async fn unread_count(&self, user_id: UserId) -> Result<usize, CommunityServiceError> {
        let notes = self.community.notifications_for_user(user_id).await?;
        Ok(notes.iter().filter(|n| !n.read).count())
    }

    /// Returns how many notifications changed.
    ///
    /// # Errors
    ///
    /// Returns `CommunityServiceError::Storage` if the update fails.
    pub async fn mark_notifications_read(
        &self,
        user_id: UserId,
    ) -> Result<u64, CommunityServiceError> {
        Ok(self.community.mark_notifications_read(user_id).await?)
    }
}
