use patente_core::model::{
    Comment, CommentId, Like, Notification, Post, PostId, Report, ReportId, ReportStatus, UserId,
};

use super::SqliteRepository;
use super::mapping::{
    conn, map_comment_row, map_like_row, map_notification_row, map_post_row, map_report_row,
    write_err,
};
use crate::repository::{CommunityRepository, StorageError};

fn expect_one(rows_affected: u64) -> Result<(), StorageError> {
    if rows_affected == 0 {
        return Err(StorageError::NotFound);
    }
    Ok(())
}

#[async_trait::async_trait]
impl CommunityRepository for SqliteRepository {
    async fn insert_post(&self, post: &Post) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO posts (id, user_id, user_name, content, likes_count, comments_count, is_deleted, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(post.id.to_string())
        .bind(post.user_id.to_string())
        .bind(&post.user_name)
        .bind(&post.content)
        .bind(i64::from(post.likes_count))
        .bind(i64::from(post.comments_count))
        .bind(i64::from(post.is_deleted))
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn update_post(&self, post: &Post) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE posts SET
                content = ?2,
                likes_count = ?3,
                comments_count = ?4,
                is_deleted = ?5,
                updated_at = ?6
            WHERE id = ?1
            ",
        )
        .bind(post.id.to_string())
        .bind(&post.content)
        .bind(i64::from(post.likes_count))
        .bind(i64::from(post.comments_count))
        .bind(i64::from(post.is_deleted))
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        expect_one(res.rows_affected())
    }

    async fn get_post(&self, id: PostId) -> Result<Post, StorageError> {
        let row = sqlx::query("SELECT * FROM posts WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        map_post_row(&row)
    }

    async fn list_posts(&self) -> Result<Vec<Post>, StorageError> {
        let rows = sqlx::query("SELECT * FROM posts ORDER BY created_at DESC, rowid DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        rows.iter().map(map_post_row).collect()
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO comments (id, post_id, user_id, user_name, content, is_deleted, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(comment.id.to_string())
        .bind(comment.post_id.to_string())
        .bind(comment.user_id.to_string())
        .bind(&comment.user_name)
        .bind(&comment.content)
        .bind(i64::from(comment.is_deleted))
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn update_comment(&self, comment: &Comment) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE comments SET content = ?2, is_deleted = ?3 WHERE id = ?1")
            .bind(comment.id.to_string())
            .bind(&comment.content)
            .bind(i64::from(comment.is_deleted))
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        expect_one(res.rows_affected())
    }

    async fn get_comment(&self, id: CommentId) -> Result<Comment, StorageError> {
        let row = sqlx::query("SELECT * FROM comments WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        map_comment_row(&row)
    }

    async fn comments_for_post(&self, post: PostId) -> Result<Vec<Comment>, StorageError> {
        let rows = sqlx::query(
            "SELECT * FROM comments WHERE post_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )
        .bind(post.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_comment_row).collect()
    }

    async fn find_like(&self, post: PostId, user: UserId) -> Result<Option<Like>, StorageError> {
        let row = sqlx::query("SELECT * FROM likes WHERE post_id = ?1 AND user_id = ?2")
            .bind(post.to_string())
            .bind(user.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(map_like_row).transpose()
    }

    async fn insert_like(&self, like: &Like) -> Result<(), StorageError> {
        sqlx::query("INSERT INTO likes (id, post_id, user_id, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(like.id.to_string())
            .bind(like.post_id.to_string())
            .bind(like.user_id.to_string())
            .bind(like.created_at)
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        Ok(())
    }

    async fn delete_like(&self, post: PostId, user: UserId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM likes WHERE post_id = ?1 AND user_id = ?2")
            .bind(post.to_string())
            .bind(user.to_string())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        expect_one(res.rows_affected())
    }

    async fn insert_report(&self, report: &Report) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO reports (id, reporter_id, target, target_id, reason, status, created_at, reviewed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(report.id.to_string())
        .bind(report.reporter_id.to_string())
        .bind(report.target.as_str())
        .bind(&report.target_id)
        .bind(&report.reason)
        .bind(report.status.as_str())
        .bind(report.created_at)
        .bind(report.reviewed_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn update_report(&self, report: &Report) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE reports SET status = ?2, reviewed_at = ?3 WHERE id = ?1")
            .bind(report.id.to_string())
            .bind(report.status.as_str())
            .bind(report.reviewed_at)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        expect_one(res.rows_affected())
    }

    async fn get_report(&self, id: ReportId) -> Result<Report, StorageError> {
        let row = sqlx::query("SELECT * FROM reports WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        map_report_row(&row)
    }

    async fn list_reports(
        &self,
        status: Option<ReportStatus>,
    ) -> Result<Vec<Report>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT * FROM reports
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY created_at DESC, rowid DESC
            ",
        )
        .bind(status.map(ReportStatus::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_report_row).collect()
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO notifications (id, user_id, kind, title, message, read, created_at, related_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(notification.id.to_string())
        .bind(notification.user_id.to_string())
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(i64::from(notification.read))
        .bind(notification.created_at)
        .bind(notification.related_id.as_deref())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn notifications_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<Notification>, StorageError> {
        let rows = sqlx::query(
            "SELECT * FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_notification_row).collect()
    }

    async fn mark_notifications_read(&self, user: UserId) -> Result<u64, StorageError> {
        let res = sqlx::query("UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0")
            .bind(user.to_string())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected())
    }
}
