use patente_core::model::AdminLogEntry;

use super::SqliteRepository;
use super::mapping::{conn, map_admin_log_row};
use crate::repository::{AdminLogRepository, StorageError};

#[async_trait::async_trait]
impl AdminLogRepository for SqliteRepository {
    async fn append_log(&self, entry: &AdminLogEntry) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO admin_logs (id, admin_id, action, target_type, target_id, details, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(entry.id.to_string())
        .bind(entry.admin_id.to_string())
        .bind(&entry.action)
        .bind(&entry.target_type)
        .bind(&entry.target_id)
        .bind(&entry.details)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn recent_logs(&self, limit: u32) -> Result<Vec<AdminLogEntry>, StorageError> {
        let rows = sqlx::query(
            "SELECT * FROM admin_logs ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_admin_log_row).collect()
    }
}
