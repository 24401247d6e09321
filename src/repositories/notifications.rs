use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{missing_parent, AppError},
    models::notification::{Notification, NotificationCount, NotificationFilter, NewNotification},
};

const NOTIFICATION_COLUMNS: &str = "id, user_discord_id, trip_id, kind, title, message, \
     created_at, read_at, read_at IS NULL AS unread";

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, new_notification: NewNotification) -> Result<Notification, AppError>;
    async fn get(&self, id: &str) -> Result<Notification, AppError>;
    /// Newest first.
    async fn list(&self, filter: &NotificationFilter) -> Result<Vec<Notification>, AppError>;
    async fn count(&self, user_discord_id: &str) -> Result<NotificationCount, AppError>;
    /// Marks one notification read; an already read one keeps its timestamp.
    async fn mark_read(&self, id: &str) -> Result<Notification, AppError>;
    /// Marks every unread notification of the user read. Returns how many changed.
    async fn mark_all_read(&self, user_discord_id: &str) -> Result<u64, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct SqliteNotificationRepository {
    pool: DbPool,
}

impl SqliteNotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for SqliteNotificationRepository {
    async fn create(&self, new_notification: NewNotification) -> Result<Notification, AppError> {
        new_notification.validate()?;

        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            user_discord_id: new_notification.user_discord_id,
            trip_id: new_notification.trip_id,
            kind: new_notification.kind,
            title: new_notification.title,
            message: new_notification.message,
            created_at: Utc::now(),
            read_at: None,
            unread: true,
        };

        sqlx::query(
            "INSERT INTO notifications \
             (id, user_discord_id, trip_id, kind, title, message, created_at, read_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)",
        )
        .bind(&notification.id)
        .bind(&notification.user_discord_id)
        .bind(&notification.trip_id)
        .bind(notification.kind)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(missing_parent)?;

        debug!(
            notification_id = %notification.id,
            user = %notification.user_discord_id,
            "notification stored"
        );
        Ok(notification)
    }

    async fn get(&self, id: &str) -> Result<Notification, AppError> {
        sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound)
    }

    async fn list(&self, filter: &NotificationFilter) -> Result<Vec<Notification>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE 1 = 1"
        ));
        if let Some(user) = &filter.user_discord_id {
            query.push(" AND user_discord_id = ").push_bind(user.clone());
        }
        if filter.unread_only {
            query.push(" AND read_at IS NULL");
        }
        query.push(" ORDER BY created_at DESC, rowid DESC");

        let notifications = query
            .build_query_as::<Notification>()
            .fetch_all(&self.pool)
            .await?;
        Ok(notifications)
    }

    async fn count(&self, user_discord_id: &str) -> Result<NotificationCount, AppError> {
        let (total, unread): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN read_at IS NULL THEN 1 ELSE 0 END), 0) \
             FROM notifications WHERE user_discord_id = ?1",
        )
        .bind(user_discord_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(NotificationCount { total, unread })
    }

    async fn mark_read(&self, id: &str) -> Result<Notification, AppError> {
        sqlx::query_as::<_, Notification>(&format!(
            "UPDATE notifications SET read_at = COALESCE(read_at, ?1) WHERE id = ?2 \
             RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound)
    }

    async fn mark_all_read(&self, user_discord_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE notifications SET read_at = ?1 \
             WHERE user_discord_id = ?2 AND read_at IS NULL",
        )
        .bind(Utc::now())
        .bind(user_discord_id)
        .execute(&self.pool)
        .await?;
        info!(
            user = user_discord_id,
            updated = result.rows_affected(),
            "notifications marked read"
        );
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
