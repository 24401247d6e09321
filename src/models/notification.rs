use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum NotificationKind {
    Recruitment,
    DayBefore,
    SameDay,
    Comment,
    #[default]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: String,
    pub user_discord_id: String,
    #[serde(rename = "trip")]
    pub trip_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub unread: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewNotification {
    pub user_discord_id: String,
    #[serde(rename = "trip", default)]
    pub trip_id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: NotificationKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
}

impl NewNotification {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.user_discord_id.trim().is_empty() {
            return Err(AppError::validation("user_discord_id is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub user_discord_id: Option<String>,
    pub unread_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationCount {
    pub total: i64,
    pub unread: i64,
}
