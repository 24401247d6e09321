use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: String,
    #[serde(rename = "trip")]
    pub trip_id: String,
    pub user_discord_id: String,
    pub user_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    #[serde(rename = "trip")]
    pub trip_id: String,
    pub user_discord_id: String,
    pub user_name: String,
    pub content: String,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.trip_id.trim().is_empty() {
            return Err(AppError::validation("trip is required"));
        }
        if self.user_discord_id.trim().is_empty() {
            return Err(AppError::validation("user_discord_id is required"));
        }
        validate_content(&self.content)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentPatch {
    pub content: Option<String>,
}

pub fn validate_content(content: &str) -> Result<(), AppError> {
    if content.trim().is_empty() {
        return Err(AppError::validation("content must not be empty"));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    pub trip_id: Option<String>,
    pub search: Option<String>,
}
