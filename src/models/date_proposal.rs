use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

/// A candidate date for a trip. `votes_count` is aggregated from
/// `date_votes` on every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DateProposal {
    pub id: String,
    #[serde(rename = "trip")]
    pub trip_id: String,
    pub date: NaiveDate,
    pub created_by_discord_id: String,
    pub created_at: DateTime<Utc>,
    pub votes_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDateProposal {
    #[serde(rename = "trip")]
    pub trip_id: String,
    pub date: NaiveDate,
    pub created_by_discord_id: String,
}

impl NewDateProposal {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.trip_id.trim().is_empty() {
            return Err(AppError::validation("trip is required"));
        }
        if self.created_by_discord_id.trim().is_empty() {
            return Err(AppError::validation("created_by_discord_id is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DateVote {
    pub id: String,
    #[serde(rename = "proposal")]
    pub proposal_id: String,
    pub user_discord_id: String,
    pub created_at: DateTime<Utc>,
}
