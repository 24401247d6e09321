use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{missing_parent, AppError},
    models::date_proposal::DateVote,
};

#[async_trait]
pub trait DateVoteRepository: Send + Sync {
    /// Returns the user's vote on the proposal, creating it when absent.
    async fn vote(&self, proposal_id: &str, user_discord_id: &str) -> Result<DateVote, AppError>;
    /// Removes the user's vote if there is one. Returns whether a vote was removed.
    async fn unvote(&self, proposal_id: &str, user_discord_id: &str) -> Result<bool, AppError>;
    async fn list(&self, proposal_id: &str) -> Result<Vec<DateVote>, AppError>;
}

#[derive(Clone)]
pub struct SqliteDateVoteRepository {
    pool: DbPool,
}

impl SqliteDateVoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn ensure_proposal(&self, proposal_id: &str) -> Result<(), AppError> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM date_proposals WHERE id = ?1")
            .bind(proposal_id)
            .fetch_optional(&self.pool)
            .await?;
        found.map(|_| ()).ok_or(AppError::NotFound)
    }
}

#[async_trait]
impl DateVoteRepository for SqliteDateVoteRepository {
    async fn vote(&self, proposal_id: &str, user_discord_id: &str) -> Result<DateVote, AppError> {
        self.ensure_proposal(proposal_id).await?;

        let id = Uuid::new_v4().to_string();
        // The no-op DO UPDATE makes RETURNING yield the existing row on a repeat vote.
        let vote = sqlx::query_as::<_, DateVote>(
            "INSERT INTO date_votes (id, proposal_id, user_discord_id, created_at) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT (proposal_id, user_discord_id) \
             DO UPDATE SET proposal_id = excluded.proposal_id \
             RETURNING id, proposal_id, user_discord_id, created_at",
        )
        .bind(&id)
        .bind(proposal_id)
        .bind(user_discord_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(missing_parent)?;

        if vote.id == id {
            info!(proposal_id, user = user_discord_id, "vote recorded");
        } else {
            debug!(proposal_id, user = user_discord_id, "vote already present");
        }
        Ok(vote)
    }

    async fn unvote(&self, proposal_id: &str, user_discord_id: &str) -> Result<bool, AppError> {
        self.ensure_proposal(proposal_id).await?;

        let result =
            sqlx::query("DELETE FROM date_votes WHERE proposal_id = ?1 AND user_discord_id = ?2")
                .bind(proposal_id)
                .bind(user_discord_id)
                .execute(&self.pool)
                .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            info!(proposal_id, user = user_discord_id, "vote removed");
        } else {
            debug!(proposal_id, user = user_discord_id, "no vote to remove");
        }
        Ok(removed)
    }

    async fn list(&self, proposal_id: &str) -> Result<Vec<DateVote>, AppError> {
        self.ensure_proposal(proposal_id).await?;

        let votes = sqlx::query_as::<_, DateVote>(
            "SELECT id, proposal_id, user_discord_id, created_at FROM date_votes \
             WHERE proposal_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )
        .bind(proposal_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(votes)
    }
}
