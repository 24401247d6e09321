use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{missing_parent, AppError},
    models::date_proposal::{DateProposal, NewDateProposal},
};

const PROPOSAL_SELECT: &str = "SELECT p.id, p.trip_id, p.date, p.created_by_discord_id, \
     p.created_at, COUNT(v.id) AS votes_count \
     FROM date_proposals p LEFT JOIN date_votes v ON v.proposal_id = p.id";

#[async_trait]
pub trait DateProposalRepository: Send + Sync {
    /// Fails with `Conflict` when the trip already has a proposal for that date.
    async fn create(&self, new_proposal: NewDateProposal) -> Result<DateProposal, AppError>;
    async fn get(&self, id: &str) -> Result<DateProposal, AppError>;
    /// Proposals ordered by date, optionally restricted to one trip.
    async fn list(&self, trip_id: Option<&str>) -> Result<Vec<DateProposal>, AppError>;
    /// Deletes the proposal and its votes in one transaction.
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct SqliteDateProposalRepository {
    pool: DbPool,
}

impl SqliteDateProposalRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DateProposalRepository for SqliteDateProposalRepository {
    async fn create(&self, new_proposal: NewDateProposal) -> Result<DateProposal, AppError> {
        new_proposal.validate()?;

        let trip_exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM trips WHERE id = ?1")
            .bind(&new_proposal.trip_id)
            .fetch_optional(&self.pool)
            .await?;
        if trip_exists.is_none() {
            return Err(AppError::NotFound);
        }

        let proposal = DateProposal {
            id: Uuid::new_v4().to_string(),
            trip_id: new_proposal.trip_id,
            date: new_proposal.date,
            created_by_discord_id: new_proposal.created_by_discord_id,
            created_at: Utc::now(),
            votes_count: 0,
        };

        let result = sqlx::query(
            "INSERT INTO date_proposals (id, trip_id, date, created_by_discord_id, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) ON CONFLICT (trip_id, date) DO NOTHING",
        )
        .bind(&proposal.id)
        .bind(&proposal.trip_id)
        .bind(proposal.date)
        .bind(&proposal.created_by_discord_id)
        .bind(proposal.created_at)
        .execute(&self.pool)
        .await
        .map_err(missing_parent)?;

        if result.rows_affected() == 0 {
            debug!(trip_id = %proposal.trip_id, date = %proposal.date, "duplicate date proposal");
            return Err(AppError::Conflict(format!(
                "a proposal for {} already exists on this trip",
                proposal.date
            )));
        }

        info!(
            proposal_id = %proposal.id,
            trip_id = %proposal.trip_id,
            date = %proposal.date,
            "date proposal created"
        );
        Ok(proposal)
    }

    async fn get(&self, id: &str) -> Result<DateProposal, AppError> {
        sqlx::query_as::<_, DateProposal>(&format!(
            "{PROPOSAL_SELECT} WHERE p.id = ?1 GROUP BY p.id"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound)
    }

    async fn list(&self, trip_id: Option<&str>) -> Result<Vec<DateProposal>, AppError> {
        let proposals = match trip_id {
            Some(trip_id) => {
                sqlx::query_as::<_, DateProposal>(&format!(
                    "{PROPOSAL_SELECT} WHERE p.trip_id = ?1 GROUP BY p.id \
                     ORDER BY p.date ASC, p.created_at ASC"
                ))
                .bind(trip_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, DateProposal>(&format!(
                    "{PROPOSAL_SELECT} GROUP BY p.id ORDER BY p.date ASC, p.created_at ASC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(proposals)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let votes = sqlx::query("DELETE FROM date_votes WHERE proposal_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM date_proposals WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        tx.commit().await?;

        info!(
            proposal_id = id,
            votes = votes.rows_affected(),
            "date proposal deleted"
        );
        Ok(())
    }
}
