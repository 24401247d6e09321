use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use tracing::{debug, info};

use crate::{
    db::DbPool,
    error::AppError,
    models::trip::{NewTrip, Trip, TripFilter, TripKind, TripPatch},
};

use super::{fold_search, matches_search};

const TRIP_COLUMNS: &str = "id, kind, user_discord_id, user_name, user_avatar, country, city, \
     start_date, end_date, description, is_recruitment, recruitment_details, \
     min_participants, max_participants, participants, is_hidden, revision, \
     created_at, updated_at";

#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn create(&self, new_trip: NewTrip) -> Result<Trip, AppError>;
    async fn get(&self, id: &str) -> Result<Trip, AppError>;
    async fn list(&self, filter: &TripFilter) -> Result<Vec<Trip>, AppError>;
    async fn update(&self, id: &str, patch: &TripPatch) -> Result<Trip, AppError>;
    /// Removes the trip together with its proposals, votes, comments and
    /// trip-scoped notifications.
    async fn delete(&self, id: &str) -> Result<(), AppError>;
    /// Ensures `user_discord_id` is a participant.
    async fn join(&self, id: &str, user_discord_id: &str) -> Result<Trip, AppError>;
    /// Ensures `user_discord_id` is not a participant.
    async fn leave(&self, id: &str, user_discord_id: &str) -> Result<Trip, AppError>;
    /// Sets `is_recruitment` to `value`, or flips it when `None`.
    async fn toggle_recruitment(&self, id: &str, value: Option<bool>) -> Result<Trip, AppError>;
    /// Closes recruitment and wipes its details.
    async fn end_recruitment(&self, id: &str) -> Result<Trip, AppError>;
    /// Sets `is_hidden` to `value`, or flips it when `None`.
    async fn toggle_hidden(&self, id: &str, value: Option<bool>) -> Result<Trip, AppError>;
}

#[derive(Debug, FromRow)]
struct TripRow {
    id: String,
    kind: TripKind,
    user_discord_id: String,
    user_name: String,
    user_avatar: String,
    country: String,
    city: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    description: String,
    is_recruitment: bool,
    recruitment_details: String,
    min_participants: Option<u32>,
    max_participants: Option<u32>,
    participants: String,
    is_hidden: bool,
    revision: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TripRow> for Trip {
    type Error = AppError;

    fn try_from(row: TripRow) -> Result<Self, Self::Error> {
        let participants: Vec<String> =
            serde_json::from_str(&row.participants).map_err(|err| AppError::Other(err.into()))?;
        Ok(Trip {
            id: row.id,
            kind: row.kind,
            user_discord_id: row.user_discord_id,
            user_name: row.user_name,
            user_avatar: row.user_avatar,
            country: row.country,
            city: row.city,
            start_date: row.start_date,
            end_date: row.end_date,
            description: row.description,
            is_recruitment: row.is_recruitment,
            recruitment_details: row.recruitment_details,
            min_participants: row.min_participants,
            max_participants: row.max_participants,
            participants,
            is_hidden: row.is_hidden,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn encode_participants(participants: &[String]) -> Result<String, AppError> {
    serde_json::to_string(participants).map_err(|err| AppError::Other(err.into()))
}

#[derive(Clone)]
pub struct SqliteTripRepository {
    pool: DbPool,
}

impl SqliteTripRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_row(&self, id: &str) -> Result<TripRow, AppError> {
        sqlx::query_as::<_, TripRow>(&format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Read-modify-write of the participant list guarded by the row revision.
    /// `change` returns whether it mutated the trip; when it did not, nothing
    /// is written. A lost race means another writer committed, so the loop
    /// always terminates.
    async fn swap_participants<F>(
        &self,
        id: &str,
        action: &'static str,
        change: F,
    ) -> Result<Trip, AppError>
    where
        F: Fn(&mut Trip) -> Result<bool, AppError> + Send + Sync,
    {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            let row = self.fetch_row(id).await?;
            let revision = row.revision;
            let mut trip = Trip::try_from(row)?;

            if !change(&mut trip)? {
                debug!(trip_id = id, action, "participants already in requested state");
                return Ok(trip);
            }

            trip.updated_at = Utc::now();
            let participants = encode_participants(&trip.participants)?;
            let result = sqlx::query(
                "UPDATE trips SET participants = ?1, updated_at = ?2, revision = revision + 1 \
                 WHERE id = ?3 AND revision = ?4",
            )
            .bind(participants)
            .bind(trip.updated_at)
            .bind(id)
            .bind(revision)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 1 {
                info!(
                    trip_id = id,
                    action,
                    attempt,
                    participants = trip.participants.len(),
                    "participants updated"
                );
                return Ok(trip);
            }
            debug!(trip_id = id, action, attempt, "trip changed concurrently, retrying");
        }
    }

    async fn set_flag(
        &self,
        id: &str,
        column: &'static str,
        value: Option<bool>,
    ) -> Result<Trip, AppError> {
        let sql = format!(
            "UPDATE trips SET {column} = COALESCE(?1, NOT {column}), updated_at = ?2, \
             revision = revision + 1 WHERE id = ?3 RETURNING {TRIP_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TripRow>(&sql)
            .bind(value)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)?;
        let trip = Trip::try_from(row)?;
        debug!(trip_id = id, column, "flag updated");
        Ok(trip)
    }
}

#[async_trait]
impl TripRepository for SqliteTripRepository {
    async fn create(&self, new_trip: NewTrip) -> Result<Trip, AppError> {
        let trip = new_trip.into_trip(Utc::now());
        trip.validate()?;

        sqlx::query(&format!(
            "INSERT INTO trips ({TRIP_COLUMNS}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, 0, ?17, ?18)"
        ))
        .bind(&trip.id)
        .bind(trip.kind)
        .bind(&trip.user_discord_id)
        .bind(&trip.user_name)
        .bind(&trip.user_avatar)
        .bind(&trip.country)
        .bind(&trip.city)
        .bind(trip.start_date)
        .bind(trip.end_date)
        .bind(&trip.description)
        .bind(trip.is_recruitment)
        .bind(&trip.recruitment_details)
        .bind(trip.min_participants)
        .bind(trip.max_participants)
        .bind(encode_participants(&trip.participants)?)
        .bind(trip.is_hidden)
        .bind(trip.created_at)
        .bind(trip.updated_at)
        .execute(&self.pool)
        .await?;

        info!(trip_id = %trip.id, owner = %trip.user_discord_id, kind = %trip.kind, "trip created");
        Ok(trip)
    }

    async fn get(&self, id: &str) -> Result<Trip, AppError> {
        Trip::try_from(self.fetch_row(id).await?)
    }

    async fn list(&self, filter: &TripFilter) -> Result<Vec<Trip>, AppError> {
        let mut query =
            QueryBuilder::<Sqlite>::new(format!("SELECT {TRIP_COLUMNS} FROM trips WHERE 1 = 1"));

        if let Some(owner) = &filter.user_discord_id {
            query.push(" AND user_discord_id = ").push_bind(owner.clone());
        }
        if let Some(kind) = filter.kind {
            query.push(" AND kind = ").push_bind(kind);
        }
        if let Some(is_recruitment) = filter.is_recruitment {
            query.push(" AND is_recruitment = ").push_bind(is_recruitment);
        }
        if let Some(is_hidden) = filter.is_hidden {
            query.push(" AND is_hidden = ").push_bind(is_hidden);
        }
        if let Some(country) = &filter.country {
            query.push(" AND country = ").push_bind(country.clone());
        }
        if let Some(city) = &filter.city {
            query.push(" AND city = ").push_bind(city.clone());
        }
        if let Some(from) = filter.start_date_gte {
            query.push(" AND start_date >= ").push_bind(from);
        }
        if let Some(until) = filter.start_date_lte {
            query.push(" AND start_date <= ").push_bind(until);
        }
        query.push(" ORDER BY ").push(filter.ordering.to_sql());

        let rows = query
            .build_query_as::<TripRow>()
            .fetch_all(&self.pool)
            .await?;
        let trips = rows
            .into_iter()
            .map(Trip::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        // SQLite's LOWER() only folds ASCII, so text search runs here.
        let Some(term) = fold_search(filter.search.as_deref()) else {
            return Ok(trips);
        };
        Ok(trips
            .into_iter()
            .filter(|trip| {
                matches_search(
                    &term,
                    [
                        trip.user_name.as_str(),
                        trip.country.as_str(),
                        trip.city.as_str(),
                        trip.description.as_str(),
                        trip.recruitment_details.as_str(),
                    ],
                )
            })
            .collect())
    }

    async fn update(&self, id: &str, patch: &TripPatch) -> Result<Trip, AppError> {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            let row = self.fetch_row(id).await?;
            let revision = row.revision;
            let mut trip = Trip::try_from(row)?;

            patch.apply_to(&mut trip);
            trip.validate()?;
            trip.updated_at = Utc::now();

            let result = sqlx::query(
                "UPDATE trips SET kind = ?1, user_name = ?2, user_avatar = ?3, country = ?4, \
                 city = ?5, start_date = ?6, end_date = ?7, description = ?8, \
                 is_recruitment = ?9, recruitment_details = ?10, min_participants = ?11, \
                 max_participants = ?12, is_hidden = ?13, updated_at = ?14, \
                 revision = revision + 1 \
                 WHERE id = ?15 AND revision = ?16",
            )
            .bind(trip.kind)
            .bind(&trip.user_name)
            .bind(&trip.user_avatar)
            .bind(&trip.country)
            .bind(&trip.city)
            .bind(trip.start_date)
            .bind(trip.end_date)
            .bind(&trip.description)
            .bind(trip.is_recruitment)
            .bind(&trip.recruitment_details)
            .bind(trip.min_participants)
            .bind(trip.max_participants)
            .bind(trip.is_hidden)
            .bind(trip.updated_at)
            .bind(id)
            .bind(revision)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 1 {
                info!(trip_id = id, attempt, "trip updated");
                return Ok(trip);
            }
            debug!(trip_id = id, attempt, "trip changed concurrently, retrying update");
        }
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM date_votes WHERE proposal_id IN \
             (SELECT id FROM date_proposals WHERE trip_id = ?1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM date_proposals WHERE trip_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM comments WHERE trip_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM notifications WHERE trip_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM trips WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        tx.commit().await?;

        info!(trip_id = id, "trip deleted");
        Ok(())
    }

    async fn join(&self, id: &str, user_discord_id: &str) -> Result<Trip, AppError> {
        self.swap_participants(id, "join", |trip| {
            trip.add_participant(user_discord_id)
        })
        .await
    }

    async fn leave(&self, id: &str, user_discord_id: &str) -> Result<Trip, AppError> {
        self.swap_participants(id, "leave", |trip| {
            Ok(trip.remove_participant(user_discord_id))
        })
        .await
    }

    async fn toggle_recruitment(&self, id: &str, value: Option<bool>) -> Result<Trip, AppError> {
        self.set_flag(id, "is_recruitment", value).await
    }

    async fn end_recruitment(&self, id: &str) -> Result<Trip, AppError> {
        let row = sqlx::query_as::<_, TripRow>(&format!(
            "UPDATE trips SET is_recruitment = 0, recruitment_details = '', updated_at = ?1, \
             revision = revision + 1 WHERE id = ?2 RETURNING {TRIP_COLUMNS}"
        ))
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound)?;

        info!(trip_id = id, "recruitment ended");
        Trip::try_from(row)
    }

    async fn toggle_hidden(&self, id: &str, value: Option<bool>) -> Result<Trip, AppError> {
        self.set_flag(id, "is_hidden", value).await
    }
}
