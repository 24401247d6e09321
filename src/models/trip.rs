use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TripKind {
    #[default]
    Trip,
    Meetup,
}

impl TripKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripKind::Trip => "trip",
            TripKind::Meetup => "meetup",
        }
    }
}

impl fmt::Display for TripKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TripKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trip" => Ok(TripKind::Trip),
            "meetup" => Ok(TripKind::Meetup),
            other => Err(AppError::validation(format!("unknown trip type {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TripKind,
    pub user_discord_id: String,
    pub user_name: String,
    pub user_avatar: String,
    pub country: String,
    pub city: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub description: String,
    pub is_recruitment: bool,
    pub recruitment_details: String,
    pub min_participants: Option<u32>,
    pub max_participants: Option<u32>,
    pub participants: Vec<String>,
    pub is_hidden: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    pub fn validate(&self) -> Result<(), AppError> {
        require_text("user_discord_id", &self.user_discord_id)?;
        require_text("user_name", &self.user_name)?;
        require_text("country", &self.country)?;
        require_text("city", &self.city)?;

        if self.end_date < self.start_date {
            return Err(AppError::validation(
                "end_date must be on or after start_date",
            ));
        }

        if let (Some(min), Some(max)) = (self.min_participants, self.max_participants) {
            if max > 0 && max < min {
                return Err(AppError::validation(
                    "max_participants must be greater than or equal to min_participants",
                ));
            }
        }

        Ok(())
    }

    /// Effective cap on the participant set. Zero is stored as "no cap".
    pub fn capacity(&self) -> Option<u32> {
        self.max_participants.filter(|max| *max > 0)
    }

    pub fn is_participant(&self, user_discord_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_discord_id)
    }

    /// Adds `user_discord_id` at the end of the participant list.
    ///
    /// Returns `Ok(false)` when the user already participates, leaving the
    /// trip untouched. Fails with `CapacityExceeded` when the trip is full.
    pub fn add_participant(&mut self, user_discord_id: &str) -> Result<bool, AppError> {
        if self.is_participant(user_discord_id) {
            return Ok(false);
        }
        if let Some(max) = self.capacity() {
            if self.participants.len() >= max as usize {
                return Err(AppError::CapacityExceeded { max });
            }
        }
        self.participants.push(user_discord_id.to_string());
        Ok(true)
    }

    /// Removes `user_discord_id`, keeping the order of everyone else.
    /// Returns whether anything changed.
    pub fn remove_participant(&mut self, user_discord_id: &str) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| p != user_discord_id);
        self.participants.len() != before
    }
}

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTrip {
    #[serde(rename = "type", default)]
    pub kind: TripKind,
    pub user_discord_id: String,
    pub user_name: String,
    #[serde(default)]
    pub user_avatar: String,
    pub country: String,
    pub city: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_recruitment: bool,
    #[serde(default)]
    pub recruitment_details: String,
    #[serde(default)]
    pub min_participants: Option<u32>,
    #[serde(default)]
    pub max_participants: Option<u32>,
}

impl NewTrip {
    pub fn into_trip(self, now: DateTime<Utc>) -> Trip {
        Trip {
            id: Uuid::new_v4().to_string(),
            kind: self.kind,
            user_discord_id: self.user_discord_id,
            user_name: self.user_name,
            user_avatar: self.user_avatar,
            country: self.country,
            city: self.city,
            start_date: self.start_date,
            end_date: self.end_date,
            description: self.description,
            is_recruitment: self.is_recruitment,
            recruitment_details: self.recruitment_details,
            min_participants: self.min_participants,
            max_participants: self.max_participants,
            participants: Vec::new(),
            is_hidden: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a trip's details. Absent fields keep their stored value;
/// the capacity bounds can additionally be cleared with an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripPatch {
    #[serde(rename = "type")]
    pub kind: Option<TripKind>,
    pub user_name: Option<String>,
    pub user_avatar: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub is_recruitment: Option<bool>,
    pub recruitment_details: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub min_participants: Option<Option<u32>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub max_participants: Option<Option<u32>>,
    pub is_hidden: Option<bool>,
}

impl TripPatch {
    pub fn apply_to(&self, trip: &mut Trip) {
        if let Some(kind) = self.kind {
            trip.kind = kind;
        }
        if let Some(user_name) = &self.user_name {
            trip.user_name = user_name.clone();
        }
        if let Some(user_avatar) = &self.user_avatar {
            trip.user_avatar = user_avatar.clone();
        }
        if let Some(country) = &self.country {
            trip.country = country.clone();
        }
        if let Some(city) = &self.city {
            trip.city = city.clone();
        }
        if let Some(start_date) = self.start_date {
            trip.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            trip.end_date = end_date;
        }
        if let Some(description) = &self.description {
            trip.description = description.clone();
        }
        if let Some(is_recruitment) = self.is_recruitment {
            trip.is_recruitment = is_recruitment;
        }
        if let Some(details) = &self.recruitment_details {
            trip.recruitment_details = details.clone();
        }
        if let Some(min) = self.min_participants {
            trip.min_participants = min;
        }
        if let Some(max) = self.max_participants {
            trip.max_participants = max;
        }
        if let Some(is_hidden) = self.is_hidden {
            trip.is_hidden = is_hidden;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripSortField {
    StartDate,
    EndDate,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripOrdering {
    pub field: TripSortField,
    pub descending: bool,
}

impl Default for TripOrdering {
    fn default() -> Self {
        Self {
            field: TripSortField::StartDate,
            descending: true,
        }
    }
}

impl TripOrdering {
    /// Parses `start_date`, `-start_date`, `end_date`, `created_at`, ...
    pub fn parse(raw: &str) -> Option<Self> {
        let (descending, name) = match raw.trim().strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw.trim()),
        };
        let field = match name {
            "start_date" => TripSortField::StartDate,
            "end_date" => TripSortField::EndDate,
            "created_at" => TripSortField::CreatedAt,
            _ => return None,
        };
        Some(Self { field, descending })
    }

    pub fn to_sql(&self) -> &'static str {
        use TripSortField::*;
        match (self.field, self.descending) {
            (StartDate, true) => "start_date DESC, created_at DESC, rowid DESC",
            (StartDate, false) => "start_date ASC, created_at DESC, rowid DESC",
            (EndDate, true) => "end_date DESC, created_at DESC, rowid DESC",
            (EndDate, false) => "end_date ASC, created_at DESC, rowid DESC",
            (CreatedAt, true) => "created_at DESC, rowid DESC",
            (CreatedAt, false) => "created_at ASC, rowid ASC",
        }
    }
}

/// Conjunctive list filter; `None` fields do not constrain the result.
#[derive(Debug, Clone, Default)]
pub struct TripFilter {
    pub user_discord_id: Option<String>,
    pub kind: Option<TripKind>,
    pub is_recruitment: Option<bool>,
    pub is_hidden: Option<bool>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub start_date_gte: Option<NaiveDate>,
    pub start_date_lte: Option<NaiveDate>,
    pub search: Option<String>,
    pub ordering: TripOrdering,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn sample_trip() -> Trip {
        NewTrip {
            kind: TripKind::Trip,
            user_discord_id: "100000000000000001".into(),
            user_name: "Aki".into(),
            user_avatar: String::new(),
            country: "Japan".into(),
            city: "Kyoto".into(),
            start_date: date("2025-11-05"),
            end_date: date("2025-11-10"),
            description: String::new(),
            is_recruitment: true,
            recruitment_details: "two seats left".into(),
            min_participants: None,
            max_participants: Some(2),
        }
        .into_trip(Utc::now())
    }

    #[test]
    fn new_trip_starts_visible_and_empty() {
        let trip = sample_trip();
        assert!(trip.participants.is_empty());
        assert!(!trip.is_hidden);
        assert!(trip.validate().is_ok());
    }

    #[test]
    fn rejects_end_before_start() {
        let mut trip = sample_trip();
        trip.end_date = date("2025-11-04");
        assert!(matches!(trip.validate(), Err(AppError::Validation(_))));

        trip.end_date = trip.start_date;
        assert!(trip.validate().is_ok());
    }

    #[test]
    fn rejects_blank_required_fields() {
        let mut trip = sample_trip();
        trip.city = "   ".into();
        assert!(matches!(trip.validate(), Err(AppError::Validation(msg)) if msg.contains("city")));
    }

    #[test]
    fn rejects_max_below_min() {
        let mut trip = sample_trip();
        trip.min_participants = Some(3);
        trip.max_participants = Some(2);
        assert!(trip.validate().is_err());

        trip.max_participants = Some(0);
        assert!(trip.validate().is_ok());
    }

    #[test]
    fn join_is_idempotent() {
        let mut trip = sample_trip();
        assert!(trip.add_participant("u1").unwrap());
        assert!(!trip.add_participant("u1").unwrap());
        assert_eq!(trip.participants, vec!["u1"]);
    }

    #[test]
    fn join_respects_capacity() {
        let mut trip = sample_trip();
        trip.add_participant("u1").unwrap();
        trip.add_participant("u2").unwrap();
        let err = trip.add_participant("u3").unwrap_err();
        assert!(matches!(err, AppError::CapacityExceeded { max: 2 }));
        assert_eq!(trip.participants, vec!["u1", "u2"]);

        // a participant re-joining a full trip is still a no-op, not an error
        assert!(!trip.add_participant("u2").unwrap());
    }

    #[test]
    fn zero_capacity_means_unlimited() {
        let mut trip = sample_trip();
        trip.max_participants = Some(0);
        for i in 0..5 {
            trip.add_participant(&format!("u{i}")).unwrap();
        }
        assert_eq!(trip.participants.len(), 5);
    }

    #[test]
    fn leave_preserves_order_and_is_idempotent() {
        let mut trip = sample_trip();
        trip.max_participants = None;
        for user in ["a", "b", "c", "d"] {
            trip.add_participant(user).unwrap();
        }
        assert!(trip.remove_participant("b"));
        assert!(!trip.remove_participant("b"));
        assert_eq!(trip.participants, vec!["a", "c", "d"]);
    }

    #[test]
    fn patch_keeps_absent_fields_and_clears_null_bounds() {
        let mut trip = sample_trip();
        let patch: TripPatch = serde_json::from_value(serde_json::json!({
            "description": "onsen weekend",
            "max_participants": null
        }))
        .unwrap();
        patch.apply_to(&mut trip);
        assert_eq!(trip.description, "onsen weekend");
        assert_eq!(trip.city, "Kyoto");
        assert_eq!(trip.max_participants, None);

        let patch: TripPatch =
            serde_json::from_value(serde_json::json!({ "end_date": "2025-11-01" })).unwrap();
        assert_eq!(patch.max_participants, None);
        patch.apply_to(&mut trip);
        assert!(trip.validate().is_err());
    }

    #[test]
    fn serializes_kind_as_type() {
        let value = serde_json::to_value(sample_trip()).unwrap();
        assert_eq!(value["type"], "trip");
        assert_eq!(value["start_date"], "2025-11-05");
    }

    #[test]
    fn parses_ordering() {
        assert_eq!(
            TripOrdering::parse("-end_date"),
            Some(TripOrdering {
                field: TripSortField::EndDate,
                descending: true
            })
        );
        assert_eq!(
            TripOrdering::parse("created_at").map(|o| o.descending),
            Some(false)
        );
        assert_eq!(TripOrdering::parse("user_name"), None);
        assert_eq!(
            TripOrdering::default().to_sql(),
            "start_date DESC, created_at DESC, rowid DESC"
        );
    }
}
