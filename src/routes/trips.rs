use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    error::AppError,
    extract::{ApiJson, OptionalJson},
    models::trip::{NewTrip, Trip, TripFilter, TripKind, TripOrdering, TripPatch},
    state::AppState,
};

use super::{non_empty, parse_flag, required};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trips/", get(list_trips).post(create_trip))
        .route(
            "/trips/:id/",
            get(get_trip).patch(update_trip).delete(delete_trip),
        )
        .route("/trips/:id/join/", post(join_trip))
        .route("/trips/:id/leave/", post(leave_trip))
        .route("/trips/:id/toggle_recruitment/", post(toggle_recruitment))
        .route("/trips/:id/end_recruitment/", post(end_recruitment))
        .route("/trips/:id/toggle_hidden/", post(toggle_hidden))
}

/// Raw list query. Values that do not parse are ignored rather than rejected.
#[derive(Debug, Default, Deserialize)]
pub struct TripListParams {
    pub user_discord_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub is_recruitment: Option<String>,
    pub is_hidden: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub start_date_gte: Option<String>,
    pub start_date_lte: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

impl From<TripListParams> for TripFilter {
    fn from(params: TripListParams) -> Self {
        TripFilter {
            user_discord_id: non_empty(params.user_discord_id),
            kind: params.kind.and_then(|raw| raw.parse::<TripKind>().ok()),
            is_recruitment: parse_flag(params.is_recruitment.as_deref()),
            is_hidden: parse_flag(params.is_hidden.as_deref()),
            country: non_empty(params.country),
            city: non_empty(params.city),
            start_date_gte: params.start_date_gte.as_deref().and_then(parse_date),
            start_date_lte: params.start_date_lte.as_deref().and_then(parse_date),
            search: non_empty(params.search),
            ordering: params
                .ordering
                .as_deref()
                .and_then(TripOrdering::parse)
                .unwrap_or_default(),
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

#[derive(Debug, Deserialize)]
struct MembershipRequest {
    #[serde(default)]
    discord_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RecruitmentToggle {
    #[serde(default)]
    is_recruitment: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct HiddenToggle {
    #[serde(default)]
    is_hidden: Option<bool>,
}

async fn list_trips(
    State(state): State<AppState>,
    Query(params): Query<TripListParams>,
) -> Result<Json<Vec<Trip>>, AppError> {
    let filter = TripFilter::from(params);
    let trips = state.trips.list(&filter).await?;
    Ok(Json(trips))
}

async fn create_trip(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewTrip>,
) -> Result<(StatusCode, Json<Trip>), AppError> {
    let trip = state.trips.create(payload).await?;
    Ok((StatusCode::CREATED, Json(trip)))
}

async fn get_trip(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Trip>, AppError> {
    Ok(Json(state.trips.get(&id).await?))
}

async fn update_trip(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<TripPatch>,
) -> Result<Json<Trip>, AppError> {
    Ok(Json(state.trips.update(&id, &patch).await?))
}

async fn delete_trip(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.trips.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn join_trip(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<MembershipRequest>,
) -> Result<Json<Trip>, AppError> {
    let discord_id = required(body.discord_id, "discord_id")?;
    Ok(Json(state.trips.join(&id, &discord_id).await?))
}

async fn leave_trip(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<MembershipRequest>,
) -> Result<Json<Trip>, AppError> {
    let discord_id = required(body.discord_id, "discord_id")?;
    Ok(Json(state.trips.leave(&id, &discord_id).await?))
}

async fn toggle_recruitment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OptionalJson(body): OptionalJson<RecruitmentToggle>,
) -> Result<Json<Trip>, AppError> {
    let value = body.and_then(|toggle| toggle.is_recruitment);
    Ok(Json(state.trips.toggle_recruitment(&id, value).await?))
}

async fn end_recruitment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Trip>, AppError> {
    Ok(Json(state.trips.end_recruitment(&id).await?))
}

async fn toggle_hidden(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OptionalJson(body): OptionalJson<HiddenToggle>,
) -> Result<Json<Trip>, AppError> {
    let value = body.and_then(|toggle| toggle.is_hidden);
    Ok(Json(state.trips.toggle_hidden(&id, value).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_list_params() {
        let filter = TripFilter::from(TripListParams {
            kind: Some("cruise".into()),
            is_recruitment: Some("true".into()),
            country: Some(String::new()),
            start_date_gte: Some("not-a-date".into()),
            start_date_lte: Some("2025-12-31".into()),
            ordering: Some("-created_at".into()),
            ..Default::default()
        });
        assert_eq!(filter.kind, None);
        assert_eq!(filter.is_recruitment, Some(true));
        assert_eq!(filter.country, None);
        assert_eq!(filter.start_date_gte, None);
        assert_eq!(
            filter.start_date_lte,
            NaiveDate::from_ymd_opt(2025, 12, 31)
        );
        assert!(filter.ordering.descending);
    }
}
