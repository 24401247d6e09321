use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::AppError,
    extract::ApiJson,
    models::date_proposal::{DateProposal, DateVote, NewDateProposal},
    state::AppState,
};

use super::{non_empty, required};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/date_proposals/",
            get(list_proposals).post(create_proposal),
        )
        .route(
            "/date_proposals/:id/",
            get(get_proposal).delete(delete_proposal),
        )
        .route("/date_proposals/:id/vote/", post(vote))
        .route("/date_proposals/:id/unvote/", post(unvote))
        .route("/date_proposals/:id/votes/", get(list_votes))
}

#[derive(Debug, Default, Deserialize)]
struct ProposalListParams {
    trip: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VoteRequest {
    #[serde(default)]
    user_discord_id: Option<String>,
}

async fn list_proposals(
    State(state): State<AppState>,
    Query(params): Query<ProposalListParams>,
) -> Result<Json<Vec<DateProposal>>, AppError> {
    let trip = non_empty(params.trip);
    Ok(Json(state.proposals.list(trip.as_deref()).await?))
}

async fn create_proposal(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewDateProposal>,
) -> Result<(StatusCode, Json<DateProposal>), AppError> {
    let proposal = state.proposals.create(payload).await?;
    Ok((StatusCode::CREATED, Json(proposal)))
}

async fn get_proposal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DateProposal>, AppError> {
    Ok(Json(state.proposals.get(&id).await?))
}

async fn delete_proposal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.proposals.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<VoteRequest>,
) -> Result<(StatusCode, Json<DateVote>), AppError> {
    let user = required(body.user_discord_id, "user_discord_id")?;
    let vote = state.votes.vote(&id, &user).await?;
    Ok((StatusCode::CREATED, Json(vote)))
}

async fn unvote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<VoteRequest>,
) -> Result<Json<Value>, AppError> {
    let user = required(body.user_discord_id, "user_discord_id")?;
    state.votes.unvote(&id, &user).await?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn list_votes(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<DateVote>>, AppError> {
    Ok(Json(state.votes.list(&id).await?))
}
