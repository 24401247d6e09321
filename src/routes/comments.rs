use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    extract::ApiJson,
    models::comment::{Comment, CommentFilter, CommentPatch, NewComment},
    state::AppState,
};

use super::non_empty;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments/", get(list_comments).post(create_comment))
        .route(
            "/comments/:id/",
            get(get_comment).patch(update_comment).delete(delete_comment),
        )
}

#[derive(Debug, Default, Deserialize)]
struct CommentListParams {
    trip: Option<String>,
    search: Option<String>,
}

async fn list_comments(
    State(state): State<AppState>,
    Query(params): Query<CommentListParams>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let filter = CommentFilter {
        trip_id: non_empty(params.trip),
        search: non_empty(params.search),
    };
    Ok(Json(state.comments.list(&filter).await?))
}

async fn create_comment(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewComment>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let comment = state.comments.create(payload).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn get_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Comment>, AppError> {
    Ok(Json(state.comments.get(&id).await?))
}

async fn update_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<CommentPatch>,
) -> Result<Json<Comment>, AppError> {
    Ok(Json(state.comments.update(&id, &patch).await?))
}

async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.comments.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
