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
    models::notification::{
        NewNotification, Notification, NotificationCount, NotificationFilter,
    },
    state::AppState,
};

use super::{non_empty, required};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications/",
            get(list_notifications).post(create_notification),
        )
        .route("/notifications/count/", get(count_notifications))
        .route("/notifications/mark_all_read/", post(mark_all_read))
        .route(
            "/notifications/:id/",
            get(get_notification).delete(delete_notification),
        )
        .route("/notifications/:id/mark_read/", post(mark_read))
}

#[derive(Debug, Default, Deserialize)]
struct NotificationListParams {
    user_discord_id: Option<String>,
    unread_only: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct UserParams {
    user_discord_id: Option<String>,
}

async fn list_notifications(
    State(state): State<AppState>,
    Query(params): Query<NotificationListParams>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let filter = NotificationFilter {
        user_discord_id: non_empty(params.user_discord_id),
        unread_only: matches!(params.unread_only.as_deref(), Some("true" | "1")),
    };
    Ok(Json(state.notifications.list(&filter).await?))
}

async fn create_notification(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewNotification>,
) -> Result<(StatusCode, Json<Notification>), AppError> {
    let notification = state.notifications.create(payload).await?;
    Ok((StatusCode::CREATED, Json(notification)))
}

async fn count_notifications(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
) -> Result<Json<NotificationCount>, AppError> {
    let user = required(params.user_discord_id, "user_discord_id")?;
    Ok(Json(state.notifications.count(&user).await?))
}

async fn mark_all_read(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<UserParams>,
) -> Result<Json<Value>, AppError> {
    let user = required(body.user_discord_id, "user_discord_id")?;
    state.notifications.mark_all_read(&user).await?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn get_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Notification>, AppError> {
    Ok(Json(state.notifications.get(&id).await?))
}

async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Notification>, AppError> {
    Ok(Json(state.notifications.mark_read(&id).await?))
}

async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.notifications.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
