pub mod comments;
pub mod date_proposals;
pub mod notifications;
pub mod trips;

use axum::{extract::State, http::HeaderValue, routing::get, Router};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::{config::AppConfig, error::AppError, state::AppState};

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(trips::router())
        .merge(date_proposals::router())
        .merge(comments::router())
        .merge(notifications::router());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<&'static str, AppError> {
    sqlx::query("SELECT 1").execute(&state.db).await?;
    Ok("ok")
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("ignoring invalid CORS origin {origin:?}: {err}");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Rejects a missing or blank identity field in a request body.
pub(crate) fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation(format!("{field} is required")))
}

/// Query-string values: blank means "not given".
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Accepts exactly `true`/`false`; anything else leaves the filter off.
pub(crate) fn parse_flag(value: Option<&str>) -> Option<bool> {
    match value {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_blank_values() {
        assert!(required(None, "discord_id").is_err());
        assert!(required(Some("  ".into()), "discord_id").is_err());
        assert_eq!(required(Some(" 42 ".into()), "discord_id").unwrap(), "42");
    }

    #[test]
    fn flags_only_accept_true_and_false() {
        assert_eq!(parse_flag(Some("true")), Some(true));
        assert_eq!(parse_flag(Some("false")), Some(false));
        assert_eq!(parse_flag(Some("1")), None);
        assert_eq!(parse_flag(None), None);
    }
}
