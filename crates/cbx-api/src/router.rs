use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;

use crate::{auth, card, deck, error::ApiError, state::ApiState, training, user};

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
        .merge(auth::routes())
        .merge(user::routes())
        .merge(deck::routes())
        .merge(card::routes())
        .merge(training::routes())
        .fallback(handler_404)
}

/// Liveness: the process is up
async fn health() -> StatusCode {
    StatusCode::OK
}

/// Readiness: the database answers
async fn ready(State(state): State<ApiState>) -> Result<Json<serde_json::Value>, ApiError> {
    sqlx::query("SELECT 1")
        .execute(&state.pool)
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, "readiness check failed");
            ApiError::from(err)
        })?;

    Ok(Json(json!({ "status": "ready" })))
}

async fn handler_404() -> impl IntoResponse {
    ApiError::NotFound("The requested resource was not found".to_string())
}
