use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cbx_db::StoreError;
use serde_json::json;
use thiserror::Error;

use crate::training::TrainingError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(sqlx::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::from(err).into()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(constraint) => Self::Conflict(conflict_message(&constraint)),
            StoreError::NotFound(_) => Self::NotFound("Referenced resource not found".to_string()),
            StoreError::Database(err) => Self::Database(err),
        }
    }
}

impl From<TrainingError> for ApiError {
    fn from(err: TrainingError) -> Self {
        match err {
            TrainingError::Validation(msg) => Self::Validation(msg),
            TrainingError::Conflict(msg) => Self::Conflict(msg),
            TrainingError::NotFound(msg) => Self::NotFound(msg),
            TrainingError::Store(err) => err.into(),
        }
    }
}

impl From<cbx_srs::SrsError> for ApiError {
    fn from(err: cbx_srs::SrsError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        Self::Internal(format!("password hashing failed: {err}"))
    }
}

/// Client-facing message for a violated uniqueness constraint
fn conflict_message(constraint: &str) -> String {
    match constraint {
        "users_username_key" => "Username is already taken",
        "users_email_key" => "Email is already registered",
        "user_follows_pkey" => "Already following this user",
        "deck_follows_pkey" => "Already following this deck",
        "deck_trainings_deck_user_key" => "Training already exists for this deck",
        "card_trainings_deck_training_card_key" => "Card is already enrolled in this training",
        _ => "Resource already exists",
    }
    .to_string()
}
