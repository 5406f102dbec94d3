use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
};
use cbx_db::{
    models::Card,
    repositories::{card, deck_training},
};
use chrono::Utc;
use futures::future::join_all;
use uuid::Uuid;

use super::model::{CreateCardRequest, UpdateCardRequest};
use crate::{
    ApiState,
    auth::AuthUser,
    deck::{load_owned, load_visible},
    error::ApiError,
    extract::ApiJson,
    middleware::rate_limit,
    validation::validate_card_text,
};

pub fn routes() -> Router<ApiState> {
    use crate::make_rate_limit_layer;

    Router::new()
        .route("/decks/{deck_id}/cards", get(list_cards).post(create_card))
        .route(
            "/decks/{deck_id}/cards/{card_id}",
            patch(update_card).delete(delete_card),
        )
        .layer(make_rate_limit_layer!(
            rate_limit::GENERAL_REPLENISH_MS,
            rate_limit::GENERAL_BURST_SIZE
        ))
}

async fn list_cards(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(deck_id): Path<Uuid>,
) -> Result<Json<Vec<Card>>, ApiError> {
    load_visible(&state.pool, deck_id, &auth_user).await?;

    let cards = card::list_by_deck(&state.pool, deck_id).await?;
    Ok(Json(cards))
}

/// Add a card and enroll it in every existing training of the deck
async fn create_card(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(deck_id): Path<Uuid>,
    ApiJson(payload): ApiJson<CreateCardRequest>,
) -> Result<(StatusCode, Json<Card>), ApiError> {
    load_owned(&state.pool, deck_id, &auth_user).await?;

    let question = validate_card_text("question", &payload.question)?;
    let answer = validate_card_text("answer", &payload.answer)?;

    let created = card::create(&state.pool, deck_id, question, answer).await?;

    let training_ids = deck_training::list_ids_by_deck(&state.pool, deck_id).await?;
    let card_ids = [created.id];
    let shown = HashMap::new();
    let now = Utc::now();

    let enrollments = training_ids
        .iter()
        .map(|&deck_training_id| state.trainings.enroll(deck_training_id, &card_ids, &shown, now));
    join_all(enrollments)
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!(
        %deck_id,
        card_id = %created.id,
        training_count = training_ids.len(),
        "card created"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_card(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path((deck_id, card_id)): Path<(Uuid, Uuid)>,
    ApiJson(payload): ApiJson<UpdateCardRequest>,
) -> Result<Json<Card>, ApiError> {
    load_owned(&state.pool, deck_id, &auth_user).await?;

    let question = payload
        .question
        .as_deref()
        .map(|text| validate_card_text("question", text))
        .transpose()?;
    let answer = payload
        .answer
        .as_deref()
        .map(|text| validate_card_text("answer", text))
        .transpose()?;

    let updated = card::update(&state.pool, deck_id, card_id, question, answer)
        .await?
        .ok_or_else(|| ApiError::NotFound("Card not found".to_string()))?;

    Ok(Json(updated))
}

/// Unenroll a card from every training of its deck, then delete it
async fn delete_card(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path((deck_id, card_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    load_owned(&state.pool, deck_id, &auth_user).await?;

    card::find_in_deck(&state.pool, deck_id, card_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Card not found".to_string()))?;

    let training_ids = deck_training::list_ids_by_deck(&state.pool, deck_id).await?;
    let card_ids = [card_id];

    let removals = training_ids
        .iter()
        .map(|&deck_training_id| state.trainings.unenroll(deck_training_id, &card_ids));
    let unenrolled: usize = join_all(removals)
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .sum();

    if !card::delete(&state.pool, deck_id, card_id).await? {
        return Err(ApiError::NotFound("Card not found".to_string()));
    }

    tracing::info!(%deck_id, %card_id, unenrolled, "card deleted");
    Ok(StatusCode::NO_CONTENT)
}
