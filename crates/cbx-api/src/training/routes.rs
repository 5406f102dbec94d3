use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use cbx_db::{
    models::{CardTraining, DeckTraining, DeckTrainingOverview, NewDeckTraining},
    repositories::{card, card_training, deck_training},
};
use cbx_srs::validate_box_amount;
use chrono::Utc;
use uuid::Uuid;

use super::model::{
    CardTrainingView, CreateTrainingRequest, CreatedTraining, StudyRequest, StudyResponse,
    UpdateTrainingRequest, VisibilityRequest,
};
use crate::{
    ApiState,
    auth::AuthUser,
    deck::load_visible,
    error::ApiError,
    extract::ApiJson,
    metrics::{record_enrollment, record_study_submission},
    middleware::rate_limit,
};

pub fn routes() -> Router<ApiState> {
    use crate::make_rate_limit_layer;

    Router::new()
        .route("/decks/{deck_id}/training", post(create_training))
        .route("/trainings", get(list_trainings))
        .route(
            "/trainings/{training_id}",
            get(get_training)
                .patch(update_training)
                .delete(delete_training),
        )
        .route("/trainings/{training_id}/reset", post(reset_training))
        .route("/trainings/{training_id}/study", post(study))
        .route("/trainings/{training_id}/cards", get(list_cards))
        .route("/trainings/{training_id}/cards/due", get(list_due_cards))
        .route(
            "/trainings/{training_id}/cards/{card_id}",
            patch(set_card_visibility),
        )
        .layer(make_rate_limit_layer!(
            rate_limit::GENERAL_REPLENISH_MS,
            rate_limit::GENERAL_BURST_SIZE
        ))
}

fn training_not_found() -> ApiError {
    ApiError::NotFound("Training not found".to_string())
}

/// The caller's training, or a 404 for missing and foreign ones alike
async fn load_own_training(
    state: &ApiState,
    training_id: Uuid,
    auth_user: &AuthUser,
) -> Result<DeckTraining, ApiError> {
    deck_training::find_for_user(&state.pool, training_id, auth_user.user_id)
        .await?
        .ok_or_else(training_not_found)
}

/// Start training a published deck and enroll all of its cards
///
/// Cards are loaded before the training row exists. If enrolling fails the new
/// training is deleted again so a retry does not run into the one-training-per-deck
/// constraint.
async fn create_training(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(deck_id): Path<Uuid>,
    ApiJson(payload): ApiJson<CreateTrainingRequest>,
) -> Result<(StatusCode, Json<CreatedTraining>), ApiError> {
    let deck = load_visible(&state.pool, deck_id, &auth_user).await?;
    if !deck.is_published {
        return Err(ApiError::Validation(
            "Only published decks can be trained".to_string(),
        ));
    }

    let box_amount = validate_box_amount(payload.box_amount.unwrap_or(state.default_box_amount))?;
    let now = Utc::now();

    let card_ids: Vec<Uuid> = card::list_by_deck(&state.pool, deck_id)
        .await?
        .into_iter()
        .map(|card| card.id)
        .collect();

    let training = deck_training::create(
        &state.pool,
        &NewDeckTraining {
            user_id: auth_user.user_id,
            deck_id,
            start_date: now,
            box_amount,
            backtrack: payload.backtrack.unwrap_or_default(),
        },
    )
    .await?;

    let enrolled = match state
        .trainings
        .enroll(training.id, &card_ids, &payload.visibility, now)
        .await
    {
        Ok(enrolled) => enrolled,
        Err(err) => {
            tracing::warn!(
                deck_training_id = %training.id,
                error = %err,
                "enrollment failed, removing training"
            );
            deck_training::delete_for_user(&state.pool, training.id, auth_user.user_id).await?;
            return Err(err.into());
        }
    };

    record_enrollment(enrolled.len());
    tracing::info!(
        deck_training_id = %training.id,
        %deck_id,
        user_id = %auth_user.user_id,
        card_count = enrolled.len(),
        "training created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreatedTraining {
            training,
            enrolled: enrolled.len(),
        }),
    ))
}

async fn list_trainings(
    auth_user: AuthUser,
    State(state): State<ApiState>,
) -> Result<Json<Vec<DeckTrainingOverview>>, ApiError> {
    let due_before = state.trainings.end_of_today(Utc::now());
    let trainings =
        deck_training::list_overview_for_user(&state.pool, auth_user.user_id, due_before).await?;

    Ok(Json(trainings))
}

async fn get_training(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(training_id): Path<Uuid>,
) -> Result<Json<DeckTraining>, ApiError> {
    load_own_training(&state, training_id, &auth_user)
        .await
        .map(Json)
}

/// Change box amount or backtrack policy
///
/// Lowering the box amount pulls every card above the new maximum down to it, in the
/// same transaction as the settings change.
async fn update_training(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(training_id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateTrainingRequest>,
) -> Result<Json<DeckTraining>, ApiError> {
    let current = load_own_training(&state, training_id, &auth_user).await?;

    let box_amount = payload
        .box_amount
        .map(validate_box_amount)
        .transpose()?
        .unwrap_or(current.box_amount);
    let backtrack = payload.backtrack.unwrap_or(current.backtrack);

    let mut tx = state.pool.begin().await?;

    let updated = deck_training::update_settings(&mut *tx, training_id, box_amount, backtrack)
        .await?
        .ok_or_else(training_not_found)?;

    if box_amount < current.box_amount {
        let clamped = card_training::clamp_boxes(&mut *tx, training_id, box_amount).await?;
        tracing::debug!(deck_training_id = %training_id, clamped, "card boxes clamped");
    }

    tx.commit().await?;

    Ok(Json(updated))
}

/// Restart the training clock; card boxes and schedules are kept
async fn reset_training(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(training_id): Path<Uuid>,
) -> Result<Json<DeckTraining>, ApiError> {
    load_own_training(&state, training_id, &auth_user).await?;

    let updated = deck_training::reset_start_date(&state.pool, training_id, Utc::now())
        .await?
        .ok_or_else(training_not_found)?;

    Ok(Json(updated))
}

async fn delete_training(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(training_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !deck_training::delete_for_user(&state.pool, training_id, auth_user.user_id).await? {
        return Err(training_not_found());
    }

    tracing::info!(
        deck_training_id = %training_id,
        user_id = %auth_user.user_id,
        "training deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Apply one study session: move the studied cards, then update the statistics
async fn study(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(training_id): Path<Uuid>,
    ApiJson(payload): ApiJson<StudyRequest>,
) -> Result<Json<StudyResponse>, ApiError> {
    load_own_training(&state, training_id, &auth_user).await?;

    let completion_time = match payload.completion_time_seconds {
        Some(seconds) if seconds < 0 => {
            return Err(ApiError::Validation(
                "completion_time_seconds must not be negative".to_string(),
            ));
        }
        Some(seconds) => Some(seconds),
        None if !payload.cards.is_empty() => {
            return Err(ApiError::Validation(
                "completion_time_seconds is required when cards are submitted".to_string(),
            ));
        }
        None => None,
    };

    let now = Utc::now();
    let report = state
        .trainings
        .submit_study_results(training_id, &payload.cards, now)
        .await?;

    record_study_submission(report.updated.len(), report.backtracked);

    let training = match completion_time {
        Some(seconds) => state.trainings.record_session(training_id, seconds).await?,
        None => load_own_training(&state, training_id, &auth_user).await?,
    };

    tracing::info!(
        deck_training_id = %training_id,
        card_count = report.updated.len(),
        backtracked = report.backtracked,
        "study session recorded"
    );

    Ok(Json(StudyResponse {
        training,
        updated: report.updated,
        backtracked: report.backtracked,
    }))
}

async fn list_due_cards(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(training_id): Path<Uuid>,
) -> Result<Json<Vec<CardTrainingView>>, ApiError> {
    load_own_training(&state, training_id, &auth_user).await?;

    let due = state.trainings.list_due_today(training_id, Utc::now()).await?;
    with_cards(&state, due).await.map(Json)
}

async fn list_cards(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(training_id): Path<Uuid>,
) -> Result<Json<Vec<CardTrainingView>>, ApiError> {
    load_own_training(&state, training_id, &auth_user).await?;

    let all = state.trainings.list_all(training_id).await?;
    with_cards(&state, all).await.map(Json)
}

async fn with_cards(
    state: &ApiState,
    trainings: Vec<CardTraining>,
) -> Result<Vec<CardTrainingView>, ApiError> {
    let card_ids: Vec<Uuid> = trainings.iter().map(|training| training.card_id).collect();
    let cards = card::find_many(&state.pool, &card_ids).await?;

    Ok(CardTrainingView::join(trainings, cards))
}

async fn set_card_visibility(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path((training_id, card_id)): Path<(Uuid, Uuid)>,
    ApiJson(payload): ApiJson<VisibilityRequest>,
) -> Result<Json<CardTraining>, ApiError> {
    load_own_training(&state, training_id, &auth_user).await?;

    let updated = state
        .trainings
        .set_visibility(training_id, card_id, payload.is_shown)
        .await?;

    Ok(Json(updated))
}
