use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use cbx_db::{
    models::{Deck, DeckRating, DeckSummary},
    repositories::{card, deck, follow, rating},
};
use uuid::Uuid;

use super::{
    load_owned, load_visible,
    model::{CreateDeckRequest, DeckDetail, DeckListQuery, RatingRequest, UpdateDeckRequest},
};
use crate::{
    ApiState,
    auth::AuthUser,
    error::ApiError,
    extract::ApiJson,
    middleware::rate_limit,
    validation::{page_from_query, validate_deck_title, validate_description, validate_rating},
};

pub fn routes() -> Router<ApiState> {
    use crate::make_rate_limit_layer;

    Router::new()
        .route("/decks", get(list_published_decks).post(create_deck))
        .route("/decks/mine", get(list_my_decks))
        .route(
            "/decks/{deck_id}",
            get(get_deck).patch(update_deck).delete(delete_deck),
        )
        .route("/decks/{deck_id}/publish", post(publish_deck))
        .route("/decks/{deck_id}/unpublish", post(unpublish_deck))
        .route("/decks/{deck_id}/rating", put(rate_deck).delete(remove_rating))
        .route(
            "/decks/{deck_id}/follow",
            post(follow_deck).delete(unfollow_deck),
        )
        .route("/users/me/followed-decks", get(list_followed_decks))
        .layer(make_rate_limit_layer!(
            rate_limit::GENERAL_REPLENISH_MS,
            rate_limit::GENERAL_BURST_SIZE
        ))
}

async fn create_deck(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    ApiJson(payload): ApiJson<CreateDeckRequest>,
) -> Result<(StatusCode, Json<Deck>), ApiError> {
    let title = validate_deck_title(&payload.title)?;
    let description = payload
        .description
        .as_deref()
        .map(validate_description)
        .transpose()?
        .filter(|description| !description.is_empty());

    let created = deck::create(&state.pool, auth_user.user_id, title, description).await?;

    tracing::info!(deck_id = %created.id, user_id = %auth_user.user_id, "deck created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_published_decks(
    _auth_user: AuthUser,
    State(state): State<ApiState>,
    Query(query): Query<DeckListQuery>,
) -> Result<Json<Vec<DeckSummary>>, ApiError> {
    let page = page_from_query(query.limit, query.offset)?;
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|search| !search.is_empty());

    let decks = deck::list_published(&state.pool, search, page).await?;
    Ok(Json(decks))
}

async fn list_my_decks(
    auth_user: AuthUser,
    State(state): State<ApiState>,
) -> Result<Json<Vec<DeckSummary>>, ApiError> {
    let decks = deck::list_by_owner(&state.pool, auth_user.user_id).await?;
    Ok(Json(decks))
}

async fn get_deck(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(deck_id): Path<Uuid>,
) -> Result<Json<DeckDetail>, ApiError> {
    load_visible(&state.pool, deck_id, &auth_user).await?;

    let summary = deck::find_summary(&state.pool, deck_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Deck not found".to_string()))?;
    let cards = card::list_by_deck(&state.pool, deck_id).await?;

    Ok(Json(DeckDetail {
        deck: summary,
        cards,
    }))
}

async fn update_deck(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(deck_id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateDeckRequest>,
) -> Result<Json<Deck>, ApiError> {
    load_owned(&state.pool, deck_id, &auth_user).await?;

    let title = payload
        .title
        .as_deref()
        .map(validate_deck_title)
        .transpose()?;
    let description = payload
        .description
        .as_deref()
        .map(validate_description)
        .transpose()?;

    let updated = deck::update(&state.pool, deck_id, title, description)
        .await?
        .ok_or_else(|| ApiError::NotFound("Deck not found".to_string()))?;

    Ok(Json(updated))
}

async fn delete_deck(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(deck_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let target = load_visible(&state.pool, deck_id, &auth_user).await?;
    if target.owner_id != auth_user.user_id && !auth_user.is_admin() {
        return Err(ApiError::Forbidden(
            "Only the deck owner or an admin can delete a deck".to_string(),
        ));
    }

    if !deck::delete(&state.pool, deck_id).await? {
        return Err(ApiError::NotFound("Deck not found".to_string()));
    }

    tracing::info!(%deck_id, user_id = %auth_user.user_id, "deck deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn publish_deck(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(deck_id): Path<Uuid>,
) -> Result<Json<Deck>, ApiError> {
    load_owned(&state.pool, deck_id, &auth_user).await?;

    if card::count_by_deck(&state.pool, deck_id).await? == 0 {
        return Err(ApiError::Validation(
            "Cannot publish a deck without cards".to_string(),
        ));
    }

    set_published(&state, deck_id, true).await
}

async fn unpublish_deck(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(deck_id): Path<Uuid>,
) -> Result<Json<Deck>, ApiError> {
    load_owned(&state.pool, deck_id, &auth_user).await?;
    set_published(&state, deck_id, false).await
}

async fn set_published(
    state: &ApiState,
    deck_id: Uuid,
    published: bool,
) -> Result<Json<Deck>, ApiError> {
    let updated = deck::set_published(&state.pool, deck_id, published)
        .await?
        .ok_or_else(|| ApiError::NotFound("Deck not found".to_string()))?;

    tracing::info!(%deck_id, published, "deck visibility changed");
    Ok(Json(updated))
}

async fn rate_deck(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(deck_id): Path<Uuid>,
    ApiJson(payload): ApiJson<RatingRequest>,
) -> Result<Json<DeckRating>, ApiError> {
    let value = validate_rating(payload.value)?;
    let target = load_visible(&state.pool, deck_id, &auth_user).await?;

    if !target.is_published {
        return Err(ApiError::Validation(
            "Only published decks can be rated".to_string(),
        ));
    }
    if target.owner_id == auth_user.user_id {
        return Err(ApiError::Validation(
            "You cannot rate your own deck".to_string(),
        ));
    }

    let saved = rating::upsert(&state.pool, auth_user.user_id, deck_id, value).await?;
    Ok(Json(saved))
}

async fn remove_rating(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(deck_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !rating::delete(&state.pool, auth_user.user_id, deck_id).await? {
        return Err(ApiError::NotFound("Rating not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn follow_deck(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(deck_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    load_visible(&state.pool, deck_id, &auth_user).await?;
    follow::follow_deck(&state.pool, auth_user.user_id, deck_id).await?;

    Ok(StatusCode::CREATED)
}

async fn unfollow_deck(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(deck_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !follow::unfollow_deck(&state.pool, auth_user.user_id, deck_id).await? {
        return Err(ApiError::NotFound("You are not following this deck".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn list_followed_decks(
    auth_user: AuthUser,
    State(state): State<ApiState>,
) -> Result<Json<Vec<DeckSummary>>, ApiError> {
    let decks = follow::list_followed_decks(&state.pool, auth_user.user_id).await?;
    Ok(Json(decks))
}
