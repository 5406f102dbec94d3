use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
};
use cbx_db::{
    models::{User, UserProfile, UserSummary},
    repositories::{follow, user},
};
use uuid::Uuid;

use super::model::{UpdateProfileRequest, UpdateRoleRequest, UserListQuery};
use crate::{
    ApiState,
    auth::{AdminUser, AuthUser, validation::validate_username},
    error::ApiError,
    extract::ApiJson,
    middleware::rate_limit,
    validation::page_from_query,
};

pub fn routes() -> Router<ApiState> {
    use crate::make_rate_limit_layer;

    let user_routes = Router::new()
        .route("/users/me", patch(update_me))
        .route("/users/{user_id}", get(get_profile))
        .route(
            "/users/{user_id}/follow",
            post(follow_user).delete(unfollow_user),
        )
        .route("/users/{user_id}/followers", get(list_followers))
        .route("/users/{user_id}/following", get(list_following));

    let admin_routes = Router::new()
        .route("/admin/users", get(admin_list_users))
        .route("/admin/users/{user_id}", delete(admin_delete_user))
        .route("/admin/users/{user_id}/role", patch(admin_update_role));

    Router::new()
        .merge(user_routes)
        .merge(admin_routes)
        .layer(make_rate_limit_layer!(
            rate_limit::GENERAL_REPLENISH_MS,
            rate_limit::GENERAL_BURST_SIZE
        ))
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

async fn get_profile(
    _auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserProfile>, ApiError> {
    user::find_profile(&state.pool, user_id)
        .await?
        .map(Json)
        .ok_or_else(user_not_found)
}

async fn update_me(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    let username = payload.username.trim();
    validate_username(username)?;

    let updated = user::update_username(&state.pool, auth_user.user_id, username)
        .await?
        .ok_or_else(user_not_found)?;

    tracing::info!(user_id = %auth_user.user_id, "username changed");
    Ok(Json(updated))
}

async fn follow_user(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if user_id == auth_user.user_id {
        return Err(ApiError::Validation("You cannot follow yourself".to_string()));
    }

    user::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(user_not_found)?;
    follow::follow_user(&state.pool, auth_user.user_id, user_id).await?;

    Ok(StatusCode::CREATED)
}

async fn unfollow_user(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !follow::unfollow_user(&state.pool, auth_user.user_id, user_id).await? {
        return Err(ApiError::NotFound("You are not following this user".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn list_followers(
    _auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let followers = follow::list_followers(&state.pool, user_id).await?;
    Ok(Json(followers))
}

async fn list_following(
    _auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let following = follow::list_following(&state.pool, user_id).await?;
    Ok(Json(following))
}

async fn admin_list_users(
    _admin: AdminUser,
    State(state): State<ApiState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    let page = page_from_query(query.limit, query.offset)?;
    let users = user::list(&state.pool, page).await?;

    Ok(Json(users))
}

async fn admin_delete_user(
    AdminUser(admin): AdminUser,
    State(state): State<ApiState>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if user_id == admin.user_id {
        return Err(ApiError::Validation(
            "Admins cannot delete their own account".to_string(),
        ));
    }

    if !user::delete(&state.pool, user_id).await? {
        return Err(user_not_found());
    }

    tracing::warn!(%user_id, admin_id = %admin.user_id, "user deleted by admin");
    Ok(StatusCode::NO_CONTENT)
}

async fn admin_update_role(
    AdminUser(admin): AdminUser,
    State(state): State<ApiState>,
    Path(user_id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateRoleRequest>,
) -> Result<Json<User>, ApiError> {
    if user_id == admin.user_id && !payload.role.is_admin() {
        return Err(ApiError::Validation(
            "Admins cannot remove their own admin role".to_string(),
        ));
    }

    let updated = user::update_role(&state.pool, user_id, payload.role)
        .await?
        .ok_or_else(user_not_found)?;

    tracing::info!(%user_id, role = %updated.role, admin_id = %admin.user_id, "role changed");
    Ok(Json(updated))
}
