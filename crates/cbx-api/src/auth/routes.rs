use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use axum_extra::extract::PrivateCookieJar;
use cbx_db::{
    models::{Role, User},
    repositories::user,
};
use serde_json::json;

use super::{
    cookies, jwt,
    middleware::AuthUser,
    models::{AuthResponse, LoginRequest, RegisterRequest},
    service, validation,
};
use crate::{
    ApiState, error::ApiError, extract::ApiJson, metrics::record_auth_event,
    middleware::rate_limit,
};

pub fn routes() -> Router<ApiState> {
    use crate::make_rate_limit_layer;

    // Credential endpoints with strict rate limiting
    let credential_routes = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .layer(make_rate_limit_layer!(
            rate_limit::AUTH_REPLENISH_MS,
            rate_limit::AUTH_BURST_SIZE
        ));

    // Session endpoints with general rate limiting
    let session_routes = Router::new()
        .route("/auth/me", get(auth_me))
        .route("/auth/logout", post(logout))
        .layer(make_rate_limit_layer!(
            rate_limit::GENERAL_REPLENISH_MS,
            rate_limit::GENERAL_BURST_SIZE
        ));

    Router::new().merge(credential_routes).merge(session_routes)
}

async fn register(
    State(state): State<ApiState>,
    jar: PrivateCookieJar,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, PrivateCookieJar, Json<AuthResponse>), ApiError> {
    let username = payload.username.trim();
    let email = payload.email.trim().to_lowercase();

    validation::validate_username(username)?;
    validation::validate_email(&email)?;
    validation::validate_password(&payload.password)?;

    let role = if state.is_admin_email(&email) {
        Role::Admin
    } else {
        Role::User
    };

    let result = service::register_user(
        &state.pool,
        username,
        &email,
        payload.password,
        role,
        state.bcrypt_cost,
    )
    .await;
    record_auth_event("register", result.is_ok());
    let user = result?;

    let (jar, response) = issue_session(&state, jar, user)?;
    Ok((StatusCode::CREATED, jar, response))
}

async fn login(
    State(state): State<ApiState>,
    jar: PrivateCookieJar,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<(PrivateCookieJar, Json<AuthResponse>), ApiError> {
    let email = payload.email.trim().to_lowercase();

    let result = service::authenticate(&state.pool, &email, payload.password).await;
    record_auth_event("login", result.is_ok());
    let user = result.inspect_err(|_| tracing::info!("login rejected"))?;

    tracing::info!(user_id = %user.id, "user logged in");
    issue_session(&state, jar, user)
}

/// Sign a token for `user`, set it as the auth cookie and return it in the body
fn issue_session(
    state: &ApiState,
    jar: PrivateCookieJar,
    user: User,
) -> Result<(PrivateCookieJar, Json<AuthResponse>), ApiError> {
    let token = jwt::generate_jwt_token(
        user.id,
        user.email.clone(),
        user.role,
        &state.auth.jwt_secret,
        state.auth.jwt_expiry_hours,
    )?;

    let cookie = cookies::create_auth_cookie(
        token.clone(),
        &state.environment,
        state.auth.jwt_expiry_hours,
    );

    Ok((jar.add(cookie), Json(AuthResponse { token, user })))
}

async fn auth_me(
    auth_user: AuthUser,
    State(state): State<ApiState>,
) -> Result<Json<User>, ApiError> {
    let user = user::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or_else(|| ApiError::Auth("User not found".to_string()))?;

    Ok(Json(user))
}

async fn logout(jar: PrivateCookieJar) -> (PrivateCookieJar, Json<serde_json::Value>) {
    let jar = jar.remove(cookies::removal_cookie());

    (
        jar,
        Json(json!({ "message": "Logged out successfully" })),
    )
}
