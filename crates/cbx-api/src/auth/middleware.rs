use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use cbx_db::{models::Role, repositories::user};
use sqlx::PgPool;
use uuid::Uuid;

use super::{cookies::AUTH_COOKIE, jwt::verify_jwt_token};
use crate::{error::ApiError, state::AuthConfig};

/// Authenticated user extractor
///
/// Use this in route handlers to ensure the user is authenticated. The JWT is read
/// from the private `auth_token` cookie, or from an `Authorization: Bearer` header
/// when no cookie is present.
///
/// # Example
/// ```
/// use axum::extract::State;
/// use cbx_api::{error::ApiError, auth::AuthUser, ApiState};
///
/// async fn protected_route(
///     auth_user: AuthUser,
///     State(state): State<ApiState>,
/// ) -> Result<(), ApiError> {
///     // auth_user.user_id, auth_user.email and auth_user.role are available
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    AuthConfig: FromRef<S>,
    Key: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_config = AuthConfig::from_ref(state);

        let jar = PrivateCookieJar::<Key>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Auth("Failed to read cookies".to_string()))?;

        let token = match jar.get(AUTH_COOKIE) {
            Some(cookie) => cookie.value().to_owned(),
            None => bearer_token(parts)
                .ok_or_else(|| ApiError::Auth("Not authenticated".to_string()))?,
        };

        let claims = verify_jwt_token(&token, &auth_config.jwt_secret)?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ApiError::Auth("Invalid user ID in token".to_string()))?;

        Ok(Self {
            user_id,
            email: claims.email,
            role: claims.role,
        })
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Authenticated user holding the admin role; anyone else gets a 403
///
/// The role in the token is only a first filter. The account is re-read from the
/// database, so a demoted admin is refused and a deleted account gets a 401 even while
/// its token is still valid.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    AuthConfig: FromRef<S>,
    Key: FromRef<S>,
    PgPool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let claimed = AuthUser::from_request_parts(parts, state).await?;
        if !claimed.is_admin() {
            return Err(admin_required());
        }

        let pool = PgPool::from_ref(state);
        let account = user::find_by_id(&pool, claimed.user_id)
            .await?
            .ok_or_else(|| ApiError::Auth("Account no longer exists".to_string()))?;

        if !account.role.is_admin() {
            tracing::warn!(user_id = %account.id, "stale admin token rejected");
            return Err(admin_required());
        }

        Ok(Self(AuthUser {
            user_id: account.id,
            email: account.email,
            role: account.role,
        }))
    }
}

fn admin_required() -> ApiError {
    ApiError::Forbidden("Admin role required".to_string())
}
