use cbx_db::{
    models::{Role, User},
    repositories::user,
};
use sqlx::PgPool;

use crate::error::ApiError;

/// Hash a password on the blocking pool
pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?
        .map_err(ApiError::from)
}

/// Check a password against a stored hash on the blocking pool
pub async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?
        .map_err(ApiError::from)
}

/// Create an account; a taken username or email surfaces as a conflict
pub async fn register_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password: String,
    role: Role,
    bcrypt_cost: u32,
) -> Result<User, ApiError> {
    let password_hash = hash_password(password, bcrypt_cost).await?;
    let user = user::create(pool, username, email, &password_hash, role).await?;

    tracing::info!(user_id = %user.id, role = %user.role, "user registered");
    Ok(user)
}

/// Resolve an email/password pair to the matching account
///
/// Unknown emails and wrong passwords produce the same error.
pub async fn authenticate(pool: &PgPool, email: &str, password: String) -> Result<User, ApiError> {
    let invalid = || ApiError::Auth("Invalid email or password".to_string());

    let credentials = user::find_credentials_by_email(pool, email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(password, credentials.password_hash).await? {
        return Err(invalid());
    }

    user::find_by_id(pool, credentials.id)
        .await?
        .ok_or_else(invalid)
}
