use axum_extra::extract::cookie::{Cookie, SameSite};

use crate::config::Environment;

/// Name of the private cookie carrying the JWT
pub const AUTH_COOKIE: &str = "auth_token";

/// Create an auth cookie with the JWT token
///
/// Cookies are secure (HTTPS-only) by default in production.
/// In development mode, cookies can be used over HTTP.
pub fn create_auth_cookie(
    token: String,
    environment: &Environment,
    expiry_hours: i64,
) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .max_age(time::Duration::hours(expiry_hours))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(!environment.is_development())
        .build()
}

/// Cookie used to remove the auth cookie on logout
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, "")).path("/").build()
}
