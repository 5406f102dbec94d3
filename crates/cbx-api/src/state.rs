use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use cbx_db::PgTrainingStore;
use chrono::Local;
use sqlx::PgPool;

use crate::{ApiConfig, config::Environment, training::TrainingCoordinator};

/// Token settings needed by the auth extractors
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
}

#[derive(Clone)]
pub struct ApiState {
    pub pool: PgPool,
    pub trainings: TrainingCoordinator<PgTrainingStore, Local>,
    pub auth: AuthConfig,
    pub cookie_key: Key,
    pub environment: Environment,
    pub bcrypt_cost: u32,
    pub default_box_amount: i32,
    pub admin_emails: Arc<Vec<String>>,
}

impl std::fmt::Debug for ApiState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiState")
            .field("environment", &self.environment)
            .field("default_box_amount", &self.default_box_amount)
            .finish_non_exhaustive()
    }
}

impl ApiState {
    pub fn new(config: &ApiConfig, pool: PgPool) -> Self {
        // Create cookie key
        let cookie_key = Key::from(config.cookie_secret.as_bytes());
        let trainings = TrainingCoordinator::new(PgTrainingStore::new(pool.clone()), Local);

        Self {
            pool,
            trainings,
            auth: AuthConfig {
                jwt_secret: config.jwt_secret.clone(),
                jwt_expiry_hours: config.jwt_expiry_hours,
            },
            cookie_key,
            environment: config.env,
            bcrypt_cost: config.bcrypt_cost,
            default_box_amount: config.default_box_amount,
            admin_emails: Arc::new(config.parsed_admin_emails()),
        }
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.to_lowercase();
        self.admin_emails.iter().any(|admin| *admin == email)
    }
}

impl FromRef<ApiState> for Key {
    fn from_ref(state: &ApiState) -> Self {
        state.cookie_key.clone()
    }
}

impl FromRef<ApiState> for PgPool {
    fn from_ref(state: &ApiState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<ApiState> for AuthConfig {
    fn from_ref(state: &ApiState) -> Self {
        state.auth.clone()
    }
}
