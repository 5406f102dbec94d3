//! HTTP API for the cardbox flashcard service: accounts, decks, cards and Leitner
//! trainings on top of `axum` and PostgreSQL.

pub mod auth;
pub mod card;
pub mod config;
pub mod deck;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod state;
pub mod tracing;
pub mod training;
pub mod user;
pub mod validation;

pub use config::ApiConfig;
pub use state::{ApiState, AuthConfig};
