//! Deck trainings: a user's Leitner-box study of one deck.
//!
//! [`TrainingCoordinator`] keeps the card trainings of a deck training in sync and applies
//! study results; [`routes`] exposes it over HTTP.

pub mod coordinator;
pub mod model;
pub mod routes;

use cbx_db::StoreError;
use thiserror::Error;

pub use coordinator::{StudyReport, StudySubmission, TrainingCoordinator};
pub use routes::routes;

/// Failures of a coordinator operation
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for TrainingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(constraint) => {
                Self::Conflict(format!("Record already exists ({constraint})"))
            }
            StoreError::NotFound(constraint) => {
                Self::NotFound(format!("Referenced record not found ({constraint})"))
            }
            other @ StoreError::Database(_) => Self::Store(other),
        }
    }
}

impl From<cbx_srs::SrsError> for TrainingError {
    fn from(err: cbx_srs::SrsError) -> Self {
        Self::Validation(err.to_string())
    }
}
