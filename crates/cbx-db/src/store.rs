//! Storage seam for the training coordinator.
//!
//! [`TrainingStore`] covers exactly the reads and writes the coordinator performs on
//! deck and card trainings. [`PgTrainingStore`] backs it with the repositories in this
//! crate; [`crate::memory::MemoryTrainingStore`] keeps everything in process.

use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{CardTraining, DeckTraining, NewCardTraining},
    repositories::{card_training, deck_training},
};

/// Failures reported by a [`TrainingStore`]
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("record already exists ({0})")]
    Conflict(String),
    /// A referenced record does not exist
    #[error("referenced record not found ({0})")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            if db_err.is_unique_violation() {
                return Self::Conflict(constraint);
            }
            if db_err.is_foreign_key_violation() {
                return Self::NotFound(constraint);
            }
        }
        Self::Database(err)
    }
}

/// Reads and writes needed to run Leitner trainings
///
/// Methods return `Send` futures so handlers generic over a store stay `Send`.
pub trait TrainingStore: Send + Sync {
    fn find_deck_training(
        &self,
        deck_training_id: Uuid,
    ) -> impl Future<Output = Result<Option<DeckTraining>, StoreError>> + Send;

    /// Insert one card training, `Conflict` if the pair already exists
    fn create_card_training(
        &self,
        new: NewCardTraining,
    ) -> impl Future<Output = Result<CardTraining, StoreError>> + Send;

    /// Returns whether a record was removed
    fn delete_card_training(
        &self,
        deck_training_id: Uuid,
        card_id: Uuid,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn find_card_training(
        &self,
        deck_training_id: Uuid,
        card_id: Uuid,
    ) -> impl Future<Output = Result<Option<CardTraining>, StoreError>> + Send;

    fn update_card_schedule(
        &self,
        deck_training_id: Uuid,
        card_id: Uuid,
        box_number: i32,
        next_training: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<CardTraining>, StoreError>> + Send;

    fn set_card_visibility(
        &self,
        deck_training_id: Uuid,
        card_id: Uuid,
        is_shown: bool,
    ) -> impl Future<Output = Result<Option<CardTraining>, StoreError>> + Send;

    /// Visible card trainings ordered by next training date, filtered to those due on
    /// or before `due_before` when given
    fn list_shown_card_trainings(
        &self,
        deck_training_id: Uuid,
        due_before: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<Vec<CardTraining>, StoreError>> + Send;

    /// Fold one finished session into the deck training's statistics
    ///
    /// The read and the write happen as one step, so concurrent sessions are all counted.
    fn record_session(
        &self,
        deck_training_id: Uuid,
        completion_time_seconds: i32,
    ) -> impl Future<Output = Result<Option<DeckTraining>, StoreError>> + Send;
}

/// PostgreSQL-backed [`TrainingStore`]
#[derive(Debug, Clone)]
pub struct PgTrainingStore {
    pool: PgPool,
}

impl PgTrainingStore {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl TrainingStore for PgTrainingStore {
    async fn find_deck_training(
        &self,
        deck_training_id: Uuid,
    ) -> Result<Option<DeckTraining>, StoreError> {
        Ok(deck_training::find_by_id(&self.pool, deck_training_id).await?)
    }

    async fn create_card_training(&self, new: NewCardTraining) -> Result<CardTraining, StoreError> {
        Ok(card_training::create(&self.pool, &new).await?)
    }

    async fn delete_card_training(
        &self,
        deck_training_id: Uuid,
        card_id: Uuid,
    ) -> Result<bool, StoreError> {
        Ok(card_training::delete(&self.pool, deck_training_id, card_id).await?)
    }

    async fn find_card_training(
        &self,
        deck_training_id: Uuid,
        card_id: Uuid,
    ) -> Result<Option<CardTraining>, StoreError> {
        Ok(card_training::find(&self.pool, deck_training_id, card_id).await?)
    }

    async fn update_card_schedule(
        &self,
        deck_training_id: Uuid,
        card_id: Uuid,
        box_number: i32,
        next_training: DateTime<Utc>,
    ) -> Result<Option<CardTraining>, StoreError> {
        Ok(card_training::update_schedule(
            &self.pool,
            deck_training_id,
            card_id,
            box_number,
            next_training,
        )
        .await?)
    }

    async fn set_card_visibility(
        &self,
        deck_training_id: Uuid,
        card_id: Uuid,
        is_shown: bool,
    ) -> Result<Option<CardTraining>, StoreError> {
        Ok(card_training::set_visibility(&self.pool, deck_training_id, card_id, is_shown).await?)
    }

    async fn list_shown_card_trainings(
        &self,
        deck_training_id: Uuid,
        due_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<CardTraining>, StoreError> {
        Ok(card_training::list_shown(&self.pool, deck_training_id, due_before).await?)
    }

    async fn record_session(
        &self,
        deck_training_id: Uuid,
        completion_time_seconds: i32,
    ) -> Result<Option<DeckTraining>, StoreError> {
        Ok(
            deck_training::record_session(&self.pool, deck_training_id, completion_time_seconds)
                .await?,
        )
    }
}
