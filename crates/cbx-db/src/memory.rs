//! In-process [`TrainingStore`] used by unit tests and local tooling.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    models::{CardTraining, DeckTraining, NewCardTraining, NewDeckTraining},
    store::{StoreError, TrainingStore},
};

#[derive(Debug, Default)]
struct Inner {
    deck_trainings: HashMap<Uuid, DeckTraining>,
    /// Keyed by `(deck_training_id, card_id)`, the same pair Postgres keeps unique
    card_trainings: HashMap<(Uuid, Uuid), CardTraining>,
}

/// [`TrainingStore`] over shared in-memory maps
///
/// Clones share state. Uniqueness and referential checks mirror the database schema:
/// a duplicate card training is a `Conflict`, a card training for an unknown deck
/// training is `NotFound`.
#[derive(Debug, Clone, Default)]
pub struct MemoryTrainingStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryTrainingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a deck training, `Conflict` if the user already trains this deck
    pub async fn insert_deck_training(
        &self,
        new: NewDeckTraining,
    ) -> Result<DeckTraining, StoreError> {
        let mut inner = self.inner.write().await;
        let duplicate = inner
            .deck_trainings
            .values()
            .any(|dt| dt.deck_id == new.deck_id && dt.user_id == new.user_id);
        if duplicate {
            return Err(StoreError::Conflict(
                "deck_trainings_deck_user_key".to_string(),
            ));
        }

        let now = Utc::now();
        let training = DeckTraining {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            deck_id: new.deck_id,
            start_date: new.start_date,
            box_amount: new.box_amount,
            backtrack: new.backtrack,
            attempts: 0,
            avg_completion_time_seconds: 0,
            created_at: now,
            updated_at: now,
        };
        inner.deck_trainings.insert(training.id, training.clone());
        Ok(training)
    }

    /// Remove a deck training together with its card trainings
    pub async fn remove_deck_training(&self, deck_training_id: Uuid) -> bool {
        let mut inner = self.inner.write().await;
        inner
            .card_trainings
            .retain(|(dt, _), _| *dt != deck_training_id);
        inner.deck_trainings.remove(&deck_training_id).is_some()
    }

    /// Every card training of a deck training, hidden ones included
    pub async fn card_trainings(&self, deck_training_id: Uuid) -> Vec<CardTraining> {
        let inner = self.inner.read().await;
        let mut trainings: Vec<_> = inner
            .card_trainings
            .values()
            .filter(|ct| ct.deck_training_id == deck_training_id)
            .cloned()
            .collect();
        trainings.sort_by_key(|ct| (ct.next_training, ct.card_id));
        trainings
    }
}

impl TrainingStore for MemoryTrainingStore {
    async fn find_deck_training(
        &self,
        deck_training_id: Uuid,
    ) -> Result<Option<DeckTraining>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .deck_trainings
            .get(&deck_training_id)
            .cloned())
    }

    async fn create_card_training(&self, new: NewCardTraining) -> Result<CardTraining, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.deck_trainings.contains_key(&new.deck_training_id) {
            return Err(StoreError::NotFound(
                "card_trainings_deck_training_id_fkey".to_string(),
            ));
        }

        let key = (new.deck_training_id, new.card_id);
        if inner.card_trainings.contains_key(&key) {
            return Err(StoreError::Conflict(
                "card_trainings_deck_training_card_key".to_string(),
            ));
        }

        let training = CardTraining {
            id: Uuid::new_v4(),
            deck_training_id: new.deck_training_id,
            card_id: new.card_id,
            box_number: new.box_number,
            next_training: new.next_training,
            is_shown: new.is_shown,
        };
        inner.card_trainings.insert(key, training.clone());
        Ok(training)
    }

    async fn delete_card_training(
        &self,
        deck_training_id: Uuid,
        card_id: Uuid,
    ) -> Result<bool, StoreError> {
        Ok(self
            .inner
            .write()
            .await
            .card_trainings
            .remove(&(deck_training_id, card_id))
            .is_some())
    }

    async fn find_card_training(
        &self,
        deck_training_id: Uuid,
        card_id: Uuid,
    ) -> Result<Option<CardTraining>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .card_trainings
            .get(&(deck_training_id, card_id))
            .cloned())
    }

    async fn update_card_schedule(
        &self,
        deck_training_id: Uuid,
        card_id: Uuid,
        box_number: i32,
        next_training: DateTime<Utc>,
    ) -> Result<Option<CardTraining>, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .card_trainings
            .get_mut(&(deck_training_id, card_id))
            .map(|ct| {
                ct.box_number = box_number;
                ct.next_training = next_training;
                ct.clone()
            }))
    }

    async fn set_card_visibility(
        &self,
        deck_training_id: Uuid,
        card_id: Uuid,
        is_shown: bool,
    ) -> Result<Option<CardTraining>, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .card_trainings
            .get_mut(&(deck_training_id, card_id))
            .map(|ct| {
                ct.is_shown = is_shown;
                ct.clone()
            }))
    }

    async fn list_shown_card_trainings(
        &self,
        deck_training_id: Uuid,
        due_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<CardTraining>, StoreError> {
        let inner = self.inner.read().await;
        let mut trainings: Vec<_> = inner
            .card_trainings
            .values()
            .filter(|ct| ct.deck_training_id == deck_training_id && ct.is_shown)
            .filter(|ct| due_before.is_none_or(|limit| ct.next_training <= limit))
            .cloned()
            .collect();
        trainings.sort_by_key(|ct| (ct.next_training, ct.card_id));
        Ok(trainings)
    }

    async fn record_session(
        &self,
        deck_training_id: Uuid,
        completion_time_seconds: i32,
    ) -> Result<Option<DeckTraining>, StoreError> {
        // Held across the read and the write
        let mut inner = self.inner.write().await;
        Ok(inner
            .deck_trainings
            .get_mut(&deck_training_id)
            .map(|dt| {
                let statistics = dt.statistics().record(completion_time_seconds);
                dt.attempts = statistics.attempts;
                dt.avg_completion_time_seconds = statistics.avg_completion_time_seconds;
                dt.updated_at = Utc::now();
                dt.clone()
            }))
    }
}
