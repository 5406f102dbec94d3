use std::collections::HashMap;

use cbx_db::models::{Card, CardTraining, DeckTraining};
use cbx_srs::Backtrack;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StudySubmission;

#[derive(Debug, Default, Deserialize)]
pub struct CreateTrainingRequest {
    pub box_amount: Option<i32>,
    pub backtrack: Option<Backtrack>,
    /// Per-card `is_shown` overrides; cards not listed are shown
    #[serde(default)]
    pub visibility: HashMap<Uuid, bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTrainingRequest {
    pub box_amount: Option<i32>,
    pub backtrack: Option<Backtrack>,
}

#[derive(Debug, Deserialize)]
pub struct StudyRequest {
    pub completion_time_seconds: Option<i32>,
    #[serde(default)]
    pub cards: Vec<StudySubmission>,
}

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub is_shown: bool,
}

/// A freshly created training with the number of cards it enrolled
#[derive(Debug, Serialize)]
pub struct CreatedTraining {
    #[serde(flatten)]
    pub training: DeckTraining,
    pub enrolled: usize,
}

/// Card training joined with the card it schedules
#[derive(Debug, Serialize)]
pub struct CardTrainingView {
    #[serde(flatten)]
    pub training: CardTraining,
    pub question: String,
    pub answer: String,
}

impl CardTrainingView {
    /// Pair each card training with its card, dropping trainings whose card is gone
    pub fn join(trainings: Vec<CardTraining>, cards: Vec<Card>) -> Vec<Self> {
        let mut cards: HashMap<Uuid, Card> =
            cards.into_iter().map(|card| (card.id, card)).collect();

        trainings
            .into_iter()
            .filter_map(|training| {
                cards.remove(&training.card_id).map(|card| Self {
                    training,
                    question: card.question,
                    answer: card.answer,
                })
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct StudyResponse {
    pub training: DeckTraining,
    pub updated: Vec<CardTraining>,
    pub backtracked: usize,
}
