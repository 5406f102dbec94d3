use cbx_db::models::{Card, DeckSummary};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateDeckRequest {
    pub title: String,
    pub description: Option<String>,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct UpdateDeckRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeckListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub value: i16,
}

/// Single deck with its cards
#[derive(Debug, Serialize)]
pub struct DeckDetail {
    #[serde(flatten)]
    pub deck: DeckSummary,
    pub cards: Vec<Card>,
}
