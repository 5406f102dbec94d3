use std::{fmt, str::FromStr};

use cbx_srs::{Backtrack, SessionStatistics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role granted to a user account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored or submitted role is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// User account as returned to its owner and to admins
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Login lookup row, never serialized
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCredentials {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
}

/// Public profile with follow and deck counters
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub followers: i64,
    pub following: i64,
    pub published_decks: i64,
}

/// Minimal user reference used in follower listings
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub followed_at: DateTime<Utc>,
}

/// Deck of question/answer cards
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Deck {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Deck listing row with card count and rating aggregates
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeckSummary {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_username: String,
    pub title: String,
    pub description: Option<String>,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub card_count: i64,
    /// Mean rating, `None` until the deck has been rated
    pub rating_average: Option<f64>,
    pub rating_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Single flashcard
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Card {
    pub id: Uuid,
    pub deck_id: Uuid,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user's rating of a deck
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeckRating {
    pub user_id: Uuid,
    pub deck_id: Uuid,
    pub value: i16,
    pub updated_at: DateTime<Utc>,
}

/// A user's enrollment in the training of one deck
///
/// Unique on `(deck_id, user_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeckTraining {
    pub id: Uuid,
    pub user_id: Uuid,
    pub deck_id: Uuid,
    /// Enrollment time, reassigned on reset
    pub start_date: DateTime<Utc>,
    /// Highest box a card of this training can reach
    pub box_amount: i32,
    #[sqlx(try_from = "String")]
    pub backtrack: Backtrack,
    pub attempts: i32,
    pub avg_completion_time_seconds: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeckTraining {
    pub const fn statistics(&self) -> SessionStatistics {
        SessionStatistics {
            attempts: self.attempts,
            avg_completion_time_seconds: self.avg_completion_time_seconds,
        }
    }
}

/// Values for a new deck training
#[derive(Debug, Clone)]
pub struct NewDeckTraining {
    pub user_id: Uuid,
    pub deck_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub box_amount: i32,
    pub backtrack: Backtrack,
}

/// Deck training listing row with the deck title and the number of cards due
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeckTrainingOverview {
    pub id: Uuid,
    pub deck_id: Uuid,
    pub deck_title: String,
    pub start_date: DateTime<Utc>,
    pub box_amount: i32,
    #[sqlx(try_from = "String")]
    pub backtrack: Backtrack,
    pub attempts: i32,
    pub avg_completion_time_seconds: i32,
    pub total_cards: i64,
    pub cards_due: i64,
}

/// Scheduling state of one card inside one deck training
///
/// Unique on `(deck_training_id, card_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CardTraining {
    pub id: Uuid,
    pub deck_training_id: Uuid,
    pub card_id: Uuid,
    #[serde(rename = "box")]
    pub box_number: i32,
    pub next_training: DateTime<Utc>,
    pub is_shown: bool,
}

/// Values for a new card training
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCardTraining {
    pub deck_training_id: Uuid,
    pub card_id: Uuid,
    pub box_number: i32,
    pub next_training: DateTime<Utc>,
    pub is_shown: bool,
}

/// Pagination parameters shared by listing queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
        }
    }
}
