//! Decks, their ratings and deck follows.

pub mod model;
pub mod routes;

use cbx_db::{models::Deck, repositories::deck};
use sqlx::PgPool;
use uuid::Uuid;

pub use routes::routes;

use crate::{auth::AuthUser, error::ApiError};

fn deck_not_found() -> ApiError {
    ApiError::NotFound("Deck not found".to_string())
}

/// Whether `user` may read `deck`: published, owned, or the caller is an admin
pub fn can_view(deck: &Deck, user: &AuthUser) -> bool {
    deck.is_published || deck.owner_id == user.user_id || user.is_admin()
}

/// Load a deck the caller is allowed to see; hidden decks are reported as missing
pub async fn load_visible(pool: &PgPool, deck_id: Uuid, user: &AuthUser) -> Result<Deck, ApiError> {
    deck::find_by_id(pool, deck_id)
        .await?
        .filter(|deck| can_view(deck, user))
        .ok_or_else(deck_not_found)
}

/// Load a deck the caller owns
///
/// Visible decks owned by someone else are a 403, invisible ones a 404.
pub async fn load_owned(pool: &PgPool, deck_id: Uuid, user: &AuthUser) -> Result<Deck, ApiError> {
    let deck = load_visible(pool, deck_id, user).await?;
    if deck.owner_id != user.user_id {
        return Err(ApiError::Forbidden(
            "Only the deck owner can do this".to_string(),
        ));
    }

    Ok(deck)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbx_db::models::Role;
    use chrono::Utc;

    fn deck(owner_id: Uuid, is_published: bool) -> Deck {
        let now = Utc::now();
        Deck {
            id: Uuid::new_v4(),
            owner_id,
            title: "Deck".to_string(),
            description: None,
            is_published,
            published_at: is_published.then_some(now),
            created_at: now,
            updated_at: now,
        }
    }

    fn user(role: Role) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn test_published_decks_are_visible_to_everyone() {
        let viewer = user(Role::User);
        assert!(can_view(&deck(Uuid::new_v4(), true), &viewer));
    }

    #[test]
    fn test_unpublished_decks_are_visible_to_owner_and_admins_only() {
        let owner = user(Role::User);
        let hidden = deck(owner.user_id, false);

        assert!(can_view(&hidden, &owner));
        assert!(can_view(&hidden, &user(Role::Admin)));
        assert!(!can_view(&hidden, &user(Role::User)));
    }
}
