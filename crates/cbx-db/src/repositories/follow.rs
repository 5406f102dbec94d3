use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::{DeckSummary, UserSummary};

pub async fn follow_user<'e, E>(
    executor: E,
    follower_id: Uuid,
    followee_id: Uuid,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO user_follows (follower_id, followee_id)
            VALUES ($1, $2)
        "#,
    )
    .bind(follower_id)
    .bind(followee_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn unfollow_user<'e, E>(
    executor: E,
    follower_id: Uuid,
    followee_id: Uuid,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            DELETE FROM user_follows
            WHERE follower_id = $1 AND followee_id = $2
        "#,
    )
    .bind(follower_id)
    .bind(followee_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_followers<'e, E>(
    executor: E,
    user_id: Uuid,
) -> Result<Vec<UserSummary>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT u.id, u.username, f.created_at AS followed_at
            FROM user_follows f
            JOIN users u ON u.id = f.follower_id
            WHERE f.followee_id = $1
            ORDER BY f.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

pub async fn list_following<'e, E>(
    executor: E,
    user_id: Uuid,
) -> Result<Vec<UserSummary>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT u.id, u.username, f.created_at AS followed_at
            FROM user_follows f
            JOIN users u ON u.id = f.followee_id
            WHERE f.follower_id = $1
            ORDER BY f.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

pub async fn follow_deck<'e, E>(
    executor: E,
    user_id: Uuid,
    deck_id: Uuid,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO deck_follows (user_id, deck_id)
            VALUES ($1, $2)
        "#,
    )
    .bind(user_id)
    .bind(deck_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn unfollow_deck<'e, E>(
    executor: E,
    user_id: Uuid,
    deck_id: Uuid,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            DELETE FROM deck_follows
            WHERE user_id = $1 AND deck_id = $2
        "#,
    )
    .bind(user_id)
    .bind(deck_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Decks followed by a user that are still published
pub async fn list_followed_decks<'e, E>(
    executor: E,
    user_id: Uuid,
) -> Result<Vec<DeckSummary>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                d.id,
                d.owner_id,
                u.username AS owner_username,
                d.title,
                d.description,
                d.is_published,
                d.published_at,
                (SELECT COUNT(*) FROM cards c WHERE c.deck_id = d.id) AS card_count,
                (SELECT AVG(r.value)::float8 FROM deck_ratings r WHERE r.deck_id = d.id)
                    AS rating_average,
                (SELECT COUNT(*) FROM deck_ratings r WHERE r.deck_id = d.id) AS rating_count,
                d.created_at
            FROM deck_follows df
            JOIN decks d ON d.id = df.deck_id
            JOIN users u ON u.id = d.owner_id
            WHERE df.user_id = $1 AND d.is_published
            ORDER BY df.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}
