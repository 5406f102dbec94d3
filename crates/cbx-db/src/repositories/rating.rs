use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::DeckRating;

/// Insert or replace a user's rating of a deck
pub async fn upsert<'e, E>(
    executor: E,
    user_id: Uuid,
    deck_id: Uuid,
    value: i16,
) -> Result<DeckRating, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            INSERT INTO deck_ratings (user_id, deck_id, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, deck_id)
            DO UPDATE SET
                value = $3,
                updated_at = NOW()
            RETURNING user_id, deck_id, value, updated_at
        "#,
    )
    .bind(user_id)
    .bind(deck_id)
    .bind(value)
    .fetch_one(executor)
    .await
}

pub async fn delete<'e, E>(executor: E, user_id: Uuid, deck_id: Uuid) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            DELETE FROM deck_ratings
            WHERE user_id = $1 AND deck_id = $2
        "#,
    )
    .bind(user_id)
    .bind(deck_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}
