use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::Card;

pub async fn create<'e, E>(
    executor: E,
    deck_id: Uuid,
    question: &str,
    answer: &str,
) -> Result<Card, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            INSERT INTO cards (deck_id, question, answer)
            VALUES ($1, $2, $3)
            RETURNING id, deck_id, question, answer, created_at, updated_at
        "#,
    )
    .bind(deck_id)
    .bind(question)
    .bind(answer)
    .fetch_one(executor)
    .await
}

pub async fn find_in_deck<'e, E>(
    executor: E,
    deck_id: Uuid,
    card_id: Uuid,
) -> Result<Option<Card>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, deck_id, question, answer, created_at, updated_at
            FROM cards
            WHERE id = $2 AND deck_id = $1
        "#,
    )
    .bind(deck_id)
    .bind(card_id)
    .fetch_optional(executor)
    .await
}

pub async fn list_by_deck<'e, E>(executor: E, deck_id: Uuid) -> Result<Vec<Card>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, deck_id, question, answer, created_at, updated_at
            FROM cards
            WHERE deck_id = $1
            ORDER BY created_at, id
        "#,
    )
    .bind(deck_id)
    .fetch_all(executor)
    .await
}

pub async fn find_many<'e, E>(executor: E, card_ids: &[Uuid]) -> Result<Vec<Card>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, deck_id, question, answer, created_at, updated_at
            FROM cards
            WHERE id = ANY($1)
        "#,
    )
    .bind(card_ids)
    .fetch_all(executor)
    .await
}

pub async fn count_by_deck<'e, E>(executor: E, deck_id: Uuid) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT COUNT(*) FROM cards WHERE deck_id = $1
        "#,
    )
    .bind(deck_id)
    .fetch_one(executor)
    .await
}

pub async fn update<'e, E>(
    executor: E,
    deck_id: Uuid,
    card_id: Uuid,
    question: Option<&str>,
    answer: Option<&str>,
) -> Result<Option<Card>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            UPDATE cards
            SET question = COALESCE($3, question),
                answer = COALESCE($4, answer),
                updated_at = NOW()
            WHERE id = $2 AND deck_id = $1
            RETURNING id, deck_id, question, answer, created_at, updated_at
        "#,
    )
    .bind(deck_id)
    .bind(card_id)
    .bind(question)
    .bind(answer)
    .fetch_optional(executor)
    .await
}

pub async fn delete<'e, E>(executor: E, deck_id: Uuid, card_id: Uuid) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            DELETE FROM cards WHERE id = $2 AND deck_id = $1
        "#,
    )
    .bind(deck_id)
    .bind(card_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}
