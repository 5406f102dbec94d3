use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::{CardTraining, NewCardTraining};

/// Insert a card training; fails on the `(deck_training_id, card_id)` unique key
pub async fn create<'e, E>(executor: E, new: &NewCardTraining) -> Result<CardTraining, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            INSERT INTO card_trainings
                (deck_training_id, card_id, box_number, next_training, is_shown)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, deck_training_id, card_id, box_number, next_training, is_shown
        "#,
    )
    .bind(new.deck_training_id)
    .bind(new.card_id)
    .bind(new.box_number)
    .bind(new.next_training)
    .bind(new.is_shown)
    .fetch_one(executor)
    .await
}

pub async fn find<'e, E>(
    executor: E,
    deck_training_id: Uuid,
    card_id: Uuid,
) -> Result<Option<CardTraining>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, deck_training_id, card_id, box_number, next_training, is_shown
            FROM card_trainings
            WHERE deck_training_id = $1 AND card_id = $2
        "#,
    )
    .bind(deck_training_id)
    .bind(card_id)
    .fetch_optional(executor)
    .await
}

pub async fn update_schedule<'e, E>(
    executor: E,
    deck_training_id: Uuid,
    card_id: Uuid,
    box_number: i32,
    next_training: DateTime<Utc>,
) -> Result<Option<CardTraining>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            UPDATE card_trainings
            SET box_number = $3, next_training = $4
            WHERE deck_training_id = $1 AND card_id = $2
            RETURNING id, deck_training_id, card_id, box_number, next_training, is_shown
        "#,
    )
    .bind(deck_training_id)
    .bind(card_id)
    .bind(box_number)
    .bind(next_training)
    .fetch_optional(executor)
    .await
}

pub async fn set_visibility<'e, E>(
    executor: E,
    deck_training_id: Uuid,
    card_id: Uuid,
    is_shown: bool,
) -> Result<Option<CardTraining>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            UPDATE card_trainings
            SET is_shown = $3
            WHERE deck_training_id = $1 AND card_id = $2
            RETURNING id, deck_training_id, card_id, box_number, next_training, is_shown
        "#,
    )
    .bind(deck_training_id)
    .bind(card_id)
    .bind(is_shown)
    .fetch_optional(executor)
    .await
}

pub async fn delete<'e, E>(
    executor: E,
    deck_training_id: Uuid,
    card_id: Uuid,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            DELETE FROM card_trainings
            WHERE deck_training_id = $1 AND card_id = $2
        "#,
    )
    .bind(deck_training_id)
    .bind(card_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Visible card trainings, optionally only those due on or before `due_before`
pub async fn list_shown<'e, E>(
    executor: E,
    deck_training_id: Uuid,
    due_before: Option<DateTime<Utc>>,
) -> Result<Vec<CardTraining>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, deck_training_id, card_id, box_number, next_training, is_shown
            FROM card_trainings
            WHERE deck_training_id = $1
                AND is_shown
                AND ($2::timestamptz IS NULL OR next_training <= $2)
            ORDER BY next_training, card_id
        "#,
    )
    .bind(deck_training_id)
    .bind(due_before)
    .fetch_all(executor)
    .await
}

/// Pull every box above `box_amount` down to it
pub async fn clamp_boxes<'e, E>(
    executor: E,
    deck_training_id: Uuid,
    box_amount: i32,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            UPDATE card_trainings
            SET box_number = $2
            WHERE deck_training_id = $1 AND box_number > $2
        "#,
    )
    .bind(deck_training_id)
    .bind(box_amount)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
