use cbx_srs::Backtrack;
use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::{DeckTraining, DeckTrainingOverview, NewDeckTraining};

pub async fn create<'e, E>(executor: E, new: &NewDeckTraining) -> Result<DeckTraining, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            INSERT INTO deck_trainings (user_id, deck_id, start_date, box_amount, backtrack)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, deck_id, start_date, box_amount, backtrack,
                      attempts, avg_completion_time_seconds, created_at, updated_at
        "#,
    )
    .bind(new.user_id)
    .bind(new.deck_id)
    .bind(new.start_date)
    .bind(new.box_amount)
    .bind(new.backtrack.as_str())
    .fetch_one(executor)
    .await
}

pub async fn find_by_id<'e, E>(
    executor: E,
    deck_training_id: Uuid,
) -> Result<Option<DeckTraining>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, user_id, deck_id, start_date, box_amount, backtrack,
                   attempts, avg_completion_time_seconds, created_at, updated_at
            FROM deck_trainings
            WHERE id = $1
        "#,
    )
    .bind(deck_training_id)
    .fetch_optional(executor)
    .await
}

/// Fetch a deck training only if it belongs to `user_id`
pub async fn find_for_user<'e, E>(
    executor: E,
    deck_training_id: Uuid,
    user_id: Uuid,
) -> Result<Option<DeckTraining>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, user_id, deck_id, start_date, box_amount, backtrack,
                   attempts, avg_completion_time_seconds, created_at, updated_at
            FROM deck_trainings
            WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(deck_training_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub async fn list_ids_by_deck<'e, E>(executor: E, deck_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT id FROM deck_trainings WHERE deck_id = $1
        "#,
    )
    .bind(deck_id)
    .fetch_all(executor)
    .await
}

/// A user's trainings with their deck title and the number of visible cards due
/// on or before `due_before`
pub async fn list_overview_for_user<'e, E>(
    executor: E,
    user_id: Uuid,
    due_before: DateTime<Utc>,
) -> Result<Vec<DeckTrainingOverview>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                dt.id,
                dt.deck_id,
                d.title AS deck_title,
                dt.start_date,
                dt.box_amount,
                dt.backtrack,
                dt.attempts,
                dt.avg_completion_time_seconds,
                (SELECT COUNT(*) FROM card_trainings ct
                    WHERE ct.deck_training_id = dt.id) AS total_cards,
                (SELECT COUNT(*) FROM card_trainings ct
                    WHERE ct.deck_training_id = dt.id
                    AND ct.is_shown
                    AND ct.next_training <= $2) AS cards_due
            FROM deck_trainings dt
            JOIN decks d ON d.id = dt.deck_id
            WHERE dt.user_id = $1
            ORDER BY dt.start_date DESC
        "#,
    )
    .bind(user_id)
    .bind(due_before)
    .fetch_all(executor)
    .await
}

pub async fn update_settings<'e, E>(
    executor: E,
    deck_training_id: Uuid,
    box_amount: i32,
    backtrack: Backtrack,
) -> Result<Option<DeckTraining>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            UPDATE deck_trainings
            SET box_amount = $2, backtrack = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, deck_id, start_date, box_amount, backtrack,
                      attempts, avg_completion_time_seconds, created_at, updated_at
        "#,
    )
    .bind(deck_training_id)
    .bind(box_amount)
    .bind(backtrack.as_str())
    .fetch_optional(executor)
    .await
}

/// Move the start date without touching card progress
pub async fn reset_start_date<'e, E>(
    executor: E,
    deck_training_id: Uuid,
    start_date: DateTime<Utc>,
) -> Result<Option<DeckTraining>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            UPDATE deck_trainings
            SET start_date = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, deck_id, start_date, box_amount, backtrack,
                      attempts, avg_completion_time_seconds, created_at, updated_at
        "#,
    )
    .bind(deck_training_id)
    .bind(start_date)
    .fetch_optional(executor)
    .await
}

/// Fold one session into the running statistics in a single statement
///
/// The right-hand sides see the row as it was before the update, so concurrent
/// sessions each add one attempt.
pub async fn record_session<'e, E>(
    executor: E,
    deck_training_id: Uuid,
    completion_time_seconds: i32,
) -> Result<Option<DeckTraining>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            UPDATE deck_trainings
            SET attempts = GREATEST(attempts, 0) + 1,
                avg_completion_time_seconds = ROUND(
                    (GREATEST(avg_completion_time_seconds, 0)::numeric * GREATEST(attempts, 0) + $2)
                        / (GREATEST(attempts, 0) + 1)
                )::int,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, deck_id, start_date, box_amount, backtrack,
                      attempts, avg_completion_time_seconds, created_at, updated_at
        "#,
    )
    .bind(deck_training_id)
    .bind(completion_time_seconds.max(0))
    .fetch_optional(executor)
    .await
}

/// Delete a user's deck training; its card trainings cascade
pub async fn delete_for_user<'e, E>(
    executor: E,
    deck_training_id: Uuid,
    user_id: Uuid,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            DELETE FROM deck_trainings WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(deck_training_id)
    .bind(user_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}
