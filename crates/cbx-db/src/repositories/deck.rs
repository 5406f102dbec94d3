use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::{Deck, DeckSummary, Page};

pub async fn create<'e, E>(
    executor: E,
    owner_id: Uuid,
    title: &str,
    description: Option<&str>,
) -> Result<Deck, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            INSERT INTO decks (owner_id, title, description)
            VALUES ($1, $2, $3)
            RETURNING id, owner_id, title, description, is_published, published_at,
                      created_at, updated_at
        "#,
    )
    .bind(owner_id)
    .bind(title)
    .bind(description)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id<'e, E>(executor: E, deck_id: Uuid) -> Result<Option<Deck>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, owner_id, title, description, is_published, published_at,
                   created_at, updated_at
            FROM decks
            WHERE id = $1
        "#,
    )
    .bind(deck_id)
    .fetch_optional(executor)
    .await
}

pub async fn find_summary<'e, E>(
    executor: E,
    deck_id: Uuid,
) -> Result<Option<DeckSummary>, sqlx::Error>
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
            FROM decks d
            JOIN users u ON u.id = d.owner_id
            WHERE d.id = $1
        "#,
    )
    .bind(deck_id)
    .fetch_optional(executor)
    .await
}

/// Published decks, newest publication first, optionally filtered by title
pub async fn list_published<'e, E>(
    executor: E,
    search: Option<&str>,
    page: Page,
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
            FROM decks d
            JOIN users u ON u.id = d.owner_id
            WHERE d.is_published
                AND ($1::text IS NULL OR d.title ILIKE '%' || $1 || '%')
            ORDER BY d.published_at DESC NULLS LAST, d.id
            LIMIT $2 OFFSET $3
        "#,
    )
    .bind(search)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(executor)
    .await
}

pub async fn list_by_owner<'e, E>(
    executor: E,
    owner_id: Uuid,
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
            FROM decks d
            JOIN users u ON u.id = d.owner_id
            WHERE d.owner_id = $1
            ORDER BY d.created_at DESC
        "#,
    )
    .bind(owner_id)
    .fetch_all(executor)
    .await
}

/// Update title and/or description; `None` keeps the current value
pub async fn update<'e, E>(
    executor: E,
    deck_id: Uuid,
    title: Option<&str>,
    description: Option<&str>,
) -> Result<Option<Deck>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            UPDATE decks
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, owner_id, title, description, is_published, published_at,
                      created_at, updated_at
        "#,
    )
    .bind(deck_id)
    .bind(title)
    .bind(description)
    .fetch_optional(executor)
    .await
}

pub async fn set_published<'e, E>(
    executor: E,
    deck_id: Uuid,
    published: bool,
) -> Result<Option<Deck>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            UPDATE decks
            SET is_published = $2,
                published_at = CASE WHEN $2 THEN COALESCE(published_at, NOW()) ELSE NULL END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, owner_id, title, description, is_published, published_at,
                      created_at, updated_at
        "#,
    )
    .bind(deck_id)
    .bind(published)
    .fetch_optional(executor)
    .await
}

/// Delete a deck; cards, ratings, follows and trainings cascade
pub async fn delete<'e, E>(executor: E, deck_id: Uuid) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            DELETE FROM decks WHERE id = $1
        "#,
    )
    .bind(deck_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}
