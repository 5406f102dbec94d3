// All repository functions are generic over `E: Executor<'e, Database = Postgres>`
// so they accept both a `&PgPool` (direct query) and a `&mut Transaction` (atomic operations).

pub mod card;
pub mod card_training;
pub mod deck;
pub mod deck_training;
pub mod follow;
pub mod rating;
pub mod user;
