//! Cards of a deck and their enrollment in the deck's trainings.

pub mod model;
pub mod routes;

pub use routes::routes;
