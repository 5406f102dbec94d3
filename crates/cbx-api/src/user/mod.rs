//! Profiles, user follows and admin user management.

pub mod model;
pub mod routes;

pub use routes::routes;
