//! SQLite persistence for sessions, turns, and archive slices

mod repository;
mod schema;

pub use repository::Repository;
pub use schema::{Schema, SCHEMA_VERSION};
