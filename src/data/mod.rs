//! Data layer module
//!
//! The document store behind the timelines:
//! - users, tweets and per-user timeline lists in SQLite
//! - read paths for the aggregator, write paths for collaborators

mod database;
mod models;

pub use database::Database;
pub use models::*;
