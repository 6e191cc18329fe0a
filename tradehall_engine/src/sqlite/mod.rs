//! SQLite backend for the Tradehall marketplace engine.

mod events;
mod guilds;
mod listings;
mod ratings;
mod sqlite_impl;
mod transactions;

pub use sqlite_impl::{SqliteDatabase, MIGRATOR};
