//! Database module

pub mod sqlite;

pub use sqlite::SqliteDb;
