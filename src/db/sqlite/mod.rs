//! SQLite database module
//!
//! Holds the small amount of client-persisted state: the backend base URL
//! the dashboard was last pointed at.

mod settings;

use crate::error::Result;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

/// SQLite database wrapper
pub struct SqliteDb {
    conn: Mutex<Connection>,
}

impl SqliteDb {
    /// Create new SQLite database connection
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.run_migrations()?;

        Ok(db)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS migrations (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        Self::run_migration(&conn, "001_settings", settings::CREATE_SETTINGS_TABLE)?;

        tracing::info!("Database migrations completed");
        Ok(())
    }

    fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM migrations WHERE name = ?)",
            [name],
            |row| row.get(0),
        )?;

        if !exists {
            tracing::info!("Running migration: {}", name);
            conn.execute_batch(sql)?;
            conn.execute("INSERT INTO migrations (name) VALUES (?)", [name])?;
        }

        Ok(())
    }

    // ========== Settings Methods ==========

    /// Get the persisted backend base URL, if any
    pub fn get_base_url(&self) -> Result<Option<String>> {
        let conn = self.conn.lock();
        settings::get_base_url(&conn)
    }

    /// Persist the backend base URL
    pub fn set_base_url(&self, base_url: &str) -> Result<()> {
        let conn = self.conn.lock();
        settings::set_base_url(&conn, base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let db = SqliteDb::new(&dir.path().join("oiscope.db")).unwrap();

        assert_eq!(db.get_base_url().unwrap(), None);

        db.set_base_url("http://192.168.1.20:8080").unwrap();
        assert_eq!(
            db.get_base_url().unwrap().as_deref(),
            Some("http://192.168.1.20:8080")
        );

        // Overwrites, never accumulates rows.
        db.set_base_url("http://localhost:8080").unwrap();
        assert_eq!(
            db.get_base_url().unwrap().as_deref(),
            Some("http://localhost:8080")
        );
    }

    #[test]
    fn test_reopen_keeps_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oiscope.db");

        {
            let db = SqliteDb::new(&path).unwrap();
            db.set_base_url("http://oi.example.com").unwrap();
        }

        let db = SqliteDb::new(&path).unwrap();
        assert_eq!(
            db.get_base_url().unwrap().as_deref(),
            Some("http://oi.example.com")
        );
    }
}
