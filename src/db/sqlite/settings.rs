//! Settings management

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension};

pub(super) const CREATE_SETTINGS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS settings (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        base_url TEXT,
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    INSERT OR IGNORE INTO settings (id, base_url) VALUES (1, NULL);
";

/// Get the persisted base URL
pub fn get_base_url(conn: &Connection) -> Result<Option<String>> {
    let base_url: Option<String> = conn
        .query_row("SELECT base_url FROM settings WHERE id = 1", [], |row| {
            row.get(0)
        })
        .optional()?
        .flatten();

    Ok(base_url)
}

/// Persist the base URL
pub fn set_base_url(conn: &Connection, base_url: &str) -> Result<()> {
    conn.execute(
        "UPDATE settings SET base_url = ?, updated_at = datetime('now') WHERE id = 1",
        [base_url],
    )?;

    Ok(())
}
