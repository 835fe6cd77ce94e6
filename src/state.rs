//! Application state management

use crate::backend::{normalize_base_url, HttpBackend, DEFAULT_BASE_URL};
use crate::db::SqliteDb;
use crate::error::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// Application state shared across screens
pub struct AppState {
    /// SQLite database connection
    pub sqlite: Arc<SqliteDb>,

    /// Application data directory
    pub data_dir: PathBuf,
}

impl AppState {
    /// Create new application state
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)?;

        tracing::info!("Data directory: {:?}", data_dir);

        let sqlite = Arc::new(SqliteDb::new(&data_dir.join("oiscope.db"))?);

        Ok(Self { sqlite, data_dir })
    }

    /// Resolve the backend base URL. An explicit override wins and is
    /// persisted for the next run; otherwise the stored value; otherwise
    /// the default localhost backend.
    pub fn resolve_base_url(&self, override_url: Option<&str>) -> Result<String> {
        if let Some(url) = override_url {
            let normalized = normalize_base_url(url)?;
            self.sqlite.set_base_url(normalized.as_str())?;
            return Ok(normalized.as_str().to_string());
        }

        Ok(self
            .sqlite
            .get_base_url()?
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()))
    }

    /// Build a backend client against the resolved base URL. Screens get
    /// the client injected at construction; nothing reads it ambiently.
    pub fn backend(&self, override_url: Option<&str>) -> Result<Arc<HttpBackend>> {
        let base_url = self.resolve_base_url(override_url)?;
        Ok(Arc::new(HttpBackend::new(&base_url)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_persists() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(dir.path().to_path_buf()).unwrap();

        let resolved = state.resolve_base_url(Some("192.168.1.5:8080")).unwrap();
        assert_eq!(resolved, "http://192.168.1.5:8080/");

        // Next run without an override picks the stored value up.
        let stored = state.resolve_base_url(None).unwrap();
        assert_eq!(stored, "http://192.168.1.5:8080/");
    }

    #[test]
    fn test_default_when_nothing_stored() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(state.resolve_base_url(None).unwrap(), DEFAULT_BASE_URL);
    }
}
