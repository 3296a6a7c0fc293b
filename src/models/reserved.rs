use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::db::DbPool;

/// A system route. `path` ending in `*` reserves everything starting with
/// the text before the star; anything else is an exact match.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReservedPath {
    pub path: String,
}

impl ReservedPath {
    pub fn new(path: &str) -> Self {
        ReservedPath {
            path: path.to_string(),
        }
    }

    /// Case-insensitive match of `candidate` against this entry.
    pub fn matches(&self, candidate: &str) -> bool {
        let candidate = candidate.to_lowercase();
        match self.path.strip_suffix('*') {
            Some(prefix) => candidate.starts_with(&prefix.to_lowercase()),
            None => candidate == self.path.to_lowercase(),
        }
    }

    pub fn list(pool: &DbPool) -> Result<Vec<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare("SELECT path FROM reserved_paths ORDER BY path")
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map([], |row| Ok(ReservedPath { path: row.get(0)? }))
            .map_err(|e| e.to_string())?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| e.to_string())
    }

    pub fn add(pool: &DbPool, path: &str) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT OR IGNORE INTO reserved_paths (path) VALUES (?1)",
            params![path],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_ignores_case() {
        let r = ReservedPath::new("admin");
        assert!(r.matches("admin"));
        assert!(r.matches("ADMIN"));
        assert!(!r.matches("admins"));
        assert!(!r.matches("my admin"));
    }

    #[test]
    fn wildcard_matches_literal_prefix() {
        let r = ReservedPath::new("api/*");
        assert!(r.matches("api/"));
        assert!(r.matches("API/v1"));
        assert!(!r.matches("api"));
        assert!(!r.matches("apiary"));
    }
}
