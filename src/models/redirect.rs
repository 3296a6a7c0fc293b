use chrono::NaiveDateTime;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Redirect {
    pub id: i64,
    pub old_path: String,
    pub new_path: String,
    pub created_by: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Redirect {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Redirect {
            id: row.get("id")?,
            old_path: row.get("old_path")?,
            new_path: row.get("new_path")?,
            created_by: row.get("created_by")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Upsert keyed by `old_path`, then re-point redirects that targeted
    /// `old_path` so visitors never hop twice. A redirect is never pointed
    /// at itself. Rows are never deleted here.
    pub fn upsert(pool: &DbPool, old_path: &str, new_path: &str, created_by: i64) -> Result<(), String> {
        if old_path == new_path {
            return Ok(());
        }
        let mut conn = pool.get().map_err(|e| e.to_string())?;
        let tx = conn.transaction().map_err(|e| e.to_string())?;
        tx.execute(
            "INSERT INTO redirects (old_path, new_path, created_by) VALUES (?1, ?2, ?3)
             ON CONFLICT(old_path) DO UPDATE SET new_path = ?2, created_by = ?3,
             updated_at = CURRENT_TIMESTAMP",
            params![old_path, new_path, created_by],
        )
        .map_err(|e| e.to_string())?;
        tx.execute(
            "UPDATE redirects SET new_path = ?2, updated_at = CURRENT_TIMESTAMP
             WHERE new_path = ?1 AND old_path != ?2",
            params![old_path, new_path],
        )
        .map_err(|e| e.to_string())?;
        tx.commit().map_err(|e| e.to_string())
    }

    pub fn find(pool: &DbPool, old_path: &str) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            "SELECT * FROM redirects WHERE old_path = ?1",
            params![old_path],
            Self::from_row,
        )
        .ok()
    }

    pub fn list(pool: &DbPool, limit: i64, offset: i64) -> Vec<Self> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        let mut stmt = match conn
            .prepare("SELECT * FROM redirects ORDER BY updated_at DESC, id DESC LIMIT ?1 OFFSET ?2")
        {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        stmt.query_map(params![limit, offset], Self::from_row)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    pub fn count(pool: &DbPool) -> i64 {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return 0,
        };
        conn.query_row("SELECT COUNT(*) FROM redirects", [], |row| row.get(0))
            .unwrap_or(0)
    }
}
