use chrono::NaiveDateTime;
use rusqlite::params;
use serde::Serialize;

use crate::db::DbPool;

#[derive(Debug, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub entity_title: Option<String>,
    pub details: Option<String>,
    pub created_at: NaiveDateTime,
}

impl AuditEntry {
    pub fn log(
        pool: &DbPool,
        user_id: Option<i64>,
        action: &str,
        entity_type: Option<&str>,
        entity_id: Option<i64>,
        entity_title: Option<&str>,
        details: Option<&str>,
    ) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO audit_log (user_id, action, entity_type, entity_id, entity_title, details)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![user_id, action, entity_type, entity_id, entity_title, details],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn for_entity(pool: &DbPool, entity_type: &str, entity_id: i64, limit: i64) -> Vec<Self> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };

        conn.prepare(
            "SELECT * FROM audit_log WHERE entity_type = ?1 AND entity_id = ?2
             ORDER BY created_at DESC, id DESC LIMIT ?3",
        )
        .and_then(|mut stmt| {
            stmt.query_map(params![entity_type, entity_id, limit], |row| {
                Ok(AuditEntry {
                    id: row.get("id")?,
                    user_id: row.get("user_id")?,
                    action: row.get("action")?,
                    entity_type: row.get("entity_type")?,
                    entity_id: row.get("entity_id")?,
                    entity_title: row.get("entity_title")?,
                    details: row.get("details")?,
                    created_at: row.get("created_at")?,
                })
            })
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
        })
        .unwrap_or_default()
    }
}
