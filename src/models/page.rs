use chrono::NaiveDateTime;
use rusqlite::{params, Row};
use serde::Serialize;

use crate::db::DbPool;
use crate::models::content::ContentItem;

/// The externally visible rendering of one content version.
#[derive(Debug, Serialize, Clone)]
pub struct PublishedPage {
    pub version_id: String,
    pub logical_id: i64,
    pub version_number: i64,
    pub url_path: String,
    pub html: String,
    pub published_at: NaiveDateTime,
}

impl PublishedPage {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(PublishedPage {
            version_id: row.get("version_id")?,
            logical_id: row.get("logical_id")?,
            version_number: row.get("version_number")?,
            url_path: row.get("url_path")?,
            html: row.get("html")?,
            published_at: row.get("published_at")?,
        })
    }

    pub fn upsert(pool: &DbPool, item: &ContentItem, html: &str) -> Result<(), String> {
        let published_at = item
            .published_at
            .ok_or_else(|| format!("content version {} has no publish date", item.version_id))?;
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO published_pages (version_id, logical_id, version_number, url_path, html, published_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(version_id) DO UPDATE SET url_path = ?4, html = ?5, published_at = ?6,
             rendered_at = CURRENT_TIMESTAMP",
            params![
                item.version_id,
                item.logical_id,
                item.version_number,
                item.url_path,
                html,
                published_at,
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn remove(pool: &DbPool, version_id: &str) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "DELETE FROM published_pages WHERE version_id = ?1",
            params![version_id],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Newest live rendering served at `url_path`.
    pub fn resolve(pool: &DbPool, url_path: &str, now: &NaiveDateTime) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            "SELECT * FROM published_pages WHERE url_path = ?1 AND published_at <= ?2
             ORDER BY version_number DESC LIMIT 1",
            params![url_path, now],
            Self::from_row,
        )
        .ok()
    }

    pub fn for_logical(pool: &DbPool, logical_id: i64) -> Vec<Self> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        let mut stmt = match conn.prepare(
            "SELECT * FROM published_pages WHERE logical_id = ?1 ORDER BY version_number",
        ) {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        stmt.query_map(params![logical_id], Self::from_row)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }
}
