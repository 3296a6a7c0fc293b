use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    General,
    BlogPost,
    BlogStream,
    Other,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::General => "general",
            ContentKind::BlogPost => "blog_post",
            ContentKind::BlogStream => "blog_stream",
            ContentKind::Other => "other",
        }
    }

    /// Unknown kinds are treated as `Other` (no cascade).
    pub fn parse(s: &str) -> Self {
        match s {
            "general" => ContentKind::General,
            "blog_post" => ContentKind::BlogPost,
            "blog_stream" => ContentKind::BlogStream,
            _ => ContentKind::Other,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    #[default]
    Active,
    Deleted,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Active => "active",
            ContentStatus::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "deleted" => ContentStatus::Deleted,
            _ => ContentStatus::Active,
        }
    }
}

/// One version row of a logical content item.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ContentItem {
    pub version_id: String,
    pub logical_id: i64,
    pub version_number: i64,
    pub title: String,
    pub url_path: String,
    pub kind: ContentKind,
    /// Owning stream slug for blog posts; the stream's own slug for streams.
    pub blog_key: Option<String>,
    pub body_html: String,
    pub published_at: Option<NaiveDateTime>,
    pub status: ContentStatus,
    pub owner_user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ContentForm {
    /// None starts a new logical item; Some appends a version to it.
    pub logical_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub url_path: String,
    pub kind: ContentKind,
    pub blog_key: Option<String>,
    #[serde(default)]
    pub body_html: String,
    pub published_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub status: ContentStatus,
    #[serde(default)]
    pub owner_user_id: i64,
}

impl ContentItem {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let kind: String = row.get("kind")?;
        let status: String = row.get("status")?;
        Ok(ContentItem {
            version_id: row.get("version_id")?,
            logical_id: row.get("logical_id")?,
            version_number: row.get("version_number")?,
            title: row.get("title")?,
            url_path: row.get("url_path")?,
            kind: ContentKind::parse(&kind),
            blog_key: row.get("blog_key")?,
            body_html: row.get("body_html")?,
            published_at: row.get("published_at")?,
            status: ContentStatus::parse(&status),
            owner_user_id: row.get("owner_user_id")?,
        })
    }

    /// Live means active and published with a timestamp that is not in the future.
    pub fn is_live_at(&self, now: NaiveDateTime) -> bool {
        self.status == ContentStatus::Active && matches!(self.published_at, Some(ts) if ts <= now)
    }

    pub fn is_live(&self) -> bool {
        self.is_live_at(chrono::Utc::now().naive_utc())
    }

    pub fn is_deleted(&self) -> bool {
        self.status == ContentStatus::Deleted
    }

    pub fn find_by_version_id(pool: &DbPool, version_id: &str) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            "SELECT * FROM content_items WHERE version_id = ?1",
            params![version_id],
            Self::from_row,
        )
        .ok()
    }

    /// Newest non-deleted version of a logical item.
    pub fn latest_version(pool: &DbPool, logical_id: i64) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            "SELECT * FROM content_items WHERE logical_id = ?1 AND status != 'deleted'
             ORDER BY version_number DESC LIMIT 1",
            params![logical_id],
            Self::from_row,
        )
        .ok()
    }

    /// Every version of a logical item, deleted ones included, oldest first.
    pub fn versions(pool: &DbPool, logical_id: i64) -> Result<Vec<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare("SELECT * FROM content_items WHERE logical_id = ?1 ORDER BY version_number")
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map(params![logical_id], Self::from_row)
            .map_err(|e| e.to_string())?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| e.to_string())
    }

    /// Non-deleted rows whose url_path starts with `prefix`.
    /// Uses substr() rather than LIKE so `_` and `%` in slugs match literally.
    pub fn by_path_prefix(pool: &DbPool, prefix: &str) -> Result<Vec<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM content_items
                 WHERE status != 'deleted' AND substr(url_path, 1, length(?1)) = ?1
                 ORDER BY logical_id, version_number DESC",
            )
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map(params![prefix], Self::from_row)
            .map_err(|e| e.to_string())?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| e.to_string())
    }

    /// Non-deleted blog post rows belonging to the stream keyed `blog_key`.
    pub fn by_blog_key(pool: &DbPool, blog_key: &str) -> Result<Vec<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM content_items
                 WHERE kind = 'blog_post' AND status != 'deleted' AND blog_key = ?1
                 ORDER BY logical_id, version_number DESC",
            )
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map(params![blog_key], Self::from_row)
            .map_err(|e| e.to_string())?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| e.to_string())
    }

    /// Logical id of another non-deleted item already at `url_path`.
    pub fn path_owner(pool: &DbPool, url_path: &str, exclude_logical_id: i64) -> Result<Option<i64>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.query_row(
            "SELECT logical_id FROM content_items
             WHERE url_path = ?1 AND logical_id != ?2 AND status != 'deleted'
             ORDER BY logical_id LIMIT 1",
            params![url_path, exclude_logical_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| e.to_string())
    }

    /// Case-insensitive title lookup across other non-deleted logical items.
    pub fn title_taken(
        pool: &DbPool,
        title: &str,
        exclude_logical_id: Option<i64>,
    ) -> Result<bool, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let count: i64 = match exclude_logical_id {
            Some(id) => conn.query_row(
                "SELECT COUNT(*) FROM content_items
                 WHERE title = ?1 COLLATE NOCASE AND logical_id != ?2 AND status != 'deleted'",
                params![title, id],
                |row| row.get(0),
            ),
            None => conn.query_row(
                "SELECT COUNT(*) FROM content_items
                 WHERE title = ?1 COLLATE NOCASE AND status != 'deleted'",
                params![title],
                |row| row.get(0),
            ),
        }
        .map_err(|e| e.to_string())?;
        Ok(count > 0)
    }

    pub fn create(pool: &DbPool, form: &ContentForm) -> Result<Self, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;

        let logical_id = match form.logical_id {
            Some(id) => id,
            None => conn
                .query_row(
                    "SELECT COALESCE(MAX(logical_id), 0) + 1 FROM content_items",
                    [],
                    |row| row.get(0),
                )
                .map_err(|e| e.to_string())?,
        };
        let version_number: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(version_number), 0) + 1 FROM content_items WHERE logical_id = ?1",
                params![logical_id],
                |row| row.get(0),
            )
            .map_err(|e| e.to_string())?;

        let item = ContentItem {
            version_id: uuid::Uuid::new_v4().to_string(),
            logical_id,
            version_number,
            title: form.title.clone(),
            url_path: form.url_path.clone(),
            kind: form.kind,
            blog_key: form.blog_key.clone(),
            body_html: form.body_html.clone(),
            published_at: form.published_at,
            status: form.status,
            owner_user_id: form.owner_user_id,
        };

        conn.execute(
            "INSERT INTO content_items (version_id, logical_id, version_number, title, url_path, kind,
             blog_key, body_html, published_at, status, owner_user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                item.version_id,
                item.logical_id,
                item.version_number,
                item.title,
                item.url_path,
                item.kind.as_str(),
                item.blog_key,
                item.body_html,
                item.published_at,
                item.status.as_str(),
                item.owner_user_id,
            ],
        )
        .map_err(|e| e.to_string())?;

        Ok(item)
    }

    pub fn update(pool: &DbPool, item: &ContentItem) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        Self::write(&conn, item)
    }

    /// Writes all rows in one transaction; a failure rolls back only this batch.
    pub fn update_batch(pool: &DbPool, items: &[ContentItem]) -> Result<(), String> {
        let mut conn = pool.get().map_err(|e| e.to_string())?;
        let tx = conn.transaction().map_err(|e| e.to_string())?;
        for item in items {
            Self::write(&tx, item)?;
        }
        tx.commit().map_err(|e| e.to_string())
    }

    fn write(conn: &rusqlite::Connection, item: &ContentItem) -> Result<(), String> {
        let changed = conn
            .execute(
                "UPDATE content_items SET title=?1, url_path=?2, kind=?3, blog_key=?4, body_html=?5,
                 published_at=?6, status=?7, updated_at=CURRENT_TIMESTAMP WHERE version_id=?8",
                params![
                    item.title,
                    item.url_path,
                    item.kind.as_str(),
                    item.blog_key,
                    item.body_html,
                    item.published_at,
                    item.status.as_str(),
                    item.version_id,
                ],
            )
            .map_err(|e| e.to_string())?;
        if changed == 0 {
            return Err(format!("content version {} not found", item.version_id));
        }
        Ok(())
    }
}

/// Collapse version rows to one row per logical item, keeping the highest
/// version number. Order of first appearance is preserved.
pub fn latest_per_logical(rows: Vec<ContentItem>) -> Vec<ContentItem> {
    let mut order: Vec<i64> = Vec::new();
    let mut best: HashMap<i64, ContentItem> = HashMap::new();
    for row in rows {
        match best.get(&row.logical_id) {
            Some(current) if current.version_number >= row.version_number => {}
            Some(_) => {
                best.insert(row.logical_id, row);
            }
            None => {
                order.push(row.logical_id);
                best.insert(row.logical_id, row);
            }
        }
    }
    order
        .into_iter()
        .filter_map(|id| best.remove(&id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(logical_id: i64, version_number: i64) -> ContentItem {
        ContentItem {
            version_id: format!("{}-{}", logical_id, version_number),
            logical_id,
            version_number,
            title: "T".to_string(),
            url_path: "t".to_string(),
            kind: ContentKind::General,
            blog_key: None,
            body_html: String::new(),
            published_at: None,
            status: ContentStatus::Active,
            owner_user_id: 1,
        }
    }

    #[test]
    fn latest_per_logical_keeps_highest_version() {
        let rows = vec![row(2, 1), row(1, 3), row(2, 4), row(1, 1)];
        let latest = latest_per_logical(rows);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].logical_id, 2);
        assert_eq!(latest[0].version_number, 4);
        assert_eq!(latest[1].logical_id, 1);
        assert_eq!(latest[1].version_number, 3);
    }

    #[test]
    fn kind_round_trips_through_text() {
        for kind in [
            ContentKind::General,
            ContentKind::BlogPost,
            ContentKind::BlogStream,
            ContentKind::Other,
        ] {
            assert_eq!(ContentKind::parse(kind.as_str()), kind);
        }
        assert_eq!(ContentKind::parse("landing_page"), ContentKind::Other);
    }

    #[test]
    fn live_requires_past_timestamp() {
        let now = chrono::NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let mut item = row(1, 1);
        assert!(!item.is_live_at(now));
        item.published_at = Some(now);
        assert!(item.is_live_at(now));
        item.published_at = Some(now + chrono::Duration::days(1));
        assert!(!item.is_live_at(now));
        item.published_at = Some(now);
        item.status = ContentStatus::Deleted;
        assert!(!item.is_live_at(now));
    }
}
