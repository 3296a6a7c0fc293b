use chrono::NaiveDateTime;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::models::audit::AuditEntry;
use crate::models::content::{ContentForm, ContentItem};
use crate::models::page::PublishedPage;
use crate::models::redirect::Redirect;
use crate::models::reserved::ReservedPath;

use super::Store;

pub type DbPool = Pool<SqliteConnectionManager>;

/// SQLite-backed implementation of the Store trait.
/// Wraps the r2d2 connection pool and delegates to model methods.
pub struct SqliteStore {
    pub pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn new_at(path: &str) -> Result<Self, String> {
        let pool = crate::db::init_pool_at(path)?;
        Ok(Self { pool })
    }
}

impl Store for SqliteStore {
    // ── Lifecycle ───────────────────────────────────────────────────

    fn run_migrations(&self) -> Result<(), String> {
        crate::db::run_migrations(&self.pool).map_err(|e| e.to_string())
    }

    fn seed_defaults(&self) -> Result<(), String> {
        crate::db::seed_defaults(&self.pool).map_err(|e| e.to_string())
    }

    fn db_backend(&self) -> &str {
        "sqlite"
    }

    // ── Content versions ────────────────────────────────────────────

    fn content_find_by_version_id(&self, version_id: &str) -> Option<ContentItem> {
        ContentItem::find_by_version_id(&self.pool, version_id)
    }

    fn content_latest_version(&self, logical_id: i64) -> Option<ContentItem> {
        ContentItem::latest_version(&self.pool, logical_id)
    }

    fn content_versions(&self, logical_id: i64) -> Result<Vec<ContentItem>, String> {
        ContentItem::versions(&self.pool, logical_id)
    }

    fn content_by_path_prefix(&self, prefix: &str) -> Result<Vec<ContentItem>, String> {
        ContentItem::by_path_prefix(&self.pool, prefix)
    }

    fn content_by_blog_key(&self, blog_key: &str) -> Result<Vec<ContentItem>, String> {
        ContentItem::by_blog_key(&self.pool, blog_key)
    }

    fn content_path_owner(&self, url_path: &str, exclude_logical_id: i64) -> Result<Option<i64>, String> {
        ContentItem::path_owner(&self.pool, url_path, exclude_logical_id)
    }

    fn content_title_taken(
        &self,
        title: &str,
        exclude_logical_id: Option<i64>,
    ) -> Result<bool, String> {
        ContentItem::title_taken(&self.pool, title, exclude_logical_id)
    }

    fn content_create(&self, form: &ContentForm) -> Result<ContentItem, String> {
        ContentItem::create(&self.pool, form)
    }

    fn content_update(&self, item: &ContentItem) -> Result<(), String> {
        ContentItem::update(&self.pool, item)
    }

    fn content_update_batch(&self, items: &[ContentItem]) -> Result<(), String> {
        ContentItem::update_batch(&self.pool, items)
    }

    // ── Redirects ───────────────────────────────────────────────────

    fn redirect_upsert(
        &self,
        old_path: &str,
        new_path: &str,
        created_by: i64,
    ) -> Result<(), String> {
        Redirect::upsert(&self.pool, old_path, new_path, created_by)
    }

    fn redirect_find(&self, old_path: &str) -> Option<Redirect> {
        Redirect::find(&self.pool, old_path)
    }

    fn redirect_list(&self, limit: i64, offset: i64) -> Vec<Redirect> {
        Redirect::list(&self.pool, limit, offset)
    }

    fn redirect_count(&self) -> i64 {
        Redirect::count(&self.pool)
    }

    // ── Reserved paths ──────────────────────────────────────────────

    fn reserved_path_list(&self) -> Result<Vec<ReservedPath>, String> {
        ReservedPath::list(&self.pool)
    }

    fn reserved_path_add(&self, path: &str) -> Result<(), String> {
        ReservedPath::add(&self.pool, path)
    }

    // ── Published pages ─────────────────────────────────────────────

    fn page_upsert(&self, item: &ContentItem, html: &str) -> Result<(), String> {
        PublishedPage::upsert(&self.pool, item, html)
    }

    fn page_remove(&self, version_id: &str) -> Result<(), String> {
        PublishedPage::remove(&self.pool, version_id)
    }

    fn page_resolve(&self, url_path: &str, now: &NaiveDateTime) -> Option<PublishedPage> {
        PublishedPage::resolve(&self.pool, url_path, now)
    }

    fn page_for_logical(&self, logical_id: i64) -> Vec<PublishedPage> {
        PublishedPage::for_logical(&self.pool, logical_id)
    }

    // ── Audit ───────────────────────────────────────────────────────

    fn audit_log(
        &self,
        user_id: Option<i64>,
        action: &str,
        entity_type: Option<&str>,
        entity_id: Option<i64>,
        entity_title: Option<&str>,
        details: Option<&str>,
    ) -> Result<(), String> {
        AuditEntry::log(
            &self.pool,
            user_id,
            action,
            entity_type,
            entity_id,
            entity_title,
            details,
        )
    }

    fn audit_for_entity(&self, entity_type: &str, entity_id: i64, limit: i64) -> Vec<AuditEntry> {
        AuditEntry::for_entity(&self.pool, entity_type, entity_id, limit)
    }
}
