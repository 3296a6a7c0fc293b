use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::config::Config;
use crate::models::audit::AuditEntry;
use crate::models::content::{ContentForm, ContentItem};
use crate::models::page::PublishedPage;
use crate::models::redirect::Redirect;
use crate::models::reserved::ReservedPath;

pub mod mongo;
pub mod sqlite;

/// Unified data-access trait. Every database operation goes through here.
/// Implementations: `SqliteStore` (wraps rusqlite/r2d2) and `MongoStore` (wraps mongodb).
///
/// There is no locking or version token on content rows: two renames that
/// touch the same rows interleave and the last write wins.
pub trait Store: Send + Sync {
    // ── Lifecycle ───────────────────────────────────────────────────
    fn run_migrations(&self) -> Result<(), String>;
    fn seed_defaults(&self) -> Result<(), String>;
    /// Return the database backend name: "sqlite" or "mongodb"
    fn db_backend(&self) -> &str;

    // ── Content versions ────────────────────────────────────────────
    fn content_find_by_version_id(&self, version_id: &str) -> Option<ContentItem>;
    fn content_latest_version(&self, logical_id: i64) -> Option<ContentItem>;
    fn content_versions(&self, logical_id: i64) -> Result<Vec<ContentItem>, String>;
    fn content_by_path_prefix(&self, prefix: &str) -> Result<Vec<ContentItem>, String>;
    fn content_by_blog_key(&self, blog_key: &str) -> Result<Vec<ContentItem>, String>;
    /// Logical id of another non-deleted item holding `url_path`, if any.
    fn content_path_owner(&self, url_path: &str, exclude_logical_id: i64)
        -> Result<Option<i64>, String>;
    fn content_title_taken(
        &self,
        title: &str,
        exclude_logical_id: Option<i64>,
    ) -> Result<bool, String>;
    fn content_create(&self, form: &ContentForm) -> Result<ContentItem, String>;
    fn content_update(&self, item: &ContentItem) -> Result<(), String>;
    /// One batch is written atomically where the backend allows it.
    /// Separate calls are independent; nothing rolls back earlier batches.
    fn content_update_batch(&self, items: &[ContentItem]) -> Result<(), String>;

    // ── Redirects ───────────────────────────────────────────────────
    fn redirect_upsert(&self, old_path: &str, new_path: &str, created_by: i64)
        -> Result<(), String>;
    fn redirect_find(&self, old_path: &str) -> Option<Redirect>;
    fn redirect_list(&self, limit: i64, offset: i64) -> Vec<Redirect>;
    fn redirect_count(&self) -> i64;

    // ── Reserved paths ──────────────────────────────────────────────
    fn reserved_path_list(&self) -> Result<Vec<ReservedPath>, String>;
    fn reserved_path_add(&self, path: &str) -> Result<(), String>;

    // ── Published pages ─────────────────────────────────────────────
    fn page_upsert(&self, item: &ContentItem, html: &str) -> Result<(), String>;
    fn page_remove(&self, version_id: &str) -> Result<(), String>;
    fn page_resolve(&self, url_path: &str, now: &NaiveDateTime) -> Option<PublishedPage>;
    fn page_for_logical(&self, logical_id: i64) -> Vec<PublishedPage>;

    // ── Audit ───────────────────────────────────────────────────────
    fn audit_log(
        &self,
        user_id: Option<i64>,
        action: &str,
        entity_type: Option<&str>,
        entity_id: Option<i64>,
        entity_title: Option<&str>,
        details: Option<&str>,
    ) -> Result<(), String>;
    fn audit_for_entity(&self, entity_type: &str, entity_id: i64, limit: i64) -> Vec<AuditEntry>;
}

/// Open the backend selected in retitle.toml and bring its schema up to date.
pub fn open(config: &Config) -> Result<Arc<dyn Store>, String> {
    let store: Arc<dyn Store> = if config.is_mongo() {
        let mongo = mongo::MongoStore::new(&config.database.uri, &config.database.name)?;
        mongo.test_connection()?;
        Arc::new(mongo)
    } else {
        Arc::new(sqlite::SqliteStore::new_at(&config.database.path)?)
    };
    store.run_migrations()?;
    store.seed_defaults()?;
    log::info!("Store ready ({})", store.db_backend());
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::{ContentKind, ContentStatus};
    use crate::store::sqlite::SqliteStore;

    /// Create a fresh in-memory SqliteStore with migrations + seed applied.
    fn test_store() -> SqliteStore {
        let manager = r2d2_sqlite::SqliteConnectionManager::memory();
        let pool = r2d2::Pool::builder()
            .max_size(1)
            .build(manager)
            .expect("Failed to create in-memory pool");
        let store = SqliteStore::new(pool);
        store.run_migrations().expect("migrations failed");
        store.seed_defaults().expect("seed failed");
        store
    }

    fn form(logical_id: Option<i64>, title: &str, url_path: &str, kind: ContentKind) -> ContentForm {
        ContentForm {
            logical_id,
            title: title.to_string(),
            url_path: url_path.to_string(),
            kind,
            blog_key: None,
            body_html: String::new(),
            published_at: None,
            status: ContentStatus::Active,
            owner_user_id: 1,
        }
    }

    // ── Content ─────────────────────────────────────────────────────

    #[test]
    fn test_content_create_assigns_ids() {
        let s = test_store();
        let first = s.content_create(&form(None, "About", "about", ContentKind::General)).unwrap();
        assert_eq!(first.logical_id, 1);
        assert_eq!(first.version_number, 1);
        assert!(!first.version_id.is_empty());

        let second = s
            .content_create(&form(Some(first.logical_id), "About", "about", ContentKind::General))
            .unwrap();
        assert_eq!(second.logical_id, first.logical_id);
        assert_eq!(second.version_number, 2);
        assert_ne!(second.version_id, first.version_id);

        let other = s.content_create(&form(None, "Contact", "contact", ContentKind::General)).unwrap();
        assert_eq!(other.logical_id, 2);

        let latest = s.content_latest_version(first.logical_id).unwrap();
        assert_eq!(latest.version_id, second.version_id);
        assert_eq!(s.content_versions(first.logical_id).unwrap().len(), 2);
        assert_eq!(
            s.content_find_by_version_id(&first.version_id).unwrap().title,
            "About"
        );
    }

    #[test]
    fn test_content_latest_skips_deleted() {
        let s = test_store();
        let v1 = s.content_create(&form(None, "A", "a", ContentKind::General)).unwrap();
        let mut f = form(Some(v1.logical_id), "A", "a", ContentKind::General);
        f.status = ContentStatus::Deleted;
        s.content_create(&f).unwrap();
        assert_eq!(s.content_latest_version(v1.logical_id).unwrap().version_id, v1.version_id);
    }

    #[test]
    fn test_content_prefix_query_is_literal() {
        let s = test_store();
        s.content_create(&form(None, "Docs", "docs", ContentKind::General)).unwrap();
        s.content_create(&form(None, "Start", "docs/start", ContentKind::General)).unwrap();
        s.content_create(&form(None, "Docs2", "docs2/x", ContentKind::General)).unwrap();
        s.content_create(&form(None, "Under", "docs_/x", ContentKind::General)).unwrap();

        let rows = s.content_by_path_prefix("docs/").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].url_path, "docs/start");

        let rows = s.content_by_path_prefix("docs_/").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].url_path, "docs_/x");
    }

    #[test]
    fn test_content_by_blog_key_only_posts() {
        let s = test_store();
        let mut stream = form(None, "Tech", "tech", ContentKind::BlogStream);
        stream.blog_key = Some("tech".to_string());
        s.content_create(&stream).unwrap();
        let mut post = form(None, "Hello", "tech/hello", ContentKind::BlogPost);
        post.blog_key = Some("tech".to_string());
        s.content_create(&post).unwrap();

        let rows = s.content_by_blog_key("tech").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, ContentKind::BlogPost);
    }

    #[test]
    fn test_content_path_owner_and_title_taken() {
        let s = test_store();
        let a = s.content_create(&form(None, "Pricing", "pricing", ContentKind::General)).unwrap();
        assert_eq!(s.content_path_owner("pricing", a.logical_id + 1).unwrap(), Some(a.logical_id));
        assert_eq!(s.content_path_owner("pricing", a.logical_id).unwrap(), None);
        assert!(s.content_title_taken("PRICING", None).unwrap());
        assert!(!s.content_title_taken("pricing", Some(a.logical_id)).unwrap());
    }

    #[test]
    fn test_content_update_batch_is_atomic() {
        let s = test_store();
        let mut a = s.content_create(&form(None, "A", "a", ContentKind::General)).unwrap();
        a.title = "A2".to_string();
        let mut ghost = a.clone();
        ghost.version_id = "missing".to_string();
        assert!(s.content_update_batch(&[a.clone(), ghost]).is_err());
        assert_eq!(s.content_find_by_version_id(&a.version_id).unwrap().title, "A");

        s.content_update_batch(&[a.clone()]).unwrap();
        assert_eq!(s.content_find_by_version_id(&a.version_id).unwrap().title, "A2");
    }

    // ── Redirects ───────────────────────────────────────────────────

    #[test]
    fn test_redirect_upsert_keyed_by_old_path() {
        let s = test_store();
        s.redirect_upsert("old", "new", 7).unwrap();
        s.redirect_upsert("old", "newer", 8).unwrap();
        assert_eq!(s.redirect_count(), 1);
        let r = s.redirect_find("old").unwrap();
        assert_eq!(r.new_path, "newer");
        assert_eq!(r.created_by, 8);
    }

    #[test]
    fn test_redirect_chain_flattened() {
        let s = test_store();
        s.redirect_upsert("a", "b", 1).unwrap();
        s.redirect_upsert("b", "c", 1).unwrap();
        assert_eq!(s.redirect_find("a").unwrap().new_path, "c");
        assert_eq!(s.redirect_find("b").unwrap().new_path, "c");

        // Renaming back must not create a self-redirect
        s.redirect_upsert("c", "a", 1).unwrap();
        assert_eq!(s.redirect_find("a").unwrap().new_path, "c");
        assert_eq!(s.redirect_find("b").unwrap().new_path, "a");
        assert_eq!(s.redirect_find("c").unwrap().new_path, "a");
    }

    #[test]
    fn test_redirect_same_path_ignored() {
        let s = test_store();
        s.redirect_upsert("same", "same", 1).unwrap();
        assert_eq!(s.redirect_count(), 0);
    }

    // ── Reserved paths ──────────────────────────────────────────────

    #[test]
    fn test_reserved_paths_seeded() {
        let s = test_store();
        let paths = s.reserved_path_list().unwrap();
        assert!(paths.iter().any(|p| p.path == "admin"));
        assert!(paths.iter().any(|p| p.path == "api/*"));
        s.reserved_path_add("billing").unwrap();
        s.reserved_path_add("billing").unwrap();
        assert_eq!(
            s.reserved_path_list().unwrap().iter().filter(|p| p.path == "billing").count(),
            1
        );
    }

    // ── Pages ───────────────────────────────────────────────────────

    #[test]
    fn test_page_resolve_prefers_newest_live_version() {
        let s = test_store();
        let ts = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut f = form(None, "Home", "home", ContentKind::General);
        f.published_at = Some(ts);
        let v1 = s.content_create(&f).unwrap();
        f.logical_id = Some(v1.logical_id);
        let v2 = s.content_create(&f).unwrap();
        s.page_upsert(&v1, "<p>v1</p>").unwrap();
        s.page_upsert(&v2, "<p>v2</p>").unwrap();

        let now = chrono::Utc::now().naive_utc();
        assert_eq!(s.page_resolve("home", &now).unwrap().html, "<p>v2</p>");

        s.page_remove(&v2.version_id).unwrap();
        assert_eq!(s.page_resolve("home", &now).unwrap().html, "<p>v1</p>");
        assert_eq!(s.page_for_logical(v1.logical_id).len(), 1);
        assert!(s.page_resolve("home", &(ts - chrono::Duration::days(1))).is_none());
    }

    // ── Audit ───────────────────────────────────────────────────────

    #[test]
    fn test_audit_log() {
        let s = test_store();
        s.audit_log(Some(1), "retitle", Some("content"), Some(42), Some("My Page"), None)
            .unwrap();
        let entries = s.audit_for_entity("content", 42, 10);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "retitle");
    }
}
