use chrono::NaiveDateTime;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{ClientOptions, FindOneOptions, FindOptions, IndexOptions, UpdateOptions};
use mongodb::sync::Client;
use mongodb::sync::Database;
use mongodb::IndexModel;

use crate::models::audit::AuditEntry;
use crate::models::content::{ContentForm, ContentItem, ContentKind, ContentStatus};
use crate::models::page::PublishedPage;
use crate::models::redirect::Redirect;
use crate::models::reserved::ReservedPath;

use super::Store;

const DT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// MongoDB-backed implementation of the Store trait.
///
/// Batches are written document by document: without a replica set there
/// are no multi-document transactions, so a failed batch may be partially
/// applied.
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Create a new MongoStore by connecting to the given URI and database name.
    pub fn new(uri: &str, db_name: &str) -> Result<Self, String> {
        let client_options = ClientOptions::parse(uri).map_err(|e| e.to_string())?;
        let client = Client::with_options(client_options).map_err(|e| e.to_string())?;
        let db = client.database(db_name);
        Ok(Self { db })
    }

    /// Test connectivity by pinging the server.
    pub fn test_connection(&self) -> Result<(), String> {
        self.db
            .run_command(doc! { "ping": 1 }, None)
            .map_err(|e| format!("MongoDB connection test failed: {}", e))?;
        Ok(())
    }

    // ── Helper: get next auto-increment ID for a collection ──
    fn next_id(&self, collection_name: &str) -> Result<i64, String> {
        let counters = self.db.collection::<Document>("_counters");
        let filter = doc! { "_id": collection_name };
        let update = doc! { "$inc": { "seq": 1_i64 } };
        let opts = mongodb::options::FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(mongodb::options::ReturnDocument::After)
            .build();
        let result = counters
            .find_one_and_update(filter, update, opts)
            .map_err(|e| e.to_string())?;
        match result {
            Some(d) => d
                .get_i64("seq")
                .map_err(|e| format!("Failed to get seq: {}", e)),
            None => Err("Failed to generate ID".to_string()),
        }
    }

    fn index(&self, collection: &str, keys: Document, unique: bool) -> Result<(), String> {
        self.db
            .collection::<Document>(collection)
            .create_index(
                IndexModel::builder()
                    .keys(keys)
                    .options(IndexOptions::builder().unique(unique).build())
                    .build(),
                None,
            )
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn find_content(&self, filter: Document) -> Result<Vec<ContentItem>, String> {
        let coll = self.db.collection::<Document>("content_items");
        let opts = FindOptions::builder()
            .sort(doc! { "logical_id": 1, "version_number": -1 })
            .build();
        let cursor = coll.find(filter, opts).map_err(|e| e.to_string())?;
        let mut items = Vec::new();
        for d in cursor {
            let d = d.map_err(|e| e.to_string())?;
            if let Some(item) = doc_to_content(&d) {
                items.push(item);
            }
        }
        Ok(items)
    }
}

impl Store for MongoStore {
    // ── Lifecycle ───────────────────────────────────────────────────

    fn run_migrations(&self) -> Result<(), String> {
        self.index("content_items", doc! { "version_id": 1 }, true)?;
        self.index(
            "content_items",
            doc! { "logical_id": 1, "version_number": 1 },
            true,
        )?;
        self.index("content_items", doc! { "url_path": 1 }, false)?;
        self.index("content_items", doc! { "blog_key": 1 }, false)?;
        self.index("redirects", doc! { "old_path": 1 }, true)?;
        self.index("redirects", doc! { "new_path": 1 }, false)?;
        self.index("reserved_paths", doc! { "path": 1 }, true)?;
        self.index("published_pages", doc! { "version_id": 1 }, true)?;
        self.index("published_pages", doc! { "url_path": 1 }, false)?;
        self.index("audit_log", doc! { "entity_type": 1, "entity_id": 1 }, false)?;
        Ok(())
    }

    fn seed_defaults(&self) -> Result<(), String> {
        for path in crate::db::DEFAULT_RESERVED_PATHS {
            self.reserved_path_add(path)?;
        }
        Ok(())
    }

    fn db_backend(&self) -> &str {
        "mongodb"
    }

    // ── Content versions ────────────────────────────────────────────

    fn content_find_by_version_id(&self, version_id: &str) -> Option<ContentItem> {
        let coll = self.db.collection::<Document>("content_items");
        let d = coll.find_one(doc! { "version_id": version_id }, None).ok()??;
        doc_to_content(&d)
    }

    fn content_latest_version(&self, logical_id: i64) -> Option<ContentItem> {
        let coll = self.db.collection::<Document>("content_items");
        let opts = FindOneOptions::builder()
            .sort(doc! { "version_number": -1 })
            .build();
        let d = coll
            .find_one(
                doc! { "logical_id": logical_id, "status": { "$ne": "deleted" } },
                opts,
            )
            .ok()??;
        doc_to_content(&d)
    }

    fn content_versions(&self, logical_id: i64) -> Result<Vec<ContentItem>, String> {
        let mut items = self.find_content(doc! { "logical_id": logical_id })?;
        items.sort_by_key(|i| i.version_number);
        Ok(items)
    }

    fn content_by_path_prefix(&self, prefix: &str) -> Result<Vec<ContentItem>, String> {
        let pattern = format!("^{}", regex::escape(prefix));
        self.find_content(doc! {
            "url_path": { "$regex": pattern },
            "status": { "$ne": "deleted" },
        })
    }

    fn content_by_blog_key(&self, blog_key: &str) -> Result<Vec<ContentItem>, String> {
        self.find_content(doc! {
            "kind": ContentKind::BlogPost.as_str(),
            "blog_key": blog_key,
            "status": { "$ne": "deleted" },
        })
    }

    fn content_path_owner(
        &self,
        url_path: &str,
        exclude_logical_id: i64,
    ) -> Result<Option<i64>, String> {
        let coll = self.db.collection::<Document>("content_items");
        let opts = FindOneOptions::builder().sort(doc! { "logical_id": 1 }).build();
        let found = coll
            .find_one(
                doc! {
                    "url_path": url_path,
                    "logical_id": { "$ne": exclude_logical_id },
                    "status": { "$ne": "deleted" },
                },
                opts,
            )
            .map_err(|e| e.to_string())?;
        Ok(found.and_then(|d| d.get_i64("logical_id").ok()))
    }

    fn content_title_taken(
        &self,
        title: &str,
        exclude_logical_id: Option<i64>,
    ) -> Result<bool, String> {
        let coll = self.db.collection::<Document>("content_items");
        let pattern = format!("^{}$", regex::escape(title));
        let mut filter = doc! {
            "title": { "$regex": pattern, "$options": "i" },
            "status": { "$ne": "deleted" },
        };
        if let Some(id) = exclude_logical_id {
            filter.insert("logical_id", doc! { "$ne": id });
        }
        let n = coll
            .count_documents(filter, None)
            .map_err(|e| e.to_string())?;
        Ok(n > 0)
    }

    fn content_create(&self, form: &ContentForm) -> Result<ContentItem, String> {
        let coll = self.db.collection::<Document>("content_items");
        let logical_id = match form.logical_id {
            Some(id) => id,
            None => self.next_id("content_items")?,
        };
        let opts = FindOneOptions::builder()
            .sort(doc! { "version_number": -1 })
            .build();
        let version_number = coll
            .find_one(doc! { "logical_id": logical_id }, opts)
            .map_err(|e| e.to_string())?
            .and_then(|d| d.get_i64("version_number").ok())
            .unwrap_or(0)
            + 1;

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
        let now = chrono::Utc::now().to_rfc3339();
        let mut d = content_to_doc(&item);
        d.insert("created_at", &now);
        d.insert("updated_at", &now);
        coll.insert_one(d, None).map_err(|e| e.to_string())?;
        Ok(item)
    }

    fn content_update(&self, item: &ContentItem) -> Result<(), String> {
        let coll = self.db.collection::<Document>("content_items");
        let mut fields = content_to_doc(item);
        fields.insert("updated_at", chrono::Utc::now().to_rfc3339());
        let result = coll
            .update_one(
                doc! { "version_id": &item.version_id },
                doc! { "$set": fields },
                None,
            )
            .map_err(|e| e.to_string())?;
        if result.matched_count == 0 {
            return Err(format!("content version {} not found", item.version_id));
        }
        Ok(())
    }

    fn content_update_batch(&self, items: &[ContentItem]) -> Result<(), String> {
        for item in items {
            self.content_update(item)?;
        }
        Ok(())
    }

    // ── Redirects ───────────────────────────────────────────────────

    fn redirect_upsert(
        &self,
        old_path: &str,
        new_path: &str,
        created_by: i64,
    ) -> Result<(), String> {
        if old_path == new_path {
            return Ok(());
        }
        let coll = self.db.collection::<Document>("redirects");
        let now = chrono::Utc::now().to_rfc3339();
        let existing = coll
            .find_one(doc! { "old_path": old_path }, None)
            .map_err(|e| e.to_string())?;
        if existing.is_none() {
            let id = self.next_id("redirects")?;
            coll.update_one(
                doc! { "old_path": old_path },
                doc! { "$setOnInsert": { "id": id, "created_at": &now } },
                UpdateOptions::builder().upsert(true).build(),
            )
            .map_err(|e| e.to_string())?;
        }
        coll.update_one(
            doc! { "old_path": old_path },
            doc! { "$set": {
                "new_path": new_path,
                "created_by": created_by,
                "updated_at": &now,
            }},
            None,
        )
        .map_err(|e| e.to_string())?;
        coll.update_many(
            doc! { "new_path": old_path, "old_path": { "$ne": new_path } },
            doc! { "$set": { "new_path": new_path, "updated_at": &now } },
            None,
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn redirect_find(&self, old_path: &str) -> Option<Redirect> {
        let coll = self.db.collection::<Document>("redirects");
        let d = coll.find_one(doc! { "old_path": old_path }, None).ok()??;
        doc_to_redirect(&d)
    }

    fn redirect_list(&self, limit: i64, offset: i64) -> Vec<Redirect> {
        let coll = self.db.collection::<Document>("redirects");
        let opts = FindOptions::builder()
            .sort(doc! { "updated_at": -1, "id": -1 })
            .skip(offset.max(0) as u64)
            .limit(limit)
            .build();
        let cursor = match coll.find(doc! {}, opts) {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        cursor
            .filter_map(|r| r.ok())
            .filter_map(|d| doc_to_redirect(&d))
            .collect()
    }

    fn redirect_count(&self) -> i64 {
        let coll = self.db.collection::<Document>("redirects");
        coll.count_documents(doc! {}, None).unwrap_or(0) as i64
    }

    // ── Reserved paths ──────────────────────────────────────────────

    fn reserved_path_list(&self) -> Result<Vec<ReservedPath>, String> {
        let coll = self.db.collection::<Document>("reserved_paths");
        let opts = FindOptions::builder().sort(doc! { "path": 1 }).build();
        let cursor = coll.find(doc! {}, opts).map_err(|e| e.to_string())?;
        let mut paths = Vec::new();
        for d in cursor {
            let d = d.map_err(|e| e.to_string())?;
            if let Ok(path) = d.get_str("path") {
                paths.push(ReservedPath::new(path));
            }
        }
        Ok(paths)
    }

    fn reserved_path_add(&self, path: &str) -> Result<(), String> {
        let coll = self.db.collection::<Document>("reserved_paths");
        coll.update_one(
            doc! { "path": path },
            doc! { "$setOnInsert": { "path": path } },
            UpdateOptions::builder().upsert(true).build(),
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    // ── Published pages ─────────────────────────────────────────────

    fn page_upsert(&self, item: &ContentItem, html: &str) -> Result<(), String> {
        let published_at = item
            .published_at
            .ok_or_else(|| format!("content version {} has no publish date", item.version_id))?;
        let coll = self.db.collection::<Document>("published_pages");
        coll.update_one(
            doc! { "version_id": &item.version_id },
            doc! { "$set": {
                "logical_id": item.logical_id,
                "version_number": item.version_number,
                "url_path": &item.url_path,
                "html": html,
                "published_at": fmt_dt(&published_at),
                "rendered_at": chrono::Utc::now().to_rfc3339(),
            }},
            UpdateOptions::builder().upsert(true).build(),
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn page_remove(&self, version_id: &str) -> Result<(), String> {
        let coll = self.db.collection::<Document>("published_pages");
        coll.delete_one(doc! { "version_id": version_id }, None)
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn page_resolve(&self, url_path: &str, now: &NaiveDateTime) -> Option<PublishedPage> {
        let coll = self.db.collection::<Document>("published_pages");
        let opts = FindOneOptions::builder()
            .sort(doc! { "version_number": -1 })
            .build();
        let d = coll
            .find_one(
                doc! { "url_path": url_path, "published_at": { "$lte": fmt_dt(now) } },
                opts,
            )
            .ok()??;
        doc_to_page(&d)
    }

    fn page_for_logical(&self, logical_id: i64) -> Vec<PublishedPage> {
        let coll = self.db.collection::<Document>("published_pages");
        let opts = FindOptions::builder()
            .sort(doc! { "version_number": 1 })
            .build();
        let cursor = match coll.find(doc! { "logical_id": logical_id }, opts) {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        cursor
            .filter_map(|r| r.ok())
            .filter_map(|d| doc_to_page(&d))
            .collect()
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
        let id = self.next_id("audit_log")?;
        let coll = self.db.collection::<Document>("audit_log");
        coll.insert_one(
            doc! {
                "id": id,
                "user_id": user_id,
                "action": action,
                "entity_type": entity_type,
                "entity_id": entity_id,
                "entity_title": entity_title,
                "details": details,
                "created_at": chrono::Utc::now().to_rfc3339(),
            },
            None,
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn audit_for_entity(&self, entity_type: &str, entity_id: i64, limit: i64) -> Vec<AuditEntry> {
        let coll = self.db.collection::<Document>("audit_log");
        let opts = FindOptions::builder()
            .sort(doc! { "created_at": -1, "id": -1 })
            .limit(limit)
            .build();
        let cursor = match coll.find(
            doc! { "entity_type": entity_type, "entity_id": entity_id },
            opts,
        ) {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        cursor
            .filter_map(|r| r.ok())
            .filter_map(|d| doc_to_audit(&d))
            .collect()
    }
}

// ── Helpers: date handling ───────────────────────────────────────────

fn fmt_dt(dt: &NaiveDateTime) -> String {
    dt.format(DT_FORMAT).to_string()
}

fn parse_naive_dt(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, DT_FORMAT))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

fn parse_naive_dt_rfc3339(s: &str) -> Option<NaiveDateTime> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.naive_utc())
        .ok()
        .or_else(|| parse_naive_dt(s))
}

fn opt_str(doc: &Document, key: &str) -> Option<String> {
    doc.get_str(key).ok().map(|s| s.to_string())
}

// ── Helpers: BSON conversion ─────────────────────────────────────────

fn content_to_doc(item: &ContentItem) -> Document {
    doc! {
        "version_id": &item.version_id,
        "logical_id": item.logical_id,
        "version_number": item.version_number,
        "title": &item.title,
        "url_path": &item.url_path,
        "kind": item.kind.as_str(),
        "blog_key": item.blog_key.as_deref().map(Bson::from).unwrap_or(Bson::Null),
        "body_html": &item.body_html,
        "published_at": item.published_at.as_ref().map(|t| Bson::from(fmt_dt(t))).unwrap_or(Bson::Null),
        "status": item.status.as_str(),
        "owner_user_id": item.owner_user_id,
    }
}

fn doc_to_content(doc: &Document) -> Option<ContentItem> {
    Some(ContentItem {
        version_id: doc.get_str("version_id").ok()?.to_string(),
        logical_id: doc.get_i64("logical_id").ok()?,
        version_number: doc.get_i64("version_number").ok()?,
        title: doc.get_str("title").ok()?.to_string(),
        url_path: doc.get_str("url_path").ok().unwrap_or("").to_string(),
        kind: ContentKind::parse(doc.get_str("kind").ok().unwrap_or("general")),
        blog_key: opt_str(doc, "blog_key"),
        body_html: doc.get_str("body_html").ok().unwrap_or("").to_string(),
        published_at: doc.get_str("published_at").ok().and_then(parse_naive_dt),
        status: ContentStatus::parse(doc.get_str("status").ok().unwrap_or("active")),
        owner_user_id: doc.get_i64("owner_user_id").unwrap_or(0),
    })
}

fn doc_to_redirect(doc: &Document) -> Option<Redirect> {
    Some(Redirect {
        id: doc.get_i64("id").ok()?,
        old_path: doc.get_str("old_path").ok()?.to_string(),
        new_path: doc.get_str("new_path").ok()?.to_string(),
        created_by: doc.get_i64("created_by").unwrap_or(0),
        created_at: doc
            .get_str("created_at")
            .ok()
            .and_then(parse_naive_dt_rfc3339)?,
        updated_at: doc
            .get_str("updated_at")
            .ok()
            .and_then(parse_naive_dt_rfc3339)?,
    })
}

fn doc_to_page(doc: &Document) -> Option<PublishedPage> {
    Some(PublishedPage {
        version_id: doc.get_str("version_id").ok()?.to_string(),
        logical_id: doc.get_i64("logical_id").ok()?,
        version_number: doc.get_i64("version_number").ok()?,
        url_path: doc.get_str("url_path").ok()?.to_string(),
        html: doc.get_str("html").ok().unwrap_or("").to_string(),
        published_at: doc.get_str("published_at").ok().and_then(parse_naive_dt)?,
    })
}

fn doc_to_audit(doc: &Document) -> Option<AuditEntry> {
    Some(AuditEntry {
        id: doc.get_i64("id").ok()?,
        user_id: doc.get_i64("user_id").ok(),
        action: doc.get_str("action").ok()?.to_string(),
        entity_type: opt_str(doc, "entity_type"),
        entity_id: doc.get_i64("entity_id").ok(),
        entity_title: opt_str(doc, "entity_title"),
        details: opt_str(doc, "details"),
        created_at: doc
            .get_str("created_at")
            .ok()
            .and_then(parse_naive_dt_rfc3339)?,
    })
}
