//! Title change cascade.
//!
//! Renaming an item changes its slug. The new slug is written to the item,
//! pushed down to dependents (entries of a blog stream, pages below a
//! general page), copied onto every other version of each touched logical
//! item, and every moved path gets a redirect. Live versions are
//! republished along the way.
//!
//! Nothing here is transactional across rows. Version rows are written in
//! fixed-size batches and a failure part way leaves earlier batches
//! committed. Concurrent renames of overlapping trees are not serialized.

use serde::Serialize;

use crate::error::RetitleError;
use crate::events::{EventDispatcher, TitleChanged};
use crate::models::content::{ContentItem, ContentKind};
use crate::publish::Publisher;
use crate::redirects::{MovedPaths, RedirectLedger};
use crate::render::BlogRenderer;
use crate::slugs;
use crate::store::Store;

mod cascade;
pub mod sync;
pub mod validate;

pub use sync::VersionBatch;
pub use validate::{check_title, validate_title};

pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Collaborators for one rename, plus who is doing it.
pub struct TitleChange<'a> {
    pub store: &'a dyn Store,
    pub publisher: &'a dyn Publisher,
    pub ledger: &'a dyn RedirectLedger,
    pub renderer: &'a dyn BlogRenderer,
    pub events: &'a EventDispatcher,
    pub acting_user_id: i64,
    pub batch_size: usize,
}

#[derive(Debug, Default, Clone, Serialize, PartialEq)]
pub struct TitleChangeReport {
    pub logical_id: i64,
    /// Slug did not change; nothing was written.
    pub unchanged: bool,
    pub old_slug: String,
    pub new_slug: String,
    /// Dependents (blog entries or sub-pages) moved with the item.
    pub dependents: usize,
    pub moved_paths: Vec<(String, String)>,
    pub versions_synced: usize,
    pub republished: usize,
    pub redirect_failures: usize,
}

impl<'a> TitleChange<'a> {
    /// `item` already carries its new title; `old_title` is what it had before.
    pub fn handle_title_change(
        &self,
        mut item: ContentItem,
        old_title: &str,
    ) -> Result<TitleChangeReport, RetitleError> {
        let now = chrono::Utc::now().naive_utc();

        let old_slug = match item.kind {
            ContentKind::BlogPost => {
                slugs::normalize_under(old_title, item.blog_key.as_deref().unwrap_or(""))
            }
            _ => slugs::normalize(old_title),
        };
        let new_slug = slugs::build_article_url(&item);

        let mut report = TitleChangeReport {
            logical_id: item.logical_id,
            old_slug: old_slug.clone(),
            new_slug: new_slug.clone(),
            ..Default::default()
        };

        if old_slug.eq_ignore_ascii_case(&new_slug) && !item.url_path.is_empty() {
            report.unchanged = true;
            return Ok(report);
        }
        // A title of only punctuation slugifies to nothing
        if new_slug.is_empty() || new_slug.ends_with('/') {
            return Err(RetitleError::EmptyTitle);
        }

        // Dependents hang off the path the item actually had, which may
        // not be the slug of its old title
        let old_path = if item.url_path.is_empty() {
            old_slug.clone()
        } else {
            item.url_path.clone()
        };
        let old_key = item
            .blog_key
            .clone()
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| old_path.clone());

        let owner = self
            .store
            .content_path_owner(&new_slug, item.logical_id)
            .map_err(RetitleError::Persistence)?;
        if let Some(owner) = owner {
            return Err(RetitleError::SlugConflict {
                slug: new_slug,
                logical_id: owner,
            });
        }

        let mut moved = MovedPaths::new();
        moved.record(&old_path, &new_slug);
        if old_slug != old_path {
            let slug_owner = self
                .store
                .content_path_owner(&old_slug, item.logical_id)
                .map_err(RetitleError::Persistence)?;
            if slug_owner.is_none() {
                moved.record(&old_slug, &new_slug);
            }
        }

        item.url_path = new_slug.clone();
        if item.kind == ContentKind::BlogStream {
            item.blog_key = Some(new_slug.clone());
        }
        if let Err(e) = self.store.content_update(&item) {
            log::error!("[retitle] content {}: write failed: {}", item.logical_id, e);
            return Err(RetitleError::Persistence(e));
        }

        let mut batch = VersionBatch::new(self.store, self.publisher, self.batch_size);

        report.dependents = match item.kind {
            ContentKind::BlogStream => cascade::blog_entries(
                self, &mut item, &old_key, &new_slug, &mut moved, &mut batch, now,
            )?,
            ContentKind::General => cascade::descendants(
                self, &item, &old_path, &new_slug, &mut moved, &mut batch, now,
            )?,
            ContentKind::BlogPost => {
                cascade::owning_stream(self, &item, &mut batch, now)?;
                0
            }
            _ => 0,
        };

        sync::sync_versions(&mut batch, &item, now)?;

        if item.is_live_at(now) {
            self.publisher
                .publish(&item)
                .map_err(RetitleError::Publish)?;
            batch.republished += 1;
        }

        report.versions_synced = batch.written;
        report.republished = batch.republished;

        for (from, to) in moved.iter() {
            if let Err(e) = self.ledger.create_or_update(from, to, self.acting_user_id) {
                log::warn!("[retitle] redirect /{} -> /{} not recorded: {}", from, to, e);
                report.redirect_failures += 1;
            }
        }
        report.moved_paths = moved.into_pairs();

        self.events.dispatch(&TitleChanged {
            logical_id: item.logical_id,
            old_title: old_title.to_string(),
            new_title: item.title.clone(),
        });

        log::info!(
            "[retitle] content {}: /{} -> /{} ({} dependents, {} versions, {} republished, {} redirects)",
            item.logical_id,
            report.old_slug,
            report.new_slug,
            report.dependents,
            report.versions_synced,
            report.republished,
            report.moved_paths.len() - report.redirect_failures
        );

        Ok(report)
    }
}
