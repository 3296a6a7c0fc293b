use chrono::NaiveDateTime;

use crate::error::RetitleError;
use crate::models::content::{ContentItem, ContentKind};
use crate::publish::Publisher;
use crate::store::Store;

/// Buffers version rows and writes them `size` at a time.
///
/// A live row forces a flush before it is republished so the publisher
/// sees what was just written. Each flush is independent: a failure leaves
/// earlier batches in place.
pub struct VersionBatch<'a> {
    store: &'a dyn Store,
    publisher: &'a dyn Publisher,
    size: usize,
    pending: Vec<ContentItem>,
    pub written: usize,
    pub republished: usize,
    pub flushes: usize,
}

impl<'a> VersionBatch<'a> {
    pub fn new(store: &'a dyn Store, publisher: &'a dyn Publisher, size: usize) -> Self {
        VersionBatch {
            store,
            publisher,
            size: size.max(1),
            pending: Vec::new(),
            written: 0,
            republished: 0,
            flushes: 0,
        }
    }

    pub fn push(&mut self, row: ContentItem, now: NaiveDateTime) -> Result<(), RetitleError> {
        if row.is_live_at(now) {
            let live = row.clone();
            self.pending.push(row);
            self.flush()?;
            self.publisher
                .publish(&live)
                .map_err(RetitleError::Publish)?;
            self.republished += 1;
        } else {
            self.pending.push(row);
            if self.pending.len() >= self.size {
                self.flush()?;
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), RetitleError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        if let Err(e) = self.store.content_update_batch(&self.pending) {
            log::error!(
                "[retitle] batch of {} versions failed after {} written: {}",
                self.pending.len(),
                self.written,
                e
            );
            return Err(RetitleError::Persistence(e));
        }
        self.written += self.pending.len();
        self.flushes += 1;
        log::debug!("[retitle] flushed {} versions", self.pending.len());
        self.pending.clear();
        Ok(())
    }
}

/// Copy the canonical title, path and (for blog kinds) blog key onto every
/// other version of the same logical item.
pub fn sync_versions(
    batch: &mut VersionBatch<'_>,
    canonical: &ContentItem,
    now: NaiveDateTime,
) -> Result<(), RetitleError> {
    let versions = batch
        .store
        .content_versions(canonical.logical_id)
        .map_err(RetitleError::Persistence)?;

    for mut version in versions {
        if version.version_id == canonical.version_id {
            continue;
        }
        version.title = canonical.title.clone();
        version.url_path = canonical.url_path.clone();
        if matches!(canonical.kind, ContentKind::BlogPost | ContentKind::BlogStream) {
            version.blog_key = canonical.blog_key.clone();
        }
        batch.push(version, now)?;
    }

    batch.flush()
}
