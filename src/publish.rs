use std::sync::Arc;

use crate::models::content::ContentItem;
use crate::render;
use crate::store::Store;

/// Materializes or removes the public rendering of one content version.
pub trait Publisher: Send + Sync {
    fn publish(&self, item: &ContentItem) -> Result<(), String>;
    fn unpublish(&self, item: &ContentItem) -> Result<(), String>;
}

/// Stores rendered HTML in `published_pages`, one row per version.
pub struct PagePublisher {
    store: Arc<dyn Store>,
}

impl PagePublisher {
    pub fn new(store: Arc<dyn Store>) -> Self {
        PagePublisher { store }
    }
}

impl Publisher for PagePublisher {
    fn publish(&self, item: &ContentItem) -> Result<(), String> {
        let html = render::render_item_page(item);
        self.store.page_upsert(item, &html)?;
        log::debug!(
            "[publish] content {} v{} at /{}",
            item.logical_id,
            item.version_number,
            item.url_path
        );
        Ok(())
    }

    fn unpublish(&self, item: &ContentItem) -> Result<(), String> {
        self.store.page_remove(&item.version_id)
    }
}
