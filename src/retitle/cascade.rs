use chrono::NaiveDateTime;

use super::sync::{sync_versions, VersionBatch};
use super::TitleChange;
use crate::error::RetitleError;
use crate::models::content::{latest_per_logical, ContentItem, ContentKind};
use crate::redirects::MovedPaths;
use crate::slugs;

/// Move a renamed stream's entries from `old_key` to the new key, then
/// rebuild the stream's listing and store it on the stream item.
pub(super) fn blog_entries(
    tc: &TitleChange<'_>,
    stream: &mut ContentItem,
    old_key: &str,
    new_slug: &str,
    moved: &mut MovedPaths,
    batch: &mut VersionBatch<'_>,
    now: NaiveDateTime,
) -> Result<usize, RetitleError> {
    let rows = tc
        .store
        .content_by_blog_key(old_key)
        .map_err(RetitleError::Persistence)?;
    let posts = latest_per_logical(rows);
    let count = posts.len();

    for mut post in posts {
        let old_path = post.url_path.clone();
        post.blog_key = Some(new_slug.to_string());
        post.url_path = slugs::normalize_under(&post.title, new_slug);
        if moved.record(&old_path, &post.url_path) {
            log::debug!("[retitle] entry {}: /{} -> /{}", post.logical_id, old_path, post.url_path);
        }
        rewrite(tc, &post, batch, now)?;
    }

    let html = tc
        .renderer
        .generate_blog_stream_html(stream)
        .map_err(RetitleError::Render)?;
    stream.body_html = html;
    tc.store
        .content_update(stream)
        .map_err(RetitleError::Persistence)?;

    Ok(count)
}

/// Rebase every page below `old_path/` onto `new_slug/`.
pub(super) fn descendants(
    tc: &TitleChange<'_>,
    ancestor: &ContentItem,
    old_path: &str,
    new_slug: &str,
    moved: &mut MovedPaths,
    batch: &mut VersionBatch<'_>,
    now: NaiveDateTime,
) -> Result<usize, RetitleError> {
    if old_path == new_slug {
        return Ok(0);
    }
    let prefix = format!("{}/", old_path);
    let rows = tc
        .store
        .content_by_path_prefix(&prefix)
        .map_err(RetitleError::Persistence)?;
    let pages: Vec<ContentItem> = latest_per_logical(rows)
        .into_iter()
        .filter(|p| p.logical_id != ancestor.logical_id)
        .collect();
    let count = pages.len();

    for mut page in pages {
        let page_path = page.url_path.clone();
        page.url_path = slugs::rebase(&page_path, old_path, new_slug);
        if moved.record(&page_path, &page.url_path) {
            log::debug!("[retitle] page {}: /{} -> /{}", page.logical_id, page_path, page.url_path);
        }
        rewrite(tc, &page, batch, now)?;
    }

    Ok(count)
}

/// Rebuild the listing of the stream a renamed post belongs to.
pub(super) fn owning_stream(
    tc: &TitleChange<'_>,
    post: &ContentItem,
    batch: &mut VersionBatch<'_>,
    now: NaiveDateTime,
) -> Result<(), RetitleError> {
    let key = match post.blog_key.as_deref() {
        Some(k) if !k.is_empty() => k,
        _ => return Ok(()),
    };
    let owner = tc
        .store
        .content_path_owner(key, post.logical_id)
        .map_err(RetitleError::Persistence)?;
    let mut stream = match owner.and_then(|id| tc.store.content_latest_version(id)) {
        Some(s) if s.kind == ContentKind::BlogStream => s,
        _ => return Ok(()),
    };

    stream.body_html = tc
        .renderer
        .generate_blog_stream_html(&stream)
        .map_err(RetitleError::Render)?;
    tc.store
        .content_update(&stream)
        .map_err(RetitleError::Persistence)?;
    if stream.is_live_at(now) {
        tc.publisher
            .publish(&stream)
            .map_err(RetitleError::Publish)?;
        batch.republished += 1;
    }
    log::debug!("[retitle] stream {} listing rebuilt", stream.logical_id);
    Ok(())
}

/// Persist one cascaded item, align its other versions, republish if live.
fn rewrite(
    tc: &TitleChange<'_>,
    item: &ContentItem,
    batch: &mut VersionBatch<'_>,
    now: NaiveDateTime,
) -> Result<(), RetitleError> {
    tc.store
        .content_update(item)
        .map_err(RetitleError::Persistence)?;
    sync_versions(batch, item, now)?;
    if item.is_live_at(now) {
        tc.publisher
            .publish(item)
            .map_err(RetitleError::Publish)?;
        batch.republished += 1;
    }
    Ok(())
}
