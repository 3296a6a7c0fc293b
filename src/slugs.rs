use crate::models::content::{ContentItem, ContentKind};

/// URL-safe segment for `text`. Idempotent.
pub fn normalize(text: &str) -> String {
    slug::slugify(text)
}

/// `parent/segment`, or just the segment when there is no parent.
pub fn normalize_under(text: &str, parent: &str) -> String {
    let segment = normalize(text);
    let parent = parent.trim_matches('/');
    if parent.is_empty() {
        segment
    } else {
        format!("{}/{}", parent, segment)
    }
}

/// Blog posts live under their stream's key; everything else is top level.
pub fn build_article_url(item: &ContentItem) -> String {
    match item.kind {
        ContentKind::BlogPost => {
            normalize_under(&item.title, item.blog_key.as_deref().unwrap_or(""))
        }
        _ => normalize(&item.title),
    }
}

/// True when `path` sits below `ancestor`. The `/` boundary is required:
/// `docs2/x` is not below `docs`.
pub fn is_descendant_path(path: &str, ancestor: &str) -> bool {
    !ancestor.is_empty()
        && path.len() > ancestor.len() + 1
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}

/// Swap the `old` prefix of `path` for `new`. Paths outside `old` are returned unchanged.
pub fn rebase(path: &str, old: &str, new: &str) -> String {
    if is_descendant_path(path, old) {
        format!("{}{}", new, &path[old.len()..])
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::ContentStatus;

    fn item(title: &str, kind: ContentKind, blog_key: Option<&str>) -> ContentItem {
        ContentItem {
            version_id: "v".to_string(),
            logical_id: 1,
            version_number: 1,
            title: title.to_string(),
            url_path: String::new(),
            kind,
            blog_key: blog_key.map(|s| s.to_string()),
            body_html: String::new(),
            published_at: None,
            status: ContentStatus::Active,
            owner_user_id: 1,
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        for s in ["Old Name", "  Tech   Blog!! ", "Ünïcödé Title", "already-a-slug", "", "C++ & Rust"] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", s);
        }
        assert_eq!(normalize("Old Name"), "old-name");
    }

    #[test]
    fn normalize_under_parent() {
        assert_eq!(normalize_under("Hello World", "tech-blog"), "tech-blog/hello-world");
        assert_eq!(normalize_under("Hello World", ""), "hello-world");
        assert_eq!(normalize_under("Hello", "/tech/"), "tech/hello");
    }

    #[test]
    fn article_url_by_kind() {
        assert_eq!(
            build_article_url(&item("First Post", ContentKind::BlogPost, Some("tech-blog"))),
            "tech-blog/first-post"
        );
        assert_eq!(
            build_article_url(&item("Tech Blog", ContentKind::BlogStream, Some("tech-blog"))),
            "tech-blog"
        );
        assert_eq!(build_article_url(&item("Docs", ContentKind::General, None)), "docs");
        assert_eq!(build_article_url(&item("Orphan", ContentKind::BlogPost, None)), "orphan");
    }

    #[test]
    fn descendant_requires_slash_boundary() {
        assert!(is_descendant_path("docs/getting-started", "docs"));
        assert!(is_descendant_path("docs/a/b", "docs"));
        assert!(!is_descendant_path("docs", "docs"));
        assert!(!is_descendant_path("docs/", "docs"));
        assert!(!is_descendant_path("docs2/x", "docs"));
        assert!(!is_descendant_path("documentation", "docs"));
        assert!(!is_descendant_path("x", ""));
    }

    #[test]
    fn rebase_swaps_prefix_only() {
        assert_eq!(rebase("docs/getting-started", "docs", "documentation"), "documentation/getting-started");
        assert_eq!(rebase("docs/a/docs/b", "docs", "d"), "d/a/docs/b");
        assert_eq!(rebase("docsy/x", "docs", "d"), "docsy/x");
    }
}
