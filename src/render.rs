use std::sync::Arc;

use crate::models::content::{latest_per_logical, ContentItem};
use crate::store::Store;

/// Produces the aggregated listing stored on a blog stream item.
pub trait BlogRenderer: Send + Sync {
    fn generate_blog_stream_html(&self, stream: &ContentItem) -> Result<String, String>;
}

/// Lists the stream's live entries (latest version of each, newest first).
pub struct StoreBlogRenderer {
    store: Arc<dyn Store>,
}

impl StoreBlogRenderer {
    pub fn new(store: Arc<dyn Store>) -> Self {
        StoreBlogRenderer { store }
    }
}

impl BlogRenderer for StoreBlogRenderer {
    fn generate_blog_stream_html(&self, stream: &ContentItem) -> Result<String, String> {
        let key = stream.blog_key.as_deref().unwrap_or(&stream.url_path);
        let now = chrono::Utc::now().naive_utc();
        let mut posts: Vec<ContentItem> = latest_per_logical(self.store.content_by_blog_key(key)?)
            .into_iter()
            .filter(|p| p.is_live_at(now))
            .collect();
        posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(render_blog_stream(stream, &posts))
    }
}

pub fn render_blog_stream(stream: &ContentItem, posts: &[ContentItem]) -> String {
    let mut html = format!(
        "<section class=\"blog-stream\" data-blog-key=\"{}\">",
        html_escape(stream.blog_key.as_deref().unwrap_or(&stream.url_path))
    );
    html.push_str(&format!("<h2>{}</h2>", html_escape(&stream.title)));

    if posts.is_empty() {
        html.push_str("<p class=\"blog-empty\">No entries yet.</p>");
    } else {
        html.push_str("<ul class=\"blog-entries\">");
        for post in posts {
            html.push_str(&format!(
                "<li><a href=\"/{}\">{}</a>",
                html_escape(&post.url_path),
                html_escape(&post.title)
            ));
            if let Some(ts) = post.published_at {
                html.push_str(&format!(
                    " <time datetime=\"{}\">{}</time>",
                    ts.format("%Y-%m-%dT%H:%M:%S"),
                    ts.format("%B %d, %Y")
                ));
            }
            html.push_str("</li>");
        }
        html.push_str("</ul>");
    }

    html.push_str("</section>");
    html
}

/// Full standalone page for one content version.
pub fn render_item_page(item: &ContentItem) -> String {
    let title = html_escape(&item.title);
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title>\
         <link rel=\"canonical\" href=\"/{path}\"></head>\
         <body><article class=\"content content-{kind}\"><h1>{title}</h1>{body}</article></body></html>",
        title = title,
        path = html_escape(&item.url_path),
        kind = item.kind.as_str(),
        body = item.body_html,
    )
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::{ContentKind, ContentStatus};

    fn item(title: &str, url: &str, kind: ContentKind) -> ContentItem {
        ContentItem {
            version_id: "v".to_string(),
            logical_id: 1,
            version_number: 1,
            title: title.to_string(),
            url_path: url.to_string(),
            kind,
            blog_key: None,
            body_html: String::new(),
            published_at: None,
            status: ContentStatus::Active,
            owner_user_id: 1,
        }
    }

    #[test]
    fn blog_stream_lists_entries() {
        let mut stream = item("Tech <Blog>", "tech-blog", ContentKind::BlogStream);
        stream.blog_key = Some("tech-blog".to_string());
        let mut post = item("Hello & Welcome", "tech-blog/hello-welcome", ContentKind::BlogPost);
        post.published_at = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0);
        let html = render_blog_stream(&stream, &[post]);
        assert!(html.contains("data-blog-key=\"tech-blog\""));
        assert!(html.contains("<h2>Tech &lt;Blog&gt;</h2>"));
        assert!(html.contains("href=\"/tech-blog/hello-welcome\""));
        assert!(html.contains("Hello &amp; Welcome"));
        assert!(html.contains("January 02, 2024"));
    }

    #[test]
    fn empty_blog_stream() {
        let stream = item("Empty", "empty", ContentKind::BlogStream);
        let html = render_blog_stream(&stream, &[]);
        assert!(html.contains("No entries yet."));
        assert!(!html.contains("<ul"));
    }

    #[test]
    fn item_page_has_canonical_path() {
        let mut page = item("Docs", "docs", ContentKind::General);
        page.body_html = "<p>body</p>".to_string();
        let html = render_item_page(&page);
        assert!(html.contains("<link rel=\"canonical\" href=\"/docs\">"));
        assert!(html.contains("<p>body</p>"));
        assert!(html.contains("content-general"));
    }
}
