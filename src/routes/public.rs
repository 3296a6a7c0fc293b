use std::path::{Path, PathBuf};
use std::sync::Arc;

use rocket::response::content::RawHtml;
use rocket::response::Redirect;
use rocket::State;

use crate::store::Store;

#[derive(Responder)]
pub enum Resolved {
    Page(RawHtml<String>),
    Moved(Redirect),
    #[response(status = 404)]
    Missing(RawHtml<String>),
}

/// Join request segments back into a stored url path (no leading slash).
pub fn request_path(path: &Path) -> String {
    path.iter()
        .map(|c| c.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ── Published pages and redirects ──────────────────────

#[get("/<path..>", rank = 20)]
pub fn resolve(store: &State<Arc<dyn Store>>, path: PathBuf) -> Resolved {
    let url_path = request_path(&path);
    let now = chrono::Utc::now().naive_utc();

    if let Some(page) = store.page_resolve(&url_path, &now) {
        return Resolved::Page(RawHtml(page.html));
    }

    // Renaming back and forth leaves a -> b and b -> a; never bounce between them
    let redirect = store.redirect_find(&url_path).filter(|r| {
        store.page_resolve(&r.new_path, &now).is_some()
            || store
                .redirect_find(&r.new_path)
                .map_or(true, |back| back.new_path != url_path)
    });
    if let Some(redirect) = redirect {
        log::debug!("[public] /{} -> /{}", url_path, redirect.new_path);
        return Resolved::Moved(Redirect::moved(format!("/{}", redirect.new_path)));
    }

    Resolved::Missing(RawHtml(
        "<html><body style='font-family:sans-serif;text-align:center;padding:80px'><h1>404</h1><p>Page not found.</p></body></html>".to_string(),
    ))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![resolve]
}
