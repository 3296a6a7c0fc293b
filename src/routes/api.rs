use std::sync::Arc;

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::ActingUser;
use crate::config::Config;
use crate::error::RetitleError;
use crate::events::EventDispatcher;
use crate::models::content::{ContentForm, ContentKind};
use crate::publish::{PagePublisher, Publisher};
use crate::redirects::StoreRedirectLedger;
use crate::render::StoreBlogRenderer;
use crate::retitle::{check_title, TitleChange};
use crate::slugs;
use crate::store::Store;

const REDIRECTS_PER_PAGE: i64 = 50;

fn error_status(err: &RetitleError) -> Status {
    match err {
        RetitleError::SlugConflict { .. } => Status::Conflict,
        RetitleError::NotFound(_) => Status::NotFound,
        e if e.is_validation() => Status::UnprocessableEntity,
        _ => Status::InternalServerError,
    }
}

fn error_body(err: &RetitleError) -> (Status, Json<Value>) {
    let status = error_status(err);
    let message = if status == Status::InternalServerError {
        log::error!("[api] {}", err);
        "internal error".to_string()
    } else {
        err.to_string()
    };
    (status, Json(json!({ "success": false, "error": message })))
}

// ── Content ────────────────────────────────────────────

#[post("/content", format = "json", data = "<form>")]
pub fn content_create(
    user: ActingUser,
    store: &State<Arc<dyn Store>>,
    form: Json<ContentForm>,
) -> (Status, Json<Value>) {
    let mut form = form.into_inner();
    form.title = form.title.trim().to_string();

    if let Err(e) = check_title(store.inner().as_ref(), &form.title, form.logical_id) {
        return error_body(&e);
    }

    if form.url_path.is_empty() {
        form.url_path = match form.kind {
            ContentKind::BlogPost => {
                slugs::normalize_under(&form.title, form.blog_key.as_deref().unwrap_or(""))
            }
            _ => slugs::normalize(&form.title),
        };
    }
    if form.kind == ContentKind::BlogStream && form.blog_key.is_none() {
        form.blog_key = Some(form.url_path.clone());
    }
    if form.owner_user_id == 0 {
        form.owner_user_id = user.0;
    }

    match store.content_path_owner(&form.url_path, form.logical_id.unwrap_or(0)) {
        Ok(None) => {}
        Ok(Some(owner)) => {
            return error_body(&RetitleError::SlugConflict {
                slug: form.url_path.clone(),
                logical_id: owner,
            })
        }
        Err(e) => return error_body(&RetitleError::Persistence(e)),
    }

    let item = match store.content_create(&form) {
        Ok(item) => item,
        Err(e) => return error_body(&RetitleError::Persistence(e)),
    };

    if item.is_live() {
        let publisher = PagePublisher::new(store.inner().clone());
        if let Err(e) = publisher.publish(&item) {
            return error_body(&RetitleError::Publish(e));
        }
    }

    if let Err(e) = store.audit_log(
        Some(user.0),
        "create",
        Some("content"),
        Some(item.logical_id),
        Some(&item.title),
        Some(&format!("version {}", item.version_number)),
    ) {
        log::warn!("[api] audit entry for content {} not written: {}", item.logical_id, e);
    }

    (
        Status::Created,
        Json(json!({ "success": true, "item": item })),
    )
}

#[get("/content/<logical_id>")]
pub fn content_get(store: &State<Arc<dyn Store>>, logical_id: i64) -> (Status, Json<Value>) {
    let latest = match store.content_latest_version(logical_id) {
        Some(item) => item,
        None => return error_body(&RetitleError::NotFound(format!("content {}", logical_id))),
    };
    let versions = store.content_versions(logical_id).unwrap_or_default();
    let pages = store.page_for_logical(logical_id);
    let history = store.audit_for_entity("content", logical_id, 20);

    (
        Status::Ok,
        Json(json!({
            "latest": latest,
            "versions": versions,
            "pages": pages,
            "history": history,
        })),
    )
}

// ── Titles ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct TitleCheck {
    pub valid: bool,
    pub reason: Option<String>,
}

#[get("/titles/check?<title>&<exclude>")]
pub fn title_check(
    store: &State<Arc<dyn Store>>,
    title: &str,
    exclude: Option<i64>,
) -> Json<TitleCheck> {
    match check_title(store.inner().as_ref(), title, exclude) {
        Ok(()) => Json(TitleCheck {
            valid: true,
            reason: None,
        }),
        Err(e) => {
            // Store errors still read as invalid
            let reason = if e.is_validation() {
                e.to_string()
            } else {
                log::warn!("[api] title check failed: {}", e);
                "title could not be checked".to_string()
            };
            Json(TitleCheck {
                valid: false,
                reason: Some(reason),
            })
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RetitleRequest {
    pub title: String,
}

#[post("/content/<logical_id>/title", format = "json", data = "<body>")]
pub fn content_retitle(
    user: ActingUser,
    store: &State<Arc<dyn Store>>,
    config: &State<Config>,
    events: &State<EventDispatcher>,
    logical_id: i64,
    body: Json<RetitleRequest>,
) -> (Status, Json<Value>) {
    let store: Arc<dyn Store> = store.inner().clone();

    let mut item = match store.content_latest_version(logical_id) {
        Some(item) => item,
        None => return error_body(&RetitleError::NotFound(format!("content {}", logical_id))),
    };

    let title = body.title.trim().to_string();
    if let Err(e) = check_title(store.as_ref(), &title, Some(logical_id)) {
        return error_body(&e);
    }

    let old_title = std::mem::replace(&mut item.title, title);

    let publisher = PagePublisher::new(store.clone());
    let ledger = StoreRedirectLedger::new(store.clone());
    let renderer = StoreBlogRenderer::new(store.clone());
    let change = TitleChange {
        store: store.as_ref(),
        publisher: &publisher,
        ledger: &ledger,
        renderer: &renderer,
        events: events.inner(),
        acting_user_id: user.0,
        batch_size: config.cascade.batch_size,
    };

    match change.handle_title_change(item, &old_title) {
        Ok(report) => (
            Status::Ok,
            Json(json!({ "success": true, "report": report })),
        ),
        Err(e) => error_body(&e),
    }
}

// ── Redirects ──────────────────────────────────────────

#[get("/redirects?<page>")]
pub fn redirect_list(store: &State<Arc<dyn Store>>, page: Option<i64>) -> Json<Value> {
    let page = page.unwrap_or(1).max(1);
    let offset = (page - 1) * REDIRECTS_PER_PAGE;
    let redirects = store.redirect_list(REDIRECTS_PER_PAGE, offset);
    let total = store.redirect_count();
    Json(json!({
        "redirects": redirects,
        "total": total,
        "page": page,
        "per_page": REDIRECTS_PER_PAGE,
    }))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        content_create,
        content_get,
        title_check,
        content_retitle,
        redirect_list
    ]
}
