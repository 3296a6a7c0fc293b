#[macro_use]
extern crate rocket;

use std::sync::Arc;

use rocket::response::content::RawHtml;
use rocket::serde::json::Json;
use rocket::{Build, Rocket};
use serde_json::{json, Value};

mod auth;
mod boot;
mod config;
mod db;
mod error;
mod events;
mod models;
mod publish;
mod redirects;
mod render;
mod retitle;
mod routes;
mod slugs;
mod store;


use config::Config;
use store::Store;

#[catch(404)]
fn not_found() -> RawHtml<String> {
    RawHtml("<html><body style='font-family:sans-serif;text-align:center;padding:80px'><h1>404</h1><p>Page not found.</p></body></html>".to_string())
}

#[catch(422)]
fn unprocessable() -> Json<Value> {
    Json(json!({ "success": false, "error": "malformed request body" }))
}

#[catch(500)]
fn server_error() -> RawHtml<String> {
    RawHtml("<html><body style='font-family:sans-serif;text-align:center;padding:80px'><h1>500</h1><p>Internal server error.</p></body></html>".to_string())
}

/// Assemble the application around an already-opened store.
pub fn build(store: Arc<dyn Store>, config: Config) -> Rocket<Build> {
    let dispatcher = events::default_dispatcher(store.clone());

    rocket::build()
        .manage(store)
        .manage(config)
        .manage(dispatcher)
        .mount("/api", routes::api::routes())
        .mount("/", routes::public::routes())
        .register("/", catchers![not_found, unprocessable, server_error])
}

#[launch]
fn rocket() -> _ {
    env_logger::init();

    let config = Config::load();

    // Boot check: create the database directory, abort if unusable
    boot::run(&config);

    let store = match store::open(&config) {
        Ok(s) => s,
        Err(e) => {
            log::error!("Failed to open {} store: {}", config.database.backend, e);
            std::process::exit(1);
        }
    };

    log::info!(
        "Title cascade ready (batch size {}, system user {})",
        config.cascade.batch_size,
        config.cascade.system_user_id
    );

    build(store, config)
}
