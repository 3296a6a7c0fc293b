use std::sync::Arc;

use serde::Serialize;

use crate::store::Store;

/// Raised once per top-level rename, after all rows, pages and redirects
/// have been written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleChanged {
    pub logical_id: i64,
    pub old_title: String,
    pub new_title: String,
}

pub trait EventSubscriber: Send + Sync {
    fn name(&self) -> &str;
    fn on_title_changed(&self, event: &TitleChanged) -> Result<(), String>;
}

/// Synchronous fan-out. Subscribers run in registration order and all of
/// them have finished when `dispatch` returns.
#[derive(Default)]
pub struct EventDispatcher {
    subscribers: Vec<Box<dyn EventSubscriber>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: Box<dyn EventSubscriber>) {
        self.subscribers.push(subscriber);
    }

    /// A failing subscriber is logged and skipped; the rest still run.
    pub fn dispatch(&self, event: &TitleChanged) {
        for sub in &self.subscribers {
            if let Err(e) = sub.on_title_changed(event) {
                log::warn!(
                    "[events] subscriber '{}' failed for content {}: {}",
                    sub.name(),
                    event.logical_id,
                    e
                );
            }
        }
    }
}

/// Writes one audit_log row per rename.
pub struct AuditTrail {
    store: Arc<dyn Store>,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn Store>) -> Self {
        AuditTrail { store }
    }
}

impl EventSubscriber for AuditTrail {
    fn name(&self) -> &str {
        "audit"
    }

    fn on_title_changed(&self, event: &TitleChanged) -> Result<(), String> {
        let details = format!("'{}' -> '{}'", event.old_title, event.new_title);
        self.store.audit_log(
            None,
            "retitle",
            Some("content"),
            Some(event.logical_id),
            Some(&event.new_title),
            Some(&details),
        )
    }
}

pub struct LogSubscriber;

impl EventSubscriber for LogSubscriber {
    fn name(&self) -> &str {
        "log"
    }

    fn on_title_changed(&self, event: &TitleChanged) -> Result<(), String> {
        log::info!(
            "Content {} retitled: '{}' -> '{}'",
            event.logical_id,
            event.old_title,
            event.new_title
        );
        Ok(())
    }
}

/// Subscribers every running instance gets.
pub fn default_dispatcher(store: Arc<dyn Store>) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.subscribe(Box::new(LogSubscriber));
    dispatcher.subscribe(Box::new(AuditTrail::new(store)));
    dispatcher
}
