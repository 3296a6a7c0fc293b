use std::sync::Arc;

use crate::store::Store;

/// Records that `old_path` now lives at `new_path`.
pub trait RedirectLedger: Send + Sync {
    fn create_or_update(&self, old_path: &str, new_path: &str, acting_user_id: i64)
        -> Result<(), String>;
}

pub struct StoreRedirectLedger {
    store: Arc<dyn Store>,
}

impl StoreRedirectLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        StoreRedirectLedger { store }
    }
}

impl RedirectLedger for StoreRedirectLedger {
    fn create_or_update(
        &self,
        old_path: &str,
        new_path: &str,
        acting_user_id: i64,
    ) -> Result<(), String> {
        self.store.redirect_upsert(old_path, new_path, acting_user_id)
    }
}

/// Old path → new path pairs collected during one rename, in the order they
/// were found. Recording the same old path again replaces its target.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MovedPaths {
    pairs: Vec<(String, String)>,
}

impl MovedPaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when nothing moved (`old == new`).
    pub fn record(&mut self, old_path: &str, new_path: &str) -> bool {
        if old_path == new_path {
            return false;
        }
        match self.pairs.iter_mut().find(|(old, _)| old == old_path) {
            Some(pair) => pair.1 = new_path.to_string(),
            None => self.pairs.push((old_path.to_string(), new_path.to_string())),
        }
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(o, n)| (o.as_str(), n.as_str()))
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_skips_unmoved_and_overwrites() {
        let mut moved = MovedPaths::new();
        assert!(!moved.record("same", "same"));
        assert!(moved.record("a", "b"));
        assert!(moved.record("c", "d"));
        assert!(moved.record("a", "e"));
        assert_eq!(
            moved.into_pairs(),
            vec![
                ("a".to_string(), "e".to_string()),
                ("c".to_string(), "d".to_string())
            ]
        );
    }
}
