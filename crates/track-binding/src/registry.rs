//! `SurfaceRegistry` - surfaces able to host the shared screen.
//!
//! A keyed container injected into presentation code. Keys are trimmed on
//! every operation; registering an existing key replaces its handle and keeps
//! its position in [`SurfaceRegistry::list_keys`].
//!
//! Clones share the same entries. Individual operations are atomic; nothing
//! spanning two calls is.
//!
//! Each registry reports its size under its own `registry` label, so several
//! injected registries in one process do not overwrite each other's gauge.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::observability::metrics;

/// Name used by [`SurfaceRegistry::new`].
pub const DEFAULT_REGISTRY_NAME: &str = "default";

/// Shared registry of share-target surfaces, keyed by name.
pub struct SurfaceRegistry<H> {
    name: Arc<str>,
    entries: Arc<Mutex<Vec<(String, H)>>>,
}

// Manual impl: cloning shares the entries and must not require `H: Clone`.
impl<H> Clone for SurfaceRegistry<H> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<H> Default for SurfaceRegistry<H> {
    fn default() -> Self {
        Self::named(DEFAULT_REGISTRY_NAME)
    }
}

impl<H> std::fmt::Debug for SurfaceRegistry<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceRegistry")
            .field("name", &self.name)
            .field("keys", &self.list_keys())
            .finish()
    }
}

impl<H> SurfaceRegistry<H> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry reporting metrics as `name`.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(String, H)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace the handle registered under `key`.
    pub fn register(&self, key: &str, handle: H) {
        let key = key.trim();
        let mut entries = self.lock();

        match entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => {
                entry.1 = handle;
                debug!(
                    target: "tb.registry",
                    registry = %self.name,
                    key = %key,
                    "Share surface replaced"
                );
            }
            None => {
                entries.push((key.to_string(), handle));
                debug!(
                    target: "tb.registry",
                    registry = %self.name,
                    key = %key,
                    "Share surface registered"
                );
            }
        }

        metrics::set_registry_entries(&self.name, entries.len());
    }

    /// Remove `key`. Unknown keys are ignored.
    pub fn unregister(&self, key: &str) {
        let key = key.trim();
        let mut entries = self.lock();

        let before = entries.len();
        entries.retain(|(k, _)| k != key);
        if entries.len() != before {
            debug!(
                target: "tb.registry",
                registry = %self.name,
                key = %key,
                "Share surface unregistered"
            );
            metrics::set_registry_entries(&self.name, entries.len());
        }
    }

    /// Registered keys in registration order.
    #[must_use]
    pub fn list_keys(&self) -> Vec<String> {
        self.lock().iter().map(|(k, _)| k.clone()).collect()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        let key = key.trim();
        self.lock().iter().any(|(k, _)| k == key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Keys to offer as share targets, or just `default` when nothing is
    /// registered.
    #[must_use]
    pub fn candidates_or(&self, default: &str) -> Vec<String> {
        let keys = self.list_keys();
        if keys.is_empty() {
            vec![default.to_string()]
        } else {
            keys
        }
    }
}

impl<H: Clone> SurfaceRegistry<H> {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<H> {
        let key = key.trim();
        self.lock()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, h)| h.clone())
    }

    /// Snapshot of every `(key, handle)` pair in registration order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, H)> {
        self.lock().clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let registry = SurfaceRegistry::new();
        registry.register("wall", 1);
        registry.register("table", 2);

        assert_eq!(registry.get("wall"), Some(1));
        assert_eq!(registry.get("table"), Some(2));
        assert_eq!(registry.get("ceiling"), None);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_overwrite_keeps_single_entry_and_position() {
        let registry = SurfaceRegistry::new();
        registry.register("wall", 1);
        registry.register("table", 2);
        registry.register("wall", 3);

        assert_eq!(registry.get("wall"), Some(3));
        assert_eq!(registry.list_keys(), vec!["wall", "table"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unregister_unknown_is_noop() {
        let registry = SurfaceRegistry::new();
        registry.register("wall", 1);
        registry.unregister("ceiling");
        assert_eq!(registry.list_keys(), vec!["wall"]);

        registry.unregister("wall");
        assert!(registry.is_empty());
        assert_eq!(registry.get("wall"), None);
    }

    #[test]
    fn test_keys_are_trimmed() {
        let registry = SurfaceRegistry::new();
        registry.register("  wall ", 1);

        assert!(registry.contains("wall"));
        assert_eq!(registry.get(" wall"), Some(1));
        assert_eq!(registry.list_keys(), vec!["wall"]);

        registry.unregister("wall   ");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_clones_share_entries() {
        let registry = SurfaceRegistry::new();
        let other = registry.clone();
        other.register("wall", "handle");

        assert_eq!(registry.get("wall"), Some("handle"));
        assert_eq!(registry.entries(), vec![("wall".to_string(), "handle")]);
    }

    #[test]
    fn test_candidates_fall_back_to_default() {
        let registry: SurfaceRegistry<u32> = SurfaceRegistry::new();
        assert_eq!(registry.candidates_or("screenshare"), vec!["screenshare"]);

        registry.register("wall", 1);
        assert_eq!(registry.candidates_or("screenshare"), vec!["wall"]);
    }

    #[test]
    fn test_registry_name() {
        let registry: SurfaceRegistry<u32> = SurfaceRegistry::new();
        assert_eq!(registry.name(), DEFAULT_REGISTRY_NAME);

        let room = SurfaceRegistry::<u32>::named("room-a");
        assert_eq!(room.clone().name(), "room-a");
    }

    #[test]
    fn test_len_matches_distinct_keys() {
        let registry = SurfaceRegistry::new();
        for (i, key) in ["a", "b", "a", "c", "b", "a"].iter().enumerate() {
            registry.register(key, i);
        }
        assert_eq!(registry.list_keys().len(), 3);
        assert_eq!(registry.get("a"), Some(5));
    }
}
