// ── Generic reactive entity collection ──
//
// Concurrent keyed storage with O(1) lookups and push-based change
// notification via `watch` channels.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

/// A reactive collection for a single entity type.
///
/// Uses `DashMap` for concurrent lookups and `watch` channels for
/// push-based change notification. Every mutation bumps a version
/// counter and rebuilds the key-ordered snapshot that subscribers receive.
///
/// Updates to an existing entry happen under that entry's shard lock, so
/// two producers editing different fields of one entity never overwrite
/// each other's fields.
pub(crate) struct EntityCollection<K, T>
where
    K: Eq + Hash + Ord + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    by_key: DashMap<K, Arc<T>>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,

    /// Full snapshot, rebuilt on mutation for efficient subscription.
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<K, T> EntityCollection<K, T>
where
    K: Eq + Hash + Ord + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            by_key: DashMap::new(),
            version,
            snapshot,
        }
    }

    /// Insert `create()` if the key is absent, otherwise apply `update` to
    /// a copy of the existing entity. Returns `true` if the key was new.
    pub(crate) fn upsert_with(
        &self,
        key: K,
        create: impl FnOnce() -> T,
        update: impl FnOnce(&mut T),
    ) -> bool {
        let is_new = match self.by_key.entry(key) {
            Entry::Occupied(mut entry) => {
                let mut value = T::clone(entry.get());
                update(&mut value);
                entry.insert(Arc::new(value));
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(create()));
                true
            }
        };

        self.rebuild_snapshot();
        self.bump_version();
        is_new
    }

    /// Apply `update` to an existing entity. Returns `false` (and changes
    /// nothing) if the key is absent.
    pub(crate) fn modify(&self, key: &K, update: impl FnOnce(&mut T)) -> bool {
        let modified = match self.by_key.get_mut(key) {
            Some(mut entry) => {
                let mut value = T::clone(entry.value());
                update(&mut value);
                *entry.value_mut() = Arc::new(value);
                true
            }
            None => false,
        };

        if modified {
            self.rebuild_snapshot();
            self.bump_version();
        }
        modified
    }

    /// Remove an entity by key. Returns the removed entity if it existed.
    pub(crate) fn remove(&self, key: &K) -> Option<Arc<T>> {
        let removed = self.by_key.remove(key).map(|(_, v)| v);
        if removed.is_some() {
            self.rebuild_snapshot();
            self.bump_version();
        }
        removed
    }

    pub(crate) fn get(&self, key: &K) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    /// Remove all entities.
    pub(crate) fn clear(&self) {
        self.by_key.clear();
        self.rebuild_snapshot();
        self.bump_version();
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }

    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Return all current keys in the collection.
    pub(crate) fn keys(&self) -> Vec<K> {
        self.by_key.iter().map(|r| r.key().clone()).collect()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Collect all values in key order and broadcast to subscribers.
    fn rebuild_snapshot(&self) {
        let mut entries: Vec<(K, Arc<T>)> = self
            .by_key
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let values = entries.into_iter().map(|(_, v)| v).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}
