//! In-process store backend.
//!
//! Holds the whole tree as one JSON document behind a mutex, so every
//! write, conditional write and the resulting change deliveries happen
//! in a single critical section. Deliveries therefore follow write order
//! on every path, and compare-and-set is linearizable.
//!
//! Besides serving as the embedded backend, [`MemoryStore`] exposes a few
//! controls used by tests: taking the store offline, revoking
//! subscriptions, and counting live subscribers per path.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::error::Error;
use crate::path::StorePath;
use crate::snapshot::Snapshot;
use crate::store::{CasOutcome, ChangeEvent, KvStore, Subscription, SubscriptionId};

struct Subscriber {
    path: StorePath,
    tx: mpsc::UnboundedSender<ChangeEvent>,
    last: Option<Value>,
}

struct State {
    root: Value,
    subscribers: BTreeMap<SubscriptionId, Subscriber>,
}

/// Mutex-guarded JSON tree implementing [`KvStore`].
pub struct MemoryStore {
    state: Mutex<State>,
    next_id: AtomicU64,
    available: AtomicBool,
    transactions: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                root: Value::Object(Map::new()),
                subscribers: BTreeMap::new(),
            }),
            next_id: AtomicU64::new(1),
            available: AtomicBool::new(true),
            transactions: true,
        }
    }

    /// A store that behaves like a backend with no transaction support:
    /// [`KvStore::compare_and_set`] reports `UnsupportedOperation`.
    pub fn without_transactions() -> Self {
        Self {
            transactions: false,
            ..Self::new()
        }
    }

    // ── Synchronous accessors ────────────────────────────────────────

    /// Current value at `path`, if any.
    pub fn get(&self, path: &StorePath) -> Option<Value> {
        lookup(&self.lock().root, path).cloned()
    }

    /// Overwrite `path` and notify subscribers, bypassing availability.
    pub fn put(&self, path: &StorePath, value: Value) {
        let mut state = self.lock();
        apply(&mut state, path, value);
    }

    // ── Test controls ────────────────────────────────────────────────

    /// Simulate losing (or regaining) the connection to the backend.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Revoke every subscription at or below `path`, delivering a terminal
    /// [`ChangeEvent::Cancelled`]. Returns the number revoked.
    pub fn revoke(&self, path: &StorePath, reason: &str) -> usize {
        let mut state = self.lock();
        let revoked: Vec<SubscriptionId> = state
            .subscribers
            .iter()
            .filter(|(_, sub)| path.is_ancestor_of(&sub.path))
            .map(|(id, _)| *id)
            .collect();

        for id in &revoked {
            if let Some(sub) = state.subscribers.remove(id) {
                let _ = sub.tx.send(ChangeEvent::Cancelled(Error::Cancelled {
                    path: sub.path.to_string(),
                    reason: reason.to_owned(),
                }));
            }
        }
        tracing::debug!(%path, count = revoked.len(), "revoked subscriptions");
        revoked.len()
    }

    /// Number of live subscriptions registered on exactly `path`.
    pub fn subscriber_count(&self, path: &StorePath) -> usize {
        self.lock()
            .subscribers
            .values()
            .filter(|sub| sub.path == *path)
            .count()
    }

    /// Number of live subscriptions on any path.
    pub fn total_subscribers(&self) -> usize {
        self.lock().subscribers.len()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_available(&self) -> Result<(), Error> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Unavailable {
                reason: "memory store is offline".into(),
            })
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn read(&self, path: &StorePath) -> Result<Snapshot, Error> {
        self.ensure_available()?;
        Ok(Snapshot::new(path.clone(), self.get(path)))
    }

    async fn write(&self, path: &StorePath, value: Value) -> Result<(), Error> {
        self.ensure_available()?;
        self.put(path, value);
        Ok(())
    }

    async fn compare_and_set(
        &self,
        path: &StorePath,
        expected: Option<Value>,
        value: Value,
    ) -> Result<CasOutcome, Error> {
        if !self.transactions {
            return Err(Error::UnsupportedOperation("compare_and_set"));
        }
        self.ensure_available()?;

        let expected = expected.map(prune).filter(|v| !v.is_null());
        let mut state = self.lock();
        let current = lookup(&state.root, path).cloned();
        if current != expected {
            return Ok(CasOutcome::Conflict { current });
        }
        apply(&mut state, path, value);
        Ok(CasOutcome::Applied)
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, Error> {
        self.ensure_available()?;

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();

        let mut state = self.lock();
        let current = lookup(&state.root, path).cloned();
        let _ = tx.send(ChangeEvent::Value(Snapshot::new(
            path.clone(),
            current.clone(),
        )));
        state.subscribers.insert(
            id,
            Subscriber {
                path: path.clone(),
                tx,
                last: current,
            },
        );
        tracing::trace!(%path, %id, "subscribed");

        Ok(Subscription::new(id, path.clone(), rx))
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), Error> {
        match self.lock().subscribers.remove(&id) {
            Some(sub) => {
                tracing::trace!(path = %sub.path, %id, "unsubscribed");
                Ok(())
            }
            None => Err(Error::UnknownSubscription { id: id.0 }),
        }
    }
}

// ── Tree manipulation ───────────────────────────────────────────────

fn lookup<'a>(root: &'a Value, path: &StorePath) -> Option<&'a Value> {
    let mut node = root;
    for segment in path.segments() {
        node = node.as_object()?.get(segment)?;
    }
    match node {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        other => Some(other),
    }
}

/// Write `value` under `path`, then deliver changes to overlapping
/// subscribers. Runs with the state lock held.
fn apply(state: &mut State, path: &StorePath, value: Value) {
    store(&mut state.root, path.segments(), prune(value));
    if !state.root.is_object() {
        state.root = Value::Object(Map::new());
    }

    let root = &state.root;
    let mut dead = Vec::new();
    for (id, sub) in &mut state.subscribers {
        if !sub.path.overlaps(path) {
            continue;
        }
        let current = lookup(root, &sub.path).cloned();
        if current == sub.last {
            continue;
        }
        sub.last.clone_from(&current);
        let snapshot = Snapshot::new(sub.path.clone(), current);
        if sub.tx.send(ChangeEvent::Value(snapshot)).is_err() {
            dead.push(*id);
        }
    }
    for id in dead {
        state.subscribers.remove(&id);
    }
}

fn store(node: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else {
        return;
    };

    if rest.is_empty() {
        if value.is_null() {
            map.remove(head);
        } else {
            map.insert(head.clone(), value);
        }
        return;
    }

    if value.is_null() && !map.contains_key(head) {
        return;
    }
    let child = map
        .entry(head.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    store(child, rest, value);
    if child.is_null() || child.as_object().is_some_and(Map::is_empty) {
        map.remove(head);
    }
}

/// Drop nulls and empty objects, which the store never retains.
fn prune(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let pruned: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, prune(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if pruned.is_empty() {
                Value::Null
            } else {
                Value::Object(pruned)
            }
        }
        other => other,
    }
}
