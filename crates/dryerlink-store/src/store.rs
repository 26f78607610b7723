// ── Store collaborator contract ──
//
// The engine talks to the realtime store only through `KvStore`.
// Backends provide point-in-time reads, unconditional overwrites,
// change subscriptions and, optionally, a compare-and-set primitive.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::Error;
use crate::path::StorePath;
use crate::snapshot::Snapshot;

/// Opaque handle identifying a live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One delivery on a subscription.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    /// The subtree now holds this value. Sent once on subscribe and
    /// again after every write that changes it, in write order.
    Value(Snapshot),
    /// The backend revoked the subscription. Nothing follows.
    Cancelled(Error),
}

/// A live change feed on one path.
///
/// Dropping the receiver does not release the backend registration;
/// call [`KvStore::unsubscribe`] with [`id`](Self::id).
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    path: StorePath,
    events: mpsc::UnboundedReceiver<ChangeEvent>,
}

impl Subscription {
    pub fn new(
        id: SubscriptionId,
        path: StorePath,
        events: mpsc::UnboundedReceiver<ChangeEvent>,
    ) -> Self {
        Self { id, path, events }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Next delivery, or `None` once the backend released the feed.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// Non-blocking poll, used by tests and drain loops.
    pub fn try_next(&mut self) -> Option<ChangeEvent> {
        self.events.try_recv().ok()
    }
}

/// Result of a conditional write.
#[derive(Debug, Clone, PartialEq)]
pub enum CasOutcome {
    /// The expected value matched and the new value was stored.
    Applied,
    /// Someone else changed the value first; nothing was written.
    Conflict { current: Option<Value> },
}

impl CasOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Path-addressable realtime key-value store.
///
/// Writing `Value::Null` deletes the subtree. Within one subscription,
/// deliveries follow write order; across paths there is no ordering.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Point-in-time read of a subtree.
    async fn read(&self, path: &StorePath) -> Result<Snapshot, Error>;

    /// Unconditional overwrite of a subtree.
    async fn write(&self, path: &StorePath, value: Value) -> Result<(), Error>;

    /// Atomically replace the value at `path` if it currently equals
    /// `expected` (`None` = absent).
    ///
    /// Backends without transactions keep the default, which reports
    /// [`Error::UnsupportedOperation`].
    async fn compare_and_set(
        &self,
        path: &StorePath,
        expected: Option<Value>,
        value: Value,
    ) -> Result<CasOutcome, Error> {
        let _ = (path, expected, value);
        Err(Error::UnsupportedOperation("compare_and_set"))
    }

    /// Open a change feed. The current value is delivered immediately.
    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, Error>;

    /// Release a change feed. Once this returns the backend sends
    /// nothing more on it.
    async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), Error>;

    /// Delete the subtree at `path`.
    async fn remove(&self, path: &StorePath) -> Result<(), Error> {
        self.write(path, Value::Null).await
    }
}
