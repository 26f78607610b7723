// ── Device directory ──
//
// Reactive view of the signed-in user's devices. Three producers feed
// each record independently: the live `users/{uid}/devices` listing,
// one-shot `deviceInfo` fetches spawned per listed device, and the
// telemetry manager's freshness hints. Each producer only writes the
// fields it owns, through per-entry atomic updates. Entries or metadata
// that cannot be applied are reported on a `DirectoryEvent` feed.

mod collection;
mod refresh;

use std::sync::Arc;

use dryerlink_store::{ChangeEvent, KvStore, Subscription, SubscriptionId};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{Device, DeviceId, DeviceInfo, SensorReading, UserId};
use crate::paths;
use crate::stream::EntityStream;

pub(crate) use collection::EntityCollection;

/// Lifecycle of the directory's listing subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingState {
    /// Nothing loaded.
    Idle,
    /// Following the user's device list.
    Live { user: UserId },
    /// The store revoked the listing. The records shown are frozen at the
    /// last delivery; call `load` again to resume.
    Lost { user: UserId, reason: String },
}

/// Producer failures that leave a record incomplete or missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEvent {
    /// A listing entry was skipped. `key` is the raw child key.
    EntryMalformed { key: String, message: String },
    /// The device's `deviceInfo` could not be read or decoded. The record
    /// stays listed without metadata.
    MetadataFailed { device_id: DeviceId, message: String },
}

struct Shared {
    store: Arc<dyn KvStore>,
    devices: EntityCollection<DeviceId, Device>,
    state: watch::Sender<ListingState>,
    events: broadcast::Sender<Arc<DirectoryEvent>>,
}

impl Shared {
    fn emit(&self, event: DirectoryEvent) {
        // No receivers is fine.
        let _ = self.events.send(Arc::new(event));
    }
}

struct ActiveListing {
    user: UserId,
    subscription: SubscriptionId,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Cheaply cloneable handle to the in-memory device records of one user.
#[derive(Clone)]
pub struct DeviceDirectory {
    shared: Arc<Shared>,
    listing: Arc<Mutex<Option<ActiveListing>>>,
}

impl DeviceDirectory {
    pub fn new(store: Arc<dyn KvStore>, event_capacity: usize) -> Self {
        let (state, _) = watch::channel(ListingState::Idle);
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                store,
                devices: EntityCollection::new(),
                state,
                events,
            }),
            listing: Arc::new(Mutex::new(None)),
        }
    }

    /// Follow `user`'s device list.
    ///
    /// A no-op while the same user's listing is live. Switching users
    /// drops the previous user's records.
    pub async fn load(&self, user: &UserId) -> Result<(), CoreError> {
        let mut listing = self.listing.lock().await;

        if let Some(active) = listing.as_ref() {
            let live = matches!(*self.shared.state.borrow(), ListingState::Live { .. });
            if active.user == *user && live && !active.task.is_finished() {
                return Ok(());
            }
        }
        if let Some(previous) = listing.take() {
            let switching = previous.user != *user;
            self.release(previous).await;
            if switching {
                self.shared.devices.clear();
            }
        }

        let subscription = self
            .shared
            .store
            .subscribe(&paths::user_devices(user))
            .await?;
        let cancel = CancellationToken::new();
        let id = subscription.id();
        // Published before the task exists, so a revocation it observes
        // always lands after `Live`.
        self.shared
            .state
            .send_replace(ListingState::Live { user: user.clone() });
        let task = tokio::spawn(run_listing(
            Arc::clone(&self.shared),
            user.clone(),
            subscription,
            cancel.clone(),
        ));

        *listing = Some(ActiveListing {
            user: user.clone(),
            subscription: id,
            cancel,
            task,
        });
        debug!(%user, "device listing started");
        Ok(())
    }

    /// Stop following the listing and forget every record.
    pub async fn unload(&self) {
        if let Some(active) = self.listing.lock().await.take() {
            self.release(active).await;
        }
        self.shared.devices.clear();
        self.shared.state.send_replace(ListingState::Idle);
    }

    // ── Read access ──────────────────────────────────────────────────

    pub fn devices(&self) -> EntityStream<Device> {
        EntityStream::new(self.shared.devices.subscribe())
    }

    pub fn snapshot(&self) -> Arc<Vec<Arc<Device>>> {
        self.shared.devices.snapshot()
    }

    pub fn get(&self, id: &DeviceId) -> Option<Arc<Device>> {
        self.shared.devices.get(id)
    }

    pub fn len(&self) -> usize {
        self.shared.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bumped on every record change.
    pub fn version(&self) -> u64 {
        self.shared.devices.version()
    }

    pub fn state(&self) -> ListingState {
        self.shared.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<ListingState> {
        self.shared.state.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<Arc<DirectoryEvent>> {
        self.shared.events.subscribe()
    }

    // ── Producers ────────────────────────────────────────────────────

    /// Telemetry hint: the device wrote a reading.
    pub(crate) fn record_reading(&self, id: &DeviceId, reading: &SensorReading) {
        self.shared.devices.modify(id, |device| {
            device.online = reading.online;
            device.last_update = Some(reading.timestamp);
        });
    }

    // ── Private helpers ──────────────────────────────────────────────

    async fn release(&self, active: ActiveListing) {
        active.cancel.cancel();
        if let Err(e) = self.shared.store.unsubscribe(active.subscription).await {
            debug!(user = %active.user, error = %e, "listing subscription already released");
        }
        if let Err(e) = active.task.await {
            warn!(user = %active.user, error = %e, "listing task failed");
        }
    }
}

async fn run_listing(
    shared: Arc<Shared>,
    user: UserId,
    mut subscription: Subscription,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = subscription.next() => event,
        };

        match event {
            Some(ChangeEvent::Value(snapshot)) => {
                for id in shared.apply_listing(&snapshot) {
                    tokio::spawn(fetch_metadata(
                        Arc::clone(&shared),
                        id,
                        cancel.child_token(),
                    ));
                }
            }
            Some(ChangeEvent::Cancelled(err)) => {
                warn!(%user, error = %err, "device listing revoked");
                shared.state.send_replace(ListingState::Lost {
                    user,
                    reason: err.to_string(),
                });
                break;
            }
            None => {
                warn!(%user, "device listing feed closed");
                shared.state.send_replace(ListingState::Lost {
                    user,
                    reason: "feed closed".into(),
                });
                break;
            }
        }
    }
}

/// One-shot metadata read. Lands whenever it resolves; discarded if the
/// device left the listing in the meantime.
async fn fetch_metadata(shared: Arc<Shared>, id: DeviceId, cancel: CancellationToken) {
    let info_path = paths::device_info(&id);
    let read = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        read = shared.store.read(&info_path) => read,
    };

    let info = match read.and_then(|snapshot| snapshot.decode::<DeviceInfo>()) {
        Ok(Some(info)) => info,
        Ok(None) => {
            debug!(device = %id, "device has no metadata yet");
            return;
        }
        Err(e) => {
            warn!(device = %id, error = %e, "device metadata fetch failed");
            if !cancel.is_cancelled() {
                shared.emit(DirectoryEvent::MetadataFailed {
                    device_id: id,
                    message: e.to_string(),
                });
            }
            return;
        }
    };

    if cancel.is_cancelled() {
        return;
    }
    if !shared.devices.modify(&id, |device| device.apply_info(&info)) {
        debug!(device = %id, "metadata for unlisted device discarded");
    }
}
