// ── Telemetry subscription manager ──
//
// At most one live subscription per device, tracked in a registry that
// `listen` and `stop_listening` mutate under a single async lock. Each
// subscription is pumped by its own task; stopping cancels the task,
// releases the store registration and joins the task before returning,
// so no reading is published for a device after `stop_listening`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use dryerlink_store::{ChangeEvent, KvStore, Snapshot, Subscription, SubscriptionId};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::directory::DeviceDirectory;
use crate::error::CoreError;
use crate::model::{DeviceId, SensorReading};
use crate::paths;
use crate::stream::ReadingStream;

// ── Events ───────────────────────────────────────────────────────────

/// Everything a telemetry subscription can report.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// A new, distinct reading arrived.
    Reading {
        device_id: DeviceId,
        reading: SensorReading,
    },
    /// The device wrote a payload that is not a `SensorReading`.
    DecodeFailed { device_id: DeviceId, message: String },
    /// The store ended the subscription. Terminal; call `listen` again
    /// to resume.
    SubscriptionLost { device_id: DeviceId, reason: String },
}

impl TelemetryEvent {
    pub fn device_id(&self) -> &DeviceId {
        match self {
            Self::Reading { device_id, .. }
            | Self::DecodeFailed { device_id, .. }
            | Self::SubscriptionLost { device_id, .. } => device_id,
        }
    }
}

/// What `listen` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenOutcome {
    /// Opened a new subscription.
    Started,
    /// A live subscription already existed; nothing changed.
    AlreadyActive,
    /// The previous subscription had been lost and was replaced.
    Replaced,
}

// ── Manager ──────────────────────────────────────────────────────────

struct ActiveSubscription {
    subscription: SubscriptionId,
    cancel: CancellationToken,
    /// Set by the pump before it reports `SubscriptionLost`.
    lost: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl ActiveSubscription {
    fn is_live(&self) -> bool {
        !self.lost.load(Ordering::Acquire) && !self.task.is_finished()
    }
}

/// Publishing side shared with pump tasks.
#[derive(Clone)]
struct Publisher {
    latest: Arc<DashMap<DeviceId, Arc<watch::Sender<Option<SensorReading>>>>>,
    events: broadcast::Sender<Arc<TelemetryEvent>>,
    directory: DeviceDirectory,
}

/// Owns every per-device telemetry subscription.
#[derive(Clone)]
pub struct TelemetryManager {
    store: Arc<dyn KvStore>,
    registry: Arc<Mutex<HashMap<DeviceId, ActiveSubscription>>>,
    publisher: Publisher,
}

impl TelemetryManager {
    pub fn new(store: Arc<dyn KvStore>, directory: DeviceDirectory, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            store,
            registry: Arc::new(Mutex::new(HashMap::new())),
            publisher: Publisher {
                latest: Arc::new(DashMap::new()),
                events,
                directory,
            },
        }
    }

    /// Subscribe to `devices/{id}/current`.
    ///
    /// Idempotent: a second call while the subscription is live does
    /// nothing. A subscription whose feed was lost is replaced.
    pub async fn listen(&self, device: &DeviceId) -> Result<ListenOutcome, CoreError> {
        let mut registry = self.registry.lock().await;

        let outcome = match registry.get(device).map(ActiveSubscription::is_live) {
            Some(true) => {
                trace!(%device, "already listening");
                return Ok(ListenOutcome::AlreadyActive);
            }
            Some(false) => {
                if let Some(stale) = registry.remove(device) {
                    self.release(device, stale).await;
                }
                ListenOutcome::Replaced
            }
            None => ListenOutcome::Started,
        };

        let subscription = self.store.subscribe(&paths::device_current(device)).await?;
        let id = subscription.id();
        let cancel = CancellationToken::new();
        let lost = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(pump(
            device.clone(),
            subscription,
            cancel.clone(),
            Arc::clone(&lost),
            self.publisher.clone(),
        ));

        registry.insert(
            device.clone(),
            ActiveSubscription {
                subscription: id,
                cancel,
                lost,
                task,
            },
        );
        debug!(%device, subscription = %id, ?outcome, "telemetry subscription opened");
        Ok(outcome)
    }

    /// Release the device's subscription. Returns `false` if none was
    /// tracked. Once this returns, no further events for the device are
    /// published.
    ///
    /// Cached readings nobody observes are dropped here, for every device
    /// no longer listened to.
    pub async fn stop_listening(&self, device: &DeviceId) -> bool {
        let mut registry = self.registry.lock().await;
        let stopped = match registry.remove(device) {
            Some(active) => {
                self.release(device, active).await;
                debug!(%device, "telemetry subscription closed");
                true
            }
            None => false,
        };
        self.publisher.prune(|id| registry.contains_key(id));
        stopped
    }

    /// Whether a live (not lost) subscription exists for `device`.
    pub async fn is_listening(&self, device: &DeviceId) -> bool {
        self.registry
            .lock()
            .await
            .get(device)
            .is_some_and(ActiveSubscription::is_live)
    }

    /// Devices with a tracked subscription, live or lost.
    pub async fn tracked(&self) -> Vec<DeviceId> {
        let mut devices: Vec<_> = self.registry.lock().await.keys().cloned().collect();
        devices.sort();
        devices
    }

    /// Latest reading of `device`. Kept after `stop_listening` for as
    /// long as a returned stream is alive.
    pub fn readings(&self, device: &DeviceId) -> ReadingStream {
        let entry = self
            .publisher
            .latest
            .entry(device.clone())
            .or_insert_with(|| Arc::new(watch::channel(None).0));
        ReadingStream::new(entry.value().subscribe())
    }

    pub fn latest(&self, device: &DeviceId) -> Option<SensorReading> {
        self.publisher
            .latest
            .get(device)
            .and_then(|tx| *tx.value().borrow())
    }

    /// Typed event feed across all devices.
    pub fn events(&self) -> broadcast::Receiver<Arc<TelemetryEvent>> {
        self.publisher.events.subscribe()
    }

    /// Stop every subscription.
    pub async fn shutdown(&self) {
        let mut registry = self.registry.lock().await;
        for (device, active) in registry.drain() {
            self.release(&device, active).await;
        }
        self.publisher.prune(|_| false);
    }

    // ── Private helpers ──────────────────────────────────────────────

    async fn release(&self, device: &DeviceId, active: ActiveSubscription) {
        active.cancel.cancel();
        if let Err(e) = self.store.unsubscribe(active.subscription).await {
            debug!(%device, error = %e, "telemetry subscription already released");
        }
        if let Err(e) = active.task.await {
            warn!(%device, error = %e, "telemetry task failed");
        }
    }
}

impl Publisher {
    fn sender(&self, device: &DeviceId) -> Arc<watch::Sender<Option<SensorReading>>> {
        let entry = self
            .latest
            .entry(device.clone())
            .or_insert_with(|| Arc::new(watch::channel(None).0));
        Arc::clone(entry.value())
    }

    /// Drop cached senders with no receivers, except for devices `keep`
    /// selects.
    fn prune(&self, keep: impl Fn(&DeviceId) -> bool) {
        self.latest
            .retain(|device, tx| keep(device) || tx.receiver_count() > 0);
    }

    fn emit(&self, event: TelemetryEvent) {
        // No receivers is fine.
        let _ = self.events.send(Arc::new(event));
    }

    fn publish(&self, device: &DeviceId, snapshot: &Snapshot) {
        let reading = match snapshot.decode::<SensorReading>() {
            Ok(Some(reading)) => reading,
            Ok(None) => {
                trace!(%device, "no reading yet");
                return;
            }
            Err(e) => {
                warn!(%device, error = %e, "undecodable telemetry payload");
                self.emit(TelemetryEvent::DecodeFailed {
                    device_id: device.clone(),
                    message: e.to_string(),
                });
                return;
            }
        };

        let changed = self.sender(device).send_if_modified(|current| {
            if *current == Some(reading) {
                false
            } else {
                *current = Some(reading);
                true
            }
        });
        if !changed {
            trace!(%device, "duplicate reading dropped");
            return;
        }

        self.directory.record_reading(device, &reading);
        self.emit(TelemetryEvent::Reading {
            device_id: device.clone(),
            reading,
        });
    }
}

async fn pump(
    device: DeviceId,
    mut subscription: Subscription,
    cancel: CancellationToken,
    lost: Arc<AtomicBool>,
    publisher: Publisher,
) {
    loop {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            event = subscription.next() => event,
        };

        let reason = match event {
            Some(ChangeEvent::Value(snapshot)) => {
                publisher.publish(&device, &snapshot);
                continue;
            }
            Some(ChangeEvent::Cancelled(err)) => err.to_string(),
            None => "feed closed".to_owned(),
        };

        warn!(%device, %reason, "telemetry subscription lost");
        lost.store(true, Ordering::Release);
        publisher.emit(TelemetryEvent::SubscriptionLost {
            device_id: device,
            reason,
        });
        return;
    }
}
