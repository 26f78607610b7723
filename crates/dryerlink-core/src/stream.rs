// ── Reactive streams ──
//
// Subscription types for consuming device-list snapshots and per-device
// readings without touching the store.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::SensorReading;

/// A subscription to a collection of entities.
///
/// Provides both point-in-time snapshot access and reactive change
/// notification via the `changed()` method or by converting to a `Stream`.
pub struct EntityStream<T: Clone + Send + Sync + 'static> {
    current: Arc<Vec<Arc<T>>>,
    receiver: watch::Receiver<Arc<Vec<Arc<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> EntityStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Vec<Arc<T>>>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Get the snapshot captured at creation time.
    pub fn current(&self) -> &Arc<Vec<Arc<T>>> {
        &self.current
    }

    /// Get the latest snapshot (may have changed since creation).
    pub fn latest(&self) -> Arc<Vec<Arc<T>>> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` if the owning directory has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<Vec<Arc<T>>>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> EntityWatchStream<T> {
        EntityWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
///
/// Yields a new `Arc<Vec<Arc<T>>>` snapshot each time the underlying
/// collection is mutated.
pub struct EntityWatchStream<T: Clone + Send + Sync + 'static> {
    inner: WatchStream<Arc<Vec<Arc<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> Stream for EntityWatchStream<T> {
    type Item = Arc<Vec<Arc<T>>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Latest telemetry reading of one device.
///
/// `None` until the first reading arrives. Identical consecutive
/// readings are never republished.
pub struct ReadingStream {
    receiver: watch::Receiver<Option<SensorReading>>,
}

impl ReadingStream {
    pub(crate) fn new(receiver: watch::Receiver<Option<SensorReading>>) -> Self {
        Self { receiver }
    }

    pub fn latest(&self) -> Option<SensorReading> {
        *self.receiver.borrow()
    }

    /// Wait for the next distinct reading.
    /// Returns `None` once the telemetry manager has been dropped.
    pub async fn changed(&mut self) -> Option<SensorReading> {
        loop {
            self.receiver.changed().await.ok()?;
            if let Some(reading) = *self.receiver.borrow_and_update() {
                return Some(reading);
            }
        }
    }

    /// Convert into a `Stream` that yields the current value first.
    pub fn into_stream(self) -> WatchStream<Option<SensorReading>> {
        WatchStream::new(self.receiver)
    }
}
