// ── Controller facade ──
//
// Wires the pairing state machine, device directory, telemetry manager
// and command channel to one injected store, identity provider and
// clock. Consumers hold a cheap clone and call into it from any task.

use std::sync::Arc;

use dryerlink_store::KvStore;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::command::{AckOutcome, CommandChannel};
use crate::config::EngineConfig;
use crate::directory::{DeviceDirectory, DirectoryEvent, ListingState};
use crate::error::{CoreError, PairingError};
use crate::history::collect_history;
use crate::identity::IdentityProvider;
use crate::liveness::{self, Liveness};
use crate::model::{
    Command, CommandAction, Device, DeviceId, HistoryPage, PairingCode, SensorReading, TimeRange,
    User, UserId,
};
use crate::pairing::PairingService;
use crate::paths;
use crate::stream::{EntityStream, ReadingStream};
use crate::telemetry::{ListenOutcome, TelemetryEvent, TelemetryManager};

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Nothing runs in the
/// background until a listing or telemetry subscription is opened;
/// [`shutdown()`](Self::shutdown) closes all of them.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: EngineConfig,
    store: Arc<dyn KvStore>,
    identity: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    pairing: PairingService,
    directory: DeviceDirectory,
    telemetry: TelemetryManager,
    commands: CommandChannel,
}

impl Controller {
    /// Build a controller on the system clock.
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn KvStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self::with_clock(config, store, identity, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: EngineConfig,
        store: Arc<dyn KvStore>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let directory = DeviceDirectory::new(Arc::clone(&store), config.event_capacity);
        let telemetry = TelemetryManager::new(
            Arc::clone(&store),
            directory.clone(),
            config.event_capacity,
        );
        let pairing = PairingService::new(Arc::clone(&store), Arc::clone(&clock));
        let commands = CommandChannel::new(Arc::clone(&store), Arc::clone(&clock), &config);

        Self {
            inner: Arc::new(ControllerInner {
                config,
                store,
                identity,
                clock,
                pairing,
                directory,
                telemetry,
                commands,
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.inner.store
    }

    /// The signed-in user, or `NotSignedIn`.
    pub fn current_user(&self) -> Result<UserId, CoreError> {
        self.inner
            .identity
            .current_user_id()
            .ok_or(CoreError::NotSignedIn)
    }

    // ── Pairing ──────────────────────────────────────────────────────

    /// Pair a device to the signed-in user and start listening to it.
    pub async fn pair_device(&self, code: &str, name: &str) -> Result<DeviceId, PairingError> {
        let user = self
            .inner
            .identity
            .current_user_id()
            .ok_or(PairingError::NotSignedIn)?;
        self.pair_device_as(&user, code, name).await
    }

    /// Pair a device to an explicit user and start listening to it.
    ///
    /// Failing to open the telemetry subscription afterwards does not
    /// fail the pairing; call [`listen`](Self::listen) to retry.
    pub async fn pair_device_as(
        &self,
        user: &UserId,
        code: &str,
        name: &str,
    ) -> Result<DeviceId, PairingError> {
        let code = PairingCode::parse(code)?;
        let device = self.inner.pairing.pair_device(user, &code, name).await?;

        if let Err(e) = self.inner.telemetry.listen(&device).await {
            warn!(%device, error = %e, "paired device but could not start telemetry");
        }
        Ok(device)
    }

    /// Re-apply the post-claim writes after [`PairingError::Incomplete`].
    pub async fn repair_pairing(&self, device: &DeviceId, name: &str) -> Result<(), CoreError> {
        let user = self.current_user()?;
        self.inner.pairing.repair(&user, device, name).await
    }

    pub async fn rename_device(&self, device: &DeviceId, name: &str) -> Result<(), CoreError> {
        let user = self.current_user()?;
        self.inner.pairing.rename(&user, device, name).await
    }

    /// Remove the device from the user, then stop listening to it. A
    /// failed unpair leaves telemetry untouched.
    pub async fn unpair_device(&self, device: &DeviceId) -> Result<(), CoreError> {
        let user = self.current_user()?;
        self.inner.pairing.unpair(&user, device).await?;
        self.inner.telemetry.stop_listening(device).await;
        Ok(())
    }

    // ── Device directory ─────────────────────────────────────────────

    /// Follow the signed-in user's device list.
    pub async fn load_user_devices(&self) -> Result<(), CoreError> {
        let user = self.current_user()?;
        self.inner.directory.load(&user).await
    }

    pub fn devices(&self) -> EntityStream<Device> {
        self.inner.directory.devices()
    }

    pub fn device(&self, id: &DeviceId) -> Option<Arc<Device>> {
        self.inner.directory.get(id)
    }

    pub fn directory(&self) -> &DeviceDirectory {
        &self.inner.directory
    }

    pub fn listing_state(&self) -> ListingState {
        self.inner.directory.state()
    }

    pub fn directory_events(&self) -> broadcast::Receiver<Arc<DirectoryEvent>> {
        self.inner.directory.events()
    }

    pub async fn user_profile(&self) -> Result<Option<User>, CoreError> {
        let user = self.current_user()?;
        let snapshot = self.inner.store.read(&paths::user(&user)).await?;
        Ok(snapshot.decode()?)
    }

    // ── Telemetry ────────────────────────────────────────────────────

    pub async fn listen(&self, device: &DeviceId) -> Result<ListenOutcome, CoreError> {
        self.inner.telemetry.listen(device).await
    }

    pub async fn stop_listening(&self, device: &DeviceId) -> bool {
        self.inner.telemetry.stop_listening(device).await
    }

    pub async fn is_listening(&self, device: &DeviceId) -> bool {
        self.inner.telemetry.is_listening(device).await
    }

    pub fn readings(&self, device: &DeviceId) -> ReadingStream {
        self.inner.telemetry.readings(device)
    }

    pub fn latest_reading(&self, device: &DeviceId) -> Option<SensorReading> {
        self.inner.telemetry.latest(device)
    }

    pub fn telemetry_events(&self) -> broadcast::Receiver<Arc<TelemetryEvent>> {
        self.inner.telemetry.events()
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub async fn send_command(
        &self,
        device: &DeviceId,
        action: CommandAction,
        value: f32,
    ) -> Result<Command, CoreError> {
        self.inner.commands.send(device, action, value).await
    }

    pub async fn current_command(&self, device: &DeviceId) -> Result<Option<Command>, CoreError> {
        self.inner.commands.current(device).await
    }

    pub async fn await_acknowledgment(
        &self,
        device: &DeviceId,
        issued: &Command,
    ) -> Result<AckOutcome, CoreError> {
        self.inner.commands.await_acknowledgment(device, issued).await
    }

    // ── Liveness & history ───────────────────────────────────────────

    /// Classify the device against the clock's current time.
    ///
    /// Uses the newest telemetry timestamp seen by either the telemetry
    /// manager or the directory. Never cached.
    pub fn liveness(&self, device: &DeviceId) -> Liveness {
        let from_reading = self.inner.telemetry.latest(device).map(|r| r.timestamp);
        let from_record = self
            .inner
            .directory
            .get(device)
            .and_then(|d| d.last_update);
        let last = from_reading.max(from_record);

        liveness::classify(
            last,
            self.inner.clock.now_millis(),
            self.inner.config.offline_threshold_millis(),
        )
    }

    pub async fn fetch_history(
        &self,
        device: &DeviceId,
        range: TimeRange,
    ) -> Result<HistoryPage, CoreError> {
        let snapshot = self.inner.store.read(&paths::device_history(device)).await?;
        let page = collect_history(
            &snapshot,
            range,
            self.inner.clock.now_millis(),
            self.inner.config.history_limit,
        );
        debug!(%device, %range, entries = page.len(), skipped = page.skipped, "history loaded");
        Ok(page)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Close every subscription and join its task.
    pub async fn shutdown(&self) {
        self.inner.telemetry.shutdown().await;
        self.inner.directory.unload().await;
        debug!("controller shut down");
    }
}
