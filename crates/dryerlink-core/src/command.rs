// ── Command channel ──
//
// Each device has a single command slot at `devices/{id}/commands`.
// Sending overwrites it unconditionally; an unacknowledged command is
// lost when the next one is sent. Acknowledgment is written by firmware
// and observed here by subscribing to the slot.

use std::sync::Arc;

use dryerlink_store::{ChangeEvent, KvStore, SubscriptionId};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::model::{Command, CommandAction, DeviceId};
use crate::paths;

/// How an issued command left the slot.
#[derive(Debug, Clone, PartialEq)]
pub enum AckOutcome {
    /// Firmware acknowledged this exact command.
    Acknowledged(Command),
    /// The slot now holds something else (or nothing). The issued
    /// command was discarded unacknowledged.
    Superseded { by: Option<Command> },
}

/// Writes commands and observes their acknowledgment.
#[derive(Clone)]
pub struct CommandChannel {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    setpoint_min: f32,
    setpoint_max: f32,
}

impl CommandChannel {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, config: &EngineConfig) -> Self {
        Self {
            store,
            clock,
            setpoint_min: config.setpoint_min,
            setpoint_max: config.setpoint_max,
        }
    }

    /// Reject values firmware cannot act on.
    pub fn validate(&self, action: CommandAction, value: f32) -> Result<(), CoreError> {
        if !value.is_finite() {
            return Err(CoreError::validation("value", "must be a finite number"));
        }
        if action == CommandAction::SetTemp
            && !(self.setpoint_min..=self.setpoint_max).contains(&value)
        {
            return Err(CoreError::validation(
                "value",
                format!(
                    "setpoint {value} outside {}..={}",
                    self.setpoint_min, self.setpoint_max
                ),
            ));
        }
        Ok(())
    }

    /// Overwrite the device's command slot. Returns the command as written.
    pub async fn send(
        &self,
        device: &DeviceId,
        action: CommandAction,
        value: f32,
    ) -> Result<Command, CoreError> {
        self.validate(action, value)?;

        let command = Command::new(action, value, self.clock.now_millis());
        let payload =
            serde_json::to_value(&command).map_err(|e| CoreError::Internal(e.to_string()))?;
        self.store
            .write(&paths::device_commands(device), payload)
            .await?;

        debug!(%device, %action, value, timestamp = command.timestamp, "command sent");
        Ok(command)
    }

    /// Read the slot once.
    pub async fn current(&self, device: &DeviceId) -> Result<Option<Command>, CoreError> {
        let snapshot = self.store.read(&paths::device_commands(device)).await?;
        Ok(snapshot.decode()?)
    }

    /// Wait until `issued` is acknowledged or replaced.
    ///
    /// Imposes no timeout; wrap in `tokio::time::timeout` if needed.
    /// Dropping the future releases the slot subscription.
    pub async fn await_acknowledgment(
        &self,
        device: &DeviceId,
        issued: &Command,
    ) -> Result<AckOutcome, CoreError> {
        let path = paths::device_commands(device);
        let mut subscription = self.store.subscribe(&path).await?;
        let guard = SubscriptionGuard::new(Arc::clone(&self.store), subscription.id());

        let outcome = loop {
            match subscription.next().await {
                Some(ChangeEvent::Value(snapshot)) => match snapshot.decode::<Command>() {
                    Ok(Some(current)) if issued.same_issuance(&current) => {
                        if current.acknowledged {
                            break Ok(AckOutcome::Acknowledged(current));
                        }
                    }
                    Ok(by) => break Ok(AckOutcome::Superseded { by }),
                    Err(e) => {
                        warn!(%device, error = %e, "command slot holds an unreadable payload");
                        break Ok(AckOutcome::Superseded { by: None });
                    }
                },
                Some(ChangeEvent::Cancelled(err)) => break Err(err.into()),
                None => {
                    break Err(CoreError::SubscriptionCancelled {
                        path: path.to_string(),
                        reason: "feed closed".into(),
                    });
                }
            }
        };

        guard.release().await;
        if let Ok(result) = &outcome {
            debug!(%device, ?result, "command settled");
        }
        outcome
    }
}

// ── Subscription guard ───────────────────────────────────────────────

/// Releases a store subscription when dropped mid-await.
struct SubscriptionGuard {
    store: Arc<dyn KvStore>,
    id: Option<SubscriptionId>,
}

impl SubscriptionGuard {
    fn new(store: Arc<dyn KvStore>, id: SubscriptionId) -> Self {
        Self {
            store,
            id: Some(id),
        }
    }

    async fn release(mut self) {
        if let Some(id) = self.id.take() {
            if let Err(e) = self.store.unsubscribe(id).await {
                debug!(subscription = %id, error = %e, "command slot subscription already released");
            }
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let store = Arc::clone(&self.store);
            handle.spawn(async move {
                let _ = store.unsubscribe(id).await;
            });
        }
    }
}
