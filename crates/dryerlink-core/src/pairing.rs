// ── Pairing state machine ──
//
// Validates and consumes one-time pairing codes, then binds the device
// to the claiming user. The claim itself is the only step that must be
// linearizable: it is a compare-and-set of `used` against the value the
// validation read observed. Everything after the claim is an idempotent
// overwrite that `repair` can re-apply.

use std::sync::Arc;

use dryerlink_store::{CasOutcome, KvStore};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{CoreError, PairingError};
use crate::model::{DeviceId, PairingCode, PairingRecord, UserDeviceLink, UserId};
use crate::paths;

const MIN_NAME_LEN: usize = 2;

/// Trim a user-chosen device name, rejecting blank or one-letter names.
pub(crate) fn normalize_device_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    (trimmed.chars().count() >= MIN_NAME_LEN).then(|| trimmed.to_owned())
}

/// Decide whether `record` can be claimed at `now_ms`.
///
/// Expiry is checked before `used`, so an expired code reports
/// `CodeExpired` whether or not someone consumed it.
pub fn check_claimable(record: &PairingRecord, now_ms: i64) -> Result<DeviceId, PairingError> {
    if record.is_expired(now_ms) {
        return Err(PairingError::CodeExpired);
    }
    if record.is_used() {
        return Err(PairingError::CodeAlreadyUsed);
    }
    let Some(raw) = record.device_id.as_deref() else {
        return Err(PairingError::MalformedRecord {
            reason: "deviceId missing".into(),
        });
    };
    DeviceId::new(raw).map_err(|e| PairingError::MalformedRecord {
        reason: e.to_string(),
    })
}

/// Pairing, repair, rename and unpair against one store.
#[derive(Clone)]
pub struct PairingService {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

impl PairingService {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Claim `code` for `user` and record the device under `name`.
    ///
    /// Exactly one of any number of concurrent calls with the same code
    /// succeeds when the store supports compare-and-set. Failures after
    /// the claim surface as [`PairingError::Incomplete`].
    pub async fn pair_device(
        &self,
        user: &UserId,
        code: &PairingCode,
        name: &str,
    ) -> Result<DeviceId, PairingError> {
        let name = normalize_device_name(name).ok_or_else(|| PairingError::InvalidDeviceName {
            name: name.to_owned(),
        })?;

        let snapshot = self.store.read(&paths::pairing_code(code)).await?;
        let record: PairingRecord = snapshot.decode()?.ok_or(PairingError::CodeNotFound)?;

        let now = self.clock.now_millis();
        let device_id = check_claimable(&record, now)?;
        debug!(%code, device = %device_id, "pairing code validated");

        self.claim(code, snapshot.child(paths::USED).into_value())
            .await?;
        info!(%code, device = %device_id, user = %user, "pairing code claimed");

        self.bind(user, &device_id, &name, now)
            .await
            .map_err(|e| {
                warn!(device = %device_id, error = %e, "pairing claimed but binding failed");
                PairingError::Incomplete {
                    device_id: device_id.clone(),
                    reason: e.to_string(),
                }
            })?;

        Ok(device_id)
    }

    /// Re-apply the post-claim writes for a device whose pairing stopped
    /// part-way. Keeps the original `pairedAt` when the link exists.
    pub async fn repair(
        &self,
        user: &UserId,
        device: &DeviceId,
        name: &str,
    ) -> Result<(), CoreError> {
        let name = normalize_device_name(name)
            .ok_or_else(|| CoreError::validation("device_name", "must be at least 2 characters"))?;

        let existing: Option<UserDeviceLink> = self
            .store
            .read(&paths::user_device(user, device))
            .await?
            .decode()?;
        let paired_at = existing.map_or_else(|| self.clock.now_millis(), |l| l.paired_at);

        self.bind(user, device, &name, paired_at).await?;
        info!(device = %device, user = %user, "pairing repaired");
        Ok(())
    }

    /// Rename a device the user owns, in both the user's list and the
    /// device's own info.
    pub async fn rename(
        &self,
        user: &UserId,
        device: &DeviceId,
        name: &str,
    ) -> Result<(), CoreError> {
        let name = normalize_device_name(name)
            .ok_or_else(|| CoreError::validation("device_name", "must be at least 2 characters"))?;

        let link_path = paths::user_device(user, device);
        if !self.store.read(&link_path).await?.exists() {
            return Err(CoreError::DeviceNotFound {
                device_id: device.to_string(),
            });
        }

        self.store
            .write(&link_path.child(paths::DEVICE_NAME), Value::String(name.clone()))
            .await?;
        self.store
            .write(&paths::device_name(device), Value::String(name))
            .await?;
        debug!(device = %device, "device renamed");
        Ok(())
    }

    /// Remove a device from the user's list and release its owner field
    /// if it still points at this user.
    pub async fn unpair(&self, user: &UserId, device: &DeviceId) -> Result<(), CoreError> {
        let link_path = paths::user_device(user, device);
        if !self.store.read(&link_path).await?.exists() {
            return Err(CoreError::DeviceNotFound {
                device_id: device.to_string(),
            });
        }
        self.store.remove(&link_path).await?;

        let owner_path = paths::device_paired_to(device);
        let owner = self.store.read(&owner_path).await?;
        if owner.value().and_then(Value::as_str) == Some(user.as_str()) {
            self.store.remove(&owner_path).await?;
        }
        info!(device = %device, user = %user, "device unpaired");
        Ok(())
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Flip `used` to `true`, conditional on it still holding `observed`.
    async fn claim(&self, code: &PairingCode, observed: Option<Value>) -> Result<(), PairingError> {
        let path = paths::pairing_used(code);
        match self
            .store
            .compare_and_set(&path, observed, Value::Bool(true))
            .await
        {
            Ok(CasOutcome::Applied) => Ok(()),
            Ok(CasOutcome::Conflict { current: None }) => {
                debug!(%code, "pairing record vanished before claim");
                Err(PairingError::CodeNotFound)
            }
            Ok(CasOutcome::Conflict { current: Some(_) }) => {
                debug!(%code, "lost pairing claim to a concurrent caller");
                Err(PairingError::CodeAlreadyUsed)
            }
            Err(e) if e.is_unsupported() => {
                warn!(%code, "store lacks compare-and-set, claiming with an unconditional write");
                self.store.write(&path, Value::Bool(true)).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The idempotent post-claim writes.
    async fn bind(
        &self,
        user: &UserId,
        device: &DeviceId,
        name: &str,
        paired_at: i64,
    ) -> Result<(), CoreError> {
        let link = UserDeviceLink {
            device_name: name.to_owned(),
            paired_at,
            notifications: true,
        };
        let link = serde_json::to_value(&link).map_err(|e| CoreError::Internal(e.to_string()))?;

        self.store
            .write(&paths::user_device(user, device), link)
            .await?;
        self.store
            .write(
                &paths::device_paired_to(device),
                Value::String(user.as_str().to_owned()),
            )
            .await?;
        self.store
            .write(&paths::device_name(device), Value::String(name.to_owned()))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(used: Option<bool>, expires_at: Option<i64>) -> PairingRecord {
        PairingRecord {
            device_id: Some("dev-1".into()),
            used,
            expires_at,
        }
    }

    #[test]
    fn fresh_code_is_claimable() {
        let id = check_claimable(&record(Some(false), Some(100)), 50).unwrap();
        assert_eq!(id.as_str(), "dev-1");
    }

    #[test]
    fn expiry_wins_over_used() {
        let err = check_claimable(&record(Some(true), Some(100)), 101).unwrap_err();
        assert!(matches!(err, PairingError::CodeExpired));
        let err = check_claimable(&record(Some(false), Some(100)), 101).unwrap_err();
        assert!(matches!(err, PairingError::CodeExpired));
    }

    #[test]
    fn used_code_is_rejected() {
        let err = check_claimable(&record(Some(true), Some(100)), 50).unwrap_err();
        assert!(matches!(err, PairingError::CodeAlreadyUsed));
    }

    #[test]
    fn expiry_is_exclusive() {
        assert!(check_claimable(&record(None, Some(100)), 100).is_ok());
    }

    #[test]
    fn missing_device_id_is_malformed() {
        let rec = PairingRecord {
            device_id: None,
            used: Some(false),
            expires_at: None,
        };
        let err = check_claimable(&rec, 0).unwrap_err();
        assert_eq!(err.code(), "MALFORMED_RECORD");

        let rec = PairingRecord {
            device_id: Some("a/b".into()),
            ..rec
        };
        assert_eq!(check_claimable(&rec, 0).unwrap_err().code(), "MALFORMED_RECORD");
    }

    #[test]
    fn device_names_are_trimmed() {
        assert_eq!(normalize_device_name("  Dryer 1 ").as_deref(), Some("Dryer 1"));
        assert!(normalize_device_name(" a ").is_none());
        assert!(normalize_device_name("   ").is_none());
    }
}
