// ── Listing application ──
//
// Applies a `users/{uid}/devices` snapshot to the directory with
// upsert-then-prune, so readers never observe a transient empty list
// and metadata or telemetry fields of surviving devices are kept.

use std::collections::HashSet;

use dryerlink_store::Snapshot;
use tracing::debug;

use super::{DirectoryEvent, Shared};
use crate::model::{Device, DeviceId, UserDeviceLink};

impl Shared {
    /// Returns the devices that still need a metadata fetch.
    pub(super) fn apply_listing(&self, snapshot: &Snapshot) -> Vec<DeviceId> {
        let mut incoming = HashSet::new();
        let mut needs_metadata = Vec::new();

        for child in snapshot.children() {
            let key = child.path().key().unwrap_or_default();
            let id = match DeviceId::new(key) {
                Ok(id) => id,
                Err(e) => {
                    debug!(path = %child.path(), "skipping listing entry with an invalid key");
                    self.emit(DirectoryEvent::EntryMalformed {
                        key: key.to_owned(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            let link = match child.decode::<UserDeviceLink>() {
                Ok(Some(link)) => link,
                Ok(None) => continue,
                Err(e) => {
                    debug!(device = %id, error = %e, "skipping malformed listing entry");
                    self.emit(DirectoryEvent::EntryMalformed {
                        key: id.to_string(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            incoming.insert(id.clone());
            let is_new = self.devices.upsert_with(
                id.clone(),
                || Device::from_link(id.clone(), &link),
                |device| device.apply_link(&link),
            );
            if is_new || self.devices.get(&id).is_some_and(|d| !d.has_metadata()) {
                needs_metadata.push(id);
            }
        }

        for existing in self.devices.keys() {
            if !incoming.contains(&existing) {
                self.devices.remove(&existing);
            }
        }
        needs_metadata
    }
}
