// ── Device domain types ──

use serde::{Deserialize, Serialize};

use super::ids::{DeviceId, MacAddress, UserId};

/// Wire shape of `devices/{id}/deviceInfo`.
///
/// Written by firmware (hardware fields) and by the claiming client
/// (`pairedTo`, `deviceName`). Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paired_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
}

/// Wire shape of `users/{uid}/devices/{deviceId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDeviceLink {
    pub device_name: String,
    #[serde(default)]
    pub paired_at: i64,
    #[serde(default = "default_notifications")]
    pub notifications: bool,
}

fn default_notifications() -> bool {
    true
}

/// In-memory device record held by the device directory.
///
/// Three independent producers write into it, each owning its own
/// fields: the user's device list (name, pairing time), the one-shot
/// metadata fetch (hardware fields, owner) and live telemetry
/// (`online`, `last_update`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,

    // Listing
    pub paired_at: i64,
    pub notifications: bool,

    // Metadata
    pub mac: Option<MacAddress>,
    pub firmware_version: Option<String>,
    pub hardware_version: Option<String>,
    pub paired_to: Option<UserId>,

    // Telemetry hints -- not authoritative, see `liveness`
    pub online: bool,
    pub last_update: Option<i64>,
}

impl Device {
    pub fn from_link(id: DeviceId, link: &UserDeviceLink) -> Self {
        Self {
            id,
            name: link.device_name.clone(),
            paired_at: link.paired_at,
            notifications: link.notifications,
            mac: None,
            firmware_version: None,
            hardware_version: None,
            paired_to: None,
            online: false,
            last_update: None,
        }
    }

    /// `true` once the metadata fetch has landed.
    pub fn has_metadata(&self) -> bool {
        self.mac.is_some() || self.firmware_version.is_some() || self.hardware_version.is_some()
    }

    pub(crate) fn apply_link(&mut self, link: &UserDeviceLink) {
        self.name.clone_from(&link.device_name);
        self.paired_at = link.paired_at;
        self.notifications = link.notifications;
    }

    pub(crate) fn apply_info(&mut self, info: &DeviceInfo) {
        self.mac = info.mac_address.as_deref().map(MacAddress::new);
        self.firmware_version.clone_from(&info.firmware_version);
        self.hardware_version.clone_from(&info.hardware_version);
        self.paired_to = info
            .paired_to
            .as_deref()
            .and_then(|uid| UserId::new(uid).ok());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn device_info_tolerates_missing_fields() {
        let info: DeviceInfo = serde_json::from_value(json!({ "macAddress": "AA:BB" })).unwrap();
        assert_eq!(info.mac_address.as_deref(), Some("AA:BB"));
        assert!(info.paired_to.is_none());
    }

    #[test]
    fn link_uses_wire_field_names() {
        let link = UserDeviceLink {
            device_name: "Dryer 1".into(),
            paired_at: 1_700_000_000_000,
            notifications: true,
        };
        assert_eq!(
            serde_json::to_value(&link).unwrap(),
            json!({ "deviceName": "Dryer 1", "pairedAt": 1_700_000_000_000_i64, "notifications": true })
        );
    }

    #[test]
    fn link_defaults_notifications_on() {
        let link: UserDeviceLink =
            serde_json::from_value(json!({ "deviceName": "Dryer" })).unwrap();
        assert!(link.notifications);
        assert_eq!(link.paired_at, 0);
    }

    #[test]
    fn apply_info_keeps_listing_fields() {
        let id = DeviceId::new("dev-1").unwrap();
        let link = UserDeviceLink {
            device_name: "Dryer 1".into(),
            paired_at: 5,
            notifications: true,
        };
        let mut device = Device::from_link(id, &link);
        device.apply_info(&DeviceInfo {
            mac_address: Some("AA-BB-CC-DD-EE-FF".into()),
            firmware_version: Some("1.2.0".into()),
            paired_to: Some("user-a".into()),
            ..DeviceInfo::default()
        });

        assert_eq!(device.name, "Dryer 1");
        assert_eq!(device.mac.as_ref().unwrap().as_str(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(device.paired_to.as_ref().unwrap().as_str(), "user-a");
        assert!(device.has_metadata());
    }
}
