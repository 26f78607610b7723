// ── Store path model ──
//
// The single place that knows the wire layout. Every component asks
// here for a location instead of formatting strings. Keys are validated
// newtypes, so distinct (entity, id) pairs always map to distinct paths.

use dryerlink_store::StorePath;

use crate::model::{DeviceId, PairingCode, UserId};

const DEVICES: &str = "devices";
const USERS: &str = "users";
const PAIRING: &str = "devicePairing";

const CURRENT: &str = "current";
const HISTORY: &str = "history";
const COMMANDS: &str = "commands";
const DEVICE_INFO: &str = "deviceInfo";
const USER_DEVICES: &str = "devices";

pub(crate) const PAIRED_TO: &str = "pairedTo";
pub(crate) const DEVICE_NAME: &str = "deviceName";
pub(crate) const USED: &str = "used";

/// `devices/{deviceId}`
pub fn device(id: &DeviceId) -> StorePath {
    StorePath::root().child(DEVICES).child(id.as_str())
}

/// `devices/{deviceId}/current`
pub fn device_current(id: &DeviceId) -> StorePath {
    device(id).child(CURRENT)
}

/// `devices/{deviceId}/history`
pub fn device_history(id: &DeviceId) -> StorePath {
    device(id).child(HISTORY)
}

/// `devices/{deviceId}/commands`
pub fn device_commands(id: &DeviceId) -> StorePath {
    device(id).child(COMMANDS)
}

/// `devices/{deviceId}/deviceInfo`
pub fn device_info(id: &DeviceId) -> StorePath {
    device(id).child(DEVICE_INFO)
}

/// `devices/{deviceId}/deviceInfo/pairedTo`
pub fn device_paired_to(id: &DeviceId) -> StorePath {
    device_info(id).child(PAIRED_TO)
}

/// `devices/{deviceId}/deviceInfo/deviceName`
pub fn device_name(id: &DeviceId) -> StorePath {
    device_info(id).child(DEVICE_NAME)
}

/// `users/{userId}`
pub fn user(id: &UserId) -> StorePath {
    StorePath::root().child(USERS).child(id.as_str())
}

/// `users/{userId}/devices`
pub fn user_devices(id: &UserId) -> StorePath {
    user(id).child(USER_DEVICES)
}

/// `users/{userId}/devices/{deviceId}`
pub fn user_device(user_id: &UserId, device_id: &DeviceId) -> StorePath {
    user_devices(user_id).child(device_id.as_str())
}

/// `devicePairing/{code}`
pub fn pairing_code(code: &PairingCode) -> StorePath {
    StorePath::root().child(PAIRING).child(code.as_str())
}

/// `devicePairing/{code}/used`
pub fn pairing_used(code: &PairingCode) -> StorePath {
    pairing_code(code).child(USED)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn dev(s: &str) -> DeviceId {
        DeviceId::new(s).unwrap()
    }

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    #[test]
    fn renders_wire_layout() {
        let d = dev("dev-1");
        let u = uid("userA");
        let code = PairingCode::parse("123456").unwrap();

        assert_eq!(device(&d).to_string(), "devices/dev-1");
        assert_eq!(device_current(&d).to_string(), "devices/dev-1/current");
        assert_eq!(device_history(&d).to_string(), "devices/dev-1/history");
        assert_eq!(device_commands(&d).to_string(), "devices/dev-1/commands");
        assert_eq!(device_info(&d).to_string(), "devices/dev-1/deviceInfo");
        assert_eq!(
            device_paired_to(&d).to_string(),
            "devices/dev-1/deviceInfo/pairedTo"
        );
        assert_eq!(user_device(&u, &d).to_string(), "users/userA/devices/dev-1");
        assert_eq!(pairing_code(&code).to_string(), "devicePairing/123456");
        assert_eq!(pairing_used(&code).to_string(), "devicePairing/123456/used");
    }

    #[test]
    fn distinct_entities_get_distinct_paths() {
        let a = dev("a");
        let b = dev("b");
        let u = uid("a");
        let paths: HashSet<String> = [
            device(&a),
            device(&b),
            device_current(&a),
            device_commands(&a),
            device_info(&a),
            user(&u),
            user_devices(&u),
            user_device(&u, &a),
            user_device(&u, &b),
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(paths.len(), 9);
    }

    #[test]
    fn paths_are_deterministic() {
        assert_eq!(device_current(&dev("x")), device_current(&dev("x")));
    }
}
