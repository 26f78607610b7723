// ── Pairing records ──

use serde::{Deserialize, Serialize};

/// Wire shape of `devicePairing/{code}`, provisioned out-of-band.
///
/// All fields are optional on the wire. A missing `used` counts as
/// unused and a missing `expiresAt` as never expiring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl PairingRecord {
    pub fn is_used(&self) -> bool {
        self.used.unwrap_or(false)
    }

    /// Expired strictly after `expiresAt`.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at.is_some_and(|at| now_ms > at)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_provisioned_record() {
        let rec: PairingRecord = serde_json::from_value(json!({
            "deviceId": "dev-1",
            "used": false,
            "expiresAt": 60_000
        }))
        .unwrap();
        assert_eq!(rec.device_id.as_deref(), Some("dev-1"));
        assert!(!rec.is_used());
        assert!(!rec.is_expired(60_000));
        assert!(rec.is_expired(60_001));
    }

    #[test]
    fn missing_fields_are_lenient() {
        let rec: PairingRecord = serde_json::from_value(json!({ "deviceId": "dev-1" })).unwrap();
        assert!(!rec.is_used());
        assert!(!rec.is_expired(i64::MAX));
    }
}
