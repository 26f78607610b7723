// ── Command slot payloads ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Actions understood by dryer firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandAction {
    Start,
    Stop,
    /// `value` is the new setpoint in °C.
    SetTemp,
    /// `value` is `1.0` to energize the heater relay, `0.0` to release it.
    ManualSsr,
}

/// Wire shape of `devices/{id}/commands`.
///
/// The slot holds one command at a time. Firmware flips `acknowledged`
/// once it has acted; clients only ever write `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub action: CommandAction,
    #[serde(default)]
    pub value: f32,
    pub timestamp: i64,
    #[serde(default)]
    pub acknowledged: bool,
}

impl Command {
    pub fn new(action: CommandAction, value: f32, timestamp: i64) -> Self {
        Self {
            action,
            value,
            timestamp,
            acknowledged: false,
        }
    }

    /// Whether `other` in the slot is this same issuance (ignoring the ack flag).
    pub fn same_issuance(&self, other: &Command) -> bool {
        self.action == other.action
            && self.timestamp == other.timestamp
            && self.value.to_bits() == other.value.to_bits()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn action_wire_names() {
        assert_eq!(serde_json::to_value(CommandAction::SetTemp).unwrap(), json!("SET_TEMP"));
        assert_eq!(CommandAction::ManualSsr.to_string(), "MANUAL_SSR");
        assert_eq!("START".parse::<CommandAction>().unwrap(), CommandAction::Start);
        assert!("REBOOT".parse::<CommandAction>().is_err());
    }

    #[test]
    fn command_serializes_for_firmware() {
        let cmd = Command::new(CommandAction::SetTemp, 45.0, 1_700_000_000_000);
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({
                "action": "SET_TEMP",
                "value": 45.0,
                "timestamp": 1_700_000_000_000_i64,
                "acknowledged": false
            })
        );
    }

    #[test]
    fn acknowledged_copy_is_same_issuance() {
        let cmd = Command::new(CommandAction::Start, 0.0, 10);
        let acked = Command {
            acknowledged: true,
            ..cmd.clone()
        };
        assert!(cmd.same_issuance(&acked));
        assert!(!cmd.same_issuance(&Command::new(CommandAction::Start, 0.0, 11)));
    }
}
