// ── Telemetry readings ──

use serde::{Deserialize, Serialize};

/// Immutable snapshot pushed by dryer firmware to `devices/{id}/current`.
///
/// Missing fields decode to their zero value, as the firmware omits
/// fields it has not sampled yet. Type mismatches are decode errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SensorReading {
    /// Chamber temperature, °C.
    pub temperature: f32,
    /// Relative humidity, %.
    pub humidity: f32,
    /// Target temperature, °C.
    #[serde(alias = "setpointTemp")]
    pub setpoint: f32,
    /// Heater relay (SSR) energized.
    #[serde(alias = "relay1Status")]
    pub ssr_status: bool,
    pub drying_active: bool,
    /// Firmware's own online flag. A hint only.
    pub online: bool,
    /// Epoch millis of the write.
    pub timestamp: i64,
}
