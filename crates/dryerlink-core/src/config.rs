// ── Runtime engine configuration ──
//
// Tuning knobs for the engine. Built by the embedding application
// (usually from `dryerlink-config`); core never reads config files.

use std::time::Duration;

/// Offline after this long without a telemetry write.
pub const DEFAULT_OFFLINE_THRESHOLD: Duration = Duration::from_secs(30);
pub const DEFAULT_HISTORY_LIMIT: usize = 100;
pub const DEFAULT_SETPOINT_MIN: f32 = 30.0;
pub const DEFAULT_SETPOINT_MAX: f32 = 60.0;
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Configuration for one [`Controller`](crate::Controller).
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Staleness threshold used by the liveness evaluator.
    pub offline_threshold: Duration,
    /// Maximum number of entries returned by a history read.
    pub history_limit: usize,
    /// Accepted `SET_TEMP` range, inclusive, °C.
    pub setpoint_min: f32,
    pub setpoint_max: f32,
    /// Capacity of the telemetry event broadcast channel.
    pub event_capacity: usize,
}

impl EngineConfig {
    pub fn offline_threshold_millis(&self) -> i64 {
        i64::try_from(self.offline_threshold.as_millis()).unwrap_or(i64::MAX)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            offline_threshold: DEFAULT_OFFLINE_THRESHOLD,
            history_limit: DEFAULT_HISTORY_LIMIT,
            setpoint_min: DEFAULT_SETPOINT_MIN,
            setpoint_max: DEFAULT_SETPOINT_MAX,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_firmware_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.offline_threshold_millis(), 30_000);
        assert_eq!(config.history_limit, 100);
        assert!((config.setpoint_min - 30.0).abs() < f32::EPSILON);
        assert!((config.setpoint_max - 60.0).abs() < f32::EPSILON);
    }
}
