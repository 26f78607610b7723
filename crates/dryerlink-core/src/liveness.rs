// ── Liveness evaluation ──
//
// Online status is inferred only from how stale the last telemetry write
// is. The `online` flags carried on readings and device records are hints;
// re-evaluate here on every display tick instead of caching the result.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Offline after this many milliseconds without a telemetry write.
pub const OFFLINE_THRESHOLD_MS: i64 = 30_000;

/// Derived connectivity of a device at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Liveness {
    Online,
    Offline,
    /// No telemetry has ever been seen.
    Unknown,
}

/// `true` iff more than `threshold_ms` elapsed between `last_update` and `now`.
///
/// A timestamp in the future (clock skew) counts as fresh.
pub fn is_stale(last_update: i64, now: i64, threshold_ms: i64) -> bool {
    now.saturating_sub(last_update) > threshold_ms
}

/// [`is_stale`] with the default 30 s threshold.
pub fn is_offline(last_update: i64, now: i64) -> bool {
    is_stale(last_update, now, OFFLINE_THRESHOLD_MS)
}

/// Classify a possibly-missing last update.
pub fn classify(last_update: Option<i64>, now: i64, threshold_ms: i64) -> Liveness {
    match last_update {
        None => Liveness::Unknown,
        Some(ts) if is_stale(ts, now, threshold_ms) => Liveness::Offline,
        Some(_) => Liveness::Online,
    }
}
