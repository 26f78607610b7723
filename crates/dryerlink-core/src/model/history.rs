// ── Historical readings ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::SensorReading;

/// Window over `devices/{id}/history` used by charts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum TimeRange {
    #[default]
    #[strum(serialize = "24h")]
    #[serde(rename = "24h")]
    Day,
    #[strum(serialize = "7d")]
    #[serde(rename = "7d")]
    Week,
    #[strum(serialize = "30d")]
    #[serde(rename = "30d")]
    Month,
    #[strum(serialize = "all")]
    #[serde(rename = "all")]
    All,
}

impl TimeRange {
    /// Window length in hours, `None` for unbounded.
    pub fn hours(self) -> Option<i64> {
        match self {
            Self::Day => Some(24),
            Self::Week => Some(168),
            Self::Month => Some(720),
            Self::All => None,
        }
    }

    /// Earliest timestamp (epoch millis) inside the window ending at `now_ms`.
    pub fn cutoff(self, now_ms: i64) -> Option<i64> {
        self.hours()
            .map(|h| now_ms.saturating_sub(h.saturating_mul(3_600_000)))
    }
}

/// One decoded history entry, keyed by its child key in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub key: String,
    pub reading: SensorReading,
}

/// Result of a history read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryPage {
    /// Newest first.
    pub entries: Vec<HistoryEntry>,
    /// Children that could not be decoded and were skipped.
    pub skipped: usize,
}

impl HistoryPage {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
