// ── History reader ──
//
// One-shot read of `devices/{id}/history`. Firmware appends readings
// under epoch-second keys; older firmware omits the `timestamp` field,
// so the key doubles as the fallback timestamp.

use dryerlink_store::Snapshot;
use tracing::debug;

use crate::model::{HistoryEntry, HistoryPage, SensorReading, TimeRange};

/// Decode, filter, sort (newest first) and truncate a history subtree.
pub fn collect_history(
    snapshot: &Snapshot,
    range: TimeRange,
    now_ms: i64,
    limit: usize,
) -> HistoryPage {
    let cutoff = range.cutoff(now_ms);
    let mut page = HistoryPage::default();

    for child in snapshot.children() {
        let key = child.path().key().unwrap_or_default().to_owned();
        let mut reading = match child.decode::<SensorReading>() {
            Ok(Some(reading)) => reading,
            Ok(None) => continue,
            Err(e) => {
                debug!(%key, error = %e, "skipping undecodable history entry");
                page.skipped += 1;
                continue;
            }
        };

        if reading.timestamp == 0 {
            if let Ok(secs) = key.parse::<i64>() {
                reading.timestamp = secs.saturating_mul(1000);
            }
        }
        if cutoff.is_some_and(|c| reading.timestamp < c) {
            continue;
        }
        page.entries.push(HistoryEntry { key, reading });
    }

    page.entries
        .sort_by(|a, b| b.reading.timestamp.cmp(&a.reading.timestamp));
    page.entries.truncate(limit);
    page
}
