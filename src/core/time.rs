//! Shared timestamp/identifier helpers for deterministic artifacts.

use ulid::Ulid;

/// Returns unix-epoch seconds with `Z` suffix (e.g. `1771220592Z`).
pub fn now_epoch_z() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{}Z", secs)
}

/// Unix-epoch nanoseconds, used as the sortable prefix of snapshot names.
/// Nanosecond resolution keeps back-to-back writes to the same destination
/// in creation order under lexicographic sort.
pub fn now_epoch_ns() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
}

/// Snapshot file name: nanosecond timestamp plus a ULID so that two writes
/// landing on the same tick never collide.
pub fn new_snapshot_id() -> String {
    format!("{}-{}", now_epoch_ns(), Ulid::new())
}
