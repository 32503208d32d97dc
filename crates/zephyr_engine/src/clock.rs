//! The sync clock convention.
//!
//! Each store holds its last-synchronization instant under a reserved key.
//! Every sync operation refreshes the clock of each store it writes to,
//! after the content writes for that store have completed. The conflict
//! resolver compares the two clock values to pick the authoritative store.

use std::time::{SystemTime, UNIX_EPOCH};
use zephyr_store::{KeyValueStore, StoreResult, Value};

/// The reserved key holding a store's last-synchronization timestamp.
///
/// This key is never copied between stores and can never be monitored;
/// monitoring it would make every sync's own clock write re-trigger a sync.
pub const DEFAULT_CLOCK_KEY: &str = "zephyr.sync-clock";

/// Current wall-clock time in milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> i64 {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
}

/// Reads a store's sync clock.
///
/// A clock key holding anything other than a timestamp reads as absent, so
/// a corrupted clock degrades to the bootstrap rules instead of failing
/// the sync.
pub(crate) fn read_clock(store: &dyn KeyValueStore, clock_key: &str) -> StoreResult<Option<i64>> {
    Ok(store.read(clock_key)?.and_then(|v| v.as_timestamp()))
}

/// Writes a fresh clock value into a store.
pub(crate) fn touch_clock(store: &dyn KeyValueStore, clock_key: &str) -> StoreResult<()> {
    store.write(clock_key, Some(Value::Timestamp(now_millis())))
}
