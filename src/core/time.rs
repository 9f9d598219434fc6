//! Clock and id helpers.

use ulid::Ulid;

/// Unix-epoch milliseconds; the unit every visit timestamp is recorded in.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Returns unix-epoch seconds with `Z` suffix (e.g. `1771220592Z`).
pub fn now_epoch_z() -> String {
    format!("{}Z", now_millis() / 1000)
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}
