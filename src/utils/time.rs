use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0)
}

/// Saturates instead of wrapping, timestamps come straight from client JSON
pub fn elapsed_seconds(start: i64, end: i64) -> i64 {
    end.saturating_sub(start)
}

/// Whether `timestamp` lies less than `window` before `current_time`.
///
/// Timestamps in the future count as recent.
pub fn is_within(timestamp: i64, window: Duration, current_time: i64) -> bool {
    let window = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);
    elapsed_seconds(timestamp, current_time) < window
}
