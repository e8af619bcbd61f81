use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current wall-clock time in milliseconds since UNIX epoch.
///
/// This is a convenience for demos and event journaling; the matching hot
/// path uses [`crate::clock::Clock`] exclusively.
pub fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
