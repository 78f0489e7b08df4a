//! Small shared helpers

/// Wall-clock milliseconds since the Unix epoch, as stored in chunk headers
pub fn now_millis() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64
}
