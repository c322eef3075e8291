use chrono::Utc;

/// Milliseconds since the Unix epoch; the unit of every timestamp column.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
