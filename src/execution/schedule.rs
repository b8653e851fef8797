use chrono::{DateTime, Duration, Utc};

/// Next wall-clock boundary strictly after `now` that is a whole multiple of
/// the interval since the Unix epoch (XX:00, XX:05, XX:10 for 5 minutes).
pub fn next_boundary(now: DateTime<Utc>, interval_minutes: u32) -> DateTime<Utc> {
    let interval_ms = interval_minutes.max(1) as i64 * 60_000;
    let now_ms = now.timestamp_millis();
    let next_ms = (now_ms.div_euclid(interval_ms) + 1) * interval_ms;

    DateTime::from_timestamp_millis(next_ms).unwrap_or(now + Duration::milliseconds(interval_ms))
}

/// How long to sleep from `now` until the next boundary
pub fn time_until_next_boundary(now: DateTime<Utc>, interval_minutes: u32) -> std::time::Duration {
    (next_boundary(now, interval_minutes) - now)
        .to_std()
        .unwrap_or_default()
}
