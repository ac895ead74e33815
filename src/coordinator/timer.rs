//! Elapsed-time labels for order tickets.

use chrono::{DateTime, Utc};

/// Orders waiting this long are highlighted.
pub const URGENT_AFTER_SECS: i64 = 15 * 60;

fn elapsed_secs(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_seconds().max(0)
}

/// Formats the time since `created_at` as `45s`, `3m 20s` or `1h 5m`.
///
/// Timestamps in the future (clock skew) read as `0s`.
pub fn elapsed_label(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = elapsed_secs(created_at, now);
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);

    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

pub fn is_urgent(created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    elapsed_secs(created_at, now) >= URGENT_AFTER_SECS
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap()
    }

    #[test]
    fn labels() {
        let t = base();
        assert_eq!(elapsed_label(t, t + Duration::seconds(45)), "45s");
        assert_eq!(elapsed_label(t, t + Duration::seconds(200)), "3m 20s");
        assert_eq!(elapsed_label(t, t + Duration::minutes(65)), "1h 5m");
        assert_eq!(elapsed_label(t, t - Duration::seconds(30)), "0s");
    }

    #[test]
    fn urgent_from_fifteen_minutes() {
        let t = base();
        assert!(!is_urgent(t, t + Duration::seconds(URGENT_AFTER_SECS - 1)));
        assert!(is_urgent(t, t + Duration::minutes(15)));
    }
}
