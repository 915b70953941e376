//! Injectable time source and timestamp formatting.
//!
//! Everything time-dependent in the engine (drift cadence, momentary resets,
//! log timestamps) reads the clock through [`Clock`], so tests can swap in a
//! [`ManualClock`] and advance it by hand.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of "now" in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, millis)
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        let step = millis(by);
        let _ = self
            .ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |ms| {
                Some(ms.saturating_add(step))
            });
    }

    /// Jump to an absolute time.
    pub fn set(&self, ms: u64) {
        self.ms.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.ms.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Format a log date the way the bridge displays it (Bulgarian locale).
/// Example: `16.10.2026 г.`
pub fn format_log_date(unix_ms: u64) -> String {
    let t = UtcStamp::from_unix_ms(unix_ms);
    format!("{:02}.{:02}.{:04} г.", t.day, t.month, t.year)
}

/// Full ISO-8601 timestamp.
/// Example: `2026-10-16T01:30:00Z`
pub fn format_iso8601(unix_ms: u64) -> String {
    let t = UtcStamp::from_unix_ms(unix_ms);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        t.year, t.month, t.day, t.hour, t.minute, t.second
    )
}

/// Wall-clock time of day, `HH:MM:SS` UTC.
pub fn format_time_of_day(unix_ms: u64) -> String {
    let t = UtcStamp::from_unix_ms(unix_ms);
    format!("{:02}:{:02}:{:02}", t.hour, t.minute, t.second)
}

/// Broken-down UTC time. No leap seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UtcStamp {
    year: u64,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

impl UtcStamp {
    fn from_unix_ms(unix_ms: u64) -> Self {
        let secs = unix_ms / 1000;
        let of_day = secs % 86_400;
        let (year, month, day) = civil_from_days(secs / 86_400);
        Self {
            year,
            month,
            day,
            hour: (of_day / 3600) as u8,
            minute: (of_day / 60 % 60) as u8,
            second: (of_day % 60) as u8,
        }
    }
}

/// Days since 1970-01-01 to a proleptic Gregorian date, counting in
/// 400-year eras that start on March 1st so the leap day falls last.
fn civil_from_days(days: u64) -> (u64, u8, u8) {
    // 1970-01-01 is day 719_468 counted from 0000-03-01
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z % 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let a = ManualClock::new(1_000);
        let b = a.clone();
        a.advance(Duration::from_millis(250));
        assert_eq!(b.now_ms(), 1_250);
        b.set(5);
        assert_eq!(a.now_ms(), 5);
    }

    #[test]
    fn system_clock_is_past_2020() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }

    #[test]
    fn log_date_epoch() {
        assert_eq!(format_log_date(0), "01.01.1970 г.");
    }

    #[test]
    fn log_date_known_day() {
        // 2000-02-29 12:00:00 UTC
        assert_eq!(format_log_date(951_825_600_000), "29.02.2000 г.");
    }

    #[test]
    fn iso8601_epoch() {
        assert_eq!(format_iso8601(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn time_of_day_drops_date() {
        // 2000-01-01 14:23:45 UTC
        assert_eq!(format_time_of_day(946_736_625_000), "14:23:45");
    }

    #[test]
    fn calendar_edges() {
        // 2100 is not a leap year
        assert_eq!(civil_from_days(47_540), (2100, 2, 28));
        assert_eq!(civil_from_days(47_541), (2100, 3, 1));
        // 2024-12-31, last day of a leap year
        assert_eq!(civil_from_days(20_088), (2024, 12, 31));
        assert_eq!(civil_from_days(20_089), (2025, 1, 1));
    }

    #[test]
    fn stamp_splits_time_of_day() {
        // 2026-10-16 01:30:00.999 UTC
        let t = UtcStamp::from_unix_ms(1_792_114_200_999);
        assert_eq!((t.year, t.month, t.day), (2026, 10, 16));
        assert_eq!((t.hour, t.minute, t.second), (1, 30, 0));
    }

    #[test]
    fn manual_clock_saturates() {
        let c = ManualClock::new(u64::MAX - 5);
        c.advance(Duration::from_millis(10));
        assert_eq!(c.now_ms(), u64::MAX);
        c.advance(Duration::MAX);
        assert_eq!(c.now_ms(), u64::MAX);
    }
}
