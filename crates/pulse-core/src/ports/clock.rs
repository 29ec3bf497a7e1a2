//! Time/Clock port: "now", date parsing/formatting and relative-time strings.
//!
//! Everything that reads the time goes through [`Clock`] so freshness leases, streak math
//! and "3 hours ago" strings can be driven by a [`ManualClock`] in tests.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::sync::Mutex;

/// Clock/date port consumed by adapters and the freshness lease.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current time as Unix milliseconds (freshness bookkeeping unit).
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }

    /// Parses a persisted timestamp. Returns `None` for anything unrecognised.
    fn parse(&self, raw: &str) -> Option<DateTime<Utc>> {
        parse_timestamp(raw)
    }

    fn format(&self, at: &DateTime<Utc>) -> String {
        at.format("%b %-d, %Y %H:%M").to_string()
    }

    /// Relative description of `at` measured from [`Clock::now`].
    fn time_ago(&self, at: &DateTime<Utc>) -> String {
        relative_to(self.now(), *at)
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(at) }
    }

    /// Starts at the given RFC 3339 / `YYYY-MM-DD` timestamp, or the Unix epoch if it does not parse.
    pub fn at(raw: &str) -> Self {
        Self::new(parse_timestamp(raw).unwrap_or_default())
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = at;
    }

    pub fn advance_ms(&self, millis: i64) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += ChronoDuration::milliseconds(millis);
    }

    pub fn advance(&self, by: std::time::Duration) {
        self.advance_ms(i64::try_from(by.as_millis()).unwrap_or(i64::MAX));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD` and Unix milliseconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        return s
            .parse::<i64>()
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
    }
    None
}

/// "just now", "5 minutes ago", "yesterday", "3 months ago", ...
pub fn relative_to(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds();
    if secs < 0 {
        return if secs > -45 { "just now".to_string() } else { "in the future".to_string() };
    }
    let minutes = secs / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    match secs {
        s if s < 45 => "just now".to_string(),
        s if s < 90 => "a minute ago".to_string(),
        _ if minutes < 45 => format!("{} minutes ago", minutes.max(2)),
        _ if minutes < 90 => "an hour ago".to_string(),
        _ if hours < 22 => format!("{} hours ago", hours.max(2)),
        _ if hours < 36 => "yesterday".to_string(),
        _ if days < 26 => format!("{} days ago", days.max(2)),
        _ if days < 45 => "a month ago".to_string(),
        _ if days < 320 => format!("{} months ago", (days / 30).max(2)),
        _ if days < 548 => "a year ago".to_string(),
        _ => format!("{} years ago", (days / 365).max(2)),
    }
}
