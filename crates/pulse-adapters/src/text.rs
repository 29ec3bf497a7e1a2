//! Small phrasing helpers shared by the templated answers.

use chrono::{DateTime, Utc};
use pulse_core::Clock;

/// `1 note`, `3 notes`.
pub(crate) fn count(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("1 {}", singular)
    } else {
        format!("{} {}", n, plural)
    }
}

/// True if the lowercased `query` contains any of `words`.
pub(crate) fn mentions(query: &str, words: &[&str]) -> bool {
    let lowered = query.to_lowercase();
    words.iter().any(|w| lowered.contains(w))
}

/// Latest parseable timestamp among `raw`.
pub(crate) fn latest<'a>(clock: &dyn Clock, raw: impl IntoIterator<Item = &'a str>) -> Option<DateTime<Utc>> {
    raw.into_iter().filter_map(|s| clock.parse(s)).max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::ManualClock;

    #[test]
    fn helpers() {
        assert_eq!(count(1, "note", "notes"), "1 note");
        assert_eq!(count(0, "note", "notes"), "0 notes");
        assert!(mentions("Show my LATEST note", &["latest", "recent"]));

        let clock = ManualClock::at("2026-01-01T00:00:00Z");
        let got = latest(&clock, ["2025-12-01", "garbage", "2025-12-24T10:00:00Z"]);
        assert_eq!(got, clock.parse("2025-12-24T10:00:00Z"));
    }
}
