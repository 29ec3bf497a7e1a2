//! **Habits**: daily habits and their streaks.
//!
//! Streaks are computed from completion dates against the clock's "today". A streak is still
//! current if the habit was done today or yesterday. Malformed dates are counted and skipped.

use crate::text::{count, mentions};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use pulse_core::{AdapterContext, AdapterError, AppDescriptor, AppSource, Clock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const HABITS_KEY: &str = "habits";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Completion timestamps or dates.
    #[serde(default)]
    pub completions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitStat {
    pub id: String,
    pub name: String,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub done_today: bool,
    pub last_done: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitsData {
    pub habits: Vec<HabitStat>,
    pub done_today: usize,
    /// Completion entries that could not be parsed.
    pub skipped_entries: usize,
}

impl HabitsData {
    /// Habit with the longest running streak; the first listed wins ties.
    pub fn best_current(&self) -> Option<&HabitStat> {
        self.habits
            .iter()
            .filter(|h| h.current_streak > 0)
            .fold(None, |best: Option<&HabitStat>, h| match best {
                Some(b) if b.current_streak >= h.current_streak => Some(b),
                _ => Some(h),
            })
    }
}

pub struct HabitsSource;

impl HabitsSource {
    fn stat(record: &HabitRecord, today: NaiveDate, clock: &dyn Clock, skipped: &mut usize) -> HabitStat {
        let mut days = BTreeSet::new();
        for raw in &record.completions {
            match clock.parse(raw) {
                Some(at) => {
                    days.insert(at.date_naive());
                }
                None => *skipped += 1,
            }
        }
        // Completions in the future do not count.
        days.retain(|d| *d <= today);

        HabitStat {
            id: record.id.clone(),
            name: record.name.clone(),
            current_streak: current_streak(&days, today),
            longest_streak: longest_streak(&days),
            done_today: days.contains(&today),
            last_done: days.iter().next_back().copied(),
        }
    }
}

fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let yesterday = today - Duration::days(1);
    let mut cursor = if days.contains(&today) {
        today
    } else if days.contains(&yesterday) {
        yesterday
    } else {
        return 0;
    };
    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}

fn longest_streak(days: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;
    for day in days {
        run = match prev {
            Some(p) if *day - p == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(*day);
    }
    longest
}

fn days_phrase(n: u32) -> String {
    count(n as usize, "day", "days")
}

impl AppSource for HabitsSource {
    type Data = HabitsData;

    fn descriptor(&self) -> AppDescriptor {
        AppDescriptor::new("habits", "Habits", "✅")
            .capabilities(["streaks", "today"])
            .keywords(["habit", "habits", "streak", "streaks", "routine", "daily"])
    }

    fn reload(&self, ctx: &AdapterContext) -> Result<HabitsData, AdapterError> {
        let records: Vec<HabitRecord> = ctx.load_or_default("habits", HABITS_KEY)?;
        let today = ctx.clock.now().date_naive();
        let mut skipped = 0;
        let habits: Vec<HabitStat> = records
            .iter()
            .map(|r| Self::stat(r, today, ctx.clock.as_ref(), &mut skipped))
            .collect();
        if skipped > 0 {
            tracing::debug!(target: "pulse::adapter", app = "habits", skipped, "unparseable completion dates skipped");
        }
        Ok(HabitsData {
            done_today: habits.iter().filter(|h| h.done_today).count(),
            skipped_entries: skipped,
            habits,
        })
    }

    fn summarize(&self, data: &HabitsData, _ctx: &AdapterContext) -> String {
        if data.habits.is_empty() {
            return "No habits tracked".to_string();
        }
        let mut summary = format!(
            "{}, {} done today",
            count(data.habits.len(), "habit", "habits"),
            data.done_today
        );
        if let Some(best) = data.best_current() {
            summary.push_str(&format!(", best streak {} ({})", days_phrase(best.current_streak), best.name));
        }
        summary
    }

    fn is_active(&self, data: &HabitsData) -> bool {
        !data.habits.is_empty()
    }

    fn last_used(&self, data: &HabitsData, _ctx: &AdapterContext) -> Option<DateTime<Utc>> {
        data.habits
            .iter()
            .filter_map(|h| h.last_done)
            .max()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    fn respond(&self, query: &str, data: &HabitsData, _ctx: &AdapterContext) -> Result<Option<String>, AdapterError> {
        if data.habits.is_empty() {
            return Ok(Some("You aren't tracking any habits yet.".to_string()));
        }
        let lowered = query.to_lowercase();
        if let Some(habit) = data
            .habits
            .iter()
            .find(|h| !h.name.is_empty() && lowered.contains(&h.name.to_lowercase()))
        {
            return Ok(Some(format!(
                "Your {} streak is {} (longest {}).",
                habit.name,
                days_phrase(habit.current_streak),
                days_phrase(habit.longest_streak)
            )));
        }
        if mentions(query, &["streak"]) {
            return Ok(Some(match data.best_current() {
                Some(best) => format!(
                    "Your longest current streak is {} on {}.",
                    days_phrase(best.current_streak),
                    best.name
                ),
                None => "You don't have an active streak right now.".to_string(),
            }));
        }
        let pending: Vec<&str> = data
            .habits
            .iter()
            .filter(|h| !h.done_today)
            .map(|h| h.name.as_str())
            .collect();
        if pending.is_empty() {
            return Ok(Some(format!("All {} are done today.", count(data.habits.len(), "habit", "habits"))));
        }
        Ok(Some(format!(
            "{} of {} done today; still to do: {}.",
            data.done_today,
            data.habits.len(),
            pending.join(", ")
        )))
    }

    fn watched_keys(&self) -> Vec<String> {
        vec![HABITS_KEY.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::{Adapter, DashboardAdapter, ManualClock, MemoryStore, StoreExt};
    use std::sync::Arc;

    fn adapter(records: serde_json::Value) -> Arc<Adapter<HabitsSource>> {
        let store = Arc::new(MemoryStore::new());
        store.set_json(HABITS_KEY, &records).unwrap();
        let clock = Arc::new(ManualClock::at("2026-06-10T18:00:00Z"));
        Adapter::new(HabitsSource, AdapterContext::new(store).with_clock(clock))
    }

    #[test]
    fn streaks_from_dates() {
        let habits = adapter(serde_json::json!([
            {"id": "r", "name": "Reading", "completions": ["2026-06-08", "2026-06-09", "2026-06-10T07:00:00Z", "2026-06-01", "2026-06-02", "2026-06-03", "2026-06-04"]},
            {"id": "s", "name": "Stretch", "completions": ["2026-06-07", "2026-06-09", "yesterday-ish"]},
            {"id": "w", "name": "Water", "completions": ["2026-06-01", "2026-07-01"]}
        ]));
        let data = habits.snapshot().data;
        assert_eq!(data.skipped_entries, 1);

        let reading = &data.habits[0];
        assert_eq!((reading.current_streak, reading.longest_streak), (3, 4));
        assert!(reading.done_today);

        // Done yesterday only: the streak is still alive.
        assert_eq!(data.habits[1].current_streak, 1);
        // Future completion ignored.
        assert_eq!(data.habits[2].current_streak, 0);
        assert_eq!(data.habits[2].last_done, NaiveDate::from_ymd_opt(2026, 6, 1));

        assert_eq!(data.best_current().map(|h| h.id.as_str()), Some("r"));
    }

    #[tokio::test]
    async fn streak_answers() {
        let habits = adapter(serde_json::json!([
            {"name": "Reading", "completions": ["2026-06-09", "2026-06-10"]},
            {"name": "Stretch", "completions": []}
        ]));
        assert_eq!(
            habits.respond("What's my streak?").await.as_deref(),
            Some("Your longest current streak is 2 days on Reading.")
        );
        assert_eq!(
            habits.respond("reading streak").await.as_deref(),
            Some("Your Reading streak is 2 days (longest 2 days).")
        );
        assert_eq!(
            habits.respond("habits today").await.as_deref(),
            Some("1 of 2 done today; still to do: Stretch.")
        );
        assert_eq!(habits.respond("how can I keep a habit").await, None);
    }
}
