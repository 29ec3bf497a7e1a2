//! **Focus timer**: the running focus session and today's completed sessions.
//!
//! Remaining time depends on "now", so this adapter polls: while anything is subscribed it
//! reloads on the configured interval and pushes the new countdown to subscribers. External
//! writes to either key (the timer UI runs elsewhere) reload immediately.

use crate::text::count;
use chrono::{DateTime, Duration, Utc};
use pulse_core::{AdapterContext, AdapterError, AppDescriptor, AppSource, Clock};
use serde::{Deserialize, Serialize};

pub const STATE_KEY: &str = "focus.state";
pub const SESSIONS_KEY: &str = "focus.sessions";

const DEFAULT_SESSION_MINUTES: u32 = 25;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusState {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSession {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub started_at: String,
    #[serde(default)]
    pub minutes: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusData {
    pub running: bool,
    pub label: Option<String>,
    pub remaining_secs: Option<i64>,
    pub today_sessions: usize,
    pub today_minutes: u32,
    pub last_session: Option<DateTime<Utc>>,
}

impl FocusData {
    /// `mm:ss` of the running countdown.
    pub fn remaining_clock(&self) -> Option<String> {
        self.remaining_secs
            .map(|s| format!("{:02}:{:02}", s / 60, s % 60))
    }
}

pub struct FocusSource;

fn remaining(state: &FocusState, clock: &dyn Clock) -> Option<i64> {
    if !state.running {
        return None;
    }
    let started = clock.parse(state.started_at.as_deref()?)?;
    let minutes = state.duration_minutes.filter(|m| *m > 0).unwrap_or(DEFAULT_SESSION_MINUTES);
    let ends = started.checked_add_signed(Duration::minutes(i64::from(minutes)))?;
    Some((ends - clock.now()).num_seconds().max(0))
}

impl AppSource for FocusSource {
    type Data = FocusData;

    fn descriptor(&self) -> AppDescriptor {
        AppDescriptor::new("focus", "Focus Timer", "⏱️")
            .capabilities(["countdown", "today"])
            .keywords(["focus", "timer", "pomodoro", "session", "sessions", "deep work"])
    }

    fn reload(&self, ctx: &AdapterContext) -> Result<FocusData, AdapterError> {
        let state: FocusState = ctx.load_or_default("focus", STATE_KEY)?;
        let sessions: Vec<FocusSession> = ctx.load_or_default("focus", SESSIONS_KEY)?;
        let clock = ctx.clock.as_ref();
        let today = clock.now().date_naive();

        let mut today_sessions = 0;
        let mut today_minutes = 0u32;
        let mut last_session = None;
        for session in &sessions {
            let Some(at) = clock.parse(&session.started_at) else { continue };
            last_session = last_session.max(Some(at));
            if at.date_naive() == today {
                today_sessions += 1;
                today_minutes = today_minutes.saturating_add(session.minutes);
            }
        }

        let remaining_secs = remaining(&state, clock);
        Ok(FocusData {
            running: remaining_secs.is_some_and(|s| s > 0),
            label: state.label.filter(|l| !l.trim().is_empty()),
            remaining_secs,
            today_sessions,
            today_minutes,
            last_session,
        })
    }

    fn summarize(&self, data: &FocusData, _ctx: &AdapterContext) -> String {
        let today = format!(
            "{} today ({} min)",
            count(data.today_sessions, "session", "sessions"),
            data.today_minutes
        );
        match (data.running, data.remaining_clock()) {
            (true, Some(left)) => format!("Focusing, {} left; {}", left, today),
            _ => today,
        }
    }

    fn is_active(&self, data: &FocusData) -> bool {
        data.running || data.today_sessions > 0
    }

    fn last_used(&self, data: &FocusData, _ctx: &AdapterContext) -> Option<DateTime<Utc>> {
        data.last_session
    }

    fn respond(&self, _query: &str, data: &FocusData, _ctx: &AdapterContext) -> Result<Option<String>, AdapterError> {
        let today = format!(
            "You've done {} today, {} minutes in total.",
            count(data.today_sessions, "focus session", "focus sessions"),
            data.today_minutes
        );
        if let (true, Some(left)) = (data.running, data.remaining_clock()) {
            let label = data.label.as_deref().unwrap_or("focus");
            return Ok(Some(format!("{} left in your {} session. {}", left, label, today)));
        }
        Ok(Some(format!("No focus session is running. {}", today)))
    }

    fn watched_keys(&self) -> Vec<String> {
        vec![STATE_KEY.to_string(), SESSIONS_KEY.to_string()]
    }

    fn polls(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::{Adapter, AdapterSettings, DashboardAdapter, ManualClock, MemoryStore, StoreExt};
    use std::sync::{Arc, Mutex};

    fn fixture() -> (Arc<Adapter<FocusSource>>, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        store
            .set_json(
                STATE_KEY,
                &FocusState {
                    running: true,
                    label: Some("writing".into()),
                    started_at: Some("2026-09-01T09:00:00Z".into()),
                    duration_minutes: Some(50),
                },
            )
            .unwrap();
        store
            .set_json(
                SESSIONS_KEY,
                &serde_json::json!([
                    {"label": "email", "startedAt": "2026-09-01T07:00:00Z", "minutes": 25},
                    {"label": "review", "startedAt": "2026-08-31T15:00:00Z", "minutes": 40},
                    {"startedAt": "garbage", "minutes": 90}
                ]),
            )
            .unwrap();
        let clock = Arc::new(ManualClock::at("2026-09-01T09:12:30Z"));
        let ctx = AdapterContext::new(store.clone())
            .with_clock(clock.clone())
            .with_settings(AdapterSettings {
                poll_interval: std::time::Duration::from_millis(20),
                ..AdapterSettings::default()
            });
        (Adapter::new(FocusSource, ctx), store, clock)
    }

    #[tokio::test]
    async fn countdown_and_today_totals() {
        let (focus, _, _) = fixture();
        let data = focus.snapshot().data;
        assert_eq!(data.remaining_clock().as_deref(), Some("37:30"));
        assert_eq!((data.today_sessions, data.today_minutes), (1, 25));
        assert_eq!(
            focus.respond("how long is left on my timer").await.as_deref(),
            Some("37:30 left in your writing session. You've done 1 focus session today, 25 minutes in total.")
        );
    }

    #[test]
    fn finished_session_is_not_running() {
        let (focus, _, clock) = fixture();
        clock.advance_ms(60 * 60 * 1000);
        focus.invalidate();
        let snap = focus.snapshot();
        assert!(!snap.data.running);
        assert_eq!(snap.summary, "1 session today (25 min)");
    }

    #[test]
    fn session_ending_past_the_calendar_limit_is_ignored() {
        let (focus, store, _) = fixture();
        store
            .set_json(
                STATE_KEY,
                &FocusState {
                    running: true,
                    label: None,
                    // Unix millis close to the latest date chrono can represent.
                    started_at: Some("8200000000000000".into()),
                    duration_minutes: Some(u32::MAX),
                },
            )
            .unwrap();
        assert!(focus.reload_now());
        assert!(focus.is_healthy());
        let data = focus.current();
        assert!(!data.running);
        assert_eq!(data.remaining_secs, None);
    }

    #[tokio::test]
    async fn polling_pushes_countdown_to_subscribers() {
        let (focus, _, clock) = fixture();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = focus.subscribe(move |d: &FocusData| sink.lock().unwrap().push(d.remaining_secs));
        assert!(focus.is_polling());

        clock.advance_ms(30_000);
        let mut waited = 0;
        while seen.lock().unwrap().is_empty() && waited < 100 {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            waited += 1;
        }
        assert_eq!(seen.lock().unwrap().first().copied().flatten(), Some(37 * 60));

        sub.unsubscribe();
        assert!(!focus.is_polling());
    }
}
