//! Demo records for `pulse-console --seed`.

use chrono::{Duration, Utc};
use pulse_adapters::favorites::{CATS_KEY, DOGS_KEY};
use pulse_adapters::focus::{SESSIONS_KEY, STATE_KEY};
use pulse_adapters::habits::HABITS_KEY;
use pulse_adapters::notes::NOTES_KEY;
use pulse_adapters::photos::PHOTOS_KEY;
use pulse_adapters::profile::PROFILE_KEY;
use pulse_adapters::rhythm::{ACTIVE_KEY, PATTERNS_KEY};
use pulse_core::{KeyValueStore, StoreError, StoreExt};
use serde_json::json;

fn id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Writes one small dataset per mini-app, relative to the current time.
pub fn seed_demo_data(store: &dyn KeyValueStore) -> Result<usize, StoreError> {
    let now = Utc::now();
    let day = |n: i64| (now - Duration::days(n)).format("%Y-%m-%d").to_string();
    let at = |mins: i64| (now - Duration::minutes(mins)).to_rfc3339();

    let records = [
        (
            PROFILE_KEY,
            json!({
                "name": "Alex",
                "bio": "Weekend drummer, weekday note-taker.",
                "location": "Porto",
                "interests": ["drums", "photography", "hiking"],
                "memberSince": day(420),
            }),
        ),
        (
            NOTES_KEY,
            json!([
                {"id": id(), "title": "Trip checklist", "content": "passport, charger, film", "tags": ["travel"], "pinned": true, "updatedAt": at(180)},
                {"id": id(), "title": "Song ideas", "content": "half-time groove in the bridge", "tags": ["music", "ideas"], "updatedAt": at(30)},
                {"id": id(), "title": "Groceries", "content": "coffee, oats", "tags": ["errands"], "updatedAt": at(60 * 26)},
            ]),
        ),
        (
            PHOTOS_KEY,
            json!([
                {"id": id(), "name": "Ribeira at dusk", "album": "Porto", "tags": ["river"], "favorite": true, "takenAt": at(60 * 50)},
                {"id": id(), "name": "Drum kit", "album": "Studio", "tags": ["music"], "takenAt": at(60 * 5)},
                {"id": id(), "name": "Trail marker", "tags": ["hiking"], "favorite": true, "takenAt": at(60 * 24 * 9)},
            ]),
        ),
        (
            HABITS_KEY,
            json!([
                {"id": id(), "name": "Practice", "completions": [day(0), day(1), day(2), day(3)]},
                {"id": id(), "name": "Stretch", "completions": [day(1), day(2)]},
                {"id": id(), "name": "Journal", "completions": [day(6)]},
            ]),
        ),
        (
            PATTERNS_KEY,
            json!([
                {"id": "p-four", "name": "Four on the floor", "bpm": 124, "steps": [
                    [true, false, false, false, true, false, false, false],
                    [false, false, true, false, false, false, true, false]
                ]},
                {"id": "p-half", "name": "Half time", "bpm": 70, "steps": [[true, false, false, false], [false, false, false, true]]},
            ]),
        ),
        (ACTIVE_KEY, json!("p-four")),
        (
            STATE_KEY,
            json!({"running": true, "label": "writing", "startedAt": at(10), "durationMinutes": 25}),
        ),
        (
            SESSIONS_KEY,
            json!([
                {"label": "email", "startedAt": at(120), "minutes": 25},
                {"label": "practice", "startedAt": at(60 * 24 + 30), "minutes": 45},
            ]),
        ),
        (
            CATS_KEY,
            json!([
                {"id": id(), "url": "https://images.example/cats/loaf.jpg", "caption": "Perfect loaf", "savedAt": at(90)},
                {"id": id(), "url": "https://images.example/cats/box.jpg", "caption": "If it fits", "savedAt": at(60 * 30)},
            ]),
        ),
        (
            DOGS_KEY,
            json!([
                {"id": id(), "url": "https://images.example/dogs/zoom.jpg", "caption": "Zoomies", "savedAt": at(60 * 72)},
            ]),
        ),
    ];

    for (key, value) in &records {
        store.set_json(key, value)?;
    }
    tracing::info!(target: "pulse::store", keys = records.len(), "demo data seeded");
    Ok(records.len())
}
