//! **Notes**: free-form notes with tags and pins.
//!
//! Store key `notes` holds a JSON array of [`NoteRecord`]. Timestamps that do not parse are
//! ignored when picking the most recent note.

use crate::text::{count, mentions};
use chrono::{DateTime, Utc};
use pulse_core::value_path::{search_records, SearchIndex};
use pulse_core::{AdapterContext, AdapterError, AppDescriptor, AppSource, Clock, SearchMatch};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const NOTES_KEY: &str = "notes";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotesData {
    pub notes: Vec<NoteRecord>,
    pub total: usize,
    pub pinned: usize,
    /// Tag → number of notes carrying it (lowercased).
    pub tags: BTreeMap<String, usize>,
    pub latest: Option<NoteRecord>,
    pub latest_at: Option<DateTime<Utc>>,
}

pub struct NotesSource;

impl NotesSource {
    fn transform(notes: Vec<NoteRecord>, clock: &dyn Clock) -> NotesData {
        let mut tags = BTreeMap::new();
        for note in &notes {
            for tag in &note.tags {
                let tag = tag.trim().trim_start_matches('#').to_lowercase();
                if !tag.is_empty() {
                    *tags.entry(tag).or_insert(0) += 1;
                }
            }
        }
        let newest = notes
            .iter()
            .filter_map(|n| n.updated_at.as_deref().and_then(|t| clock.parse(t)).map(|at| (at, n)))
            .max_by_key(|(at, _)| *at);
        NotesData {
            total: notes.len(),
            pinned: notes.iter().filter(|n| n.pinned).count(),
            latest: newest.map(|(_, n)| n.clone()),
            latest_at: newest.map(|(at, _)| at),
            tags,
            notes,
        }
    }
}

impl AppSource for NotesSource {
    type Data = NotesData;

    fn descriptor(&self) -> AppDescriptor {
        AppDescriptor::new("notes", "Notes", "📝")
            .capabilities(["count", "latest", "tags", "search"])
            .keywords(["note", "notes", "notebook", "memo", "jot", "wrote"])
    }

    fn reload(&self, ctx: &AdapterContext) -> Result<NotesData, AdapterError> {
        let notes: Vec<NoteRecord> = ctx.load_or_default("notes", NOTES_KEY)?;
        Ok(Self::transform(notes, ctx.clock.as_ref()))
    }

    fn summarize(&self, data: &NotesData, _ctx: &AdapterContext) -> String {
        if data.total == 0 {
            return "No notes yet".to_string();
        }
        let mut summary = count(data.total, "note", "notes");
        if data.pinned > 0 {
            summary.push_str(&format!(", {} pinned", data.pinned));
        }
        if let Some(note) = &data.latest {
            summary.push_str(&format!(", latest \"{}\"", note.title));
        }
        summary
    }

    fn is_active(&self, data: &NotesData) -> bool {
        data.total > 0
    }

    fn last_used(&self, data: &NotesData, _ctx: &AdapterContext) -> Option<DateTime<Utc>> {
        data.latest_at
    }

    fn respond(&self, query: &str, data: &NotesData, ctx: &AdapterContext) -> Result<Option<String>, AdapterError> {
        if data.total == 0 {
            return Ok(Some("You don't have any notes yet.".to_string()));
        }
        if mentions(query, &["latest", "last", "recent", "newest"]) {
            if let (Some(note), Some(at)) = (&data.latest, data.latest_at) {
                return Ok(Some(format!(
                    "Your latest note is \"{}\", updated {}.",
                    note.title,
                    ctx.clock.time_ago(&at)
                )));
            }
        }
        let lowered = query.to_lowercase();
        if let Some((tag, n)) = data
            .tags
            .iter()
            .find(|(tag, _)| lowered.split(|c: char| !c.is_alphanumeric() && c != '-').any(|w| w == tag.as_str()))
        {
            return Ok(Some(format!("You have {} tagged #{}.", count(*n, "note", "notes"), tag)));
        }
        if mentions(query, &["pinned", "pin"]) {
            return Ok(Some(format!("You have {} pinned.", count(data.pinned, "note", "notes"))));
        }
        Ok(Some(format!("You have {}.", count(data.total, "note", "notes"))))
    }

    fn search(&self, query: &str, data: &NotesData) -> Result<Vec<SearchMatch>, AdapterError> {
        let index = SearchIndex {
            kind: "note",
            label_path: "title",
            fields: &["title", "content", "tags"],
        };
        Ok(search_records(&data.notes, &index, query))
    }

    fn watched_keys(&self) -> Vec<String> {
        vec![NOTES_KEY.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::{Adapter, DashboardAdapter, ManualClock, MemoryStore, StoreExt};
    use std::sync::Arc;

    fn seeded() -> (Arc<Adapter<NotesSource>>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store
            .set_json(
                NOTES_KEY,
                &serde_json::json!([
                    {"id": "1", "title": "Garden plan", "content": "Plant tomatoes", "tags": ["garden", "#Spring"], "updatedAt": "2026-04-01T10:00:00Z"},
                    {"id": "2", "title": "Groceries", "content": "milk, eggs", "tags": ["errands"], "pinned": true, "updatedAt": "2026-04-03T08:00:00Z"},
                    {"id": "3", "title": "Loose thought", "updatedAt": "not a date"}
                ]),
            )
            .unwrap();
        let clock = Arc::new(ManualClock::at("2026-04-03T11:00:00Z"));
        let ctx = AdapterContext::new(store.clone()).with_clock(clock);
        (Adapter::new(NotesSource, ctx), store)
    }

    #[test]
    fn transform_counts_tags_and_picks_latest() {
        let (adapter, _) = seeded();
        let snap = adapter.snapshot();
        assert_eq!(snap.data.total, 3);
        assert_eq!(snap.data.pinned, 1);
        assert_eq!(snap.data.tags.get("spring"), Some(&1));
        assert_eq!(snap.data.latest.as_ref().map(|n| n.id.as_str()), Some("2"));
        assert_eq!(snap.summary, "3 notes, 1 pinned, latest \"Groceries\"");
        assert!(snap.is_active);
    }

    #[tokio::test]
    async fn templated_answers() {
        let (adapter, _) = seeded();
        assert_eq!(
            adapter.respond("what was my latest note?").await.as_deref(),
            Some("Your latest note is \"Groceries\", updated 3 hours ago.")
        );
        assert_eq!(
            adapter.respond("notes about garden").await.as_deref(),
            Some("You have 1 note tagged #garden.")
        );
        assert_eq!(adapter.respond("how many notes").await.as_deref(), Some("You have 3 notes."));
        assert_eq!(adapter.respond("suggest a note topic").await, None);
    }

    #[tokio::test]
    async fn search_hits_title_content_and_tags() {
        let (adapter, _) = seeded();
        let hits = adapter.search("GARDEN").await;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].field, "title");
        assert_eq!(hits[1].field, "tags");
        assert!(adapter.search("zebra").await.is_empty());
    }

    #[test]
    fn empty_store_gives_empty_typed_data() {
        let ctx = AdapterContext::new(Arc::new(MemoryStore::new()));
        let adapter = Adapter::new(NotesSource, ctx);
        let snap = adapter.snapshot();
        assert_eq!(snap.data, NotesData::default());
        assert!(!snap.is_active);
        assert_eq!(snap.summary, "No notes yet");
    }
}
