//! **Rhythm**: step-sequencer patterns.
//!
//! `rhythm.patterns` holds the saved patterns (tracks × steps grids); `rhythm.active` holds the id
//! of the pattern currently loaded in the sequencer.

use crate::text::{count, mentions};
use pulse_core::value_path::{search_records, SearchIndex};
use pulse_core::{AdapterContext, AdapterError, AppDescriptor, AppSource, SearchMatch};
use serde::{Deserialize, Serialize};

pub const PATTERNS_KEY: &str = "rhythm.patterns";
pub const ACTIVE_KEY: &str = "rhythm.active";

const DEFAULT_BPM: u32 = 120;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bpm: Option<u32>,
    /// One row per track; `true` marks an active step.
    #[serde(default)]
    pub steps: Vec<Vec<bool>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternStat {
    pub id: String,
    pub name: String,
    pub bpm: u32,
    pub tracks: usize,
    pub steps: usize,
    pub active_steps: usize,
    /// Active steps over the full grid, 0 for an empty grid.
    pub density: f32,
}

impl From<&PatternRecord> for PatternStat {
    fn from(p: &PatternRecord) -> Self {
        let tracks = p.steps.len();
        // Ragged rows: the grid is as wide as the longest track.
        let steps = p.steps.iter().map(Vec::len).max().unwrap_or(0);
        let active_steps = p.steps.iter().flatten().filter(|on| **on).count();
        let cells = tracks * steps;
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            bpm: p.bpm.filter(|b| *b > 0).unwrap_or(DEFAULT_BPM),
            tracks,
            steps,
            active_steps,
            density: if cells == 0 { 0.0 } else { active_steps as f32 / cells as f32 },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RhythmData {
    pub patterns: Vec<PatternStat>,
    pub active: Option<String>,
}

impl RhythmData {
    /// The loaded pattern, or the first saved one.
    pub fn current(&self) -> Option<&PatternStat> {
        self.active
            .as_deref()
            .and_then(|id| self.patterns.iter().find(|p| p.id == id))
            .or_else(|| self.patterns.first())
    }
}

pub struct RhythmSource;

impl AppSource for RhythmSource {
    type Data = RhythmData;

    fn descriptor(&self) -> AppDescriptor {
        AppDescriptor::new("rhythm", "Rhythm", "🥁")
            .capabilities(["patterns", "tempo"])
            .keywords(["rhythm", "beat", "beats", "bpm", "tempo", "sequencer", "drum", "drums", "pattern"])
    }

    fn reload(&self, ctx: &AdapterContext) -> Result<RhythmData, AdapterError> {
        let records: Vec<PatternRecord> = ctx.load_or_default("rhythm", PATTERNS_KEY)?;
        let active: Option<String> = ctx.load_or_default("rhythm", ACTIVE_KEY)?;
        Ok(RhythmData {
            patterns: records.iter().map(PatternStat::from).collect(),
            active: active.filter(|id| !id.is_empty()),
        })
    }

    fn summarize(&self, data: &RhythmData, _ctx: &AdapterContext) -> String {
        match data.current() {
            None => "No patterns saved".to_string(),
            Some(p) => format!(
                "{} saved, \"{}\" at {} BPM ({:.0}% of steps on)",
                count(data.patterns.len(), "pattern", "patterns"),
                p.name,
                p.bpm,
                p.density * 100.0
            ),
        }
    }

    fn is_active(&self, data: &RhythmData) -> bool {
        !data.patterns.is_empty()
    }

    fn respond(&self, query: &str, data: &RhythmData, _ctx: &AdapterContext) -> Result<Option<String>, AdapterError> {
        let Some(current) = data.current() else {
            return Ok(Some("You haven't saved any rhythm patterns yet.".to_string()));
        };
        if mentions(query, &["bpm", "tempo", "fast", "speed"]) {
            return Ok(Some(format!("\"{}\" runs at {} BPM.", current.name, current.bpm)));
        }
        if mentions(query, &["busy", "dense", "density", "steps"]) {
            return Ok(Some(format!(
                "\"{}\" has {} of {} steps active across {}.",
                current.name,
                current.active_steps,
                current.tracks * current.steps,
                count(current.tracks, "track", "tracks")
            )));
        }
        Ok(Some(format!(
            "You have {} saved; \"{}\" is loaded.",
            count(data.patterns.len(), "pattern", "patterns"),
            current.name
        )))
    }

    fn search(&self, query: &str, data: &RhythmData) -> Result<Vec<SearchMatch>, AdapterError> {
        let index = SearchIndex {
            kind: "pattern",
            label_path: "name",
            fields: &["name"],
        };
        Ok(search_records(&data.patterns, &index, query))
    }

    fn watched_keys(&self) -> Vec<String> {
        vec![PATTERNS_KEY.to_string(), ACTIVE_KEY.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::{Adapter, DashboardAdapter, MemoryStore, StoreExt};
    use std::sync::Arc;

    fn adapter() -> Arc<Adapter<RhythmSource>> {
        let store = Arc::new(MemoryStore::new());
        store
            .set_json(
                PATTERNS_KEY,
                &serde_json::json!([
                    {"id": "a", "name": "Four on the floor", "bpm": 124, "steps": [[true, false, false, false], [false, false, true, false]]},
                    {"id": "b", "name": "Half time", "steps": [[true, false], [true]]},
                    {"id": "c", "name": "Empty"}
                ]),
            )
            .unwrap();
        store.set_json(ACTIVE_KEY, &"b").unwrap();
        Adapter::new(RhythmSource, AdapterContext::new(store))
    }

    #[test]
    fn stats_handle_ragged_and_empty_grids() {
        let data = adapter().snapshot().data;
        assert_eq!(data.patterns[0].density, 0.25);
        let half = &data.patterns[1];
        assert_eq!((half.bpm, half.tracks, half.steps, half.active_steps), (DEFAULT_BPM, 2, 2, 2));
        assert_eq!(data.patterns[2].density, 0.0);
        assert_eq!(data.current().map(|p| p.id.as_str()), Some("b"));
    }

    #[tokio::test]
    async fn tempo_answer_uses_loaded_pattern() {
        let rhythm = adapter();
        assert_eq!(
            rhythm.respond("what's the bpm").await.as_deref(),
            Some("\"Half time\" runs at 120 BPM.")
        );
        assert_eq!(rhythm.confidence("what's the tempo?").await.value(), 0.9);
    }

    #[test]
    fn unknown_active_id_falls_back_to_first() {
        let data = RhythmData {
            patterns: vec![PatternStat { id: "x".into(), ..Default::default() }],
            active: Some("gone".into()),
        };
        assert_eq!(data.current().map(|p| p.id.as_str()), Some("x"));
    }
}
