//! Dashboard integration test: every shipped adapter over a Sled store, routed and aggregated
//! through one registry, with Sled's change feed invalidating adapters.
//!
//! Run with: `cargo test -p pulse-adapters --test dashboard_integration_test`

use pulse_adapters::favorites::{CATS_KEY, DOGS_KEY};
use pulse_adapters::notes::NOTES_KEY;
use pulse_adapters::photos::PHOTOS_KEY;
use pulse_adapters::{default_adapters, register_defaults, FavoriteImage, NoteRecord, PhotoRecord};
use pulse_core::{
    AdapterContext, AdapterRegistry, ChangeChannel, DashboardAdapter, KeyValueStore, ManualClock, MemoryStore,
    RecordingLogger, SledStore, StoreExt,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn image(id: &str) -> FavoriteImage {
    FavoriteImage {
        id: id.to_string(),
        url: format!("https://img.example/{}.jpg", id),
        ..Default::default()
    }
}

fn open_store(dir: &tempfile::TempDir) -> Arc<SledStore> {
    Arc::new(SledStore::open_path(dir.path().join("pulse_store")).expect("open sled store"))
}

#[tokio::test]
async fn test_default_registration_order() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let store = open_store(&temp_dir);
    let ctx = AdapterContext::new(store);
    let names: Vec<String> = default_adapters(&ctx).iter().map(|a| a.app_name().to_string()).collect();
    assert_eq!(
        names,
        vec!["profile", "notes", "photos", "habits", "rhythm", "focus", "cat-gallery", "dog-gallery"]
    );
}

#[tokio::test]
async fn test_routing_and_cross_app_totals() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let store = open_store(&temp_dir);
    store
        .set_json(
            PHOTOS_KEY,
            &vec![
                PhotoRecord { id: "p1".into(), name: "Harbour".into(), favorite: true, ..Default::default() },
                PhotoRecord { id: "p2".into(), name: "Market".into(), favorite: true, ..Default::default() },
                PhotoRecord { id: "p3".into(), name: "Tram".into(), ..Default::default() },
            ],
        )
        .expect("seed photos");
    store.set_json(CATS_KEY, &vec![image("c1"), image("c2"), image("c3")]).expect("seed cats");
    store.set_json(DOGS_KEY, &vec![image("d1")]).expect("seed dogs");

    let logger = Arc::new(RecordingLogger::new());
    let ctx = AdapterContext::new(store.clone())
        .with_clock(Arc::new(ManualClock::at("2026-10-01T12:00:00Z")))
        .with_logger(logger.clone());
    let mut registry = AdapterRegistry::new().with_logger(logger.clone());
    register_defaults(&mut registry, &ctx);
    assert_eq!(registry.len(), 8);

    let saved = registry.cross_app_total("saved_images");
    assert_eq!(saved.total, 2 + 3 + 1);
    assert_eq!(saved.by_app.get("photos"), Some(&2));
    assert_eq!(saved.by_app.get("cat-gallery"), Some(&3));
    assert_eq!(registry.cross_app_totals()["photos"].total, 3);

    // Both galleries match "favorites"; cat-gallery registered first.
    let route = registry.find_best_adapter("show my favorites").await.expect("routed");
    assert_eq!(route.app_name(), "cat-gallery");

    let answer = registry.answer("How many photos do I have?").await.expect("routed");
    assert_eq!(answer.app_name, "photos");
    assert_eq!(answer.answer.as_deref(), Some("You have 3 photos in your library."));

    assert!(registry.find_best_adapter("what's the weather in Oslo").await.is_none());

    let context = registry.aggregated_context();
    assert_eq!(context.apps.len(), 8);
    assert!(context.skipped.is_empty());
    assert!(context.apps["notes"].data["notes"].as_array().is_some_and(|a| a.is_empty()));
    assert!(context.prompt_block().starts_with("Dashboard:\n- 🐱 Cat Gallery: 3 cat pictures saved"));
    assert!(logger.is_empty());
}

#[tokio::test]
async fn test_sled_changes_invalidate_watching_adapters() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let store = open_store(&temp_dir);
    let channel = ChangeChannel::new();
    let forwarder = store.forward_changes(channel.clone());

    let ctx = AdapterContext::new(store.clone()).with_changes(channel);
    let mut registry = AdapterRegistry::new();
    register_defaults(&mut registry, &ctx);
    let notes = registry.get("notes").expect("notes registered");
    assert_eq!(notes.snapshot_value().expect("snapshot").summary, "No notes yet");

    // A write from "another context": straight into the store, well inside the 5s lease.
    store
        .set_json(
            NOTES_KEY,
            &vec![NoteRecord { id: "n1".into(), title: "Call the vet".into(), ..Default::default() }],
        )
        .expect("external write");

    let mut summary = String::new();
    for _ in 0..200 {
        summary = notes.snapshot_value().expect("snapshot").summary;
        if summary != "No notes yet" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    // No timestamp on the record, so there is no "latest" to report.
    assert_eq!(summary, "1 note");

    let hits = registry.search_all("vet").await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].app_name, "notes");

    assert!(store.remove(NOTES_KEY).expect("remove"));
    forwarder.abort();
}

#[tokio::test]
async fn test_registry_handle_subscribers_see_pushed_reloads() {
    let channel = ChangeChannel::new();
    let store = Arc::new(MemoryStore::with_change_channel(channel.clone()));
    let ctx = AdapterContext::new(store.clone()).with_changes(channel);
    let mut registry = AdapterRegistry::new();
    register_defaults(&mut registry, &ctx);

    let seen: Arc<Mutex<Vec<serde_json::Value>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let notes = registry.get("notes").expect("notes registered");
    let subscription = notes.subscribe_value(Box::new(move |value: &serde_json::Value| {
        sink.lock().expect("sink lock").push(value.clone());
    }));

    store
        .set_json(
            NOTES_KEY,
            &vec![NoteRecord { id: "n1".into(), title: "Renew passport".into(), ..Default::default() }],
        )
        .expect("external write");

    for _ in 0..200 {
        if !seen.lock().expect("sink lock").is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    {
        let seen = seen.lock().expect("sink lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["total"], 1);
        assert_eq!(seen[0]["notes"][0]["title"], "Renew passport");
    }

    subscription.unsubscribe();
    store.set_json(NOTES_KEY, &Vec::<NoteRecord>::new()).expect("second write");
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(seen.lock().expect("sink lock").len(), 1);
}
