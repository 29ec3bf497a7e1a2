//! Composition of a concrete mini-app into a full [`DashboardAdapter`].
//!
//! A mini-app implements [`AppSource`]: how to reload its data from the store, how to summarize
//! and answer questions about it, and which keywords it owns. [`Adapter`] holds the source by
//! composition together with a [`Freshness`] lease, a [`SubscriberSet`] and a
//! [`ConfidenceScorer`], and enforces the never-fail boundary around all of it.

use super::freshness::{Freshness, DEFAULT_TTL};
use super::pubsub::{panic_message, SubscriberId, SubscriberSet, Subscription};
use super::scorer::{is_advice_request, ConfidenceScorer, DEFAULT_SEMANTIC_THRESHOLD, DEFAULT_SEMANTIC_TIMEOUT};
use super::{guarded, AdapterSnapshot, AggregateContribution, Confidence, DashboardAdapter, SearchMatch, Snapshot};
use crate::config::PulseConfig;
use crate::error::{AdapterError, StoreError};
use crate::ports::{
    ChangeChannel, Clock, HttpSemanticService, KeyValueStore, LogContext, SemanticConfidence, StoreExt,
    StructuredLogger, SystemClock, TracingLogger,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Static identity of a mini-app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDescriptor {
    pub app_name: String,
    pub display_name: String,
    pub icon: String,
    pub capabilities: Vec<String>,
    pub keywords: Vec<String>,
}

impl AppDescriptor {
    pub fn new(app_name: impl Into<String>, display_name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            display_name: display_name.into(),
            icon: icon.into(),
            capabilities: Vec::new(),
            keywords: Vec::new(),
        }
    }

    pub fn capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

/// Tunables shared by every adapter built from one context.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterSettings {
    pub ttl: Duration,
    pub semantic_threshold: f32,
    pub semantic_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            semantic_threshold: DEFAULT_SEMANTIC_THRESHOLD,
            semantic_timeout: DEFAULT_SEMANTIC_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl From<&PulseConfig> for AdapterSettings {
    fn from(config: &PulseConfig) -> Self {
        Self {
            ttl: config.cache_ttl(),
            semantic_threshold: config.semantic_threshold,
            semantic_timeout: config.semantic_timeout(),
            poll_interval: config.poll_interval(),
        }
    }
}

/// Collaborators injected into every adapter.
#[derive(Clone)]
pub struct AdapterContext {
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
    pub logger: Arc<dyn StructuredLogger>,
    pub semantic: Option<Arc<dyn SemanticConfidence>>,
    pub changes: Option<ChangeChannel>,
    pub settings: AdapterSettings,
}

impl AdapterContext {
    /// System clock, tracing logger, no semantic service, no change channel.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            logger: Arc::new(TracingLogger),
            semantic: None,
            changes: None,
            settings: AdapterSettings::default(),
        }
    }

    /// Settings and (optional) HTTP semantic service taken from `config`.
    pub fn from_config(store: Arc<dyn KeyValueStore>, config: &PulseConfig) -> Self {
        let mut ctx = Self::new(store).with_settings(AdapterSettings::from(config));
        if let Some(service) = HttpSemanticService::from_config(config) {
            ctx = ctx.with_semantic(Arc::new(service));
        }
        ctx
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn StructuredLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_semantic(mut self, semantic: Arc<dyn SemanticConfidence>) -> Self {
        self.semantic = Some(semantic);
        self
    }

    pub fn with_changes(mut self, changes: ChangeChannel) -> Self {
        self.changes = Some(changes);
        self
    }

    pub fn with_settings(mut self, settings: AdapterSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.settings.ttl = ttl;
        self
    }

    /// Reads `key`, substituting `T::default()` when it is missing or corrupt. Corruption is
    /// logged; store access failures propagate so the reload counts as failed.
    pub fn load_or_default<T>(&self, component: &str, key: &str) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Default,
    {
        match self.store.get_json::<T>(key) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Ok(T::default()),
            Err(e) if e.is_corrupt() => {
                self.logger.error(
                    "corrupt stored value replaced with empty default",
                    &e,
                    &LogContext::new(component, "reload").with("key", key),
                );
                Ok(T::default())
            }
            Err(e) => Err(e),
        }
    }
}

/// What a concrete mini-app provides. Everything else comes from [`Adapter`].
pub trait AppSource: Send + Sync + 'static {
    /// Typed view of the app's state. `Default` is the empty state.
    type Data: Clone + Default + Serialize + Send + Sync + 'static;

    fn descriptor(&self) -> AppDescriptor;

    /// Reads the backing store and transforms it. Missing or corrupt records become defaults.
    fn reload(&self, ctx: &AdapterContext) -> Result<Self::Data, AdapterError>;

    fn summarize(&self, data: &Self::Data, ctx: &AdapterContext) -> String;

    fn is_active(&self, _data: &Self::Data) -> bool {
        true
    }

    fn last_used(&self, _data: &Self::Data, _ctx: &AdapterContext) -> Option<DateTime<Utc>> {
        None
    }

    /// Templated status answer. Advice requests never reach this method.
    fn respond(&self, query: &str, data: &Self::Data, ctx: &AdapterContext) -> Result<Option<String>, AdapterError>;

    fn search(&self, _query: &str, _data: &Self::Data) -> Result<Vec<SearchMatch>, AdapterError> {
        Ok(Vec::new())
    }

    fn supports_aggregation(&self) -> bool {
        false
    }

    fn aggregate(&self, _data: &Self::Data) -> Vec<AggregateContribution> {
        Vec::new()
    }

    /// Store keys whose external changes should reload this app immediately.
    fn watched_keys(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether this app refreshes itself on a timer while it has subscribers.
    fn polls(&self) -> bool {
        false
    }
}

struct State<D> {
    data: D,
    healthy: bool,
}

/// A mini-app wrapped with caching, pub/sub, scoring and failure isolation.
pub struct Adapter<S: AppSource> {
    source: S,
    descriptor: AppDescriptor,
    ctx: AdapterContext,
    state: RwLock<State<S::Data>>,
    freshness: Freshness,
    subscribers: SubscriberSet<S::Data>,
    scorer: ConfidenceScorer,
    poller: Mutex<Option<JoinHandle<()>>>,
    watcher: Mutex<Option<JoinHandle<()>>>,
    this: Weak<Self>,
}

impl<S: AppSource> Adapter<S> {
    /// Builds the adapter and performs the initial load. A failing initial load leaves the
    /// adapter inactive with empty data; it is retried on the next access.
    pub fn new(source: S, ctx: AdapterContext) -> Arc<Self> {
        let descriptor = source.descriptor();
        let mut scorer = ConfidenceScorer::new(&descriptor.app_name, &descriptor.keywords, ctx.logger.clone())
            .with_semantic_threshold(ctx.settings.semantic_threshold)
            .with_semantic_timeout(ctx.settings.semantic_timeout);
        if let Some(semantic) = &ctx.semantic {
            scorer = scorer.with_semantic(semantic.clone());
        }

        let adapter = Arc::new_cyclic(|this| Self {
            subscribers: SubscriberSet::new(&descriptor.app_name, ctx.logger.clone()),
            freshness: Freshness::new(ctx.settings.ttl),
            state: RwLock::new(State {
                data: S::Data::default(),
                healthy: false,
            }),
            poller: Mutex::new(None),
            watcher: Mutex::new(None),
            this: this.clone(),
            scorer,
            source,
            descriptor,
            ctx,
        });
        adapter.refresh_if_stale();
        adapter.attach_change_watcher();
        adapter
    }

    pub fn descriptor(&self) -> &AppDescriptor {
        &self.descriptor
    }

    pub fn context(&self) -> &AdapterContext {
        &self.ctx
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn scorer(&self) -> &ConfidenceScorer {
        &self.scorer
    }

    /// Whether the last reload succeeded.
    pub fn is_healthy(&self) -> bool {
        self.read().healthy
    }

    /// Cached data without checking the lease.
    pub fn current(&self) -> S::Data {
        self.read().data.clone()
    }

    /// Reloads if the lease has expired. Returns whether a reload succeeded.
    pub fn refresh_if_stale(&self) -> bool {
        let now = self.ctx.clock.now_millis();
        match self.freshness.refresh_if_stale(now, || self.load_and_commit()) {
            Ok(Some(data)) => {
                self.subscribers.publish(&data);
                true
            }
            Ok(None) => false,
            Err(e) => {
                self.log_reload_failure(&e);
                false
            }
        }
    }

    /// Reloads unconditionally and renews the lease (push invalidation and polling).
    pub fn reload_now(&self) -> bool {
        let now = self.ctx.clock.now_millis();
        match self.freshness.force(now, || self.load_and_commit()) {
            Ok(data) => {
                self.subscribers.publish(&data);
                true
            }
            Err(e) => {
                self.log_reload_failure(&e);
                false
            }
        }
    }

    /// Marks the lease stale; the next access reloads.
    pub fn invalidate(&self) {
        self.freshness.invalidate();
    }

    /// Typed snapshot. Never panics: summary and activity computations are guarded.
    pub fn snapshot(&self) -> Snapshot<S::Data> {
        self.refresh_if_stale();
        let (data, healthy) = {
            let state = self.read();
            (state.data.clone(), state.healthy)
        };
        let logger = self.ctx.logger.as_ref();
        let app = self.descriptor.app_name.as_str();

        let summary = guarded(logger, app, "summarize", || self.source.summarize(&data, &self.ctx))
            .unwrap_or_else(|| format!("{} is unavailable right now", self.descriptor.display_name));
        let active = healthy && guarded(logger, app, "snapshot", || self.source.is_active(&data)).unwrap_or(false);
        let last_used = guarded(logger, app, "snapshot", || self.source.last_used(&data, &self.ctx)).flatten();

        Snapshot {
            app_name: self.descriptor.app_name.clone(),
            display_name: self.descriptor.display_name.clone(),
            icon: self.descriptor.icon.clone(),
            is_active: active,
            last_used,
            data,
            summary,
            capabilities: self.descriptor.capabilities.clone(),
        }
    }

    /// Registers `callback` for every successful reload. Polling apps start their timer on the
    /// first subscriber and stop it when the last one unsubscribes.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&S::Data) + Send + Sync + 'static,
    {
        let id = self.subscribers.subscribe(callback);
        if self.source.polls() {
            self.ensure_poller();
        }
        let this = self.this.clone();
        Subscription::new(id, move |id| {
            if let Some(adapter) = this.upgrade() {
                adapter.release(id);
            }
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_polling(&self) -> bool {
        lock(&self.poller).as_ref().is_some_and(|h| !h.is_finished())
    }

    fn release(&self, id: SubscriberId) {
        self.subscribers.unsubscribe(id);
        if self.subscribers.is_empty() {
            if let Some(handle) = lock(&self.poller).take() {
                handle.abort();
            }
        }
    }

    fn load(&self) -> Result<S::Data, AdapterError> {
        match catch_unwind(AssertUnwindSafe(|| self.source.reload(&self.ctx))) {
            Ok(result) => result,
            Err(payload) => Err(AdapterError::Panicked(panic_message(payload.as_ref()))),
        }
    }

    /// Loads and writes the result into `state`. Called with the lease held, so an older read
    /// can never be committed over a newer one. Publishing happens after the lease is released.
    fn load_and_commit(&self) -> Result<S::Data, AdapterError> {
        let result = self.load();
        let mut state = self.write();
        match &result {
            Ok(data) => {
                state.data = data.clone();
                state.healthy = true;
            }
            Err(_) => state.healthy = false,
        }
        result
    }

    fn log_reload_failure(&self, error: &AdapterError) {
        self.ctx.logger.error(
            "reload failed, keeping previous data",
            error,
            &LogContext::new(&self.descriptor.app_name, "reload"),
        );
    }

    fn ensure_poller(&self) {
        let mut slot = lock(&self.poller);
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.ctx.logger.warn(
                "no async runtime, background refresh disabled",
                &LogContext::new(&self.descriptor.app_name, "poll"),
            );
            return;
        };
        let this = self.this.clone();
        let period = self.ctx.settings.poll_interval;
        *slot = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(adapter) = this.upgrade() else { break };
                adapter.reload_now();
            }
        }));
    }

    fn attach_change_watcher(&self) {
        let keys = self.source.watched_keys();
        if keys.is_empty() {
            return;
        }
        let Some(channel) = &self.ctx.changes else { return };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.ctx.logger.warn(
                "no async runtime, change notifications ignored",
                &LogContext::new(&self.descriptor.app_name, "watch"),
            );
            return;
        };
        // Subscribe before spawning so no change sent after construction is missed.
        let mut rx = channel.subscribe();
        let this = self.this.clone();
        let task = runtime.spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(change) if keys.iter().any(|k| *k == change.key) => {}
                    Ok(_) => continue,
                    // Missed events may have included ours.
                    Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }
                let Some(adapter) = this.upgrade() else { break };
                tracing::debug!(target: "pulse::adapter", app = %adapter.descriptor.app_name, "external change, reloading");
                adapter.reload_now();
            }
        });
        *lock(&self.watcher) = Some(task);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State<S::Data>> {
        self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State<S::Data>> {
        self.state.write().unwrap_or_else(|p| p.into_inner())
    }

    fn log_failure(&self, action: &str, error: &AdapterError) {
        self.ctx.logger.error(
            "adapter operation failed",
            error,
            &LogContext::new(&self.descriptor.app_name, action),
        );
    }
}

impl<S: AppSource> Drop for Adapter<S> {
    fn drop(&mut self) {
        for slot in [&self.poller, &self.watcher] {
            if let Some(handle) = lock(slot).take() {
                handle.abort();
            }
        }
    }
}

#[async_trait]
impl<S: AppSource> DashboardAdapter for Adapter<S> {
    fn app_name(&self) -> &str {
        &self.descriptor.app_name
    }

    fn snapshot_value(&self) -> Result<AdapterSnapshot, AdapterError> {
        Ok(self.snapshot().erase()?)
    }

    async fn confidence(&self, query: &str) -> Confidence {
        self.scorer.score(query).await
    }

    async fn respond(&self, query: &str) -> Option<String> {
        if is_advice_request(query) {
            return None;
        }
        self.refresh_if_stale();
        let data = self.current();
        let logger = self.ctx.logger.as_ref();
        match guarded(logger, &self.descriptor.app_name, "respond", || {
            self.source.respond(query, &data, &self.ctx)
        })? {
            Ok(answer) => answer,
            Err(e) => {
                self.log_failure("respond", &e);
                None
            }
        }
    }

    async fn search(&self, query: &str) -> Vec<SearchMatch> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        self.refresh_if_stale();
        let data = self.current();
        let logger = self.ctx.logger.as_ref();
        match guarded(logger, &self.descriptor.app_name, "search", || self.source.search(query, &data)) {
            Some(Ok(matches)) => matches,
            Some(Err(e)) => {
                self.log_failure("search", &e);
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    fn subscribe_value(&self, callback: Box<dyn Fn(&serde_json::Value) + Send + Sync>) -> Subscription {
        let logger = self.ctx.logger.clone();
        let app = self.descriptor.app_name.clone();
        self.subscribe(move |data: &S::Data| match serde_json::to_value(data) {
            Ok(value) => callback(&value),
            Err(e) => logger.error(
                "subscriber payload could not be serialized",
                &e,
                &LogContext::new(&app, "publish"),
            ),
        })
    }

    fn supports_aggregation(&self) -> bool {
        self.source.supports_aggregation()
    }

    fn aggregate_data(&self) -> Vec<AggregateContribution> {
        if !self.source.supports_aggregation() {
            return Vec::new();
        }
        self.refresh_if_stale();
        let data = self.current();
        let app = self.descriptor.app_name.as_str();
        let mut rows = guarded(self.ctx.logger.as_ref(), app, "aggregate", || self.source.aggregate(&data))
            .unwrap_or_default();
        for row in &mut rows {
            if row.app_name.is_empty() {
                row.app_name = app.to_string();
            }
        }
        rows
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{ManualClock, MemoryStore, RecordingLogger};
    use serde::Deserialize;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::mpsc;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Counter {
        total: u32,
    }

    struct CounterSource {
        reloads: Arc<AtomicUsize>,
        polls: bool,
    }

    impl AppSource for CounterSource {
        type Data = Counter;

        fn descriptor(&self) -> AppDescriptor {
            AppDescriptor::new("counter", "Counter", "#").keywords(["count"])
        }

        fn reload(&self, ctx: &AdapterContext) -> Result<Counter, AdapterError> {
            self.reloads.fetch_add(1, Ordering::SeqCst);
            Ok(ctx.load_or_default("counter", "counter")?)
        }

        fn summarize(&self, data: &Counter, _: &AdapterContext) -> String {
            format!("{} counted", data.total)
        }

        fn respond(&self, _: &str, data: &Counter, _: &AdapterContext) -> Result<Option<String>, AdapterError> {
            Ok(Some(format!("The count is {}.", data.total)))
        }

        fn watched_keys(&self) -> Vec<String> {
            vec!["counter".into()]
        }

        fn polls(&self) -> bool {
            self.polls
        }
    }

    fn fixture(polls: bool) -> (Arc<Adapter<CounterSource>>, Arc<MemoryStore>, Arc<ManualClock>, Arc<AtomicUsize>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::at("2026-03-01T09:00:00Z"));
        let reloads = Arc::new(AtomicUsize::new(0));
        let ctx = AdapterContext::new(store.clone())
            .with_clock(clock.clone())
            .with_logger(Arc::new(RecordingLogger::new()))
            .with_settings(AdapterSettings {
                poll_interval: Duration::from_millis(20),
                ..AdapterSettings::default()
            });
        let adapter = Adapter::new(
            CounterSource {
                reloads: reloads.clone(),
                polls,
            },
            ctx,
        );
        (adapter, store, clock, reloads)
    }

    #[test]
    fn snapshot_reloads_only_after_the_ttl() {
        let (adapter, store, clock, reloads) = fixture(false);
        assert_eq!(reloads.load(Ordering::SeqCst), 1);

        store.set_json("counter", &Counter { total: 3 }).unwrap();
        clock.advance_ms(4_000);
        assert_eq!(adapter.snapshot().data.total, 0);

        clock.advance_ms(1_001);
        let snap = adapter.snapshot();
        assert_eq!(snap.data.total, 3);
        assert_eq!(snap.summary, "3 counted");
        assert_eq!(reloads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn reload_publishes_to_subscribers() {
        let (adapter, store, _clock, _) = fixture(false);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = adapter.subscribe(move |c: &Counter| sink.lock().unwrap().push(c.total));

        store.set_json("counter", &Counter { total: 9 }).unwrap();
        assert!(adapter.reload_now());
        sub.unsubscribe();
        adapter.reload_now();

        assert_eq!(*seen.lock().unwrap(), vec![9]);
        assert_eq!(adapter.subscriber_count(), 0);
    }

    /// Blocks its second reload until the test opens the gate.
    struct GateSource {
        seq: AtomicU32,
        entered: Mutex<Option<mpsc::Sender<()>>>,
        gate: Mutex<Option<mpsc::Receiver<()>>>,
    }

    impl AppSource for GateSource {
        type Data = Counter;

        fn descriptor(&self) -> AppDescriptor {
            AppDescriptor::new("gate", "Gate", "#")
        }

        fn reload(&self, _: &AdapterContext) -> Result<Counter, AdapterError> {
            let total = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
            if total == 2 {
                if let Some(entered) = self.entered.lock().unwrap().take() {
                    entered.send(()).unwrap();
                }
                let gate = self.gate.lock().unwrap().take();
                if let Some(gate) = gate {
                    gate.recv().unwrap();
                }
            }
            Ok(Counter { total })
        }

        fn summarize(&self, data: &Counter, _: &AdapterContext) -> String {
            data.total.to_string()
        }

        fn respond(&self, _: &str, _: &Counter, _: &AdapterContext) -> Result<Option<String>, AdapterError> {
            Ok(None)
        }
    }

    #[test]
    fn slow_lazy_refresh_never_overwrites_a_newer_forced_reload() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (open_tx, open_rx) = mpsc::channel();
        let adapter = Adapter::new(
            GateSource {
                seq: AtomicU32::new(0),
                entered: Mutex::new(Some(entered_tx)),
                gate: Mutex::new(Some(open_rx)),
            },
            AdapterContext::new(Arc::new(MemoryStore::new())).with_logger(Arc::new(RecordingLogger::new())),
        );
        assert_eq!(adapter.current().total, 1);
        adapter.invalidate();

        std::thread::scope(|scope| {
            let lazy = scope.spawn(|| adapter.refresh_if_stale());
            entered_rx.recv().unwrap();
            let forced = scope.spawn(|| adapter.reload_now());
            std::thread::sleep(Duration::from_millis(20));
            open_tx.send(()).unwrap();
            assert!(lazy.join().unwrap());
            assert!(forced.join().unwrap());
        });

        assert_eq!(adapter.current().total, 3);
        assert!(adapter.is_healthy());
    }

    #[tokio::test]
    async fn advice_queries_defer_to_the_general_responder() {
        let (adapter, _, _, _) = fixture(false);
        assert_eq!(adapter.respond("how many in the count").await.as_deref(), Some("The count is 0."));
        assert_eq!(adapter.respond("how do I count better?").await, None);
    }

    #[tokio::test]
    async fn polling_stops_when_the_last_subscriber_leaves() {
        let (adapter, _, _, reloads) = fixture(true);
        assert!(!adapter.is_polling());

        let a = adapter.subscribe(|_| {});
        let b = adapter.subscribe(|_| {});
        assert!(adapter.is_polling());
        tokio::time::sleep(Duration::from_millis(70)).await;
        assert!(reloads.load(Ordering::SeqCst) > 1);

        a.unsubscribe();
        assert!(adapter.is_polling());
        b.unsubscribe();
        assert!(!adapter.is_polling());

        let settled = reloads.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(reloads.load(Ordering::SeqCst), settled);
    }
}
