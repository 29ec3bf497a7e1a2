//! Adapter registry and query router.
//!
//! Holds every registered [`DashboardAdapter`] in registration order. Routing scores all
//! adapters concurrently and keeps the strictly highest score above the floor, so on a tie the
//! earliest registration wins. Aggregation prefers partial results: an adapter that fails to
//! produce a snapshot is skipped with a warning.

use crate::adapter::{guarded, AdapterSnapshot, Confidence, DashboardAdapter, SearchMatch};
use crate::config::PulseConfig;
use crate::ports::{LogContext, StructuredLogger, TracingLogger};
use futures_util::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.2;

const COMPONENT: &str = "registry";

/// The adapter chosen for a query.
#[derive(Clone)]
pub struct RouteMatch {
    pub adapter: Arc<dyn DashboardAdapter>,
    pub confidence: Confidence,
}

impl RouteMatch {
    pub fn app_name(&self) -> &str {
        self.adapter.app_name()
    }
}

impl std::fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteMatch")
            .field("app_name", &self.app_name())
            .field("confidence", &self.confidence)
            .finish()
    }
}

/// Result of [`AdapterRegistry::answer`]. `answer` is `None` when the routed adapter deferred
/// (advice request, or nothing templated to say).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedAnswer {
    pub app_name: String,
    pub confidence: Confidence,
    pub answer: Option<String>,
}

/// Every adapter's snapshot keyed by app name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardContext {
    pub apps: BTreeMap<String, AdapterSnapshot>,
    /// Adapters that failed to produce a snapshot.
    pub skipped: Vec<String>,
}

impl DashboardContext {
    /// Plain-text situational summary for the assistant prompt. Active apps first.
    pub fn prompt_block(&self) -> String {
        let (active, idle): (Vec<_>, Vec<_>) = self.apps.values().partition(|s| s.is_active);
        let mut lines = Vec::with_capacity(self.apps.len() + 1);
        lines.push("Dashboard:".to_string());
        for snap in active {
            lines.push(format!("- {} {}: {}", snap.icon, snap.display_name, snap.summary));
        }
        for snap in idle {
            lines.push(format!("- {} {} (inactive): {}", snap.icon, snap.display_name, snap.summary));
        }
        lines.join("\n")
    }
}

/// Sum of one contribution type across apps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossAppTotal {
    #[serde(rename = "type")]
    pub kind: String,
    pub total: u64,
    pub label: String,
    pub by_app: BTreeMap<String, u64>,
}

/// A search match tagged with the app that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaggedMatch {
    pub app_name: String,
    #[serde(flatten)]
    pub found: SearchMatch,
}

pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn DashboardAdapter>>,
    min_confidence: f32,
    logger: Arc<dyn StructuredLogger>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            logger: Arc::new(TracingLogger),
        }
    }

    pub fn from_config(config: &PulseConfig) -> Self {
        Self::new().with_min_confidence(config.min_route_confidence)
    }

    pub fn with_logger(mut self, logger: Arc<dyn StructuredLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Adapters must score strictly above `min` to be routed to.
    pub fn with_min_confidence(mut self, min: f32) -> Self {
        self.min_confidence = min;
        self
    }

    /// Appends `adapter`. Re-registering an app name replaces the earlier adapter in place,
    /// keeping its routing priority.
    pub fn register(&mut self, adapter: Arc<dyn DashboardAdapter>) {
        let name = adapter.app_name().to_string();
        if let Some(slot) = self.adapters.iter_mut().find(|a| a.app_name() == name) {
            self.logger.warn(
                "adapter re-registered, replacing previous instance",
                &LogContext::new(COMPONENT, "register").with("app", name.as_str()),
            );
            *slot = adapter;
            return;
        }
        tracing::info!(target: "pulse::registry", app = %name, position = self.adapters.len(), "adapter registered");
        self.adapters.push(adapter);
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// App names in registration order.
    pub fn app_names(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.app_name().to_string()).collect()
    }

    pub fn get(&self, app_name: &str) -> Option<Arc<dyn DashboardAdapter>> {
        self.adapters.iter().find(|a| a.app_name() == app_name).cloned()
    }

    /// Best adapter for `query`, or `None` if nothing scores above the floor.
    pub async fn find_best_adapter(&self, query: &str) -> Option<RouteMatch> {
        let scores = join_all(self.adapters.iter().map(|a| a.confidence(query))).await;

        let mut best: Option<(usize, Confidence)> = None;
        for (idx, score) in scores.into_iter().enumerate() {
            if score.value() <= self.min_confidence {
                continue;
            }
            // Strictly greater: the earlier registration keeps a tie.
            if best.map_or(true, |(_, top)| score.value() > top.value()) {
                best = Some((idx, score));
            }
        }

        let (idx, confidence) = best?;
        let adapter = self.adapters[idx].clone();
        tracing::debug!(
            target: "pulse::registry",
            app = adapter.app_name(),
            confidence = confidence.value(),
            "query routed"
        );
        Some(RouteMatch { adapter, confidence })
    }

    /// Routes `query` and asks the winner for a templated answer.
    pub async fn answer(&self, query: &str) -> Option<RoutedAnswer> {
        let route = self.find_best_adapter(query).await?;
        let answer = route.adapter.respond(query).await;
        Some(RoutedAnswer {
            app_name: route.app_name().to_string(),
            confidence: route.confidence,
            answer,
        })
    }

    /// Every adapter's snapshot, skipping (and logging) the ones that fail.
    pub fn aggregated_context(&self) -> DashboardContext {
        let mut context = DashboardContext::default();
        for adapter in &self.adapters {
            let name = adapter.app_name().to_string();
            match guarded(self.logger.as_ref(), COMPONENT, "aggregate", || adapter.snapshot_value()) {
                Some(Ok(snapshot)) => {
                    context.apps.insert(name, snapshot);
                }
                Some(Err(e)) => {
                    self.logger.warn(
                        "snapshot failed, adapter skipped",
                        &LogContext::new(COMPONENT, "aggregate")
                            .with("app", name.as_str())
                            .with("error", e.to_string()),
                    );
                    context.skipped.push(name);
                }
                None => {
                    self.logger.warn(
                        "snapshot panicked, adapter skipped",
                        &LogContext::new(COMPONENT, "aggregate").with("app", name.as_str()),
                    );
                    context.skipped.push(name);
                }
            }
        }
        context
    }

    /// Sum of `kind` contributions across apps that opt into aggregation.
    pub fn cross_app_total(&self, kind: &str) -> CrossAppTotal {
        let mut total = CrossAppTotal {
            kind: kind.to_string(),
            total: 0,
            label: kind.to_string(),
            by_app: BTreeMap::new(),
        };
        let mut labeled = false;
        for row in self.contributions().into_iter().filter(|c| c.kind == kind) {
            if !labeled {
                total.label = row.label.clone();
                labeled = true;
            }
            total.total = total.total.saturating_add(row.count);
            let per_app = total.by_app.entry(row.app_name).or_insert(0);
            *per_app = per_app.saturating_add(row.count);
        }
        total
    }

    /// Every contribution type, summed.
    pub fn cross_app_totals(&self) -> BTreeMap<String, CrossAppTotal> {
        let mut totals: BTreeMap<String, CrossAppTotal> = BTreeMap::new();
        for row in self.contributions() {
            let entry = totals.entry(row.kind.clone()).or_insert_with(|| CrossAppTotal {
                kind: row.kind.clone(),
                total: 0,
                label: row.label.clone(),
                by_app: BTreeMap::new(),
            });
            entry.total = entry.total.saturating_add(row.count);
            let per_app = entry.by_app.entry(row.app_name).or_insert(0);
            *per_app = per_app.saturating_add(row.count);
        }
        totals
    }

    /// Searches every adapter concurrently; results keep registration order.
    pub async fn search_all(&self, query: &str) -> Vec<TaggedMatch> {
        let results = join_all(self.adapters.iter().map(|a| a.search(query))).await;
        self.adapters
            .iter()
            .zip(results)
            .flat_map(|(adapter, matches)| {
                let app = adapter.app_name().to_string();
                matches.into_iter().map(move |found| TaggedMatch {
                    app_name: app.clone(),
                    found,
                })
            })
            .collect()
    }

    fn contributions(&self) -> Vec<crate::adapter::AggregateContribution> {
        self.adapters
            .iter()
            .filter(|a| a.supports_aggregation())
            .flat_map(|a| {
                guarded(self.logger.as_ref(), a.app_name(), "aggregate", || a.aggregate_data()).unwrap_or_default()
            })
            .collect()
    }
}
