//! The dashboard adapter contract.
//!
//! Every mini-app is exposed to the assistant through [`DashboardAdapter`]. Concrete apps
//! implement the much smaller [`AppSource`] (reload, summarize, respond, keywords) and are
//! wrapped by [`Adapter`], which composes the freshness lease, subscriber set and scorer.
//!
//! None of the contract methods surface an error to the router: failures are logged with the
//! adapter name and the boundary action, then replaced with a safe value.

pub mod freshness;
pub mod pubsub;
pub mod scorer;
pub mod source;

pub use freshness::Freshness;
pub use pubsub::{panic_message, SubscriberId, SubscriberSet, Subscription};
pub use scorer::{is_advice_request, ConfidenceScorer};
pub use source::{Adapter, AdapterContext, AdapterSettings, AppDescriptor, AppSource};

use crate::error::AdapterError;
use crate::ports::{LogContext, StructuredLogger};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Score in [0, 1]. Construction clamps; NaN becomes 0.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(f32);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0.0);

    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            Self::ZERO
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// An adapter's current summarized state. `data` is always a valid `T`, empty when the
/// mini-app has no records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot<T> {
    pub app_name: String,
    pub display_name: String,
    pub icon: String,
    pub is_active: bool,
    pub last_used: Option<DateTime<Utc>>,
    pub data: T,
    pub summary: String,
    pub capabilities: Vec<String>,
}

/// Type-erased snapshot used across adapters.
pub type AdapterSnapshot = Snapshot<serde_json::Value>;

impl<T: Serialize> Snapshot<T> {
    pub fn erase(self) -> Result<AdapterSnapshot, serde_json::Error> {
        Ok(Snapshot {
            data: serde_json::to_value(&self.data)?,
            app_name: self.app_name,
            display_name: self.display_name,
            icon: self.icon,
            is_active: self.is_active,
            last_used: self.last_used,
            summary: self.summary,
            capabilities: self.capabilities,
        })
    }
}

/// One hit from an adapter's search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    pub value: String,
    pub field: String,
}

/// A typed count offered for cross-app rollups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateContribution {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: u64,
    pub label: String,
    pub app_name: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl AggregateContribution {
    pub fn new(kind: impl Into<String>, count: u64, label: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            count,
            label: label.into(),
            app_name: String::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Uniform capability set the router sees. Implementations must not panic out of these
/// methods; [`Adapter`] guards every call.
#[async_trait]
pub trait DashboardAdapter: Send + Sync {
    fn app_name(&self) -> &str;

    /// Current snapshot. The only fallible contract method, so the router can skip and log
    /// an adapter that cannot produce one.
    fn snapshot_value(&self) -> Result<AdapterSnapshot, AdapterError>;

    async fn confidence(&self, query: &str) -> Confidence;

    /// Templated answer, or `None` to defer to a general-purpose responder.
    async fn respond(&self, query: &str) -> Option<String>;

    async fn search(&self, _query: &str) -> Vec<SearchMatch> {
        Vec::new()
    }

    /// Type-erased `subscribe`: `callback` receives the app's data as JSON after every
    /// successful reload. Adapters without a change feed return an inert handle.
    fn subscribe_value(&self, _callback: Box<dyn Fn(&serde_json::Value) + Send + Sync>) -> Subscription {
        Subscription::inert()
    }

    fn supports_aggregation(&self) -> bool {
        false
    }

    fn aggregate_data(&self) -> Vec<AggregateContribution> {
        Vec::new()
    }
}

/// Runs `f`, converting a panic into a logged `None`.
pub fn guarded<R>(
    logger: &dyn StructuredLogger,
    component: &str,
    action: &str,
    f: impl FnOnce() -> R,
) -> Option<R> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            logger.error(
                "adapter code panicked",
                &message,
                &LogContext::new(component, action),
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::RecordingLogger;

    #[test]
    fn confidence_is_always_in_unit_range() {
        assert_eq!(Confidence::new(f32::NAN).value(), 0.0);
        assert_eq!(Confidence::new(-0.4).value(), 0.0);
        assert_eq!(Confidence::new(1.7).value(), 1.0);
        assert_eq!(Confidence::new(f32::INFINITY).value(), 1.0);
        assert_eq!(Confidence::new(0.3).value(), 0.3);
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let snap = Snapshot {
            app_name: "notes".into(),
            display_name: "Notes".into(),
            icon: "📝".into(),
            is_active: true,
            last_used: None,
            data: Vec::<u8>::new(),
            summary: "0 notes".into(),
            capabilities: vec!["search".into()],
        };
        let value = serde_json::to_value(snap.erase().unwrap()).unwrap();
        assert_eq!(value["appName"], "notes");
        assert_eq!(value["isActive"], true);
        assert_eq!(value["data"], serde_json::json!([]));
    }

    #[test]
    fn guarded_turns_panics_into_none() {
        let logger = RecordingLogger::new();
        let out: Option<u8> = guarded(&logger, "photos", "snapshot", || panic!("bad exif"));
        assert!(out.is_none());
        assert_eq!(logger.for_action("snapshot")[0].context.component, "photos");
        assert_eq!(guarded(&logger, "photos", "snapshot", || 4), Some(4));
    }
}
