//! pulse-core: dashboard adapter core (uniform mini-app contract, freshness lease, pub/sub,
//! confidence scoring and the query router).
//!
//! Concrete mini-apps live in `pulse-adapters`; front ends (the console) only talk to
//! [`AdapterRegistry`].

mod config;
mod error;
mod registry;
pub mod adapter;
pub mod ports;
pub mod value_path;

// Configuration
pub use config::PulseConfig;

// Errors
pub use error::{AdapterError, SemanticError, StoreError};

// Adapter contract + composition helpers
pub use adapter::{
    guarded, is_advice_request, Adapter, AdapterContext, AdapterSettings, AdapterSnapshot, AggregateContribution,
    AppDescriptor, AppSource, Confidence, ConfidenceScorer, DashboardAdapter, Freshness, SearchMatch, Snapshot,
    SubscriberId, SubscriberSet, Subscription,
};

// Ports (clock, logger, store, semantic service, change channel)
pub use ports::{
    ChangeChannel, Clock, HttpSemanticService, KeyValueStore, LogContext, LogEntry, LogLevel, ManualClock,
    MemoryStore, RecordingLogger, SemanticConfidence, SledStore, StoreChange, StoreExt, StructuredLogger,
    SystemClock, TracingLogger,
};

// Router
pub use registry::{
    AdapterRegistry, CrossAppTotal, DashboardContext, RouteMatch, RoutedAnswer, TaggedMatch, DEFAULT_MIN_CONFIDENCE,
};
