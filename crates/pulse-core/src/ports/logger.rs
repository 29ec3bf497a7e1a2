//! Structured Logger port.
//!
//! Every recovered failure in the adapter layer is reported as
//! `(message, error, {component, action, metadata})`. Production code uses [`TracingLogger`];
//! tests use [`RecordingLogger`] to assert on what was swallowed.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

/// Adapter-scoped context attached to every log entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogContext {
    /// Owning component, usually the adapter's app name.
    pub component: String,
    /// Boundary operation that recovered (`reload`, `publish`, `confidence`, ...).
    pub action: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl LogContext {
    pub fn new(component: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            action: action.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

pub trait StructuredLogger: Send + Sync {
    fn error(&self, message: &str, error: &dyn fmt::Display, ctx: &LogContext);

    fn warn(&self, message: &str, ctx: &LogContext);
}

/// Forwards to `tracing` under the `pulse::adapter` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl StructuredLogger for TracingLogger {
    fn error(&self, message: &str, error: &dyn fmt::Display, ctx: &LogContext) {
        tracing::error!(
            target: "pulse::adapter",
            component = %ctx.component,
            action = %ctx.action,
            metadata = ?ctx.metadata,
            error = %error,
            "{}",
            message
        );
    }

    fn warn(&self, message: &str, ctx: &LogContext) {
        tracing::warn!(
            target: "pulse::adapter",
            component = %ctx.component,
            action = %ctx.action,
            metadata = ?ctx.metadata,
            "{}",
            message
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub error: Option<String>,
    pub context: LogContext,
}

/// In-memory logger used by tests.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Entries recorded for a given action, in order.
    pub fn for_action(&self, action: &str) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.context.action == action)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, entry: LogEntry) {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).push(entry);
    }
}

impl StructuredLogger for RecordingLogger {
    fn error(&self, message: &str, error: &dyn fmt::Display, ctx: &LogContext) {
        self.push(LogEntry {
            level: LogLevel::Error,
            message: message.to_string(),
            error: Some(error.to_string()),
            context: ctx.clone(),
        });
    }

    fn warn(&self, message: &str, ctx: &LogContext) {
        self.push(LogEntry {
            level: LogLevel::Warn,
            message: message.to_string(),
            error: None,
            context: ctx.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_logger_keeps_context() {
        let logger = RecordingLogger::new();
        let ctx = LogContext::new("notes", "reload").with("key", "notes");
        logger.error("corrupt value", &"expected array", &ctx);
        logger.warn("skipped", &LogContext::new("registry", "aggregate"));

        let entries = logger.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, LogLevel::Error);
        assert_eq!(entries[0].error.as_deref(), Some("expected array"));
        assert_eq!(entries[0].context.metadata["key"], "notes");
        assert_eq!(logger.for_action("aggregate").len(), 1);
    }
}
