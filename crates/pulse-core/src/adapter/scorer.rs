//! Confidence scoring: semantic signal first, keyword regex as fallback, plus advice detection.
//!
//! | Signal                                  | Score                     |
//! |-----------------------------------------|---------------------------|
//! | semantic similarity above the threshold | returned as-is (clamped)  |
//! | whole-word keyword match                | 0.9                       |
//! | substring-only keyword match            | 0.3                       |
//! | nothing                                 | 0.0                       |
//!
//! Keyword regexes are compiled lazily and cached on the scorer instance, one per keyword.

use super::pubsub::panic_message;
use super::Confidence;
use crate::error::SemanticError;
use crate::ports::{LogContext, SemanticConfidence, StructuredLogger};
use dashmap::DashMap;
use futures_util::FutureExt;
use regex::Regex;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

pub const EXACT_MATCH: f32 = 0.9;
pub const PARTIAL_MATCH: f32 = 0.3;
pub const DEFAULT_SEMANTIC_THRESHOLD: f32 = 0.5;
pub const DEFAULT_SEMANTIC_TIMEOUT: Duration = Duration::from_millis(800);

/// Phrases that mark a request for guidance rather than status.
const ADVICE_MARKERS: &[&str] = &[
    "how to",
    "how do i",
    "how can i",
    "how should",
    "recommend",
    "suggest",
    "what should",
    "should i",
    "best way",
    "any tips",
    "tips for",
    "advice",
    "ideas for",
    "help me",
];

pub struct ConfidenceScorer {
    app_name: String,
    keywords: Vec<String>,
    /// Compiled whole-word patterns keyed by keyword; `None` if compilation failed.
    patterns: DashMap<String, Option<Regex>>,
    semantic: Option<Arc<dyn SemanticConfidence>>,
    semantic_threshold: f32,
    semantic_timeout: Duration,
    logger: Arc<dyn StructuredLogger>,
}

impl ConfidenceScorer {
    pub fn new<I, K>(app_name: impl Into<String>, keywords: I, logger: Arc<dyn StructuredLogger>) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for kw in keywords {
            let kw = kw.as_ref().trim().to_lowercase();
            if !kw.is_empty() && !normalized.contains(&kw) {
                normalized.push(kw);
            }
        }
        Self {
            app_name: app_name.into(),
            keywords: normalized,
            patterns: DashMap::new(),
            semantic: None,
            semantic_threshold: DEFAULT_SEMANTIC_THRESHOLD,
            semantic_timeout: DEFAULT_SEMANTIC_TIMEOUT,
            logger,
        }
    }

    pub fn with_semantic(mut self, service: Arc<dyn SemanticConfidence>) -> Self {
        self.semantic = Some(service);
        self
    }

    pub fn with_semantic_threshold(mut self, threshold: f32) -> Self {
        self.semantic_threshold = threshold;
        self
    }

    pub fn with_semantic_timeout(mut self, timeout: Duration) -> Self {
        self.semantic_timeout = timeout;
        self
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Number of compiled patterns held by this instance.
    pub fn cached_patterns(&self) -> usize {
        self.patterns.len()
    }

    /// Full score for `query`. Never fails; semantic errors fall back to keywords.
    pub async fn score(&self, query: &str) -> Confidence {
        if query.trim().is_empty() {
            return Confidence::ZERO;
        }
        if let Some(semantic) = self.semantic_score(query).await {
            if semantic > self.semantic_threshold {
                return Confidence::new(semantic);
            }
        }
        self.keyword_score(query)
    }

    /// Keyword-only score: 0.9 on a whole-word hit, else 0.3 on a substring hit, else 0.
    pub fn keyword_score(&self, query: &str) -> Confidence {
        let lowered = query.to_lowercase();
        let mut best = 0.0_f32;
        for kw in &self.keywords {
            if self.matches_word(kw, query) {
                return Confidence::new(EXACT_MATCH);
            }
            if lowered.contains(kw.as_str()) {
                best = best.max(PARTIAL_MATCH);
            }
        }
        Confidence::new(best)
    }

    async fn semantic_score(&self, query: &str) -> Option<f32> {
        let service = self.semantic.as_ref()?;
        // A panicking service is a failed signal, not a failed query.
        let call = AssertUnwindSafe(service.semantic_confidence(query, &self.app_name)).catch_unwind();
        let result = match tokio::time::timeout(self.semantic_timeout, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(payload)) => Err(SemanticError::Panicked(panic_message(payload.as_ref()))),
            Err(_) => Err(SemanticError::Timeout(
                u64::try_from(self.semantic_timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        };
        match result {
            Ok(value) if value.is_finite() => Some(value),
            Ok(value) => {
                self.logger.warn(
                    "semantic service returned a non-finite score",
                    &LogContext::new(&self.app_name, "confidence").with("value", value.to_string()),
                );
                None
            }
            Err(e) => {
                self.logger.error(
                    "semantic confidence failed, using keyword scoring",
                    &e,
                    &LogContext::new(&self.app_name, "confidence").with("query_len", query.len()),
                );
                None
            }
        }
    }

    fn matches_word(&self, keyword: &str, query: &str) -> bool {
        if let Some(cached) = self.patterns.get(keyword) {
            return cached.as_ref().is_some_and(|re| re.is_match(query));
        }
        let compiled = match Regex::new(&format!(r"(?i)\b{}\b", regex::escape(keyword))) {
            Ok(re) => Some(re),
            Err(e) => {
                self.logger.error(
                    "keyword pattern did not compile",
                    &e,
                    &LogContext::new(&self.app_name, "confidence").with("keyword", keyword),
                );
                None
            }
        };
        let hit = compiled.as_ref().is_some_and(|re| re.is_match(query));
        self.patterns.insert(keyword.to_string(), compiled);
        hit
    }
}

/// True when `query` asks for guidance ("how do I...", "any tips", "what should I...")
/// rather than status.
pub fn is_advice_request(query: &str) -> bool {
    let normalized: String = query
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '\'' { c } else { ' ' })
        .collect();
    let padded = format!(" {} ", normalized.split_whitespace().collect::<Vec<_>>().join(" "));
    ADVICE_MARKERS
        .iter()
        .any(|marker| padded.contains(&format!(" {} ", marker)))
}
