//! Pulse configuration.
//!
//! Loaded with the `config` crate. Precedence (lowest → highest): built-in defaults, the TOML
//! file named by `PULSE_CONFIG` (default `config/pulse[.toml]`), then `PULSE_*` environment
//! variables (`PULSE_CACHE_TTL_MS=2000`, `PULSE_SEMANTIC_URL=...`).
//!
//! | Key                    | Default              | Description                                   |
//! |------------------------|----------------------|-----------------------------------------------|
//! | `store_path`           | `./data/pulse_store` | Sled directory for every mini-app's state     |
//! | `cache_ttl_ms`         | 5000                 | Freshness lease per adapter                   |
//! | `semantic_threshold`   | 0.5                  | Semantic score that short-circuits keywords   |
//! | `semantic_timeout_ms`  | 800                  | Deadline for one semantic call                |
//! | `min_route_confidence` | 0.2                  | Router ignores adapters at or below this      |
//! | `poll_interval_ms`     | 1000                 | Background refresh period for polling apps    |
//! | `semantic_url`         | unset                | Embedding service endpoint (optional)         |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config/pulse";
const MIN_POLL_INTERVAL_MS: u64 = 50;

fn default_store_path() -> String {
    "./data/pulse_store".to_string()
}

fn default_cache_ttl_ms() -> u64 {
    5_000
}

fn default_semantic_threshold() -> f32 {
    0.5
}

fn default_semantic_timeout_ms() -> u64 {
    800
}

fn default_min_route_confidence() -> f32 {
    0.2
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseConfig {
    #[serde(default = "default_store_path")]
    pub store_path: String,
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    #[serde(default = "default_semantic_threshold")]
    pub semantic_threshold: f32,
    #[serde(default = "default_semantic_timeout_ms")]
    pub semantic_timeout_ms: u64,
    #[serde(default = "default_min_route_confidence")]
    pub min_route_confidence: f32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub semantic_url: Option<String>,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            cache_ttl_ms: default_cache_ttl_ms(),
            semantic_threshold: default_semantic_threshold(),
            semantic_timeout_ms: default_semantic_timeout_ms(),
            min_route_confidence: default_min_route_confidence(),
            poll_interval_ms: default_poll_interval_ms(),
            semantic_url: None,
        }
    }
}

impl PulseConfig {
    /// Loads from `PULSE_CONFIG` (or `config/pulse`) and the environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var("PULSE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Loads from a specific file (with or without the `.toml` suffix) and the environment.
    /// A missing file is not an error.
    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let builder = config::Config::builder()
            .set_default("store_path", defaults.store_path)?
            .set_default("cache_ttl_ms", defaults.cache_ttl_ms)?
            .set_default("semantic_threshold", f64::from(defaults.semantic_threshold))?
            .set_default("semantic_timeout_ms", defaults.semantic_timeout_ms)?
            .set_default("min_route_confidence", f64::from(defaults.min_route_confidence))?
            .set_default("poll_interval_ms", defaults.poll_interval_ms)?;

        let builder = match resolve_file(path) {
            Some(file) => builder.add_source(config::File::from(file)),
            None => builder,
        };

        let built = builder
            .add_source(
                config::Environment::with_prefix("PULSE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = built.try_deserialize()?;
        Ok(config.sanitized())
    }

    /// Clamps thresholds into [0, 1] and keeps the poll interval above a floor.
    pub fn sanitized(mut self) -> Self {
        self.semantic_threshold = clamp_unit(self.semantic_threshold, default_semantic_threshold());
        self.min_route_confidence = clamp_unit(self.min_route_confidence, default_min_route_confidence());
        self.poll_interval_ms = self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS);
        self.semantic_url = self
            .semantic_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn semantic_timeout(&self) -> Duration {
        Duration::from_millis(self.semantic_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn clamp_unit(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn resolve_file(path: &str) -> Option<PathBuf> {
    let exact = Path::new(path);
    if exact.is_file() {
        return Some(exact.to_path_buf());
    }
    let with_ext = PathBuf::from(format!("{}.toml", path));
    with_ext.is_file().then_some(with_ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent");
        let config = PulseConfig::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.cache_ttl_ms, 5_000);
        assert_eq!(config.semantic_timeout(), Duration::from_millis(800));
        assert!((config.semantic_threshold - 0.5).abs() < f32::EPSILON);
        assert!(config.semantic_url.is_none());
    }

    #[test]
    fn toml_file_overrides_defaults_and_is_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulse.toml");
        std::fs::write(
            &path,
            "cache_ttl_ms = 250\nmin_route_confidence = 3.0\npoll_interval_ms = 5\nsemantic_url = \"http://localhost:7700/score\"\n",
        )
        .unwrap();

        // Suffix is optional, like `config/pulse`.
        let base = dir.path().join("pulse");
        let config = PulseConfig::load_from(base.to_str().unwrap()).unwrap();
        assert_eq!(config.cache_ttl(), Duration::from_millis(250));
        assert!((config.min_route_confidence - 1.0).abs() < f32::EPSILON);
        assert_eq!(config.poll_interval_ms, MIN_POLL_INTERVAL_MS);
        assert_eq!(config.semantic_url.as_deref(), Some("http://localhost:7700/score"));
    }
}
