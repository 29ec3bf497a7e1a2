//! Freshness lease: bounds how often an adapter re-reads its backing store.
//!
//! A reload runs iff `now - last_fetch > ttl` (or nothing was ever fetched). `last_fetch` only
//! moves forward after a successful reload, so a failing store is retried on the next check.
//! The lease lock is held across the reload; concurrent callers inside the same window see a
//! fresh lease and skip.

use std::sync::Mutex;
use std::time::Duration;

pub const DEFAULT_TTL: Duration = Duration::from_millis(5_000);

#[derive(Debug)]
pub struct Freshness {
    ttl_ms: i64,
    last_fetch: Mutex<Option<i64>>,
}

impl Freshness {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            last_fetch: Mutex::new(None),
        }
    }

    pub fn ttl_ms(&self) -> i64 {
        self.ttl_ms
    }

    /// Millis timestamp of the last successful reload.
    pub fn last_fetch(&self) -> Option<i64> {
        *self.lease()
    }

    pub fn is_stale(&self, now_ms: i64) -> bool {
        stale(*self.lease(), now_ms, self.ttl_ms)
    }

    /// Runs `reload` when the lease has expired. `Ok(None)` means the lease was still fresh.
    pub fn refresh_if_stale<R, E>(
        &self,
        now_ms: i64,
        reload: impl FnOnce() -> Result<R, E>,
    ) -> Result<Option<R>, E> {
        let mut last = self.lease();
        if !stale(*last, now_ms, self.ttl_ms) {
            return Ok(None);
        }
        let value = reload()?;
        *last = Some(now_ms);
        Ok(Some(value))
    }

    /// Push path: reloads regardless of the lease, and renews it on success.
    pub fn force<R, E>(&self, now_ms: i64, reload: impl FnOnce() -> Result<R, E>) -> Result<R, E> {
        let mut last = self.lease();
        let value = reload()?;
        *last = Some(now_ms);
        Ok(value)
    }

    /// Marks the data stale so the next check reloads.
    pub fn invalidate(&self) {
        *self.lease() = None;
    }

    fn lease(&self) -> std::sync::MutexGuard<'_, Option<i64>> {
        self.last_fetch.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Default for Freshness {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

fn stale(last: Option<i64>, now_ms: i64, ttl_ms: i64) -> bool {
    match last {
        None => true,
        Some(at) => now_ms.saturating_sub(at) > ttl_ms,
    }
}
