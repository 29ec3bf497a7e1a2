//! Per-adapter listener registry with isolated, ordered delivery.

use crate::ports::{LogContext, StructuredLogger};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Identity of one registration. Two registrations of the same closure get distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct SubscriberSet<T> {
    component: String,
    logger: Arc<dyn StructuredLogger>,
    next_id: AtomicU64,
    entries: Mutex<Vec<(SubscriberId, Callback<T>)>>,
}

impl<T> SubscriberSet<T> {
    pub fn new(component: impl Into<String>, logger: Arc<dyn StructuredLogger>) -> Self {
        Self {
            component: component.into(),
            logger,
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Appends `callback`; delivery follows registration order.
    pub fn subscribe<F>(&self, callback: F) -> SubscriberId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(callback)));
        id
    }

    /// Removes exactly the registration `id`. Returns whether it was present.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut entries = self.lock();
        match entries.iter().position(|(e, _)| *e == id) {
            Some(idx) => {
                entries.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls every current subscriber with `data`. A panicking subscriber is logged with
    /// action `publish` and delivery continues. Returns the number of successful deliveries.
    pub fn publish(&self, data: &T) -> usize {
        // Snapshot outside the lock so callbacks may subscribe/unsubscribe re-entrantly.
        let callbacks: Vec<(SubscriberId, Callback<T>)> = self.lock().clone();
        let mut delivered = 0;
        for (id, callback) in callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback(data))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    self.logger.error(
                        "subscriber failed during publish",
                        &message,
                        &LogContext::new(&self.component, "publish").with("subscriber", id.0),
                    );
                }
            }
        }
        delivered
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriberId, Callback<T>)>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Handle returned by `subscribe`. Call [`Subscription::unsubscribe`] to remove the listener
/// (and stop any background polling tied to it). Dropping the handle leaves the listener active.
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    id: SubscriberId,
    release: Box<dyn FnOnce(SubscriberId) + Send + Sync>,
}

impl Subscription {
    pub fn new(id: SubscriberId, release: impl FnOnce(SubscriberId) + Send + Sync + 'static) -> Self {
        Self {
            id,
            release: Box::new(release),
        }
    }

    /// Handle for an adapter that never publishes; unsubscribing is a no-op.
    pub fn inert() -> Self {
        Self::new(SubscriberId(0), |_| {})
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn unsubscribe(self) {
        (self.release)(self.id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::RecordingLogger;

    fn set(logger: Arc<RecordingLogger>) -> SubscriberSet<u32> {
        SubscriberSet::new("notes", logger)
    }

    #[test]
    fn panicking_subscriber_does_not_block_neighbours() {
        let logger = Arc::new(RecordingLogger::new());
        let subs = set(logger.clone());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = seen.clone();
        subs.subscribe(move |v: &u32| s.lock().unwrap().push(("before", *v)));
        subs.subscribe(|_: &u32| panic!("listener exploded"));
        let s = seen.clone();
        subs.subscribe(move |v: &u32| s.lock().unwrap().push(("after", *v)));

        assert_eq!(subs.publish(&7), 2);
        assert_eq!(*seen.lock().unwrap(), vec![("before", 7), ("after", 7)]);

        let logged = logger.for_action("publish");
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].context.component, "notes");
        assert_eq!(logged[0].error.as_deref(), Some("listener exploded"));
    }

    #[test]
    fn unsubscribe_removes_only_that_registration() {
        let subs = set(Arc::new(RecordingLogger::new()));
        let hits = Arc::new(AtomicU64::new(0));

        // Same closure body registered twice.
        let make = |hits: Arc<AtomicU64>| move |_: &u32| {
            hits.fetch_add(1, Ordering::SeqCst);
        };
        let first = subs.subscribe(make(hits.clone()));
        let _second = subs.subscribe(make(hits.clone()));

        assert!(subs.unsubscribe(first));
        assert!(!subs.unsubscribe(first));
        subs.publish(&1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(subs.len(), 1);
    }

    #[test]
    fn subscription_handle_releases_its_id() {
        let subs = Arc::new(set(Arc::new(RecordingLogger::new())));
        let id = subs.subscribe(|_: &u32| {});
        let owner = subs.clone();
        let handle = Subscription::new(id, move |id| {
            owner.unsubscribe(id);
        });
        handle.unsubscribe();
        assert!(subs.is_empty());
        assert_eq!(subs.publish(&3), 0);
    }
}
