//! Topic-keyed publish/subscribe mediator.
//!
//! Architecture:
//! - Components subscribe callbacks under a string topic (`"<uid>:timeupdate"`)
//! - publish() invokes every callback registered for that topic, immediately
//! - A once-registration is claimed (deactivated and detached) right before its
//!   callback runs, so a reentrant publish from inside a callback can never fire it twice
//!
//! Callback order: FIFO (first-subscribed, first-called) within the same topic.
//! Cross-topic order undefined - don't rely on ordering between different topics.
//!
//! Publishing iterates over a snapshot of the topic's registrations. Callbacks may
//! subscribe or unsubscribe (on any topic) while a publish is in flight; new
//! registrations are seen by the next publish, removed ones are skipped right away.

use log::{trace, warn};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Type-erased callback
type Callback = Arc<dyn Fn(&dyn Any) + Send + Sync>;

/// Handle of a single registration, returned by the subscribe family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Registration {
    id: ListenerId,
    once: bool,
    /// Cleared on unsubscribe so in-flight snapshots skip the callback
    active: AtomicBool,
    callback: Callback,
}

impl Registration {
    /// Deactivate; true only for the caller that flipped it
    fn claim(&self) -> bool {
        self.active
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

type Registry = HashMap<String, Vec<Arc<Registration>>>;

/// Process-wide pub/sub bus keyed by topic string.
///
/// Cheap to clone: clones share the same registry. Create one at application
/// start and hand a clone to every component that needs it.
#[derive(Clone)]
pub struct Mediator {
    topics: Arc<RwLock<Registry>>,
    next_id: Arc<AtomicU64>,
}

impl Default for Mediator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Mediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mediator")
            .field("topics", &self.topics.read().map(|t| t.len()).unwrap_or(0))
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl Mediator {
    pub fn new() -> Self {
        Self {
            topics: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    // ========== Subscribe ==========

    /// Register `callback` under `topic`. No de-duplication: subscribing the
    /// same logic twice makes it fire twice.
    pub fn subscribe<F>(&self, topic: impl Into<String>, callback: F) -> ListenerId
    where
        F: Fn(&dyn Any) + Send + Sync + 'static,
    {
        self.register(topic.into(), false, Arc::new(callback))
    }

    /// Register a callback that removes itself before its first invocation.
    pub fn subscribe_once<F>(&self, topic: impl Into<String>, callback: F) -> ListenerId
    where
        F: Fn(&dyn Any) + Send + Sync + 'static,
    {
        self.register(topic.into(), true, Arc::new(callback))
    }

    /// Subscribe with a typed payload. Publishes carrying another payload type
    /// are delivered but ignored by this callback.
    ///
    /// # Example
    /// ```ignore
    /// mediator.subscribe_typed::<Emitted, _>("playback:ready", move |e| {
    ///     log::info!("{} is ready", e.backend);
    /// });
    /// ```
    pub fn subscribe_typed<E, F>(&self, topic: impl Into<String>, callback: F) -> ListenerId
    where
        E: Any,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(topic.into(), false, Self::wrap(callback))
    }

    /// Typed variant of [`subscribe_once`](Self::subscribe_once).
    pub fn subscribe_once_typed<E, F>(&self, topic: impl Into<String>, callback: F) -> ListenerId
    where
        E: Any,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(topic.into(), true, Self::wrap(callback))
    }

    fn wrap<E, F>(callback: F) -> Callback
    where
        E: Any,
        F: Fn(&E) + Send + Sync + 'static,
    {
        Arc::new(move |any: &dyn Any| {
            if let Some(payload) = any.downcast_ref::<E>() {
                callback(payload);
            }
        })
    }

    fn register(&self, topic: String, once: bool, callback: Callback) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let registration = Arc::new(Registration {
            id,
            once,
            active: AtomicBool::new(true),
            callback,
        });
        trace!("Mediator: subscribe {:?} to '{}' (once: {})", id, topic, once);
        self.topics
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(topic)
            .or_default()
            .push(registration);
        id
    }

    // ========== Publish ==========

    /// Invoke every callback currently registered under `topic`, in
    /// registration order. Returns how many callbacks completed.
    ///
    /// A panicking callback is logged and skipped; the remaining callbacks
    /// still run. Nothing is retried.
    pub fn publish(&self, topic: &str, payload: &dyn Any) -> usize {
        let snapshot = {
            let topics = self.topics.read().unwrap_or_else(|e| e.into_inner());
            match topics.get(topic) {
                Some(list) => list.clone(),
                None => {
                    trace!("Mediator: publish '{}' (no subscribers)", topic);
                    return 0;
                }
            }
        };

        trace!("Mediator: publish '{}' to {} subscriber(s)", topic, snapshot.len());
        let mut delivered = 0;
        for registration in &snapshot {
            if registration.once {
                // Still in the registry until claimed
                if !registration.claim() {
                    continue;
                }
                self.detach(topic, registration.id);
            } else if !registration.active.load(Ordering::Acquire) {
                continue;
            }
            let callback = &registration.callback;
            match panic::catch_unwind(AssertUnwindSafe(|| callback(payload))) {
                Ok(()) => delivered += 1,
                Err(_) => warn!(
                    "Mediator: subscriber {:?} on '{}' panicked, continuing",
                    registration.id, topic
                ),
            }
        }
        delivered
    }

    /// Publish without a payload (the callback receives `&()`).
    pub fn signal(&self, topic: &str) -> usize {
        self.publish(topic, &())
    }

    // ========== Unsubscribe & Utilities ==========

    /// Remove one registration, or every registration of `topic` when `id` is None.
    /// Returns the number of registrations removed.
    pub fn unsubscribe(&self, topic: &str, id: Option<ListenerId>) -> usize {
        let mut topics = self.topics.write().unwrap_or_else(|e| e.into_inner());
        let Some(list) = topics.get_mut(topic) else {
            return 0;
        };

        let before = list.len();
        list.retain(|r| {
            let keep = id.is_some_and(|id| r.id != id);
            if !keep {
                r.active.store(false, Ordering::Release);
            }
            keep
        });
        let removed = before - list.len();
        if list.is_empty() {
            topics.remove(topic);
        }
        if removed > 0 {
            trace!("Mediator: removed {} subscriber(s) from '{}'", removed, topic);
        }
        removed
    }

    fn detach(&self, topic: &str, id: ListenerId) {
        let mut topics = self.topics.write().unwrap_or_else(|e| e.into_inner());
        if let Some(list) = topics.get_mut(topic) {
            list.retain(|r| r.id != id);
            if list.is_empty() {
                topics.remove(topic);
            }
        }
    }

    /// Check if there are subscribers for `topic`
    pub fn has_subscribers(&self, topic: &str) -> bool {
        self.subscriber_count(topic) > 0
    }

    /// Number of registrations under `topic`
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(topic)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    /// Total number of registrations across all topics
    pub fn listener_count(&self) -> usize {
        self.topics
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|v| v.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn test_publish_in_registration_order() {
        let mediator = Mediator::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for n in 0..3 {
            let o = Arc::clone(&order);
            mediator.subscribe("topic", move |_| o.lock().unwrap().push(n));
        }

        assert_eq!(mediator.signal("topic"), 3);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_once_fires_exactly_once() {
        let mediator = Mediator::new();
        let counter = Arc::new(AtomicI32::new(0));
        let c = Arc::clone(&counter);

        mediator.subscribe_once("topic", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        for _ in 0..10 {
            mediator.signal("topic");
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!mediator.has_subscribers("topic"));
    }

    #[test]
    fn test_once_is_exactly_once_under_reentrant_publish() {
        let mediator = Mediator::new();
        let counter = Arc::new(AtomicI32::new(0));

        let c = Arc::clone(&counter);
        let m = mediator.clone();
        mediator.subscribe_once("topic", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            // Re-trigger from inside itself
            m.signal("topic");
            m.signal("topic");
        });

        mediator.signal("topic");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_callback_is_isolated() {
        let mediator = Mediator::new();
        let counter = Arc::new(AtomicI32::new(0));

        mediator.subscribe("topic", |_| panic!("subscriber failure"));
        let c = Arc::clone(&counter);
        mediator.subscribe("topic", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(mediator.signal("topic"), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        // Still registered, still delivering
        mediator.signal("topic");
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe_specific_and_all() {
        let mediator = Mediator::new();
        let counter = Arc::new(AtomicI32::new(0));

        let c1 = Arc::clone(&counter);
        let first = mediator.subscribe("topic", move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        let c2 = Arc::clone(&counter);
        mediator.subscribe("topic", move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
        });

        assert_eq!(mediator.unsubscribe("topic", Some(first)), 1);
        mediator.signal("topic");
        assert_eq!(counter.load(Ordering::SeqCst), 10);

        assert_eq!(mediator.unsubscribe("topic", None), 1);
        mediator.signal("topic");
        assert_eq!(counter.load(Ordering::SeqCst), 10);
        assert_eq!(mediator.listener_count(), 0);
    }

    #[test]
    fn test_unsubscribe_during_publish_skips_removed() {
        let mediator = Mediator::new();
        let counter = Arc::new(AtomicI32::new(0));
        let victim = Arc::new(Mutex::new(None::<ListenerId>));

        let m = mediator.clone();
        let v = Arc::clone(&victim);
        mediator.subscribe("topic", move |_| {
            if let Some(id) = *v.lock().unwrap() {
                m.unsubscribe("topic", Some(id));
            }
        });
        let c = Arc::clone(&counter);
        let id = mediator.subscribe("topic", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        *victim.lock().unwrap() = Some(id);

        mediator.signal("topic");
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(mediator.subscriber_count("topic"), 1);
    }

    #[test]
    fn test_unsubscribe_once_during_publish_prevents_firing() {
        let mediator = Mediator::new();
        let fired = Arc::new(AtomicI32::new(0));
        let removed = Arc::new(AtomicI32::new(-1));
        let victim = Arc::new(Mutex::new(None::<ListenerId>));

        let m = mediator.clone();
        let v = Arc::clone(&victim);
        let r = Arc::clone(&removed);
        mediator.subscribe("topic", move |_| {
            if let Some(id) = v.lock().unwrap().take() {
                r.store(m.unsubscribe("topic", Some(id)) as i32, Ordering::SeqCst);
            }
        });
        let f = Arc::clone(&fired);
        let id = mediator.subscribe_once("topic", move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        *victim.lock().unwrap() = Some(id);

        assert_eq!(mediator.signal("topic"), 1);
        assert_eq!(removed.load(Ordering::SeqCst), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(mediator.subscriber_count("topic"), 1);

        mediator.signal("topic");
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe_all_during_publish_reaches_pending_once() {
        let mediator = Mediator::new();
        let fired = Arc::new(AtomicI32::new(0));
        let removed = Arc::new(AtomicI32::new(0));

        let m = mediator.clone();
        let r = Arc::clone(&removed);
        mediator.subscribe_once("topic", move |_| {
            r.store(m.unsubscribe("topic", None) as i32, Ordering::SeqCst);
        });
        for _ in 0..2 {
            let f = Arc::clone(&fired);
            mediator.subscribe_once("topic", move |_| {
                f.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(mediator.signal("topic"), 1);
        // The running once-callback was already detached; its two siblings were not
        assert_eq!(removed.load(Ordering::SeqCst), 2);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(mediator.listener_count(), 0);
    }

    #[test]
    fn test_teardown_from_inside_own_callback() {
        let mediator = Mediator::new();
        let fired = Arc::new(AtomicI32::new(0));
        let own: Arc<Mutex<Vec<(String, ListenerId)>>> = Arc::new(Mutex::new(Vec::new()));

        // Some other component, subscribed first
        let f = Arc::clone(&fired);
        mediator.subscribe("p1:statechanged", move |_| {
            f.fetch_add(100, Ordering::SeqCst);
        });

        // An instance whose first callback tears down every registration it holds
        let m = mediator.clone();
        let o = Arc::clone(&own);
        let id = mediator.subscribe("p1:statechanged", move |_| {
            for (topic, id) in o.lock().unwrap().drain(..) {
                m.unsubscribe(&topic, Some(id));
            }
        });
        own.lock().unwrap().push(("p1:statechanged".to_string(), id));
        for topic in ["p1:statechanged", "p1:timeupdate"] {
            let f = Arc::clone(&fired);
            let id = mediator.subscribe(topic, move |_| {
                f.fetch_add(1, Ordering::SeqCst);
            });
            own.lock().unwrap().push((topic.to_string(), id));
        }
        let f = Arc::clone(&fired);
        let id = mediator.subscribe_once("p1:statechanged", move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        own.lock().unwrap().push(("p1:statechanged".to_string(), id));

        assert_eq!(mediator.signal("p1:statechanged"), 2);
        assert_eq!(fired.load(Ordering::SeqCst), 100);
        assert_eq!(mediator.listener_count(), 1);

        assert_eq!(mediator.signal("p1:timeupdate"), 0);
        assert_eq!(mediator.signal("p1:statechanged"), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 200);
    }

    #[test]
    fn test_subscribe_during_publish_waits_for_next_publish() {
        let mediator = Mediator::new();
        let counter = Arc::new(AtomicI32::new(0));

        let m = mediator.clone();
        let c = Arc::clone(&counter);
        mediator.subscribe_once("topic", move |_| {
            let c = Arc::clone(&c);
            m.subscribe("topic", move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            });
        });

        mediator.signal("topic");
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        mediator.signal("topic");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_typed_payload() {
        #[derive(Debug)]
        struct Position(f64);

        let mediator = Mediator::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        mediator.subscribe_typed::<Position, _>("pos", move |p| s.lock().unwrap().push(p.0));

        mediator.publish("pos", &Position(1.5));
        // Wrong payload type: delivered, ignored by the typed callback
        mediator.publish("pos", &"not a position");

        assert_eq!(*seen.lock().unwrap(), vec![1.5]);
    }

    #[test]
    fn test_topics_are_isolated() {
        let mediator = Mediator::new();
        let counter = Arc::new(AtomicI32::new(0));
        let c = Arc::clone(&counter);
        mediator.subscribe("a:progress", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(mediator.signal("b:progress"), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
