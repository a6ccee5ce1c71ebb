#![forbid(unsafe_code)]

//! Per-property subscriber registry.
//!
//! A [`Dep`] is an ordered list of weak [`Subscriber`] references. Reading a
//! property inside an evaluation registers the evaluating subscriber with the
//! property's dep; writing the property calls [`Dep::notify`], which invokes
//! [`Subscriber::update`] on every live subscriber in registration order.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order, at most once per pass.
//! 2. Notification iterates a snapshot: subscribers may join or leave during
//!    a pass without invalidating it.
//! 3. Dead subscribers (dropped without teardown) are pruned lazily, at the
//!    start of the next notification.
//! 4. A notification triggered from inside the same dep's notification does
//!    not recurse. It schedules another pass, and passes are bounded by
//!    [`RuntimeConfig::max_update_passes`].
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Update loop | A subscriber keeps writing to the dep it listens on | Reported as [`ReactiveError::UpdateLoop`], passes stop |

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use super::collector::Collector;
use crate::config::RuntimeConfig;
use crate::diagnostics;
use crate::error::ReactiveError;

static NEXT_DEP_ID: AtomicU64 = AtomicU64::new(0);
static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identity of a [`Dep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepId(u64);

impl DepId {
    pub(crate) fn next() -> Self {
        Self(NEXT_DEP_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Process-unique identity of a subscriber (watcher or computed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Issue a fresh identity.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Something a [`Dep`] can notify.
pub trait Subscriber {
    /// Called synchronously when a dep this subscriber joined is notified.
    fn update(&self);
}

/// Weak, non-owning reference to a subscriber, tagged with its identity.
#[derive(Clone)]
pub struct SubscriberRef {
    id: SubscriberId,
    target: Weak<dyn Subscriber>,
}

impl SubscriberRef {
    /// Reference `target` without keeping it alive.
    pub fn new(id: SubscriberId, target: &Rc<dyn Subscriber>) -> Self {
        Self {
            id,
            target: Rc::downgrade(target),
        }
    }

    /// Wrap an existing weak reference.
    pub fn from_weak(id: SubscriberId, target: Weak<dyn Subscriber>) -> Self {
        Self { id, target }
    }

    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Strong reference, if the subscriber is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Rc<dyn Subscriber>> {
        self.target.upgrade()
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }
}

impl std::fmt::Debug for SubscriberRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRef")
            .field("id", &self.id.0)
            .field("alive", &self.is_alive())
            .finish()
    }
}

struct DepInner {
    id: DepId,
    subs: RefCell<Vec<SubscriberRef>>,
    notifying: Cell<bool>,
    rerun: Cell<bool>,
}

/// Subscriber registry for one property (or one object's key set).
///
/// Cloning a `Dep` creates another handle to the **same** registry.
#[derive(Clone)]
pub struct Dep {
    inner: Rc<DepInner>,
}

impl std::fmt::Debug for Dep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.inner.id.0)
            .field("subscribers", &self.inner.subs.borrow().len())
            .field("notifying", &self.inner.notifying.get())
            .finish()
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the notifying flag even if a subscriber unwinds.
struct NotifyGuard<'a>(&'a DepInner);

impl<'a> NotifyGuard<'a> {
    fn enter(inner: &'a DepInner) -> Self {
        inner.notifying.set(true);
        Self(inner)
    }
}

impl Drop for NotifyGuard<'_> {
    fn drop(&mut self) {
        self.0.notifying.set(false);
        self.0.rerun.set(false);
    }
}

impl Dep {
    /// Create an empty dep with a fresh identity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(DepInner {
                id: DepId::next(),
                subs: RefCell::new(Vec::new()),
                notifying: Cell::new(false),
                rerun: Cell::new(false),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> DepId {
        self.inner.id
    }

    /// Whether both handles refer to the same registry.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Append a subscriber. Duplicates are not filtered here;
    /// [`Collector::add_dep`] guarantees each subscriber joins once.
    pub fn add_sub(&self, sub: SubscriberRef) {
        trace!(dep = self.inner.id.0, subscriber = sub.id.0, "subscribed");
        self.inner.subs.borrow_mut().push(sub);
    }

    /// Remove the first subscriber with identity `id`. No-op if absent.
    pub fn remove_sub(&self, id: SubscriberId) {
        let mut subs = self.inner.subs.borrow_mut();
        if let Some(pos) = subs.iter().position(|s| s.id == id) {
            subs.remove(pos);
            trace!(dep = self.inner.id.0, subscriber = id.0, "unsubscribed");
        }
    }

    /// Register the collector's subscriber with this dep. `None` is a no-op.
    pub fn depend(&self, collector: Option<&mut Collector>) {
        if let Some(collector) = collector {
            collector.add_dep(self);
        }
    }

    /// Notify every live subscriber, in order.
    pub fn notify(&self) {
        if self.inner.notifying.get() {
            self.inner.rerun.set(true);
            trace!(dep = self.inner.id.0, "re-entrant notify deferred");
            return;
        }
        let _guard = NotifyGuard::enter(&self.inner);
        let limit = RuntimeConfig::current().max_update_passes;
        let mut passes = 0u32;
        loop {
            self.notify_pass();
            if !self.inner.rerun.replace(false) {
                break;
            }
            if passes >= limit {
                diagnostics::report(ReactiveError::UpdateLoop {
                    dep: self.inner.id,
                    passes,
                });
                break;
            }
            passes += 1;
        }
        if passes > 0 {
            debug!(dep = self.inner.id.0, passes, "dep re-notified");
        }
    }

    fn notify_pass(&self) {
        let snapshot: Vec<SubscriberRef> = {
            let mut subs = self.inner.subs.borrow_mut();
            subs.retain(SubscriberRef::is_alive);
            subs.clone()
        };
        trace!(
            dep = self.inner.id.0,
            subscribers = snapshot.len(),
            "notify"
        );
        for sub in snapshot {
            // Upgraded one at a time: an earlier subscriber may drop a later one.
            if let Some(target) = sub.upgrade() {
                target.update();
            }
        }
    }

    /// Number of registered subscribers, including dead ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subs.borrow().len()
    }

    /// Identities of registered subscribers, in notification order.
    #[must_use]
    pub fn subscriber_ids(&self) -> Vec<SubscriberId> {
        self.inner.subs.borrow().iter().map(|s| s.id).collect()
    }

    /// Whether a notification of this dep is in progress.
    #[must_use]
    pub fn is_notifying(&self) -> bool {
        self.inner.notifying.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe {
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Subscriber for Probe {
        fn update(&self) {
            self.log.borrow_mut().push(self.name);
        }
    }

    fn probe(
        name: &'static str,
        log: &Rc<RefCell<Vec<&'static str>>>,
    ) -> (Rc<dyn Subscriber>, SubscriberId) {
        let id = SubscriberId::next();
        let p: Rc<dyn Subscriber> = Rc::new(Probe {
            name,
            log: Rc::clone(log),
        });
        (p, id)
    }

    #[test]
    fn notifies_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let dep = Dep::new();
        let (a, a_id) = probe("a", &log);
        let (b, b_id) = probe("b", &log);
        dep.add_sub(SubscriberRef::new(b_id, &b));
        dep.add_sub(SubscriberRef::new(a_id, &a));

        dep.notify();
        assert_eq!(*log.borrow(), vec!["b", "a"]);
        assert_eq!(dep.subscriber_ids(), vec![b_id, a_id]);
    }

    #[test]
    fn remove_sub_is_noop_when_absent() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let dep = Dep::new();
        let (a, a_id) = probe("a", &log);
        dep.add_sub(SubscriberRef::new(a_id, &a));
        dep.remove_sub(SubscriberId::next());
        assert_eq!(dep.subscriber_count(), 1);
        dep.remove_sub(a_id);
        assert_eq!(dep.subscriber_count(), 0);
        dep.notify();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn dead_subscribers_are_pruned_on_notify() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let dep = Dep::new();
        let (a, a_id) = probe("a", &log);
        let (b, b_id) = probe("b", &log);
        dep.add_sub(SubscriberRef::new(a_id, &a));
        dep.add_sub(SubscriberRef::new(b_id, &b));
        drop(a);

        assert_eq!(dep.subscriber_count(), 2);
        dep.notify();
        assert_eq!(*log.borrow(), vec!["b"]);
        assert_eq!(dep.subscriber_count(), 1);
    }

    #[test]
    fn depend_without_collector_is_noop() {
        let dep = Dep::new();
        dep.depend(None);
        assert_eq!(dep.subscriber_count(), 0);
    }

    #[test]
    fn ids_are_unique() {
        let a = Dep::new();
        let b = Dep::new();
        assert_ne!(a.id(), b.id());
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
    }

    struct Renotify {
        dep: Dep,
        remaining: Cell<u32>,
        calls: Cell<u32>,
    }

    impl Subscriber for Renotify {
        fn update(&self) {
            self.calls.set(self.calls.get() + 1);
            if self.remaining.get() > 0 {
                self.remaining.set(self.remaining.get() - 1);
                self.dep.notify();
            }
        }
    }

    #[test]
    fn reentrant_notify_runs_another_pass() {
        let dep = Dep::new();
        let sub = Rc::new(Renotify {
            dep: dep.clone(),
            remaining: Cell::new(2),
            calls: Cell::new(0),
        });
        let as_dyn: Rc<dyn Subscriber> = sub.clone();
        dep.add_sub(SubscriberRef::new(SubscriberId::next(), &as_dyn));

        dep.notify();
        assert_eq!(sub.calls.get(), 3);
        assert!(!dep.is_notifying());
    }

    #[test]
    fn endless_renotify_is_bounded() {
        let _ = diagnostics::take_diagnostics();
        let previous = RuntimeConfig::default().with_max_update_passes(4).install();

        let dep = Dep::new();
        let sub = Rc::new(Renotify {
            dep: dep.clone(),
            remaining: Cell::new(u32::MAX),
            calls: Cell::new(0),
        });
        let as_dyn: Rc<dyn Subscriber> = sub.clone();
        dep.add_sub(SubscriberRef::new(SubscriberId::next(), &as_dyn));

        dep.notify();
        previous.install();

        assert_eq!(sub.calls.get(), 5);
        let reported = diagnostics::take_diagnostics();
        assert_eq!(reported.len(), 1);
        assert_eq!(
            reported[0].error,
            ReactiveError::UpdateLoop {
                dep: dep.id(),
                passes: 4
            }
        );
    }
}
