#![forbid(unsafe_code)]

//! Dependency collection for a single evaluation.
//!
//! A [`Collector`] is created for one evaluation of one subscriber and passed
//! by `&mut` through every tracked read. It records which deps were touched
//! and subscribes the evaluator to the ones it did not already hold. When the
//! evaluation ends, [`DepSet::replace`] unsubscribes the deps that were held
//! before but not touched this time.

use std::cell::RefCell;

use ahash::AHashSet;
use tracing::trace;

use super::dep::{Dep, DepId, SubscriberId, SubscriberRef};

/// Evaluation context recording the deps a subscriber reads.
pub struct Collector {
    subscriber: SubscriberRef,
    previous: AHashSet<DepId>,
    joined: AHashSet<DepId>,
    deps: Vec<Dep>,
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("subscriber", &self.subscriber.id().raw())
            .field("previous", &self.previous.len())
            .field("joined", &self.deps.len())
            .finish()
    }
}

impl Collector {
    pub(crate) fn new(subscriber: SubscriberRef, previous: AHashSet<DepId>) -> Self {
        Self {
            subscriber,
            previous,
            joined: AHashSet::new(),
            deps: Vec::new(),
        }
    }

    /// Record a read of `dep`.
    ///
    /// Idempotent within one evaluation. A dep already held from the previous
    /// evaluation keeps its existing subscription (and position).
    pub fn add_dep(&mut self, dep: &Dep) {
        let id = dep.id();
        if !self.joined.insert(id) {
            return;
        }
        self.deps.push(dep.clone());
        if !self.previous.contains(&id) {
            dep.add_sub(self.subscriber.clone());
        }
    }

    /// The evaluating subscriber.
    #[must_use]
    pub fn subscriber_id(&self) -> SubscriberId {
        self.subscriber.id()
    }

    /// Number of distinct deps read so far.
    #[must_use]
    pub fn dep_count(&self) -> usize {
        self.deps.len()
    }

    pub(crate) fn finish(self) -> Vec<Dep> {
        self.deps
    }
}

/// The deps a subscriber holds after its latest evaluation.
#[derive(Debug, Default)]
pub(crate) struct DepSet {
    deps: Vec<Dep>,
    generation: u64,
}

impl DepSet {
    pub(crate) fn ids(&self) -> AHashSet<DepId> {
        self.deps.iter().map(Dep::id).collect()
    }

    /// Install the deps of a finished evaluation and drop stale ones.
    pub(crate) fn replace(&mut self, subscriber: SubscriberId, next: Vec<Dep>) {
        let keep: AHashSet<DepId> = next.iter().map(Dep::id).collect();
        let mut pruned = 0usize;
        for old in self.deps.drain(..) {
            if !keep.contains(&old.id()) {
                old.remove_sub(subscriber);
                pruned += 1;
            }
        }
        self.deps = next;
        self.generation += 1;
        if pruned > 0 {
            trace!(
                subscriber = subscriber.raw(),
                pruned,
                generation = self.generation,
                "stale deps pruned"
            );
        }
    }

    /// Unsubscribe from everything.
    pub(crate) fn clear(&mut self, subscriber: SubscriberId) {
        for dep in self.deps.drain(..) {
            dep.remove_sub(subscriber);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.deps.len()
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }
}

/// Run `f` with a collector for `subscriber`, then update `deps`.
pub(crate) fn collect<R>(
    subscriber: SubscriberRef,
    deps: &RefCell<DepSet>,
    f: impl FnOnce(&mut Collector) -> R,
) -> R {
    let id = subscriber.id();
    let previous = deps.borrow().ids();
    let mut collector = Collector::new(subscriber, previous);
    let out = f(&mut collector);
    deps.borrow_mut().replace(id, collector.finish());
    out
}
