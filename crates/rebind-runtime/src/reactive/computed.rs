#![forbid(unsafe_code)]

//! Lazy computed values over a reactive root.
//!
//! # Design
//!
//! [`Computed`] wraps a getter and its cached result in shared,
//! reference-counted storage. The getter's tracked reads subscribe the
//! computed value to the deps it touched; when any of them notifies, the
//! cache is marked dirty. The next [`get()`](Computed::get) recomputes with
//! a fresh collector, dropping deps the new evaluation no longer reads.
//!
//! Collection is single-level: a watcher that reads a `Computed` is not
//! subscribed to the computed value's own dependencies.
//!
//! # Invariants
//!
//! 1. `get()` always returns a value consistent with the current state of all
//!    dependencies.
//! 2. The getter is called at most once per dependency change cycle.
//! 3. If no dependency has changed, `get()` returns the cached value.
//! 4. Version increments by exactly 1 per recomputation.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::collector::{Collector, DepSet, collect};
use super::dep::{Subscriber, SubscriberId, SubscriberRef};
use super::observer::ReactiveObject;
use super::path::Path;
use super::value::Value;

type Getter = Box<dyn Fn(&ReactiveObject, &mut Collector) -> Value>;

/// Shared interior for [`Computed`].
struct ComputedInner {
    id: SubscriberId,
    this: Weak<ComputedInner>,
    root: ReactiveObject,
    getter: Getter,
    /// Cached result (`Undefined` before the first computation).
    cached: RefCell<Value>,
    /// Whether the cached value is stale.
    dirty: Cell<bool>,
    /// Bumped on each recomputation.
    version: Cell<u64>,
    deps: RefCell<DepSet>,
}

impl ComputedInner {
    fn refresh(&self) {
        if !self.dirty.get() {
            return;
        }
        let this: Weak<dyn Subscriber> = self.this.clone();
        let value = collect(SubscriberRef::from_weak(self.id, this), &self.deps, |c| {
            (self.getter)(&self.root, c)
        });
        *self.cached.borrow_mut() = value;
        self.dirty.set(false);
        self.version.set(self.version.get() + 1);
    }
}

impl Subscriber for ComputedInner {
    fn update(&self) {
        self.dirty.set(true);
    }
}

impl Drop for ComputedInner {
    fn drop(&mut self) {
        self.deps.get_mut().clear(self.id);
    }
}

/// A lazily-evaluated, memoized value derived from a reactive root.
///
/// Cloning a `Computed` creates a new handle to the **same** inner state.
#[derive(Clone)]
pub struct Computed {
    inner: Rc<ComputedInner>,
}

impl std::fmt::Debug for Computed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("cached", &*self.inner.cached.borrow())
            .field("dirty", &self.inner.dirty.get())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl Computed {
    /// Create a computed value. Nothing is evaluated until the first `get()`.
    pub fn new(
        root: &ReactiveObject,
        getter: impl Fn(&ReactiveObject, &mut Collector) -> Value + 'static,
    ) -> Self {
        Self {
            inner: Rc::new_cyclic(|this| ComputedInner {
                id: SubscriberId::next(),
                this: this.clone(),
                root: root.clone(),
                getter: Box::new(getter),
                cached: RefCell::new(Value::Undefined),
                dirty: Cell::new(true), // Computed on first get().
                version: Cell::new(0),
                deps: RefCell::new(DepSet::default()),
            }),
        }
    }

    /// Computed value of a dotted path.
    pub fn from_path(root: &ReactiveObject, expression: &str) -> Self {
        let path = Path::parse(expression);
        Self::new(root, move |root, c| path.resolve(root, Some(c)))
    }

    /// Get the current value, recomputing if any dependency has changed.
    #[must_use]
    pub fn get(&self) -> Value {
        self.inner.refresh();
        self.inner.cached.borrow().clone()
    }

    /// Access the current value by reference without cloning.
    ///
    /// # Panics
    ///
    /// Panics if the closure recomputes the same `Computed` (re-entrant borrow).
    pub fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        self.inner.refresh();
        f(&self.inner.cached.borrow())
    }

    /// Whether the cached value is stale.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Force invalidation. The next `get()` recomputes.
    pub fn invalidate(&self) {
        self.inner.dirty.set(true);
    }

    /// Current version number. Increments by 1 on each recomputation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Number of deps the latest computation subscribed to.
    #[must_use]
    pub fn dep_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
