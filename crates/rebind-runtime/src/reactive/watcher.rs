#![forbid(unsafe_code)]

//! Watchers: one evaluated expression plus a reaction.
//!
//! A [`Watcher`] evaluates a dotted path (or a closure getter) against a
//! reactive root, caches the result, and subscribes to every dep the
//! evaluation read. When one of them notifies, the watcher re-evaluates and,
//! if the value changed, calls its reaction with `(new, old)`.
//!
//! # Invariants
//!
//! 1. Construction evaluates once and never calls the reaction.
//! 2. After every evaluation the watcher is subscribed to exactly the deps
//!    that evaluation read. Deps from the previous evaluation that were not
//!    read again are unsubscribed.
//! 3. The reaction runs only when the value changed by [`same_value`].
//! 4. An update triggered from inside the watcher's own reaction is deferred
//!    and re-run after the reaction returns, bounded by
//!    [`RuntimeConfig::max_update_passes`].
//! 5. Dropping the `Watcher` unsubscribes it from every dep.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Reaction error | Reaction returns `Err` | Reported as [`ReactiveError::Reaction`]; new value stays cached |
//! | Self-trigger loop | Reaction keeps changing its own input | Reported as [`ReactiveError::WatcherLoop`] |
//!
//! # Example
//!
//! ```
//! use rebind_runtime::reactive::{Watcher, observe};
//! use serde_json::json;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let data = observe(json!({"a": {"b": 1}})).unwrap();
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let log = Rc::clone(&seen);
//! let watcher = Watcher::new(&data, "a.b", move |new, old| {
//!     log.borrow_mut().push((new.to_string(), old.to_string()));
//! });
//!
//! data.get("a").as_object().unwrap().set("b", 2);
//! assert_eq!(*seen.borrow(), vec![("2".to_string(), "1".to_string())]);
//! assert_eq!(watcher.dep_count(), 3);
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use super::collector::{Collector, DepSet, collect};
use super::dep::{Subscriber, SubscriberId, SubscriberRef};
use super::observer::ReactiveObject;
use super::path::Path;
use super::value::{Value, same_value};
use crate::config::RuntimeConfig;
use crate::diagnostics;
use crate::error::{ReactionError, ReactiveError};

type Getter = Box<dyn Fn(&ReactiveObject, &mut Collector) -> Value>;
type Reaction = Box<dyn FnMut(&Value, &Value) -> Result<(), ReactionError>>;

const GETTER_EXPRESSION: &str = "<getter>";

enum Source {
    Path(Path),
    Getter(Getter),
}

struct WatcherInner {
    id: SubscriberId,
    this: Weak<WatcherInner>,
    root: ReactiveObject,
    expression: String,
    source: Source,
    value: RefCell<Value>,
    deps: RefCell<DepSet>,
    reaction: RefCell<Reaction>,
    active: Cell<bool>,
    running: Cell<bool>,
    pending: Cell<bool>,
}

/// Clears the running flag when an update finishes.
struct RunGuard<'a>(&'a Cell<bool>);

impl<'a> RunGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl WatcherInner {
    fn subscriber_ref(&self) -> SubscriberRef {
        let this: Weak<dyn Subscriber> = self.this.clone();
        SubscriberRef::from_weak(self.id, this)
    }

    fn evaluate(&self) -> Value {
        collect(self.subscriber_ref(), &self.deps, |collector| match &self.source {
            Source::Path(path) => path.resolve(&self.root, Some(collector)),
            Source::Getter(getter) => getter(&self.root, collector),
        })
    }

    fn run_once(&self) {
        let new = self.evaluate();
        let old = {
            let mut cached = self.value.borrow_mut();
            if same_value(&cached, &new) {
                return;
            }
            std::mem::replace(&mut *cached, new.clone())
        };
        trace!(watcher = self.id.raw(), expression = %self.expression, "reaction");
        let result = {
            let mut reaction = self.reaction.borrow_mut();
            (*reaction)(&new, &old)
        };
        if let Err(source) = result {
            diagnostics::report(ReactiveError::Reaction {
                watcher: self.id,
                expression: self.expression.clone(),
                source,
            });
        }
    }

    fn teardown(&self) {
        if self.active.replace(false) {
            self.deps.borrow_mut().clear(self.id);
            trace!(watcher = self.id.raw(), expression = %self.expression, "watcher torn down");
        }
    }
}

impl Subscriber for WatcherInner {
    fn update(&self) {
        if !self.active.get() {
            return;
        }
        if self.running.get() {
            self.pending.set(true);
            return;
        }
        let _guard = RunGuard::enter(&self.running);
        let limit = RuntimeConfig::current().max_update_passes;
        let mut passes = 0u32;
        loop {
            self.pending.set(false);
            self.run_once();
            if !self.pending.get() || !self.active.get() {
                break;
            }
            if passes >= limit {
                diagnostics::report(ReactiveError::WatcherLoop {
                    watcher: self.id,
                    expression: self.expression.clone(),
                    passes,
                });
                break;
            }
            passes += 1;
        }
        self.pending.set(false);
        if passes > 0 {
            debug!(watcher = self.id.raw(), passes, "watcher re-ran");
        }
    }
}

impl Drop for WatcherInner {
    fn drop(&mut self) {
        self.deps.get_mut().clear(self.id);
    }
}

/// A subscription that keeps a derived value in sync with a reactive root.
///
/// Dropping the watcher tears it down.
pub struct Watcher {
    inner: Rc<WatcherInner>,
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.inner.id.raw())
            .field("expression", &self.inner.expression)
            .field("value", &*self.inner.value.borrow())
            .field("deps", &self.dep_count())
            .field("active", &self.inner.active.get())
            .finish()
    }
}

impl Watcher {
    /// Watch the dotted path `expression` under `root`.
    pub fn new(
        root: &ReactiveObject,
        expression: &str,
        mut reaction: impl FnMut(&Value, &Value) + 'static,
    ) -> Self {
        Self::try_new(root, expression, move |new, old| {
            reaction(new, old);
            Ok(())
        })
    }

    /// Like [`new`](Self::new), with a reaction that can fail. Failures are
    /// reported to [diagnostics](crate::diagnostics).
    pub fn try_new(
        root: &ReactiveObject,
        expression: &str,
        reaction: impl FnMut(&Value, &Value) -> Result<(), ReactionError> + 'static,
    ) -> Self {
        Self::build(
            root,
            expression.to_owned(),
            Source::Path(Path::parse(expression)),
            Box::new(reaction),
        )
    }

    /// Watch the value computed by `getter`. Every read the getter makes
    /// through the collector is tracked.
    pub fn with_getter(
        root: &ReactiveObject,
        getter: impl Fn(&ReactiveObject, &mut Collector) -> Value + 'static,
        mut reaction: impl FnMut(&Value, &Value) + 'static,
    ) -> Self {
        Self::try_with_getter(root, getter, move |new, old| {
            reaction(new, old);
            Ok(())
        })
    }

    /// Like [`with_getter`](Self::with_getter), with a reaction that can fail.
    pub fn try_with_getter(
        root: &ReactiveObject,
        getter: impl Fn(&ReactiveObject, &mut Collector) -> Value + 'static,
        reaction: impl FnMut(&Value, &Value) -> Result<(), ReactionError> + 'static,
    ) -> Self {
        Self::build(
            root,
            GETTER_EXPRESSION.to_owned(),
            Source::Getter(Box::new(getter)),
            Box::new(reaction),
        )
    }

    fn build(root: &ReactiveObject, expression: String, source: Source, reaction: Reaction) -> Self {
        let inner = Rc::new_cyclic(|this| WatcherInner {
            id: SubscriberId::next(),
            this: this.clone(),
            root: root.clone(),
            expression,
            source,
            value: RefCell::new(Value::Undefined),
            deps: RefCell::new(DepSet::default()),
            reaction: RefCell::new(reaction),
            active: Cell::new(true),
            running: Cell::new(false),
            pending: Cell::new(false),
        });
        let initial = inner.evaluate();
        *inner.value.borrow_mut() = initial;
        trace!(
            watcher = inner.id.raw(),
            expression = %inner.expression,
            deps = inner.deps.borrow().len(),
            "watcher created"
        );
        Self { inner }
    }

    /// The cached value from the latest evaluation.
    #[must_use]
    pub fn value(&self) -> Value {
        self.inner.value.borrow().clone()
    }

    /// The watched expression (`"<getter>"` for closure getters).
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.inner.expression
    }

    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Number of evaluations so far, including the initial one.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.deps.borrow().generation()
    }

    /// Number of deps the latest evaluation subscribed to.
    #[must_use]
    pub fn dep_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Re-evaluate now, as if a dependency had notified.
    pub fn update(&self) {
        self.inner.update();
    }

    /// Weak reference usable with [`Dep::add_sub`](super::dep::Dep::add_sub).
    #[must_use]
    pub fn subscriber(&self) -> SubscriberRef {
        self.inner.subscriber_ref()
    }

    /// Unsubscribe from every dep. Later notifications are ignored.
    pub fn teardown(&self) {
        self.inner.teardown();
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.inner.teardown();
    }
}
