#![forbid(unsafe_code)]

//! Dependency-tracking core.
//!
//! - [`ReactiveObject`]: property store with one [`Dep`] per key, created by
//!   [`observe`].
//! - [`Dep`]: ordered list of weak [`Subscriber`] references.
//! - [`Collector`]: the context of one evaluation, passed by `&mut` through
//!   every tracked read.
//! - [`Watcher`]: evaluates a path or getter, subscribes to what it read, and
//!   reacts to changes.
//! - [`Computed`]: lazily recomputed, memoized derived value.
//!
//! # Architecture
//!
//! Everything is single-threaded (`Rc`/`RefCell`). Deps hold subscribers
//! weakly; a dropped watcher is pruned from each dep on that dep's next
//! notification, and an explicit teardown unsubscribes it immediately.
//!
//! There is no ambient "current watcher". An evaluation owns its
//! [`Collector`] and hands it to [`ReactiveObject::get_in`], so attribution of
//! reads to subscribers cannot leak between evaluations.
//!
//! # Invariants
//!
//! 1. Writes are the only notification trigger, and a write of a
//!    [`same_value`] value triggers nothing.
//! 2. Subscribers of a dep are notified in registration order.
//! 3. After each evaluation, a subscriber holds exactly the deps it read.

pub mod collector;
pub mod computed;
pub mod dep;
pub mod observer;
pub mod path;
pub mod value;
pub mod watcher;

pub use collector::Collector;
pub use computed::Computed;
pub use dep::{Dep, DepId, Subscriber, SubscriberId, SubscriberRef};
pub use observer::{ObjectId, ReactiveObject, observe};
pub use path::{Path, get_path, set_path};
pub use value::{Value, same_value};
pub use watcher::Watcher;
