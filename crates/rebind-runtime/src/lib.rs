#![forbid(unsafe_code)]

//! Reactive data binding runtime.
//!
//! [`reactive`] turns plain data into observable objects and keeps watchers
//! in sync with them. [`binding`] connects watchers to view nodes, including
//! debounced two-way input binding driven by a
//! [`Scheduler`](rebind_core::scheduler::Scheduler).
//!
//! Failures inside reactions never abort a notification; they are routed to
//! [`diagnostics`].

pub mod binding;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod reactive;

pub use binding::{
    Binding, BindingError, BindingScope, BlurPolicy, Debouncer, Directive, EditFocus,
    ModelBinding, ModelConfig, NodeId, NodeRef, ViewNode,
};
pub use config::RuntimeConfig;
pub use diagnostics::Diagnostic;
pub use error::{ReactionError, ReactiveError};
pub use reactive::{
    Collector, Computed, Dep, ReactiveObject, Value, Watcher, get_path, observe, set_path,
};
