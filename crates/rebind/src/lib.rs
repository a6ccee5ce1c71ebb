#![forbid(unsafe_code)]

//! rebind public facade crate.
//!
//! # Example
//!
//! ```
//! use rebind::prelude::*;
//! use serde_json::json;
//!
//! let data = observe(json!({"greeting": "hello"})).unwrap();
//! let watcher = Watcher::new(&data, "greeting", |_, _| {});
//! data.set("greeting", "bonjour");
//! assert_eq!(watcher.value().as_str(), Some("bonjour"));
//! ```

pub use rebind_core as core;
pub use rebind_runtime as runtime;

pub mod prelude {
    pub use rebind_core::clock::{Clock, LabClock};
    pub use rebind_core::scheduler::{Scheduler, TaskHandle};
    pub use rebind_runtime::binding::{
        Binding, BindingScope, BlurPolicy, Directive, EditFocus, ModelBinding, ModelConfig,
        NodeId, NodeRef, ViewNode,
    };
    pub use rebind_runtime::reactive::{
        Collector, Computed, ReactiveObject, Value, Watcher, get_path, observe, set_path,
    };
    pub use rebind_runtime::{ReactionError, ReactiveError, RuntimeConfig};
}
