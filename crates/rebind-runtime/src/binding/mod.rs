#![forbid(unsafe_code)]

//! View bindings on top of the reactive core.
//!
//! - [`Binding`]: one-way render of a path into a [`ViewNode`].
//! - [`ModelBinding`]: debounced two-way binding for input nodes.
//! - [`Debouncer`]: cancel-on-supersede task slot used for write-backs.
//! - [`BindingScope`]: owns the bindings of a view subtree.
//!
//! # Invariants
//!
//! 1. A binding renders once on creation and again on every change of its
//!    value.
//! 2. The node with edit focus is never re-rendered by its model binding.
//! 3. Of a burst of inputs within the debounce window, only the last one is
//!    written back.
//! 4. A disposed binding neither renders nor writes.

pub mod debounce;
pub mod model;
pub mod one_way;
pub mod scope;
pub mod updater;

pub use debounce::Debouncer;
pub use model::{BlurPolicy, ModelBinding, ModelConfig};
pub use one_way::Binding;
pub use scope::BindingScope;
pub use updater::{ATTRIBUTE_PREFIX, BindingError, Directive, EditFocus, NodeId, NodeRef, ViewNode, render_text};
