#![forbid(unsafe_code)]

//! One-way bindings: model to view.

use super::updater::{Directive, EditFocus, NodeId, NodeRef};
use crate::reactive::{ReactiveObject, Value, Watcher};

/// Renders a reactive path into a node with a directive, on creation and on
/// every change. Dropping the binding stops the updates.
pub struct Binding {
    directive: Directive,
    node_id: NodeId,
    watcher: Watcher,
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("directive", &self.directive)
            .field("expression", &self.watcher.expression())
            .field("node", &self.node_id)
            .finish()
    }
}

impl Binding {
    pub fn new(
        root: &ReactiveObject,
        expression: &str,
        directive: Directive,
        node: NodeRef,
        focus: &EditFocus,
    ) -> Self {
        let node_id = node.borrow().node_id();
        let reaction_node = NodeRef::clone(&node);
        let reaction_focus = focus.clone();
        let watcher = Watcher::new(root, expression, move |new, _| {
            directive.apply(&reaction_node, new, &reaction_focus);
        });
        directive.apply(&node, &watcher.value(), focus);
        Self {
            directive,
            node_id,
            watcher,
        }
    }

    #[must_use]
    pub fn directive(&self) -> Directive {
        self.directive
    }

    #[must_use]
    pub fn expression(&self) -> &str {
        self.watcher.expression()
    }

    #[must_use]
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// The value last rendered.
    #[must_use]
    pub fn value(&self) -> Value {
        self.watcher.value()
    }

    #[must_use]
    pub fn watcher(&self) -> &Watcher {
        &self.watcher
    }

    /// Stop rendering updates.
    pub fn dispose(&self) {
        self.watcher.teardown();
    }
}
