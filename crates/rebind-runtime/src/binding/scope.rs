#![forbid(unsafe_code)]

//! Lifecycle owner for the bindings of one view subtree.
//!
//! A [`BindingScope`] creates bindings against one reactive root, shares a
//! single [`EditFocus`] and [`Scheduler`] between them, and routes input and
//! blur events to the model binding of the target node. Clearing or dropping
//! the scope disposes every binding and cancels pending write-backs.

use rebind_core::scheduler::Scheduler;
use tracing::debug;

use super::model::{ModelBinding, ModelConfig};
use super::one_way::Binding;
use super::updater::{BindingError, Directive, EditFocus, NodeId, NodeRef};
use crate::reactive::ReactiveObject;

/// Owns the bindings of a view subtree.
pub struct BindingScope {
    root: ReactiveObject,
    scheduler: Scheduler,
    focus: EditFocus,
    config: ModelConfig,
    bindings: Vec<Binding>,
    models: Vec<ModelBinding>,
}

impl std::fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingScope")
            .field("root", &self.root.id())
            .field("bindings", &self.bindings.len())
            .field("models", &self.models.len())
            .field("focus", &self.focus.current())
            .finish()
    }
}

impl BindingScope {
    /// Empty scope with [`ModelConfig::from_env`].
    #[must_use]
    pub fn new(root: &ReactiveObject, scheduler: Scheduler) -> Self {
        Self {
            root: root.clone(),
            scheduler,
            focus: EditFocus::new(),
            config: ModelConfig::from_env(),
            bindings: Vec::new(),
            models: Vec::new(),
        }
    }

    /// Use `config` for model bindings created from now on.
    #[must_use]
    pub fn with_model_config(mut self, config: ModelConfig) -> Self {
        self.config = config;
        self
    }

    /// One-way binding of `expression` into `node`.
    pub fn bind(&mut self, expression: &str, directive: Directive, node: NodeRef) -> &Binding {
        let idx = self.bindings.len();
        self.bindings.push(Binding::new(
            &self.root,
            expression,
            directive,
            node,
            &self.focus,
        ));
        &self.bindings[idx]
    }

    /// Two-way binding of `expression` to the input `node`.
    pub fn bind_model(&mut self, expression: &str, node: NodeRef) -> &ModelBinding {
        let idx = self.models.len();
        self.models.push(ModelBinding::new(
            &self.root,
            expression,
            node,
            self.scheduler.clone(),
            self.focus.clone(),
            self.config,
        ));
        &self.models[idx]
    }

    /// Bind by directive name (`text`, `html`, `class`, `model`, optionally
    /// prefixed with `x-`). `model` creates a two-way binding.
    ///
    /// # Errors
    ///
    /// [`BindingError::UnknownDirective`] for any other name.
    pub fn bind_directive(&mut self, name: &str, expression: &str, node: NodeRef) -> Result<(), BindingError> {
        match Directive::parse(name)? {
            Directive::Model => {
                self.bind_model(expression, node);
            }
            directive => {
                self.bind(expression, directive, node);
            }
        }
        Ok(())
    }

    /// Route an input event to the model binding of `node`.
    /// Returns `false` if the node has no model binding.
    ///
    /// Input on a node other than the one holding edit focus blurs the
    /// holder first, so its pending write follows its blur policy.
    pub fn dispatch_input(&self, node: NodeId, text: &str) -> bool {
        let Some(model) = self.model(node) else {
            return false;
        };
        if let Some(previous) = self.focus.current()
            && previous != node
            && let Some(holder) = self.model(previous)
        {
            debug!(from = previous.0, to = node.0, "edit focus moved without blur");
            holder.blur();
        }
        model.on_input(text);
        true
    }

    /// Route a blur event to the model binding of `node`.
    pub fn dispatch_blur(&self, node: NodeId) -> bool {
        let Some(model) = self.model(node) else {
            return false;
        };
        model.blur();
        true
    }

    /// The model binding of `node`, if any.
    #[must_use]
    pub fn model(&self, node: NodeId) -> Option<&ModelBinding> {
        self.models.iter().find(|m| m.node_id() == node)
    }

    /// Configuration used for model bindings created from now on.
    #[must_use]
    pub fn model_config(&self) -> &ModelConfig {
        &self.config
    }

    #[must_use]
    pub fn focus(&self) -> &EditFocus {
        &self.focus
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn root(&self) -> &ReactiveObject {
        &self.root
    }

    /// Number of live bindings, one-way and two-way.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.bindings.len() + self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.binding_count() == 0
    }

    /// Dispose every binding.
    pub fn clear(&mut self) {
        let count = self.binding_count();
        self.models.clear();
        self.bindings.clear();
        if count > 0 {
            debug!(count, "binding scope cleared");
        }
    }
}

impl Drop for BindingScope {
    fn drop(&mut self) {
        self.clear();
    }
}
