#![forbid(unsafe_code)]

//! Debounced two-way binding between a reactive path and an input node.
//!
//! # Protocol
//!
//! 1. The current value is rendered into the node on creation.
//! 2. [`on_input`](ModelBinding::on_input) gives the node edit focus and
//!    schedules a write-back after the quiet period. A newer input cancels
//!    the pending write, so a burst of keystrokes lands as one write of the
//!    latest text.
//! 3. When the model changes, every bound node re-renders except the one
//!    that has edit focus, so the user's caret is never disturbed.
//! 4. [`blur`](ModelBinding::blur) releases focus and applies the
//!    [`BlurPolicy`] to any write still pending.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unresolvable path | An intermediate segment is not an object when the write lands | Reported to diagnostics; the model is unchanged |

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rebind_core::scheduler::Scheduler;
use tracing::{debug, trace};
use web_time::Duration;

use super::debounce::Debouncer;
use super::updater::{Directive, EditFocus, NodeId, NodeRef, render_text};
use crate::diagnostics;
use crate::reactive::{Path, ReactiveObject, Value, Watcher, same_value};

/// Environment variable overriding [`ModelConfig::debounce`], in milliseconds.
pub const ENV_DEBOUNCE_MS: &str = "REBIND_DEBOUNCE_MS";

/// What happens to a pending write when the input loses focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlurPolicy {
    /// Drop the pending write; the node shows the model value again.
    #[default]
    Cancel,
    /// Land the pending write immediately.
    Flush,
}

/// Configuration of a [`ModelBinding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelConfig {
    /// Quiet period before an input is written back. Default: 30ms.
    pub debounce: Duration,
    /// Pending-write handling on blur. Default: [`BlurPolicy::Cancel`].
    pub blur_policy: BlurPolicy,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(30),
            blur_policy: BlurPolicy::Cancel,
        }
    }
}

impl ModelConfig {
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    #[must_use]
    pub fn with_blur_policy(mut self, policy: BlurPolicy) -> Self {
        self.blur_policy = policy;
        self
    }

    /// Defaults overridden by process environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by values from `lookup`. Unparseable values are
    /// ignored.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(val) = lookup(ENV_DEBOUNCE_MS)
            && let Ok(ms) = val.trim().parse::<u64>()
        {
            config = config.with_debounce(Duration::from_millis(ms));
        }
        config
    }
}

struct ModelState {
    root: ReactiveObject,
    path: Path,
    node: NodeRef,
    node_id: NodeId,
    focus: EditFocus,
    /// Last value known to be in the model.
    synced: RefCell<Value>,
    /// Input waiting for the debounce window to close.
    pending: RefCell<Option<Value>>,
    writes: Cell<u64>,
}

impl ModelState {
    /// Write the pending input. Returns whether the model changed.
    fn land(&self) -> bool {
        let Some(value) = self.pending.borrow_mut().take() else {
            return false;
        };
        match self.path.assign(&self.root, value.clone()) {
            Ok(changed) => {
                *self.synced.borrow_mut() = value;
                self.writes.set(self.writes.get() + 1);
                debug!(path = %self.path, node = self.node_id.0, changed, "model write-back");
                changed
            }
            Err(err) => {
                diagnostics::report(err);
                false
            }
        }
    }
}

/// Two-way binding of an input node to a reactive path.
///
/// Dropping the binding disposes it.
pub struct ModelBinding {
    state: Rc<ModelState>,
    debouncer: Debouncer,
    watcher: Watcher,
    config: ModelConfig,
}

impl std::fmt::Debug for ModelBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBinding")
            .field("path", &self.state.path.as_str())
            .field("node", &self.state.node_id)
            .field("pending", &*self.state.pending.borrow())
            .field("config", &self.config)
            .finish()
    }
}

impl ModelBinding {
    /// Bind `node` to `expression` under `root` and render the current value.
    pub fn new(
        root: &ReactiveObject,
        expression: &str,
        node: NodeRef,
        scheduler: Scheduler,
        focus: EditFocus,
        config: ModelConfig,
    ) -> Self {
        let node_id = node.borrow().node_id();
        let state = Rc::new(ModelState {
            root: root.clone(),
            path: Path::parse(expression),
            node,
            node_id,
            focus,
            synced: RefCell::new(Value::Undefined),
            pending: RefCell::new(None),
            writes: Cell::new(0),
        });

        let reaction_state = Rc::clone(&state);
        let watcher = Watcher::new(root, expression, move |new, _| {
            *reaction_state.synced.borrow_mut() = new.clone();
            Directive::Model.apply(&reaction_state.node, new, &reaction_state.focus);
        });
        let initial = watcher.value();
        Directive::Model.apply(&state.node, &initial, &state.focus);
        *state.synced.borrow_mut() = initial;

        Self {
            state,
            debouncer: Debouncer::new(scheduler, config.debounce),
            watcher,
            config,
        }
    }

    /// Handle an input event carrying the node's new text.
    pub fn on_input(&self, text: &str) {
        let state = &self.state;
        state.focus.begin(state.node_id);
        let value = Value::from(text);
        if same_value(&state.synced.borrow(), &value) {
            // Typed back to the model value: nothing to write.
            self.cancel();
            return;
        }
        *state.pending.borrow_mut() = Some(value);
        let weak = Rc::downgrade(state);
        self.debouncer.call(move || {
            if let Some(state) = weak.upgrade() {
                state.land();
            }
        });
        trace!(path = %state.path, node = state.node_id.0, "write-back scheduled");
    }

    /// Land the pending write now. Returns whether the model changed.
    pub fn flush(&self) -> bool {
        self.debouncer.cancel();
        self.state.land()
    }

    /// Drop the pending write. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        self.debouncer.cancel();
        self.state.pending.borrow_mut().take().is_some()
    }

    /// Release edit focus and apply the blur policy.
    pub fn blur(&self) {
        let state = &self.state;
        state.focus.end(state.node_id);
        match self.config.blur_policy {
            BlurPolicy::Cancel => {
                self.cancel();
            }
            BlurPolicy::Flush => {
                self.flush();
            }
        }
        let shown = render_text(&self.watcher.value());
        let stale = state.node.borrow().value() != shown;
        if stale {
            state.node.borrow_mut().set_value(&shown);
        }
    }

    /// Cancel any pending write, stop listening to the model and release
    /// focus. Idempotent.
    pub fn dispose(&self) {
        self.cancel();
        self.watcher.teardown();
        self.state.focus.end(self.state.node_id);
    }

    #[must_use]
    pub fn node_id(&self) -> NodeId {
        self.state.node_id
    }

    #[must_use]
    pub fn expression(&self) -> &str {
        self.state.path.as_str()
    }

    /// The current model value.
    #[must_use]
    pub fn value(&self) -> Value {
        self.watcher.value()
    }

    /// Input waiting to be written back.
    #[must_use]
    pub fn pending_value(&self) -> Option<Value> {
        self.state.pending.borrow().clone()
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.watcher.is_active()
    }

    /// Number of write-backs that reached the model.
    #[must_use]
    pub fn writes_total(&self) -> u64 {
        self.state.writes.get()
    }

    #[must_use]
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

impl Drop for ModelBinding {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::updater::test_node::FakeNode;
    use crate::error::ReactiveError;
    use crate::reactive::observe;
    use rebind_core::clock::LabClock;
    use serde_json::json;

    fn setup(
        data: serde_json::Value,
        expr: &str,
        config: ModelConfig,
    ) -> (
        LabClock,
        Scheduler,
        ReactiveObject,
        Rc<RefCell<FakeNode>>,
        ModelBinding,
    ) {
        let (lab, scheduler) = Scheduler::lab();
        let root = observe(data).unwrap();
        let (node, handle) = FakeNode::shared(1);
        let model = ModelBinding::new(
            &root,
            expr,
            handle,
            scheduler.clone(),
            EditFocus::new(),
            config,
        );
        (lab, scheduler, root, node, model)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn config_defaults_and_lookup() {
        let config = ModelConfig::default();
        assert_eq!(config.debounce, ms(30));
        assert_eq!(config.blur_policy, BlurPolicy::Cancel);

        let config = ModelConfig::from_lookup(|key| (key == ENV_DEBOUNCE_MS).then(|| "120".into()));
        assert_eq!(config.debounce, ms(120));
        let config = ModelConfig::from_lookup(|_| Some("soon".into()));
        assert_eq!(config, ModelConfig::default());
    }

    #[test]
    fn initial_render() {
        let (_lab, _s, _root, node, model) =
            setup(json!({"form": {"name": "ada"}}), "form.name", ModelConfig::default());
        assert_eq!(node.borrow().value, "ada");
        assert_eq!(model.value(), Value::from("ada"));
        assert_eq!(model.expression(), "form.name");
    }

    #[test]
    fn burst_lands_once() {
        let (lab, scheduler, root, _node, model) =
            setup(json!({"q": ""}), "q", ModelConfig::default());
        let writes = Rc::new(Cell::new(0u32));
        let w = Rc::clone(&writes);
        let _watch = Watcher::new(&root, "q", move |_, _| w.set(w.get() + 1));

        for text in ["a", "ab", "abc"] {
            model.on_input(text);
            lab.advance(ms(10));
            scheduler.run_due();
        }
        assert_eq!(writes.get(), 0);

        lab.advance(ms(30));
        scheduler.run_due();
        assert_eq!(writes.get(), 1);
        assert_eq!(root.get("q"), Value::from("abc"));
        assert_eq!(model.writes_total(), 1);
    }

    #[test]
    fn focused_node_is_not_rewritten() {
        let (lab, scheduler, root, node, model) =
            setup(json!({"q": "x"}), "q", ModelConfig::default());
        let before = node.borrow().writes;
        model.on_input("xy");
        lab.advance(ms(30));
        scheduler.run_due();
        assert_eq!(root.get("q"), Value::from("xy"));
        assert_eq!(node.borrow().writes, before, "edited node keeps its caret");

        root.set("q", "external");
        assert_eq!(node.borrow().writes, before);

        model.blur();
        assert_eq!(node.borrow().value, "external");
    }

    #[test]
    fn input_equal_to_model_is_ignored() {
        let (lab, scheduler, _root, _node, model) =
            setup(json!({"q": "same"}), "q", ModelConfig::default());
        model.on_input("samex");
        assert!(model.is_pending());
        model.on_input("same");
        assert!(!model.is_pending());
        assert_eq!(model.pending_value(), None);
        lab.advance(ms(100));
        assert_eq!(scheduler.run_due(), 0);
        assert_eq!(model.writes_total(), 0);
    }

    #[test]
    fn blur_cancels_by_default() {
        let (lab, scheduler, root, node, model) =
            setup(json!({"q": "a"}), "q", ModelConfig::default());
        model.on_input("ab");
        node.borrow_mut().value = "ab".into();
        model.blur();
        lab.advance(ms(100));
        scheduler.run_due();
        assert_eq!(root.get("q"), Value::from("a"));
        assert_eq!(node.borrow().value, "a", "view reverts to the model");
    }

    #[test]
    fn blur_can_flush() {
        let config = ModelConfig::default().with_blur_policy(BlurPolicy::Flush);
        let (_lab, _scheduler, root, _node, model) = setup(json!({"q": "a"}), "q", config);
        model.on_input("ab");
        model.blur();
        assert_eq!(root.get("q"), Value::from("ab"));
        assert!(!model.is_pending());
    }

    #[test]
    fn dispose_cancels_and_stops_rendering() {
        let (lab, scheduler, root, node, model) =
            setup(json!({"q": "a"}), "q", ModelConfig::default());
        model.on_input("ab");
        model.dispose();
        lab.advance(ms(100));
        scheduler.run_due();
        assert_eq!(root.get("q"), Value::from("a"));
        assert!(!model.is_active());

        root.set("q", "later");
        assert_eq!(node.borrow().value, "a");
    }

    #[test]
    fn drop_cancels_pending_write() {
        let (lab, scheduler, root, _node, model) =
            setup(json!({"q": "a"}), "q", ModelConfig::default());
        model.on_input("ab");
        drop(model);
        lab.advance(ms(100));
        assert_eq!(scheduler.run_due(), 0);
        assert_eq!(root.get("q"), Value::from("a"));
    }

    #[test]
    fn unresolvable_write_is_reported() {
        let _ = diagnostics::take_diagnostics();
        let (lab, scheduler, root, _node, model) =
            setup(json!({"form": {"name": "a"}}), "form.name", ModelConfig::default());
        model.on_input("b");
        root.set("form", 5);
        lab.advance(ms(30));
        scheduler.run_due();

        let reported = diagnostics::take_diagnostics();
        assert_eq!(reported.len(), 1);
        assert_eq!(
            reported[0].error,
            ReactiveError::UnresolvablePath {
                path: "form.name".into(),
                segment: "form".into(),
            }
        );
        assert_eq!(model.writes_total(), 0);
    }
}
