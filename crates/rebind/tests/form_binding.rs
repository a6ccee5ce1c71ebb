//! A small form wired through the prelude: labels, a two-way input, and a
//! derived summary.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use rebind::prelude::*;
use serde_json::json;

#[derive(Default)]
struct Node {
    id: u64,
    text: String,
    value: String,
    renders: u32,
}

impl ViewNode for Node {
    fn node_id(&self) -> NodeId {
        NodeId(self.id)
    }

    fn set_text(&mut self, text: &str) {
        self.text = text.to_owned();
        self.renders += 1;
    }

    fn set_html(&mut self, html: &str) {
        self.set_text(html);
    }

    fn set_value(&mut self, value: &str) {
        self.value = value.to_owned();
        self.renders += 1;
    }

    fn value(&self) -> String {
        self.value.clone()
    }
}

fn node(id: u64) -> (Rc<RefCell<Node>>, NodeRef) {
    let node = Rc::new(RefCell::new(Node {
        id,
        ..Node::default()
    }));
    let handle: NodeRef = node.clone();
    (node, handle)
}

#[test]
fn typing_updates_the_label_after_the_debounce_window() {
    let (lab, scheduler) = Scheduler::lab();
    let data = observe(json!({"user": {"name": "grace"}})).unwrap();
    let mut scope = BindingScope::new(&data, scheduler.clone());

    let (label, label_ref) = node(1);
    let (input, input_ref) = node(2);
    scope.bind_directive("x-text", "user.name", label_ref).unwrap();
    scope.bind_directive("x-model", "user.name", input_ref).unwrap();
    assert_eq!(label.borrow().text, "grace");
    assert_eq!(input.borrow().value, "grace");

    for text in ["a", "ad", "ada"] {
        input.borrow_mut().value = text.to_owned();
        scope.dispatch_input(NodeId(2), text);
        lab.advance(Duration::from_millis(10));
        scheduler.run_due();
    }
    assert_eq!(label.borrow().text, "grace");

    lab.advance(Duration::from_millis(30));
    scheduler.run_due();
    assert_eq!(label.borrow().text, "ada");
    assert_eq!(get_path(&data, "user.name"), Value::from("ada"));
    assert_eq!(scope.model(NodeId(2)).unwrap().writes_total(), 1);

    scope.dispatch_blur(NodeId(2));
    assert!(scheduler.is_idle());
}

#[test]
fn derived_summary_follows_the_model() {
    let data = observe(json!({"items": {"count": 2, "price": 3}})).unwrap();
    let total = Computed::new(&data, |root, c| {
        let items = root.get_in("items", Some(&mut *c));
        let Some(items) = items.as_object() else {
            return Value::Undefined;
        };
        let count = items.get_in("count", Some(&mut *c)).as_f64().unwrap_or(0.0);
        let price = items.get_in("price", Some(c)).as_f64().unwrap_or(0.0);
        Value::from(count * price)
    });
    assert_eq!(total.get(), Value::from(6));

    set_path(&data, "items.count", 5).unwrap();
    assert!(total.is_dirty());
    assert_eq!(total.get(), Value::from(15));

    data.set("items", json!({"count": 1, "price": 1}));
    assert_eq!(total.get(), Value::from(1));
}

#[test]
fn writing_through_a_scalar_is_rejected() {
    let data = observe(json!({"user": "anonymous"})).unwrap();
    let err = set_path(&data, "user.name", "ada").unwrap_err();
    assert_eq!(
        err,
        ReactiveError::UnresolvablePath {
            path: "user.name".into(),
            segment: "user".into(),
        }
    );
    assert_eq!(data.get("user"), Value::from("anonymous"));
}

#[test]
fn dropping_the_scope_stops_rendering() {
    let (_lab, scheduler) = Scheduler::lab();
    let data = observe(json!({"title": "draft"})).unwrap();
    let (label, label_ref) = node(1);
    {
        let mut scope = BindingScope::new(&data, scheduler);
        scope.bind("title", Directive::Text, label_ref);
    }
    data.set("title", "final");
    assert_eq!(label.borrow().text, "draft");
    assert_eq!(label.borrow().renders, 1);
}
