#![forbid(unsafe_code)]

//! Reactive objects.
//!
//! A [`ReactiveObject`] stores each own property next to its own [`Dep`], plus
//! one object-level dep notified when keys are added or removed. Tracked reads
//! ([`get_in`](ReactiveObject::get_in)) register the evaluating subscriber;
//! writes ([`set`](ReactiveObject::set)) notify it.
//!
//! # Invariants
//!
//! 1. Writing a value that is [`same_value`] to the current one is a no-op:
//!    nothing is stored and nobody is notified.
//! 2. A tracked read of a property holding an object also registers with
//!    that object's object-level dep.
//! 3. A tracked read of a missing key registers with the object-level dep,
//!    so defining the key later notifies the reader.
//! 4. No borrow of the property map is held while subscribers run.
//!
//! # Example
//!
//! ```
//! use rebind_runtime::reactive::observe;
//! use serde_json::json;
//!
//! let data = observe(json!({"user": {"name": "ada"}})).unwrap();
//! let user = data.get("user");
//! assert_eq!(user.as_object().unwrap().get("name").as_str(), Some("ada"));
//! assert!(observe(json!(42)).is_none());
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use super::collector::Collector;
use super::dep::Dep;
use super::value::{Value, same_value};
use crate::error::ReactiveError;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identity of a [`ReactiveObject`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    fn next() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

struct Property {
    value: Value,
    dep: Dep,
}

struct ObjectInner {
    id: ObjectId,
    dep: Dep,
    props: RefCell<IndexMap<String, Property>>,
}

/// Shared handle to a reactive object.
///
/// Cloning creates another handle to the **same** object.
#[derive(Clone)]
pub struct ReactiveObject {
    inner: Rc<ObjectInner>,
}

impl std::fmt::Debug for ReactiveObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Values are not printed: the graph may contain cycles.
        f.debug_struct("ReactiveObject")
            .field("id", &self.inner.id.0)
            .field("keys", &self.keys())
            .finish()
    }
}

impl Default for ReactiveObject {
    fn default() -> Self {
        Self::new()
    }
}

/// Observe `value`.
///
/// Returns the reactive object for structured values and `None` for
/// primitives and null. JSON objects are converted recursively. A top-level
/// array becomes an object keyed by index (`"0"`, `"1"`, ...), so its
/// elements are reactive properties. Observing a reactive object returns the
/// same handle.
pub fn observe(value: impl Into<Value>) -> Option<ReactiveObject> {
    match value.into() {
        Value::Object(obj) => Some(obj),
        Value::Array(items) => Some(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), item.clone()))
                .collect(),
        ),
        _ => None,
    }
}

impl ReactiveObject {
    /// Create an empty reactive object.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ObjectInner {
                id: ObjectId::next(),
                dep: Dep::new(),
                props: RefCell::new(IndexMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.inner.id
    }

    /// Whether both handles refer to the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The object-level dep, notified when keys are added or removed.
    #[must_use]
    pub fn dep(&self) -> &Dep {
        &self.inner.dep
    }

    /// The dep of property `key`, if it exists.
    #[must_use]
    pub fn property_dep(&self, key: &str) -> Option<Dep> {
        self.inner.props.borrow().get(key).map(|p| p.dep.clone())
    }

    /// Untracked read. Missing keys read as [`Value::Undefined`].
    #[must_use]
    pub fn get(&self, key: &str) -> Value {
        self.get_in(key, None)
    }

    /// Read `key`, registering the collector (if any) with the deps involved.
    pub fn get_in(&self, key: &str, collector: Option<&mut Collector>) -> Value {
        let found = self
            .inner
            .props
            .borrow()
            .get(key)
            .map(|p| (p.value.clone(), p.dep.clone()));
        let Some(collector) = collector else {
            return found.map(|(value, _)| value).unwrap_or_default();
        };
        match found {
            Some((value, dep)) => {
                collector.add_dep(&dep);
                if let Value::Object(child) = &value {
                    collector.add_dep(child.dep());
                }
                value
            }
            None => {
                collector.add_dep(&self.inner.dep);
                Value::Undefined
            }
        }
    }

    /// Write `key`. Returns `true` if the stored value changed.
    ///
    /// Subscribers of the property run before this returns. Defining a new
    /// key notifies the object-level dep instead.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        let mut props = self.inner.props.borrow_mut();
        let (dep, _old) = match props.get_mut(key) {
            Some(prop) => {
                if same_value(&prop.value, &value) {
                    return false;
                }
                let old = std::mem::replace(&mut prop.value, value);
                (prop.dep.clone(), Some(old))
            }
            None => {
                props.insert(
                    key.to_owned(),
                    Property {
                        value,
                        dep: Dep::new(),
                    },
                );
                (self.inner.dep.clone(), None)
            }
        };
        drop(props);
        dep.notify();
        true
    }

    /// Delete `key`, returning its last value.
    ///
    /// Notifies the property's subscribers, then the object-level dep.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let removed = self.inner.props.borrow_mut().shift_remove(key)?;
        removed.dep.notify();
        self.inner.dep.notify();
        Some(removed.value)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.props.borrow().contains_key(key)
    }

    /// Own keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.props.borrow().keys().cloned().collect()
    }

    /// Snapshot of own properties in insertion order (untracked).
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.inner
            .props
            .borrow()
            .iter()
            .map(|(k, p)| (k.clone(), p.value.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.props.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.props.borrow().is_empty()
    }

    /// Export as a JSON object. See [`Value::to_json`].
    ///
    /// # Errors
    ///
    /// [`ReactiveError::Circular`] if the object contains itself.
    pub fn to_json(&self) -> Result<JsonValue, ReactiveError> {
        Value::Object(self.clone()).to_json()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ReactiveObject {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let obj = Self::new();
        {
            let mut props = obj.inner.props.borrow_mut();
            for (key, value) in iter {
                props.insert(
                    key.into(),
                    Property {
                        value: value.into(),
                        dep: Dep::new(),
                    },
                );
            }
        }
        obj
    }
}
