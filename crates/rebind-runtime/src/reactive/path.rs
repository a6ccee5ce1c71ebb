#![forbid(unsafe_code)]

//! Dotted path expressions (`"user.address.city"`).
//!
//! Segments are split on `.` and trimmed. A segment applied to an array is an
//! index (`"list.0.name"`). Reads resolve softly: walking through anything
//! that is not an object or array yields [`Value::Undefined`]. Writes walk
//! the intermediate segments untracked and assign the last one, which must
//! be a key of an object.

use super::collector::Collector;
use super::observer::ReactiveObject;
use super::value::Value;
use crate::error::ReactiveError;

/// A parsed dotted path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    raw: String,
    segments: Vec<String>,
}

impl Path {
    /// Parse `expr`. Never fails; an empty expression is a single empty key.
    #[must_use]
    pub fn parse(expr: &str) -> Self {
        Self {
            raw: expr.to_owned(),
            segments: expr.split('.').map(|s| s.trim().to_owned()).collect(),
        }
    }

    /// The expression as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Resolve against `root`. Every lookup is a tracked read when a
    /// collector is given.
    pub fn resolve(&self, root: &ReactiveObject, mut collector: Option<&mut Collector>) -> Value {
        let mut current = Value::Object(root.clone());
        for segment in &self.segments {
            if !is_container(&current) {
                return Value::Undefined;
            }
            current = step(&current, segment, collector.as_deref_mut());
        }
        current
    }

    /// Assign `value` at this path. Returns whether the stored value changed.
    ///
    /// # Errors
    ///
    /// [`ReactiveError::UnresolvablePath`] if an intermediate segment does
    /// not lead to an object or array, or if the container of the last key
    /// is not an object. Array elements are reached by index but never
    /// assigned themselves.
    pub fn assign(&self, root: &ReactiveObject, value: impl Into<Value>) -> Result<bool, ReactiveError> {
        let Some((last, parents)) = self.segments.split_last() else {
            return Ok(false);
        };
        let mut current = Value::Object(root.clone());
        for segment in parents {
            current = step(&current, segment, None);
            if !is_container(&current) {
                return Err(self.unresolvable(segment));
            }
        }
        match current {
            Value::Object(target) => Ok(target.set(last, value)),
            _ => Err(self.unresolvable(parents.last().map_or("", String::as_str))),
        }
    }

    fn unresolvable(&self, segment: &str) -> ReactiveError {
        ReactiveError::UnresolvablePath {
            path: self.raw.clone(),
            segment: segment.to_owned(),
        }
    }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// One lookup. Keys index objects; canonical decimal indices index arrays.
fn step(current: &Value, segment: &str, collector: Option<&mut Collector>) -> Value {
    match current {
        Value::Object(obj) => obj.get_in(segment, collector),
        Value::Array(items) => {
            // Arrays are immutable; the read is tracked by the dep of the
            // property that holds the array.
            let item = array_index(segment)
                .and_then(|i| items.get(i))
                .cloned()
                .unwrap_or_default();
            if let (Value::Object(child), Some(c)) = (&item, collector) {
                c.add_dep(child.dep());
            }
            item
        }
        _ => Value::Undefined,
    }
}

fn array_index(segment: &str) -> Option<usize> {
    let index: usize = segment.parse().ok()?;
    (index.to_string() == segment).then_some(index)
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Untracked read of `expr` from `root`.
#[must_use]
pub fn get_path(root: &ReactiveObject, expr: &str) -> Value {
    Path::parse(expr).resolve(root, None)
}

/// Assign `value` at `expr` under `root`.
///
/// # Errors
///
/// See [`Path::assign`].
pub fn set_path(root: &ReactiveObject, expr: &str, value: impl Into<Value>) -> Result<bool, ReactiveError> {
    Path::parse(expr).assign(root, value)
}
