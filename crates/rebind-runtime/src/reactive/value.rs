#![forbid(unsafe_code)]

//! Dynamic values stored in reactive objects.
//!
//! [`Value`] mirrors the JSON data model plus `Undefined` (the result of
//! reading a missing key). Objects are [`ReactiveObject`] handles with shared
//! identity; arrays are immutable shared slices and are not intercepted.
//!
//! # Equality
//!
//! [`same_value`] is the change test used by every write and every watcher:
//! strict equality, except that `NaN` equals `NaN`. Objects and arrays compare
//! by identity, strings by content, and `+0` equals `-0`. `PartialEq` for
//! `Value` follows the same rule.

use std::fmt;
use std::rc::Rc;

use serde_json::Value as JsonValue;

use super::observer::{ObjectId, ReactiveObject};
use crate::error::ReactiveError;

/// Largest integer an `f64` represents exactly (2^53).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A dynamic value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Result of reading a missing key or resolving through a non-object.
    #[default]
    Undefined,
    /// JSON `null`.
    Null,
    /// Boolean.
    Bool(bool),
    /// IEEE-754 double.
    Number(f64),
    /// Immutable shared string.
    String(Rc<str>),
    /// Immutable shared array. Elements are not intercepted.
    Array(Rc<[Value]>),
    /// Reactive object handle.
    Object(ReactiveObject),
}

/// Whether writing `b` over `a` is a no-op.
#[must_use]
pub fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => Rc::ptr_eq(x, y),
        (Value::Object(x), Value::Object(y)) => x.ptr_eq(y),
        _ => false,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        same_value(self, other)
    }
}

impl Value {
    /// Whether this is [`Value::Undefined`].
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Whether this is [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ReactiveObject> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Short name of the variant, for messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Export as JSON.
    ///
    /// `Undefined` properties are omitted; `Undefined` elsewhere and
    /// non-finite numbers become `null`. Integral numbers within the safe
    /// integer range are emitted as integers.
    ///
    /// # Errors
    ///
    /// [`ReactiveError::Circular`] if an object contains itself.
    pub fn to_json(&self) -> Result<JsonValue, ReactiveError> {
        let mut stack = Vec::new();
        self.to_json_inner(&mut stack)
    }

    fn to_json_inner(&self, stack: &mut Vec<ObjectId>) -> Result<JsonValue, ReactiveError> {
        Ok(match self {
            Self::Undefined | Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Number(n) => number_to_json(*n),
            Self::String(s) => JsonValue::String(s.to_string()),
            Self::Array(items) => JsonValue::Array(
                items
                    .iter()
                    .map(|item| item.to_json_inner(stack))
                    .collect::<Result<_, _>>()?,
            ),
            Self::Object(obj) => {
                let id = obj.id();
                if stack.contains(&id) {
                    return Err(ReactiveError::Circular { object: id });
                }
                stack.push(id);
                let mut map = serde_json::Map::new();
                for (key, value) in obj.entries() {
                    if value.is_undefined() {
                        continue;
                    }
                    map.insert(key, value.to_json_inner(stack)?);
                }
                stack.pop();
                JsonValue::Object(map)
            }
        })
    }
}

fn number_to_json(n: f64) -> JsonValue {
    if !n.is_finite() {
        return JsonValue::Null;
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return JsonValue::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
}

fn fmt_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n.is_infinite() {
        f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n == 0.0 {
        f.write_str("0")
    } else if !(1e-6..1e21).contains(&n.abs()) {
        // Exponent form outside [1e-6, 1e21), with an explicit `+` sign.
        let text = format!("{n:e}");
        match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => write!(f, "{mantissa}e+{exp}"),
            _ => f.write_str(&text),
        }
    } else {
        write!(f, "{n}")
    }
}

/// Renders the way a template shows a value: `1` not `1.0`, arrays joined
/// with `,`, objects as `[object Object]`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => fmt_number(*n, f),
            Self::String(s) => f.write_str(s),
            Self::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    // Holes and nulls join as empty strings.
                    if !matches!(item, Self::Undefined | Self::Null) {
                        write!(f, "{item}")?;
                    }
                }
                Ok(())
            }
            Self::Object(_) => f.write_str("[object Object]"),
        }
    }
}

// ─── Conversions ─────────────────────────────────────────────────────────────

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(Rc::from(s))
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Self::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(Rc::from(items))
    }
}

impl From<ReactiveObject> for Value {
    fn from(obj: ReactiveObject) -> Self {
        Self::Object(obj)
    }
}

impl From<&ReactiveObject> for Value {
    fn from(obj: &ReactiveObject) -> Self {
        Self::Object(obj.clone())
    }
}

/// Nested JSON objects become reactive objects.
impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => Self::String(Rc::from(s)),
            JsonValue::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            JsonValue::Object(map) => Self::Object(map.into_iter().collect()),
        }
    }
}
