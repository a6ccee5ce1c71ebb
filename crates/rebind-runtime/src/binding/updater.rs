#![forbid(unsafe_code)]

//! Directive updaters and the view-node boundary.
//!
//! The runtime never touches a real view. It writes rendered strings through
//! [`ViewNode`], which the host implements for its widgets or DOM handles.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::reactive::Value;

/// Identity of a view node, assigned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// A node a binding can render into.
pub trait ViewNode {
    /// Stable identity used for edit-focus tracking.
    fn node_id(&self) -> NodeId;

    /// Replace the node's text content.
    fn set_text(&mut self, text: &str);

    /// Replace the node's inner markup.
    fn set_html(&mut self, html: &str);

    /// Set the displayed value of an input-like node.
    fn set_value(&mut self, value: &str);

    /// The displayed value of an input-like node.
    fn value(&self) -> String;

    /// Replace the node's class list. Nodes without classes ignore it.
    fn set_class(&mut self, _class: &str) {}
}

/// Shared handle to a view node.
pub type NodeRef = Rc<RefCell<dyn ViewNode>>;

/// Errors from the binding layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// The directive name is not one of `text`, `html`, `class`, `model`.
    UnknownDirective(String),
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDirective(name) => write!(f, "unknown directive '{name}'"),
        }
    }
}

impl std::error::Error for BindingError {}

/// What a binding renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// Text content.
    Text,
    /// Inner markup.
    Html,
    /// Class list.
    Class,
    /// Displayed value of an input.
    Model,
}

/// Prefix marking a directive attribute on a view node.
pub const ATTRIBUTE_PREFIX: &str = "x-";

impl Directive {
    /// Parse a directive name, with or without the `x-` attribute prefix.
    ///
    /// # Errors
    ///
    /// [`BindingError::UnknownDirective`] for any other name.
    pub fn parse(name: &str) -> Result<Self, BindingError> {
        let bare = name.trim();
        let bare = bare.strip_prefix(ATTRIBUTE_PREFIX).unwrap_or(bare);
        match bare {
            "text" => Ok(Self::Text),
            "html" => Ok(Self::Html),
            "class" => Ok(Self::Class),
            "model" => Ok(Self::Model),
            _ => Err(BindingError::UnknownDirective(name.to_owned())),
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Html => "html",
            Self::Class => "class",
            Self::Model => "model",
        }
    }

    /// Render `value` into `node`. Returns `false` if the node was skipped.
    ///
    /// The model updater skips the node that currently has edit focus.
    pub fn apply(self, node: &NodeRef, value: &Value, focus: &EditFocus) -> bool {
        let rendered = render_text(value);
        match self {
            Self::Text => node.borrow_mut().set_text(&rendered),
            Self::Html => node.borrow_mut().set_html(&rendered),
            Self::Class => node.borrow_mut().set_class(&rendered),
            Self::Model => {
                let id = node.borrow().node_id();
                if focus.is_editing(id) {
                    return false;
                }
                node.borrow_mut().set_value(&rendered);
            }
        }
        true
    }
}

impl FromStr for Directive {
    type Err = BindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Text shown for a value. `Undefined` renders as the empty string.
#[must_use]
pub fn render_text(value: &Value) -> String {
    match value {
        Value::Undefined => String::new(),
        other => other.to_string(),
    }
}

/// Which node, if any, the user is currently typing into.
///
/// Shared by every binding of a scope. Cloning shares the slot.
#[derive(Debug, Clone, Default)]
pub struct EditFocus {
    slot: Rc<Cell<Option<NodeId>>>,
}

impl EditFocus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `node` as being edited.
    pub fn begin(&self, node: NodeId) {
        self.slot.set(Some(node));
    }

    /// Clear focus if `node` holds it. Returns whether it did.
    pub fn end(&self, node: NodeId) -> bool {
        if self.slot.get() == Some(node) {
            self.slot.set(None);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn is_editing(&self, node: NodeId) -> bool {
        self.slot.get() == Some(node)
    }

    #[must_use]
    pub fn current(&self) -> Option<NodeId> {
        self.slot.get()
    }
}
