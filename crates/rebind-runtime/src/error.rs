//! Error types for the reactive runtime.
//!
//! None of these errors abort a write. Reads through missing segments yield
//! [`Value::Undefined`](crate::reactive::Value::Undefined); everything else is
//! isolated and routed to the [diagnostics](crate::diagnostics) channel so a
//! single broken binding degrades to "did not update".

use std::fmt;

use crate::reactive::dep::{DepId, SubscriberId};
use crate::reactive::observer::ObjectId;

/// Failure reported by a watcher reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionError {
    message: String,
}

impl ReactionError {
    /// Create a reaction error with a human-readable message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ReactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ReactionError {}

impl From<String> for ReactionError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ReactionError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Errors produced by the reactive core.
#[derive(Debug, Clone, PartialEq)]
pub enum ReactiveError {
    /// An assignment walked through a segment that is not an object.
    UnresolvablePath {
        /// The full dotted expression.
        path: String,
        /// The first segment whose value was not an object.
        segment: String,
    },
    /// A watcher reaction returned an error. Remaining subscribers still ran.
    Reaction {
        /// The failing watcher.
        watcher: SubscriberId,
        /// Expression the watcher evaluates.
        expression: String,
        /// The error returned by the reaction.
        source: ReactionError,
    },
    /// A dep kept being re-notified from inside its own notification.
    UpdateLoop {
        /// The dep that hit the bound.
        dep: DepId,
        /// Number of extra passes that ran before giving up.
        passes: u32,
    },
    /// A watcher kept invalidating itself from inside its own reaction.
    WatcherLoop {
        /// The watcher that hit the bound.
        watcher: SubscriberId,
        /// Expression the watcher evaluates.
        expression: String,
        /// Number of extra passes that ran before giving up.
        passes: u32,
    },
    /// The object graph contains a cycle and cannot be exported as JSON.
    Circular {
        /// The object reached a second time on the same branch.
        object: ObjectId,
    },
}

impl fmt::Display for ReactiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvablePath { path, segment } => {
                write!(f, "cannot resolve '{path}': '{segment}' is not an object")
            }
            Self::Reaction {
                watcher,
                expression,
                source,
            } => write!(
                f,
                "reaction of watcher {} on '{expression}' failed: {source}",
                watcher.raw()
            ),
            Self::UpdateLoop { dep, passes } => write!(
                f,
                "dep {} re-notified itself {passes} times; possible infinite update loop",
                dep.raw()
            ),
            Self::WatcherLoop {
                watcher,
                expression,
                passes,
            } => write!(
                f,
                "watcher {} on '{expression}' re-triggered itself {passes} times; possible infinite update loop",
                watcher.raw()
            ),
            Self::Circular { object } => {
                write!(f, "object {} is part of a cycle", object.raw())
            }
        }
    }
}

impl std::error::Error for ReactiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Reaction { source, .. } => Some(source),
            _ => None,
        }
    }
}
