//! Logging macros that compile to nothing without the `tracing` feature.
//!
//! Call sites import from here when the feature is on and from the crate
//! root when it is off:
//!
//! ```ignore
//! #[cfg(feature = "tracing")]
//! use crate::logging::debug;
//! #[cfg(not(feature = "tracing"))]
//! use crate::debug;
//! ```

#[cfg(feature = "tracing")]
pub use tracing::{debug, trace};

/// No-op stand-in for `tracing::trace!`.
#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// No-op stand-in for `tracing::debug!`.
#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
