#![forbid(unsafe_code)]

//! Runtime configuration.
//!
//! [`RuntimeConfig`] bounds the re-entrancy guards and the diagnostics ring.
//! Reactive code is single-threaded, so the active configuration is stored
//! per thread: [`RuntimeConfig::install`] replaces it and
//! [`RuntimeConfig::current`] reads it.
//!
//! A thread starts from [`RuntimeConfig::from_env`], read the first time it
//! touches the runtime. The variables are:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `REBIND_MAX_UPDATE_PASSES` | [`max_update_passes`](RuntimeConfig::max_update_passes) |
//! | `REBIND_DIAGNOSTICS_CAPACITY` | [`diagnostics_capacity`](RuntimeConfig::diagnostics_capacity) |

use std::cell::Cell;

/// Environment variable overriding [`RuntimeConfig::max_update_passes`].
pub const ENV_MAX_UPDATE_PASSES: &str = "REBIND_MAX_UPDATE_PASSES";
/// Environment variable overriding [`RuntimeConfig::diagnostics_capacity`].
pub const ENV_DIAGNOSTICS_CAPACITY: &str = "REBIND_DIAGNOSTICS_CAPACITY";

thread_local! {
    static CURRENT: Cell<RuntimeConfig> = Cell::new(RuntimeConfig::from_env());
}

/// Configuration of the reactive runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Maximum number of extra notification passes a dep (or a watcher) runs
    /// when it is re-triggered from inside its own notification. Exceeding it
    /// is reported as an update loop. Default: 100. Never below 1.
    pub max_update_passes: u32,
    /// Number of diagnostics retained before the oldest are dropped.
    /// Default: 64.
    pub diagnostics_capacity: usize,
}

impl RuntimeConfig {
    const DEFAULT: Self = Self {
        max_update_passes: 100,
        diagnostics_capacity: 64,
    };

    /// Set the update pass bound (clamped to at least 1).
    #[must_use]
    pub fn with_max_update_passes(mut self, passes: u32) -> Self {
        self.max_update_passes = passes.max(1);
        self
    }

    /// Set the diagnostics ring capacity.
    #[must_use]
    pub fn with_diagnostics_capacity(mut self, capacity: usize) -> Self {
        self.diagnostics_capacity = capacity;
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
        if let Some(val) = lookup(ENV_MAX_UPDATE_PASSES)
            && let Ok(n) = val.trim().parse()
        {
            config = config.with_max_update_passes(n);
        }
        if let Some(val) = lookup(ENV_DIAGNOSTICS_CAPACITY)
            && let Ok(n) = val.trim().parse()
        {
            config = config.with_diagnostics_capacity(n);
        }
        config
    }

    /// Make this the active configuration for the current thread.
    /// Returns the previously active configuration.
    pub fn install(self) -> Self {
        CURRENT.with(|c| c.replace(self))
    }

    /// The active configuration for the current thread. Until something is
    /// installed this is [`RuntimeConfig::from_env`].
    #[must_use]
    pub fn current() -> Self {
        CURRENT.with(Cell::get)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
