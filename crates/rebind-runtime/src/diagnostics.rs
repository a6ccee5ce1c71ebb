#![forbid(unsafe_code)]

//! Diagnostics channel for isolated failures.
//!
//! Reaction failures, update loops, and failed write-backs never abort a
//! notification. They are reported here instead: each report emits a
//! `WARN` tracing event, is appended to a bounded per-thread ring, and is
//! passed to an optional hook installed by the host.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Ring full | More reports than `diagnostics_capacity` | Oldest entry dropped |
//! | Hook reports again | Hook triggers another failure | Nested report is logged, hook not re-entered |
//! | Hook panics | Host hook unwinds | Panic propagates; later reports reach the hook again |

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::RuntimeConfig;
use crate::error::ReactiveError;

static REACTION_FAILURES_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Total number of reaction failures reported on any thread.
#[must_use]
pub fn reaction_failures_total() -> u64 {
    REACTION_FAILURES_TOTAL.load(Ordering::Relaxed)
}

/// A reported failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Per-thread report sequence number, starting at 0.
    pub seq: u64,
    /// What went wrong.
    pub error: ReactiveError,
}

type Hook = Rc<dyn Fn(&Diagnostic)>;

#[derive(Default)]
struct DiagnosticLog {
    entries: VecDeque<Diagnostic>,
    next_seq: u64,
}

thread_local! {
    static LOG: RefCell<DiagnosticLog> = RefCell::new(DiagnosticLog::default());
    static HOOK: RefCell<Option<Hook>> = const { RefCell::new(None) };
    static IN_HOOK: Cell<bool> = const { Cell::new(false) };
}

/// Report an isolated failure.
pub fn report(error: ReactiveError) {
    tracing::warn!(target: "rebind::diagnostics", error = %error, "binding did not update");
    if matches!(error, ReactiveError::Reaction { .. }) {
        REACTION_FAILURES_TOTAL.fetch_add(1, Ordering::Relaxed);
    }

    let capacity = RuntimeConfig::current().diagnostics_capacity;
    let diagnostic = LOG.with(|log| {
        let mut log = log.borrow_mut();
        let diagnostic = Diagnostic {
            seq: log.next_seq,
            error,
        };
        log.next_seq += 1;
        if capacity > 0 {
            while log.entries.len() >= capacity {
                log.entries.pop_front();
            }
            log.entries.push_back(diagnostic.clone());
        }
        diagnostic
    });

    let hook = HOOK.with(|h| h.borrow().clone());
    if let Some(hook) = hook {
        let Some(_guard) = HookGuard::enter() else {
            return;
        };
        hook(&diagnostic);
    }
}

/// Marks the hook as running until dropped, including on unwind.
struct HookGuard;

impl HookGuard {
    fn enter() -> Option<Self> {
        if IN_HOOK.with(|f| f.replace(true)) {
            None
        } else {
            Some(Self)
        }
    }
}

impl Drop for HookGuard {
    fn drop(&mut self) {
        IN_HOOK.with(|f| f.set(false));
    }
}

/// Drain all retained diagnostics for the current thread, oldest first.
#[must_use]
pub fn take_diagnostics() -> Vec<Diagnostic> {
    LOG.with(|log| log.borrow_mut().entries.drain(..).collect())
}

/// Number of retained diagnostics for the current thread.
#[must_use]
pub fn diagnostics_len() -> usize {
    LOG.with(|log| log.borrow().entries.len())
}

/// Install a hook called with every report on the current thread.
pub fn set_diagnostic_hook(hook: impl Fn(&Diagnostic) + 'static) {
    HOOK.with(|h| *h.borrow_mut() = Some(Rc::new(hook)));
}

/// Remove the hook installed on the current thread.
pub fn clear_diagnostic_hook() {
    HOOK.with(|h| *h.borrow_mut() = None);
}
