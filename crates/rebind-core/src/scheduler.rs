//! Cooperative, single-threaded task scheduling with explicit cancellation.
//!
//! A [`Scheduler`] is a queue of deferred closures keyed by due time. The
//! host's event loop calls [`Scheduler::run_due`] once per turn; every task
//! whose due time has passed runs, in due-time order (FIFO among equal due
//! times). Nothing runs on another thread and nothing runs implicitly.
//!
//! Scheduling returns a [`TaskHandle`]. Cancelling it before the task runs
//! guarantees the closure is dropped without being called. Dropping the
//! handle does **not** cancel the task: cancellation is always explicit.
//!
//! # Invariants
//!
//! 1. A cancelled task never runs.
//! 2. A task runs at most once.
//! 3. Tasks scheduled from inside a running task never run in the same
//!    `run_due` call, even with a zero delay (they belong to the next turn).
//!
//! # Example
//!
//! ```
//! use rebind_core::clock::{Clock, LabClock};
//! use rebind_core::scheduler::Scheduler;
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use web_time::Duration;
//!
//! let lab = LabClock::new();
//! let scheduler = Scheduler::new(Clock::lab(&lab));
//! let fired = Rc::new(Cell::new(false));
//! let f = Rc::clone(&fired);
//! let _handle = scheduler.schedule(Duration::from_millis(10), move || f.set(true));
//!
//! assert_eq!(scheduler.run_due(), 0);
//! lab.advance(Duration::from_millis(10));
//! assert_eq!(scheduler.run_due(), 1);
//! assert!(fired.get());
//! ```

use std::cell::{Cell, RefCell};
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use web_time::{Duration, Instant};

use crate::clock::Clock;

#[cfg(feature = "tracing")]
use crate::logging::{debug, trace};
#[cfg(not(feature = "tracing"))]
use crate::{debug, trace};

// ─── Metrics counters ────────────────────────────────────────────────────────

static TASKS_CANCELLED_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Total number of scheduled tasks cancelled before running (diagnostics).
#[must_use]
pub fn tasks_cancelled_total() -> u64 {
    TASKS_CANCELLED_TOTAL.load(Ordering::Relaxed)
}

// ─── Task state ──────────────────────────────────────────────────────────────

/// Identifier of a scheduled task, unique within its scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Raw sequence number.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct TaskState {
    id: TaskId,
    due: Instant,
    cancelled: Cell<bool>,
    finished: Cell<bool>,
}

/// Handle to a scheduled task.
///
/// Cheap to clone; all clones refer to the same task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    state: Rc<TaskState>,
}

impl TaskHandle {
    /// Identifier of the task.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.state.id
    }

    /// When the task becomes eligible to run.
    #[must_use]
    pub fn due(&self) -> Instant {
        self.state.due
    }

    /// Cancel the task. Returns `true` if this call prevented it from running.
    ///
    /// Cancelling a task that already ran, or was already cancelled, is a
    /// no-op returning `false`.
    pub fn cancel(&self) -> bool {
        if self.state.finished.get() || self.state.cancelled.replace(true) {
            return false;
        }
        TASKS_CANCELLED_TOTAL.fetch_add(1, Ordering::Relaxed);
        trace!(task = self.state.id.0, "task cancelled");
        true
    }

    /// Whether the task was cancelled before running.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.get()
    }

    /// Whether the task already ran.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.finished.get()
    }

    /// Whether the task is still waiting to run.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.is_cancelled() && !self.is_finished()
    }
}

// ─── Queue entries ───────────────────────────────────────────────────────────

struct Entry {
    state: Rc<TaskState>,
    task: Box<dyn FnOnce()>,
}

impl Entry {
    fn key(&self) -> (Instant, TaskId) {
        (self.state.due, self.state.id)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed: BinaryHeap is a max-heap and the earliest task must pop first.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other.key().cmp(&self.key())
    }
}

// ─── Scheduler ───────────────────────────────────────────────────────────────

struct SchedulerInner {
    clock: Clock,
    queue: RefCell<BinaryHeap<Entry>>,
    next_id: Cell<u64>,
    executed: Cell<u64>,
}

/// Single-threaded deferred task queue.
///
/// Cloning a `Scheduler` creates another handle to the **same** queue.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("clock", &self.inner.clock)
            .field("queued", &self.inner.queue.borrow().len())
            .field("executed", &self.inner.executed.get())
            .finish()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Clock::Real)
    }
}

impl Scheduler {
    /// Create an empty scheduler reading time from `clock`.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                clock,
                queue: RefCell::new(BinaryHeap::new()),
                next_id: Cell::new(0),
                executed: Cell::new(0),
            }),
        }
    }

    /// The clock this scheduler reads.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.inner.clock
    }

    /// Current time according to the scheduler's clock.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.inner.clock.now()
    }

    /// Schedule `task` to run once `delay` has elapsed.
    pub fn schedule(&self, delay: Duration, task: impl FnOnce() + 'static) -> TaskHandle {
        let id = TaskId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        let state = Rc::new(TaskState {
            id,
            due: self.now() + delay,
            cancelled: Cell::new(false),
            finished: Cell::new(false),
        });
        self.inner.queue.borrow_mut().push(Entry {
            state: Rc::clone(&state),
            task: Box::new(task),
        });
        trace!(task = id.0, delay_us = delay.as_micros() as u64, "task scheduled");
        TaskHandle { state }
    }

    /// Run every task that is due now. Returns the number of tasks executed.
    ///
    /// Cancelled tasks are discarded without running. Tasks scheduled while
    /// this call is running wait for the next call.
    pub fn run_due(&self) -> usize {
        let now = self.now();
        let id_limit = self.inner.next_id.get();
        let mut ran = 0usize;
        loop {
            let entry = {
                let mut queue = self.inner.queue.borrow_mut();
                match queue.peek() {
                    Some(top) if top.state.due <= now && top.state.id.0 < id_limit => queue.pop(),
                    Some(top) if top.state.cancelled.get() => queue.pop(),
                    _ => None,
                }
            };
            let Some(entry) = entry else {
                break;
            };
            if entry.state.cancelled.get() {
                continue;
            }
            entry.state.finished.set(true);
            // The queue borrow is released: the task may schedule more work.
            (entry.task)();
            ran += 1;
        }
        if ran > 0 {
            self.inner
                .executed
                .set(self.inner.executed.get() + ran as u64);
            debug!(ran, "scheduler turn");
        }
        ran
    }

    /// Due time of the earliest task that has not been cancelled.
    #[must_use]
    pub fn next_due(&self) -> Option<Instant> {
        self.inner
            .queue
            .borrow()
            .iter()
            .filter(|e| !e.state.cancelled.get())
            .map(|e| e.state.due)
            .min()
    }

    /// Number of queued tasks that are still waiting to run.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner
            .queue
            .borrow()
            .iter()
            .filter(|e| !e.state.cancelled.get())
            .count()
    }

    /// Whether no task is waiting to run.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending_count() == 0
    }

    /// Total number of tasks executed by this scheduler.
    #[must_use]
    pub fn executed_total(&self) -> u64 {
        self.inner.executed.get()
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Scheduler {
    /// Scheduler driven by a fresh [`LabClock`](crate::clock::LabClock).
    ///
    /// Returns the clock so the caller can advance time.
    #[must_use]
    pub fn lab() -> (crate::clock::LabClock, Self) {
        let lab = crate::clock::LabClock::new();
        let scheduler = Self::new(Clock::lab(&lab));
        (lab, scheduler)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
