#![forbid(unsafe_code)]

//! Cancel-on-supersede debouncing.
//!
//! A [`Debouncer`] owns one slot. Each [`call`](Debouncer::call) cancels the
//! task in the slot (if still pending) and schedules the new one after the
//! quiet period, so only the latest call in a burst runs. Dropping the
//! debouncer cancels whatever is pending.

use std::cell::{Cell, RefCell};

use rebind_core::scheduler::{Scheduler, TaskHandle};
use tracing::trace;
use web_time::Duration;

/// Single-slot debouncer on a [`Scheduler`].
pub struct Debouncer {
    scheduler: Scheduler,
    delay: Duration,
    slot: RefCell<Option<TaskHandle>>,
    superseded: Cell<u64>,
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.is_pending())
            .field("superseded", &self.superseded.get())
            .finish()
    }
}

impl Debouncer {
    #[must_use]
    pub fn new(scheduler: Scheduler, delay: Duration) -> Self {
        Self {
            scheduler,
            delay,
            slot: RefCell::new(None),
            superseded: Cell::new(0),
        }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `task` after the quiet period, cancelling the pending one.
    pub fn call(&self, task: impl FnOnce() + 'static) {
        let handle = self.scheduler.schedule(self.delay, task);
        let previous = self.slot.borrow_mut().replace(handle);
        if let Some(previous) = previous
            && previous.cancel()
        {
            self.superseded.set(self.superseded.get() + 1);
            trace!(task = previous.id().raw(), "debounced task superseded");
        }
    }

    /// Cancel the pending task. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        self.slot
            .borrow_mut()
            .take()
            .is_some_and(|handle| handle.cancel())
    }

    /// Whether a scheduled task is still waiting to run.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.slot
            .borrow()
            .as_ref()
            .is_some_and(TaskHandle::is_pending)
    }

    /// Number of tasks cancelled because a newer call replaced them.
    #[must_use]
    pub fn superseded_count(&self) -> u64 {
        self.superseded.get()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(handle) = self.slot.get_mut().take() {
            handle.cancel();
        }
    }
}
