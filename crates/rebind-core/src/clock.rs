//! Time sources for scheduling.
//!
//! [`Clock`] is either the real wall clock (`web_time::Instant::now()`) or a
//! [`LabClock`] whose time only moves when a test advances it. Every
//! component that needs "now" takes a `Clock`, so debounce windows and task
//! deadlines can be exercised deterministically.
//!
//! # Example
//!
//! ```
//! use rebind_core::clock::{Clock, LabClock};
//! use web_time::Duration;
//!
//! let lab = LabClock::new();
//! let clock = Clock::lab(&lab);
//! let t0 = clock.now();
//! lab.advance(Duration::from_millis(30));
//! assert_eq!(clock.now().duration_since(t0), Duration::from_millis(30));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use web_time::{Duration, Instant};

/// A manually-advanceable clock for deterministic tests.
///
/// All clones share the same offset, so every [`Clock`] built from the same
/// `LabClock` sees the same time.
#[derive(Debug, Clone)]
pub struct LabClock {
    epoch: Instant,
    offset_us: Arc<AtomicU64>,
}

impl LabClock {
    /// Create a new lab clock starting at `Instant::now()`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            offset_us: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Advance the lab clock by `delta`.
    pub fn advance(&self, delta: Duration) {
        let us = delta.as_micros().min(u64::MAX as u128) as u64;
        self.offset_us.fetch_add(us, Ordering::Release);
    }

    /// Time elapsed since the clock was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.offset_us.load(Ordering::Acquire))
    }

    /// Current lab time.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.epoch + self.elapsed()
    }
}

impl Default for LabClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Time source used by the scheduler and debouncers.
#[derive(Debug, Clone, Default)]
pub enum Clock {
    /// Real wall-clock time.
    #[default]
    Real,
    /// Deterministic lab clock for testing.
    Lab(LabClock),
}

impl Clock {
    /// Clock backed by a shared [`LabClock`].
    #[must_use]
    pub fn lab(clock: &LabClock) -> Self {
        Self::Lab(clock.clone())
    }

    /// Current time according to this source.
    #[must_use]
    pub fn now(&self) -> Instant {
        match self {
            Self::Real => Instant::now(),
            Self::Lab(c) => c.now(),
        }
    }

    /// Whether this clock is a lab clock.
    #[inline]
    #[must_use]
    pub fn is_lab(&self) -> bool {
        matches!(self, Self::Lab(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lab_clock_starts_at_zero_offset() {
        let clock = LabClock::new();
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn lab_clock_advance_accumulates() {
        let clock = LabClock::new();
        let t0 = clock.now();
        clock.advance(Duration::from_millis(100));
        clock.advance(Duration::from_millis(200));
        assert_eq!(clock.now().duration_since(t0), Duration::from_millis(300));
    }

    #[test]
    fn clones_share_time() {
        let clock = LabClock::new();
        let other = clock.clone();
        clock.advance(Duration::from_millis(7));
        assert_eq!(other.elapsed(), Duration::from_millis(7));
    }

    #[test]
    fn clock_reports_source() {
        let lab = LabClock::new();
        assert!(Clock::lab(&lab).is_lab());
        assert!(!Clock::Real.is_lab());
        assert!(!Clock::default().is_lab());
    }

    #[test]
    fn lab_clock_does_not_move_on_its_own() {
        let lab = LabClock::new();
        let clock = Clock::lab(&lab);
        let a = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert_eq!(clock.now(), a);
    }

    #[test]
    fn real_clock_is_monotonic() {
        let clock = Clock::Real;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
