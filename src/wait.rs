//! Wait descriptors and the wait-condition evaluator.
//!
//! A suspended routine is always blocked on exactly one [`Wait`]. The kind
//! set is closed and dispatched exhaustively; descriptors the engine does
//! not interpret are represented by [`Wait::Opaque`] and treated as
//! immediately satisfied.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::coroutine::Coroutine;
use crate::routine::{Routine, RoutineRef};

/// Externally owned asynchronous operation the engine polls for completion.
///
/// The engine never drives the operation; it only reads the completion flag
/// once per tick while a routine is suspended on it.
pub trait AsyncOp {
    /// Whether the operation has completed.
    fn is_complete(&self) -> bool;
}

/// A fixed-duration wait with a lazily started clock.
///
/// The start timestamp is set the first time the evaluator observes the
/// wait, not when it is constructed, and is never reset afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedWait {
    duration: Duration,
    started: Option<Duration>,
}

impl TimedWait {
    /// Create a wait for `duration`, not yet started.
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            started: None,
        }
    }

    /// The configured wait duration.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// When the wait was first observed, if it has been.
    #[must_use]
    pub fn started(&self) -> Option<Duration> {
        self.started
    }

    /// Observe the wait at `now`: start the clock if unset, then report
    /// whether the duration has elapsed.
    pub(crate) fn observe(&mut self, now: Duration) -> bool {
        let started = *self.started.get_or_insert(now);
        now.saturating_sub(started) >= self.duration
    }
}

/// The condition a routine is currently suspended on.
#[derive(Default)]
pub enum Wait {
    /// Nothing to wait for; the routine is immediately resumable.
    #[default]
    None,
    /// A nested routine. The stack walker descends into it and drives it
    /// within the parent coroutine's tick rather than polling it.
    Routine(RoutineRef),
    /// An independently registered coroutine; satisfied once it reports
    /// done. A coroutine stopped before finishing never reports done, so a
    /// waiter on its handle never resumes.
    Coroutine(Coroutine),
    /// A fixed delay; satisfied once the lazily started clock elapses.
    Timer(TimedWait),
    /// An external asynchronous operation; satisfied once it reports
    /// complete.
    Async(Rc<dyn AsyncOp>),
    /// A descriptor the engine does not interpret. Treated as immediately
    /// satisfied: tick-for-tick equivalent to [`Wait::None`]. This fail-open
    /// policy is deliberate, not a defect.
    Opaque,
}

impl Wait {
    /// Suspend on a nested routine.
    ///
    /// The nesting forms a chain: a routine may be the active child of at
    /// most one suspended parent at a time.
    #[must_use]
    pub fn routine(routine: impl Routine + 'static) -> Self {
        let routine: RoutineRef = Rc::new(RefCell::new(routine));
        Wait::Routine(routine)
    }

    /// Suspend until `handle` reports done.
    #[must_use]
    pub fn coroutine(handle: &Coroutine) -> Self {
        Wait::Coroutine(handle.clone())
    }

    /// Suspend for a fixed `duration`, measured from first observation.
    #[must_use]
    pub fn timer(duration: Duration) -> Self {
        Wait::Timer(TimedWait::new(duration))
    }

    /// Suspend until an external operation reports complete.
    #[must_use]
    pub fn external(op: Rc<dyn AsyncOp>) -> Self {
        Wait::Async(op)
    }
}

impl fmt::Debug for Wait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Wait::None => f.write_str("None"),
            Wait::Routine(_) => f.write_str("Routine(..)"),
            Wait::Coroutine(_) => f.write_str("Coroutine(..)"),
            Wait::Timer(timer) => f.debug_tuple("Timer").field(timer).finish(),
            Wait::Async(_) => f.write_str("Async(..)"),
            Wait::Opaque => f.write_str("Opaque"),
        }
    }
}

/// Whether `wait` is satisfied at `now`.
///
/// The only side effect is the one-time start of a [`TimedWait`] clock;
/// every other kind is evaluated purely.
pub fn is_satisfied(wait: &mut Wait, now: Duration) -> bool {
    match wait {
        Wait::None | Wait::Opaque => true,
        // The stack walker only re-evaluates a parent after its child ran to
        // completion, so a nested-routine descriptor reaching the evaluator
        // is already drained.
        Wait::Routine(_) => true,
        Wait::Coroutine(handle) => handle.is_done(),
        Wait::Timer(timer) => timer.observe(now),
        Wait::Async(op) => op.is_complete(),
    }
}
