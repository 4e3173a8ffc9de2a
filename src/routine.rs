//! The step-computation seam between the engine and host code.
//!
//! A [`Routine`] is a suspendable sequence of steps: it reports the wait
//! descriptor it is currently suspended on and advances by exactly one step
//! when asked. The engine drives routines once per tick; host step logic
//! runs synchronously inside the tick callback.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::wait::Wait;

/// Shared handle to a routine.
///
/// Routines are held behind shared interior-mutable handles so a suspension
/// chain can be walked with an explicit stack: the parent's wait descriptor
/// owns one handle to the child while the walker holds another.
pub type RoutineRef = Rc<RefCell<dyn Routine>>;

/// A suspendable step computation.
///
/// Contract:
/// - a routine is constructed already suspended on its first wait
///   descriptor ([`Wait::None`] if it has none);
/// - [`advance`](Routine::advance) runs one step and leaves the routine
///   suspended on its next wait, returning `Ok(false)` once no further step
///   exists (and on every call after that);
/// - step failures are reported, never swallowed; the engine propagates
///   them out of the tick that observed them.
pub trait Routine {
    /// The wait descriptor the routine is currently suspended on.
    ///
    /// Mutable so the evaluator can start a timer clock in place.
    fn current(&mut self) -> &mut Wait;

    /// Advance by one step.
    ///
    /// Returns `Ok(true)` while further steps exist, `Ok(false)` once the
    /// routine is exhausted.
    ///
    /// # Errors
    /// Returns a message describing the host step failure.
    fn advance(&mut self) -> Result<bool, String>;
}

/// Adapter driving any `Iterator<Item = Wait>` as a routine.
///
/// The iterator's first item is pulled at construction, leaving the routine
/// suspended on its first wait; each `advance` pulls the next. Host work
/// interleaved between waits runs inside the iterator itself (a custom
/// iterator or `std::iter::from_fn` closure).
pub struct Steps<I> {
    steps: I,
    current: Wait,
}

impl<I: Iterator<Item = Wait>> Steps<I> {
    /// Wrap `steps`, suspending on its first item.
    pub fn new<S>(steps: S) -> Self
    where
        S: IntoIterator<Item = Wait, IntoIter = I>,
    {
        let mut steps = steps.into_iter();
        let current = steps.next().unwrap_or(Wait::None);
        Self { steps, current }
    }
}

impl<I: Iterator<Item = Wait>> Routine for Steps<I> {
    fn current(&mut self) -> &mut Wait {
        &mut self.current
    }

    fn advance(&mut self) -> Result<bool, String> {
        match self.steps.next() {
            Some(next) => {
                self.current = next;
                Ok(true)
            }
            None => {
                self.current = Wait::None;
                Ok(false)
            }
        }
    }
}

impl<I> fmt::Debug for Steps<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Steps")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}
