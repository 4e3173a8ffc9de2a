//! The nesting-stack walker: one tick's worth of work for one root routine.
//!
//! Each tick the walker descends from the root along nested-routine edges
//! to find the innermost suspended routine, then unwinds innermost-first,
//! advancing exactly the steps whose wait conditions hold. A finished child
//! unblocks its parent within the same tick, so completion cascades through
//! any number of nesting levels without per-level tick latency.

use std::rc::Rc;
use std::time::Duration;

use crate::routine::RoutineRef;
use crate::wait::{self, Wait};

/// Errors surfaced by tick processing.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// A routine's step logic failed while advancing.
    #[error("routine step failed: {message}")]
    StepFailed {
        /// Host-reported failure message.
        message: String,
    },
}

/// Result of driving one routine for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The wait is unsatisfied; the current step was not consumed.
    Blocked,
    /// Advanced one step; a new wait is in effect for the next tick.
    Progressed,
    /// Advanced past the last step.
    Finished,
}

/// Drive `routine` by at most one step.
///
/// A [`Wait::None`] descriptor short-circuits straight to the next step:
/// no timer is started and no external handle is polled. Any other
/// descriptor is evaluated first, and an unsatisfied one leaves the routine
/// untouched.
///
/// # Errors
/// Propagates host step failures as [`TickError::StepFailed`].
pub fn drive(routine: &RoutineRef, now: Duration) -> Result<StepOutcome, TickError> {
    let mut routine = routine.borrow_mut();
    let blocked = match routine.current() {
        // Fast path: no timer start, no external poll.
        Wait::None => false,
        current => !wait::is_satisfied(current, now),
    };
    if blocked {
        return Ok(StepOutcome::Blocked);
    }
    let more = routine
        .advance()
        .map_err(|message| TickError::StepFailed { message })?;
    Ok(if more {
        StepOutcome::Progressed
    } else {
        StepOutcome::Finished
    })
}

/// Process one tick for the chain rooted at `root`.
///
/// Returns `Ok(true)` once the root itself has finished.
///
/// # Errors
/// Propagates host step failures as [`TickError::StepFailed`].
pub fn process(root: &RoutineRef, now: Duration) -> Result<bool, TickError> {
    // Descend along nested-routine edges, recording the chain root-first.
    // The chain is held in an explicit vector so deep nesting never grows
    // the call stack.
    let mut chain: Vec<RoutineRef> = Vec::new();
    let mut cursor = Rc::clone(root);
    loop {
        chain.push(Rc::clone(&cursor));
        let child = match cursor.borrow_mut().current() {
            Wait::Routine(child) => Some(Rc::clone(child)),
            _ => None,
        };
        match child {
            Some(child) => cursor = child,
            None => break,
        }
    }

    // Unwind innermost-first. Blocked or Progressed ends the tick for the
    // whole chain; a finished child lets its parent advance in the same
    // tick.
    while let Some(entry) = chain.pop() {
        match drive(&entry, now)? {
            StepOutcome::Blocked | StepOutcome::Progressed => return Ok(false),
            StepOutcome::Finished => {
                if chain.is_empty() {
                    return Ok(true);
                }
            }
        }
    }
    Ok(false)
}
