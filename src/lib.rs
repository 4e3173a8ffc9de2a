//! Tick-driven cooperative coroutine engine.
//!
//! This crate lets a host application run long-lived, pausable sequences of
//! work ("coroutines") off a recurring tick event, without dedicated
//! threads. A coroutine wraps a step-producing routine that suspends itself
//! on a wait condition (a fixed delay, a nested routine, another coroutine,
//! or an external asynchronous handle) and resumes on a later tick once the
//! condition holds.
//!
//! # Architecture
//!
//! - **Wait descriptors** ([`wait::Wait`]): the closed set of conditions a
//!   routine can suspend on, plus the evaluator that decides satisfaction
//! - **Routines** ([`routine::Routine`]): the host seam; report the
//!   current wait, advance by one step
//! - **Stack walker** ([`stack::process`]): per-tick descend/unwind over a
//!   chain of nested routines, with same-tick completion cascade
//! - **Coroutines** ([`coroutine::Coroutine`]): lifecycle; registration
//!   with a tick source, owner-liveness cancellation, completion
//! - **Tick source** ([`ticker::TickSource`]): the host's update event;
//!   [`ticker::ManualTicker`] is a deterministic reference implementation
//!
//! Everything is single-threaded and cooperative: all state transitions
//! happen synchronously inside the tick callback, and "waiting" means
//! returning control to the tick source.
//!
//! # Usage
//!
//! ```
//! use std::rc::Rc;
//! use std::time::Duration;
//! use tickloop::{Coroutine, ManualTicker, Steps, Wait};
//!
//! # fn main() -> Result<(), tickloop::TickError> {
//! let ticker = Rc::new(ManualTicker::new(Duration::from_millis(16)));
//!
//! let routine = Steps::new(vec![
//!     Wait::timer(Duration::from_millis(32)),
//!     Wait::None,
//! ]);
//! let handle = Coroutine::start(ticker.clone(), routine);
//!
//! while !handle.is_done() {
//!     ticker.tick()?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod coroutine;
pub mod routine;
pub mod stack;
pub mod ticker;
pub mod wait;

pub use coroutine::{Coroutine, Liveness};
pub use routine::{Routine, RoutineRef, Steps};
pub use stack::{StepOutcome, TickError};
pub use ticker::{ManualTicker, SubscriptionId, TickCallback, TickSource};
pub use wait::{AsyncOp, TimedWait, Wait};
