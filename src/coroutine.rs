//! Coroutine lifecycle: registration, per-tick driving, cancellation.
//!
//! A [`Coroutine`] wraps a root routine and registers a callback with a
//! [`TickSource`]. Each tick it checks owner liveness, runs the stack
//! walker for one tick's worth of work, and unregisters itself once the
//! root finishes. All state lives behind a shared handle so the coroutine
//! can itself be used as a wait target by other routines.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::routine::{Routine, RoutineRef};
use crate::stack::{self, TickError};
use crate::ticker::{SubscriptionId, TickSource};

/// Liveness probe for a non-owning owner reference.
///
/// The engine checks the probe lazily, once per tick before any step
/// processing, so there is a bounded one-tick delay between owner death and
/// coroutine teardown. The probe must never keep the owner alive.
pub trait Liveness {
    /// Whether the observed owner is still alive.
    fn is_alive(&self) -> bool;
}

impl<T: ?Sized> Liveness for std::rc::Weak<T> {
    fn is_alive(&self) -> bool {
        self.strong_count() > 0
    }
}

impl<T: ?Sized> Liveness for std::sync::Weak<T> {
    fn is_alive(&self) -> bool {
        self.strong_count() > 0
    }
}

struct CoroState {
    routine: Option<RoutineRef>,
    owner: Option<Box<dyn Liveness>>,
    done: bool,
    subscription: Option<SubscriptionId>,
    ticker: Rc<dyn TickSource>,
}

/// Handle to a running coroutine.
///
/// Cloning the handle shares the underlying coroutine; the tick callback
/// itself holds one clone, which keeps the coroutine alive while it is
/// registered even if the host drops every other handle.
#[derive(Clone)]
pub struct Coroutine {
    state: Rc<RefCell<CoroState>>,
}

impl Coroutine {
    /// Start `routine`, registering a tick callback with `ticker`.
    pub fn start(ticker: Rc<dyn TickSource>, routine: impl Routine + 'static) -> Self {
        let routine: RoutineRef = Rc::new(RefCell::new(routine));
        Self::register(ticker, routine, None)
    }

    /// Start `routine` tied to `owner`: once the owner probe reports dead,
    /// the coroutine is stopped on its next tick without advancing.
    pub fn start_with_owner(
        ticker: Rc<dyn TickSource>,
        routine: impl Routine + 'static,
        owner: impl Liveness + 'static,
    ) -> Self {
        let routine: RoutineRef = Rc::new(RefCell::new(routine));
        Self::register(ticker, routine, Some(Box::new(owner)))
    }

    fn register(
        ticker: Rc<dyn TickSource>,
        routine: RoutineRef,
        owner: Option<Box<dyn Liveness>>,
    ) -> Self {
        let state = Rc::new(RefCell::new(CoroState {
            routine: Some(routine),
            owner,
            done: false,
            subscription: None,
            ticker: Rc::clone(&ticker),
        }));
        let handle = Coroutine {
            state: Rc::clone(&state),
        };

        let callback_handle = handle.clone();
        let id = ticker.subscribe(Rc::new(move |now| callback_handle.on_tick(now)));
        state.borrow_mut().subscription = Some(id);
        tracing::debug!(subscription = id, "coroutine started");
        handle
    }

    /// Whether the root routine ran to completion.
    ///
    /// Monotonic: once true it never reverts. [`stop`](Coroutine::stop)
    /// does not set it.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state.borrow().done
    }

    /// Whether the coroutine still holds a tick subscription.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.state.borrow().subscription.is_some()
    }

    /// Stop the coroutine: unregister the tick callback and clear the root
    /// routine and owner probe.
    ///
    /// Idempotent, and callable at any time, including from inside one of
    /// the coroutine's own steps; the step in progress completes its
    /// current advance and is never invoked again.
    pub fn stop(&self) {
        let subscription = {
            let mut state = self.state.borrow_mut();
            state.routine = None;
            state.owner = None;
            state
                .subscription
                .take()
                .map(|id| (Rc::clone(&state.ticker), id))
        };
        if let Some((ticker, id)) = subscription {
            ticker.unsubscribe(id);
            tracing::debug!(subscription = id, "coroutine stopped");
        }
    }

    fn on_tick(&self, now: Duration) -> Result<(), TickError> {
        let (root, owner_dead) = {
            let state = self.state.borrow();
            if state.done {
                return Ok(());
            }
            // A tick source snapshot may still fire us on the tick we were
            // stopped in; the cleared root marks that.
            let Some(root) = state.routine.clone() else {
                return Ok(());
            };
            let owner_dead = state.owner.as_ref().is_some_and(|owner| !owner.is_alive());
            (root, owner_dead)
        };

        if owner_dead {
            tracing::debug!("owner dropped; cancelling coroutine");
            self.stop();
            return Ok(());
        }

        let finished = stack::process(&root, now)?;
        if finished {
            self.state.borrow_mut().done = true;
            tracing::debug!("coroutine finished");
            self.stop();
        }
        Ok(())
    }
}

impl fmt::Debug for Coroutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => f
                .debug_struct("Coroutine")
                .field("done", &state.done)
                .field("registered", &state.subscription.is_some())
                .finish_non_exhaustive(),
            Err(_) => f.write_str("Coroutine { .. }"),
        }
    }
}
