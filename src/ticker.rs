//! The tick-source seam and a deterministic reference implementation.
//!
//! Hosts that already own an update loop implement [`TickSource`] over it;
//! [`ManualTicker`] serves hosts (and tests) that want to drive ticks
//! explicitly against a simulated clock.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::stack::TickError;

/// Identifier for a tick-callback subscription.
pub type SubscriptionId = usize;

/// Callback invoked once per tick with the source's current time.
pub type TickCallback = Rc<dyn Fn(Duration) -> Result<(), TickError>>;

/// The recurring update event a host exposes to the engine.
///
/// Implementations fire every subscribed callback once per tick, in an
/// application-defined order, and must tolerate `subscribe` and
/// `unsubscribe` calls made from inside a currently firing callback: a
/// callback subscribed mid-tick first fires on the next tick, and one
/// unsubscribed mid-tick may still fire for the tick in progress.
pub trait TickSource {
    /// Register `callback`, returning its subscription id.
    fn subscribe(&self, callback: TickCallback) -> SubscriptionId;

    /// Remove the callback registered under `id`. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);

    /// Monotonic current time.
    fn now(&self) -> Duration;
}

struct Registry {
    callbacks: Vec<(SubscriptionId, TickCallback)>,
    next_id: SubscriptionId,
    ticks: u64,
    elapsed: Duration,
    tick_duration: Duration,
}

/// Deterministic tick source with a simulated clock.
///
/// Each [`tick`](ManualTicker::tick) fires all subscribed callbacks at the
/// current simulated time, then advances the clock by the configured tick
/// duration. Callbacks are fired from a snapshot of the registry, which is
/// what tolerates reentrant subscribe/unsubscribe.
pub struct ManualTicker {
    registry: RefCell<Registry>,
}

impl ManualTicker {
    /// Create a ticker whose clock advances by `tick_duration` per tick,
    /// starting at time zero.
    #[must_use]
    pub fn new(tick_duration: Duration) -> Self {
        Self {
            registry: RefCell::new(Registry {
                callbacks: Vec::new(),
                next_id: 0,
                ticks: 0,
                elapsed: Duration::ZERO,
                tick_duration,
            }),
        }
    }

    /// Fire every subscribed callback once, then advance the clock.
    ///
    /// The clock advances even when a callback fails, so a failing tick
    /// still consumes its time slice.
    ///
    /// # Errors
    /// Returns the first callback error; callbacks after the failing one do
    /// not fire this tick.
    pub fn tick(&self) -> Result<(), TickError> {
        let (snapshot, now) = {
            let registry = self.registry.borrow();
            (registry.callbacks.clone(), registry.elapsed)
        };

        let mut result = Ok(());
        for (_, callback) in &snapshot {
            if let Err(error) = callback(now) {
                result = Err(error);
                break;
            }
        }

        let mut registry = self.registry.borrow_mut();
        registry.ticks += 1;
        let step = registry.tick_duration;
        registry.elapsed += step;
        result
    }

    /// Number of ticks fired so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.registry.borrow().ticks
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.borrow().callbacks.len()
    }
}

impl TickSource for ManualTicker {
    fn subscribe(&self, callback: TickCallback) -> SubscriptionId {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.callbacks.push((id, callback));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.registry
            .borrow_mut()
            .callbacks
            .retain(|(existing, _)| *existing != id);
    }

    fn now(&self) -> Duration {
        self.registry.borrow().elapsed
    }
}

impl fmt::Debug for ManualTicker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("ManualTicker")
            .field("ticks", &registry.ticks)
            .field("elapsed", &registry.elapsed)
            .field("subscribers", &registry.callbacks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_subscription_ids_monotonic() {
        let ticker = ManualTicker::new(Duration::from_secs(1));
        let id1 = ticker.subscribe(Rc::new(|_| Ok(())));
        let id2 = ticker.subscribe(Rc::new(|_| Ok(())));
        let id3 = ticker.subscribe(Rc::new(|_| Ok(())));

        assert!(id1 < id2);
        assert!(id2 < id3);
    }

    #[test]
    fn test_clock_advances_per_tick() {
        let ticker = ManualTicker::new(Duration::from_millis(16));
        assert_eq!(ticker.now(), Duration::ZERO);

        ticker.tick().unwrap();
        ticker.tick().unwrap();
        assert_eq!(ticker.now(), Duration::from_millis(32));
        assert_eq!(ticker.ticks(), 2);
    }

    #[test]
    fn test_callbacks_observe_time_before_advance() {
        let ticker = ManualTicker::new(Duration::from_secs(1));
        let seen = Rc::new(Cell::new(Duration::MAX));
        let record = Rc::clone(&seen);
        ticker.subscribe(Rc::new(move |now| {
            record.set(now);
            Ok(())
        }));

        ticker.tick().unwrap();
        assert_eq!(seen.get(), Duration::ZERO);

        ticker.tick().unwrap();
        assert_eq!(seen.get(), Duration::from_secs(1));
    }

    #[test]
    fn test_unsubscribe_during_tick_still_fires_snapshot() {
        let ticker = Rc::new(ManualTicker::new(Duration::from_secs(1)));
        let fired = Rc::new(Cell::new(0u32));

        // First callback removes the second; the second still fires for the
        // tick in progress because the registry was snapshotted.
        let target = Rc::new(Cell::new(None::<SubscriptionId>));
        let remover_ticker = Rc::clone(&ticker);
        let remover_target = Rc::clone(&target);
        ticker.subscribe(Rc::new(move |_| {
            if let Some(id) = remover_target.get() {
                remover_ticker.unsubscribe(id);
            }
            Ok(())
        }));

        let counter = Rc::clone(&fired);
        let id = ticker.subscribe(Rc::new(move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        }));
        target.set(Some(id));

        ticker.tick().unwrap();
        assert_eq!(fired.get(), 1);
        assert_eq!(ticker.subscriber_count(), 1);

        ticker.tick().unwrap();
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_subscribe_during_tick_fires_next_tick() {
        let ticker = Rc::new(ManualTicker::new(Duration::from_secs(1)));
        let fired = Rc::new(Cell::new(0u32));

        let outer_ticker = Rc::clone(&ticker);
        let outer_fired = Rc::clone(&fired);
        let added = Rc::new(Cell::new(false));
        ticker.subscribe(Rc::new(move |_| {
            if !added.get() {
                added.set(true);
                let counter = Rc::clone(&outer_fired);
                outer_ticker.subscribe(Rc::new(move |_| {
                    counter.set(counter.get() + 1);
                    Ok(())
                }));
            }
            Ok(())
        }));

        ticker.tick().unwrap();
        assert_eq!(fired.get(), 0);

        ticker.tick().unwrap();
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_error_aborts_remaining_callbacks_for_tick() {
        let ticker = ManualTicker::new(Duration::from_secs(1));
        let fired = Rc::new(Cell::new(false));

        ticker.subscribe(Rc::new(|_| {
            Err(TickError::StepFailed {
                message: "boom".into(),
            })
        }));
        let witness = Rc::clone(&fired);
        ticker.subscribe(Rc::new(move |_| {
            witness.set(true);
            Ok(())
        }));

        assert!(ticker.tick().is_err());
        assert!(!fired.get());
        // The failing tick still consumed its time slice.
        assert_eq!(ticker.now(), Duration::from_secs(1));
    }
}
