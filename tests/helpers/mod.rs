//! Shared fixtures for engine integration tests.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tickloop::{AsyncOp, ManualTicker, Routine, Steps, Wait};

/// Ticker advancing one second of simulated time per tick.
pub fn ticker() -> Rc<ManualTicker> {
    Rc::new(ManualTicker::new(Duration::from_secs(1)))
}

/// External async handle backed by a host-settable flag.
pub struct FlagOp {
    complete: Cell<bool>,
}

impl FlagOp {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            complete: Cell::new(false),
        })
    }

    pub fn finish(&self) {
        self.complete.set(true);
    }
}

impl AsyncOp for FlagOp {
    fn is_complete(&self) -> bool {
        self.complete.get()
    }
}

/// Routine that counts `advance` calls and finishes after `steps` of them.
pub struct Counted {
    advances: Rc<Cell<usize>>,
    remaining: usize,
    current: Wait,
}

impl Counted {
    pub fn new(steps: usize) -> (Self, Rc<Cell<usize>>) {
        let advances = Rc::new(Cell::new(0));
        let routine = Self {
            advances: Rc::clone(&advances),
            remaining: steps,
            current: Wait::None,
        };
        (routine, advances)
    }
}

impl Routine for Counted {
    fn current(&mut self) -> &mut Wait {
        &mut self.current
    }

    fn advance(&mut self) -> Result<bool, String> {
        self.advances.set(self.advances.get() + 1);
        self.remaining = self.remaining.saturating_sub(1);
        Ok(self.remaining > 0)
    }
}

/// Routine whose step logic always fails.
pub struct Failing {
    message: String,
    current: Wait,
}

impl Failing {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.into(),
            current: Wait::None,
        }
    }
}

impl Routine for Failing {
    fn current(&mut self) -> &mut Wait {
        &mut self.current
    }

    fn advance(&mut self) -> Result<bool, String> {
        Err(self.message.clone())
    }
}

/// Build a routine nested `depth` levels deep where every level finishes on
/// its next advance.
pub fn nested_chain(depth: usize) -> Steps<std::vec::IntoIter<Wait>> {
    let mut routine = Steps::new(Vec::new());
    for _ in 0..depth {
        routine = Steps::new(vec![Wait::routine(routine)]);
    }
    routine
}
