//! Tick output contract.
//!
//! The runner records what it observed during a tick (completions, stops it
//! initiated itself, contained failures) into an [`Outputs`] buffer returned
//! by reference from `tick`. The buffer is cleared at the start of the next
//! tick. Direct host calls (play, stop) are not echoed here; the caller
//! already knows about those.

use crate::handle::Handle;

/// Discrete signals recorded during one tick.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum RunnerEvent {
    /// The instance ran to natural completion and its slot was released.
    Completed { handle: Handle },
    /// The runner stopped the instance itself (lifetime expiry, internal
    /// abort by a node).
    Stopped { handle: Handle },
    /// A node failed while ticking; the instance was stopped.
    Error { handle: Handle, message: String },
}

/// Events produced by one `tick` call.
#[derive(Debug, Default)]
pub struct Outputs {
    pub events: Vec<RunnerEvent>,
}

impl Outputs {
    #[inline]
    pub fn clear(&mut self) {
        self.events.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
