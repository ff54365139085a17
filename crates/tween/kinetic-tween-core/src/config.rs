//! Runner configuration.

use serde::{Deserialize, Serialize};

/// Sizing hints and limits for a [`Runner`](crate::runner::Runner).
///
/// Capacities are hints used to reserve storage up front; growing past them
/// is a documented one-time allocation, not an error. `max_slots` is the hard
/// cap at which [`play`](crate::runner::Runner::play) starts reporting
/// capacity errors instead of allocating.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Initial slot storage reserved at construction.
    pub slot_capacity: usize,
    /// Initial dense active-list storage reserved at construction.
    pub active_capacity: usize,
    /// Hard cap on total slots (live plus pooled). `None` grows unbounded.
    pub max_slots: Option<usize>,
    /// Maximum events retained per tick; extras are dropped with a warning.
    pub max_events_per_tick: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            slot_capacity: 64,
            active_capacity: 64,
            max_slots: None,
            max_events_per_tick: 256,
        }
    }
}
