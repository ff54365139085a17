//! Handles: (slot index, generation) capabilities referencing one play.
//!
//! A handle is valid exactly while its generation matches the slot's current
//! generation. Release (stop or completion) bumps the generation, so every
//! operation on a stale handle is a safe no-op rather than an error.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SlotIx(pub u32);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Generation(pub u32);

/// Opaque, copyable capability referencing a scheduled instance.
///
/// Handles own no resources and are safe to store or copy freely; all
/// operations go through a [`Runner`](crate::runner::Runner) and validate the
/// generation first.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Handle {
    pub(crate) slot: SlotIx,
    pub(crate) generation: Generation,
}

impl Handle {
    pub fn slot(&self) -> SlotIx {
        self.slot
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }
}
