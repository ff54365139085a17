//! Error taxonomy for the scheduling core.
//!
//! Capacity and configuration problems are reported to the caller at play
//! time. Stale-handle operations are not errors at all (generation checks
//! make them no-ops), and nothing crosses the tick loop: a failing instance
//! is stopped and surfaced through the event buffer.

use thiserror::Error;

/// Why a play request was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlayError {
    /// The configured hard slot cap is reached and no pooled shell of the
    /// requested kind is free.
    #[error("slot capacity exhausted ({in_use} slots allocated, cap {cap})")]
    CapacityExhausted { in_use: usize, cap: usize },
    /// A composite node in the blueprint has no children.
    #[error("composite blueprint has an empty child list")]
    EmptyComposite,
}

/// Failure reported by a node while ticking.
///
/// Contained at the instance boundary: the runner stops the offending
/// instance and records the error, other instances keep ticking.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct NodeError(pub String);

impl NodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Lookup failures in the extensibility registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no node factory registered for type id '{0}'")]
    UnknownNode(String),
    #[error("no condition factory registered for type id '{0}'")]
    UnknownCondition(String),
}
