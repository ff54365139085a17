//! Condition predicates for control-flow nodes.
//!
//! Conditions are read-only and evaluated at most once per tick per consuming
//! node. Combinators short-circuit left to right. Shared state a condition
//! observes (counters, probes, lifetime tokens) lives behind `Rc`, so cloning
//! a condition tree never copies that state.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::lifetime::Lifetime;

/// Epsilon used by [`CmpOp::ApproxEq`].
pub const CMP_EPSILON: f32 = 1e-5;

/// Shared iteration counter, incremented by whatever drives the iteration
/// (e.g. a repeat composite on each child completion).
#[derive(Clone, Debug, Default)]
pub struct Counter(Rc<Cell<u32>>);

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u32 {
        self.0.get()
    }

    pub fn increment(&self) {
        self.0.set(self.0.get().saturating_add(1));
    }

    pub fn reset(&self) {
        self.0.set(0);
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Less,
    Greater,
    /// Equal within [`CMP_EPSILON`].
    ApproxEq,
}

/// Boolean predicate tree.
#[derive(Clone)]
pub enum Condition {
    /// True while `counter < max`.
    IterationsBelow { counter: Counter, max: u32 },
    /// True while the owner token is alive.
    Alive(Lifetime),
    /// True once the owner token has expired.
    Expired(Lifetime),
    /// Compares a sampled value against a threshold.
    Compare {
        probe: Rc<dyn Fn() -> f32>,
        op: CmpOp,
        threshold: f32,
    },
    All(Box<Condition>, Box<Condition>),
    Any(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
    /// Opaque predicate, e.g. produced by a registry factory.
    Custom(Rc<dyn Fn() -> bool>),
}

impl Condition {
    pub fn eval(&self) -> bool {
        match self {
            Condition::IterationsBelow { counter, max } => counter.get() < *max,
            Condition::Alive(token) => token.alive(),
            Condition::Expired(token) => token.expired(),
            Condition::Compare {
                probe,
                op,
                threshold,
            } => {
                let value = probe();
                match op {
                    CmpOp::Less => value < *threshold,
                    CmpOp::Greater => value > *threshold,
                    CmpOp::ApproxEq => (value - threshold).abs() <= CMP_EPSILON,
                }
            }
            Condition::All(a, b) => a.eval() && b.eval(),
            Condition::Any(a, b) => a.eval() || b.eval(),
            Condition::Not(inner) => !inner.eval(),
            Condition::Custom(pred) => pred(),
        }
    }

    pub fn compare(probe: impl Fn() -> f32 + 'static, op: CmpOp, threshold: f32) -> Self {
        Condition::Compare {
            probe: Rc::new(probe),
            op,
            threshold,
        }
    }

    pub fn custom(pred: impl Fn() -> bool + 'static) -> Self {
        Condition::Custom(Rc::new(pred))
    }

    pub fn all(a: Condition, b: Condition) -> Self {
        Condition::All(Box::new(a), Box::new(b))
    }

    pub fn any(a: Condition, b: Condition) -> Self {
        Condition::Any(Box::new(a), Box::new(b))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Condition) -> Self {
        Condition::Not(Box::new(inner))
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::IterationsBelow { counter, max } => f
                .debug_struct("IterationsBelow")
                .field("counter", &counter.get())
                .field("max", max)
                .finish(),
            Condition::Alive(token) => f.debug_tuple("Alive").field(&token.alive()).finish(),
            Condition::Expired(token) => f.debug_tuple("Expired").field(&token.expired()).finish(),
            Condition::Compare { op, threshold, .. } => f
                .debug_struct("Compare")
                .field("op", op)
                .field("threshold", threshold)
                .finish(),
            Condition::All(a, b) => f.debug_tuple("All").field(a).field(b).finish(),
            Condition::Any(a, b) => f.debug_tuple("Any").field(a).field(b).finish(),
            Condition::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
            Condition::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
