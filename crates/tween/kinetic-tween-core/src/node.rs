//! Blueprints: immutable authored descriptions of animation nodes.
//!
//! A blueprint is authored once and cloned into a pooled instance on each
//! play; Play never mutates it. Cloning is cheap because shared leaves
//! (appliers, condition probes, custom-node factories) live behind `Rc`.

use std::fmt;
use std::rc::Rc;

use crate::condition::{Condition, Counter};
use crate::easing::Easing;
use crate::error::{NodeError, PlayError};
use crate::target::Applier;

/// Timing parameters carried by every node.
///
/// `duration` is meaningful for leaves (tween, wait); composites derive their
/// span from their children. `delay` is honored by every node before any
/// child ticks or apply steps run.
#[derive(Clone, Copy, Debug)]
pub struct Timing {
    pub duration: f32,
    pub delay: f32,
    pub easing: Easing,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            duration: 0.0,
            delay: 0.0,
            easing: Easing::Linear,
        }
    }
}

/// How a parallel composite decides it is complete.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum JoinPolicy {
    /// Every child must reach Completed. A child that stopped short leaves
    /// the join open until the join itself is stopped.
    #[default]
    AllCompleted,
    /// Any terminal child state (Completed or Stopped) counts.
    AllTerminal,
}

/// Progress report from a custom node's tick.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CustomStatus {
    Running,
    Completed,
    /// The node aborted itself; the owning instance releases with stop
    /// semantics.
    Stopped,
}

/// Extension seam for registry-provided node behaviors.
///
/// A custom node owns its playback state; `reset` rewinds it to the start and
/// `tick` advances it, reporting completion or a contained failure. The
/// node's `delay` timing still applies before the first tick reaches it.
pub trait CustomNode {
    fn reset(&mut self);
    fn tick(&mut self, dt: f32) -> Result<CustomStatus, NodeError>;
}

/// Pool key grouping instances with interchangeable storage shapes.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) enum KindKey {
    Tween,
    Wait,
    Sequence,
    Parallel,
    RepeatUntil,
    Conditional,
    WaitUntil,
    Custom(Rc<str>),
}

#[derive(Clone)]
pub(crate) enum Kind {
    Tween {
        applier: Rc<dyn Applier>,
    },
    Wait,
    Sequence {
        children: Vec<Blueprint>,
    },
    Parallel {
        children: Vec<Blueprint>,
        policy: JoinPolicy,
    },
    RepeatUntil {
        child: Box<Blueprint>,
        until: Condition,
        counter: Option<Counter>,
    },
    Conditional {
        gate: Condition,
        child: Box<Blueprint>,
    },
    WaitUntil {
        until: Condition,
    },
    Custom {
        type_id: Rc<str>,
        make: Rc<dyn Fn() -> Box<dyn CustomNode>>,
    },
}

/// Immutable authored description of one node, leaf or composite.
#[derive(Clone)]
pub struct Blueprint {
    pub(crate) timing: Timing,
    pub(crate) kind: Kind,
}

impl Blueprint {
    fn new(timing: Timing, kind: Kind) -> Self {
        Self { timing, kind }
    }

    /// Leaf that applies eased progress to a target for `duration` seconds.
    pub fn tween(duration: f32, applier: Rc<dyn Applier>) -> Self {
        Self::new(
            Timing {
                duration,
                ..Timing::default()
            },
            Kind::Tween { applier },
        )
    }

    /// [`tween`](Self::tween) over a plain closure.
    pub fn tween_fn(duration: f32, apply: impl Fn(f32) + 'static) -> Self {
        Self::tween(duration, Rc::new(apply))
    }

    /// Pure delay leaf; applies nothing.
    pub fn wait(duration: f32) -> Self {
        Self::new(
            Timing {
                duration,
                ..Timing::default()
            },
            Kind::Wait,
        )
    }

    /// Runs children one after another; completes when the last completes.
    pub fn sequence(children: Vec<Blueprint>) -> Self {
        Self::new(Timing::default(), Kind::Sequence { children })
    }

    /// Runs children together under the default [`JoinPolicy`].
    pub fn parallel(children: Vec<Blueprint>) -> Self {
        Self::parallel_with(children, JoinPolicy::default())
    }

    pub fn parallel_with(children: Vec<Blueprint>, policy: JoinPolicy) -> Self {
        Self::new(Timing::default(), Kind::Parallel { children, policy })
    }

    /// Replays `child` until `until` evaluates true on a child completion.
    /// At most one replay starts per tick, so zero-duration children cannot
    /// spin inside a single tick.
    pub fn repeat_until(child: Blueprint, until: Condition) -> Self {
        Self::new(
            Timing::default(),
            Kind::RepeatUntil {
                child: Box::new(child),
                until,
                counter: None,
            },
        )
    }

    /// Replays `child` exactly `times` times, counting completions on a
    /// fresh [`Counter`].
    pub fn repeat_times(child: Blueprint, times: u32) -> Self {
        let counter = Counter::new();
        Self::new(
            Timing::default(),
            Kind::RepeatUntil {
                child: Box::new(child),
                until: Condition::not(Condition::IterationsBelow {
                    counter: counter.clone(),
                    max: times,
                }),
                counter: Some(counter),
            },
        )
    }

    /// Gated passthrough: `gate` is evaluated once at play; false turns the
    /// whole node into a no-op that completes on its first tick.
    pub fn when(gate: Condition, child: Blueprint) -> Self {
        Self::new(
            Timing::default(),
            Kind::Conditional {
                gate,
                child: Box::new(child),
            },
        )
    }

    /// Completes on the first tick `until` is observed true; no fixed
    /// duration, no target.
    pub fn wait_until(until: Condition) -> Self {
        Self::new(Timing::default(), Kind::WaitUntil { until })
    }

    /// Leaf backed by a registry-provided [`CustomNode`] behavior.
    pub fn custom(type_id: &str, make: impl Fn() -> Box<dyn CustomNode> + 'static) -> Self {
        Self::new(
            Timing::default(),
            Kind::Custom {
                type_id: Rc::from(type_id),
                make: Rc::new(make),
            },
        )
    }

    pub fn with_delay(mut self, delay: f32) -> Self {
        self.timing.delay = delay;
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.timing.easing = easing;
        self
    }

    /// Reject malformed composites before any slot is touched.
    pub(crate) fn validate(&self) -> Result<(), PlayError> {
        match &self.kind {
            Kind::Sequence { children } | Kind::Parallel { children, .. } => {
                if children.is_empty() {
                    return Err(PlayError::EmptyComposite);
                }
                children.iter().try_for_each(Blueprint::validate)
            }
            Kind::RepeatUntil { child, .. } | Kind::Conditional { child, .. } => child.validate(),
            Kind::Tween { .. } | Kind::Wait | Kind::WaitUntil { .. } | Kind::Custom { .. } => {
                Ok(())
            }
        }
    }

    pub(crate) fn kind_key(&self) -> KindKey {
        match &self.kind {
            Kind::Tween { .. } => KindKey::Tween,
            Kind::Wait => KindKey::Wait,
            Kind::Sequence { .. } => KindKey::Sequence,
            Kind::Parallel { .. } => KindKey::Parallel,
            Kind::RepeatUntil { .. } => KindKey::RepeatUntil,
            Kind::Conditional { .. } => KindKey::Conditional,
            Kind::WaitUntil { .. } => KindKey::WaitUntil,
            Kind::Custom { type_id, .. } => KindKey::Custom(Rc::clone(type_id)),
        }
    }
}

impl fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match &self.kind {
            Kind::Tween { .. } => "Tween",
            Kind::Wait => "Wait",
            Kind::Sequence { .. } => "Sequence",
            Kind::Parallel { .. } => "Parallel",
            Kind::RepeatUntil { .. } => "RepeatUntil",
            Kind::Conditional { .. } => "Conditional",
            Kind::WaitUntil { .. } => "WaitUntil",
            Kind::Custom { type_id, .. } => type_id,
        };
        f.debug_struct("Blueprint")
            .field("kind", &name)
            .field("timing", &self.timing)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_composites_fail_validation() {
        assert_eq!(
            Blueprint::sequence(vec![]).validate(),
            Err(PlayError::EmptyComposite)
        );
        assert_eq!(
            Blueprint::parallel(vec![]).validate(),
            Err(PlayError::EmptyComposite)
        );
    }

    #[test]
    fn nested_empty_composites_are_caught() {
        let bp = Blueprint::sequence(vec![Blueprint::wait(0.1), Blueprint::parallel(vec![])]);
        assert_eq!(bp.validate(), Err(PlayError::EmptyComposite));
    }

    #[test]
    fn cloning_shares_the_applier() {
        let bp = Blueprint::tween_fn(1.0, |_| {});
        let copy = bp.clone();
        match (&bp.kind, &copy.kind) {
            (Kind::Tween { applier: a }, Kind::Tween { applier: b }) => {
                assert!(Rc::ptr_eq(a, b));
            }
            _ => panic!("expected tween kinds"),
        }
    }
}
