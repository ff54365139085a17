//! Pure composition operators over blueprints.
//!
//! `then` and `join` build new composite blueprints from borrowed inputs;
//! the inputs are cloned, never mutated, and stay reusable elsewhere. An
//! input that is already the same composite kind is flattened into the new
//! child list instead of nested, provided its own timing and policy are the
//! defaults (anything else would change semantics).

use crate::node::{Blueprint, JoinPolicy, Kind};

/// Sequential composition: `a`, then `b`.
pub fn then(a: &Blueprint, b: &Blueprint) -> Blueprint {
    let mut children = Vec::new();
    push_sequential(&mut children, a);
    push_sequential(&mut children, b);
    Blueprint::sequence(children)
}

/// Parallel composition of `a` and `b` under the default [`JoinPolicy`].
pub fn join(a: &Blueprint, b: &Blueprint) -> Blueprint {
    join_with(a, b, JoinPolicy::default())
}

/// Parallel composition with an explicit completion policy.
pub fn join_with(a: &Blueprint, b: &Blueprint, policy: JoinPolicy) -> Blueprint {
    let mut children = Vec::new();
    push_parallel(&mut children, a, policy);
    push_parallel(&mut children, b, policy);
    Blueprint::parallel_with(children, policy)
}

fn push_sequential(out: &mut Vec<Blueprint>, bp: &Blueprint) {
    match &bp.kind {
        Kind::Sequence { children } if bp.timing.delay == 0.0 => {
            out.extend(children.iter().cloned());
        }
        _ => out.push(bp.clone()),
    }
}

fn push_parallel(out: &mut Vec<Blueprint>, bp: &Blueprint, policy: JoinPolicy) {
    match &bp.kind {
        Kind::Parallel {
            children,
            policy: child_policy,
        } if bp.timing.delay == 0.0 && *child_policy == policy => {
            out.extend(children.iter().cloned());
        }
        _ => out.push(bp.clone()),
    }
}

impl Blueprint {
    /// Method form of [`then`].
    pub fn then(&self, next: &Blueprint) -> Blueprint {
        then(self, next)
    }

    /// Method form of [`join`].
    pub fn join(&self, other: &Blueprint) -> Blueprint {
        join(self, other)
    }
}
