//! Runtime playback state: the node state machine and pooled instance shell.
//!
//! An [`Instance`] is the mutable clone of a blueprint owned by exactly one
//! slot while active. Released shells stay boxed inside their slot and are
//! reinitialized in place on the next same-kind play, which is what makes
//! steady-state replays allocation-free.

use std::rc::Rc;

use crate::condition::{Condition, Counter};
use crate::easing::ease;
use crate::error::NodeError;
use crate::handle::Handle;
use crate::node::{Blueprint, CustomNode, CustomStatus, JoinPolicy, Kind, KindKey, Timing};
use crate::runner::PlayCfg;
use crate::suspend::WaitCell;
use crate::target::{Applier, ApplyStatus};

/// Node playback states.
///
/// `Completed` and `Stopped` are terminal; reaching either at the root
/// releases the slot on the same tick.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum State {
    Idle,
    Playing,
    Paused,
    Completed,
    Stopped,
}

impl State {
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Completed | State::Stopped)
    }
}

/// Which per-frame delta drives an instance.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ClockKind {
    #[default]
    Scaled,
    Unscaled,
}

pub(crate) enum InstKind {
    Tween {
        applier: Rc<dyn Applier>,
    },
    Wait,
    Sequence {
        children: Vec<NodeInst>,
        current: usize,
    },
    Parallel {
        children: Vec<NodeInst>,
        policy: JoinPolicy,
    },
    RepeatUntil {
        child: Box<NodeInst>,
        until: Condition,
        counter: Option<Counter>,
    },
    Conditional {
        gate: Condition,
        child: Box<NodeInst>,
        engaged: bool,
    },
    WaitUntil {
        until: Condition,
    },
    Custom {
        node: Box<dyn CustomNode>,
    },
}

/// One node's runtime state within an instance tree.
pub(crate) struct NodeInst {
    pub(crate) timing: Timing,
    pub(crate) state: State,
    pub(crate) elapsed: f32,
    pub(crate) kind: InstKind,
}

impl NodeInst {
    pub(crate) fn from_blueprint(bp: &Blueprint) -> Self {
        Self {
            timing: bp.timing,
            state: State::Idle,
            elapsed: 0.0,
            kind: InstKind::from_kind(&bp.kind),
        }
    }

    /// Rewind to the start of playback. Children are rewound lazily: a
    /// sequence starts only its first child here and each later child when
    /// the cursor reaches it.
    pub(crate) fn start(&mut self) {
        self.state = State::Playing;
        self.elapsed = 0.0;
        match &mut self.kind {
            InstKind::Sequence { children, current } => {
                *current = 0;
                if let Some(first) = children.first_mut() {
                    first.start();
                }
            }
            InstKind::Parallel { children, .. } => {
                for child in children.iter_mut() {
                    child.start();
                }
            }
            InstKind::RepeatUntil { child, counter, .. } => {
                if let Some(counter) = counter {
                    counter.reset();
                }
                child.start();
            }
            InstKind::Conditional {
                gate,
                child,
                engaged,
            } => {
                // The gate is sampled exactly once, at play.
                *engaged = gate.eval();
                if *engaged {
                    child.start();
                }
            }
            InstKind::Custom { node } => node.reset(),
            InstKind::Tween { .. } | InstKind::Wait | InstKind::WaitUntil { .. } => {}
        }
    }

    /// Advance by `dt` seconds. Returns time left over after reaching a
    /// terminal state, which sequences feed into the next child.
    pub(crate) fn tick(&mut self, dt: f32) -> Result<f32, NodeError> {
        if self.state.is_terminal() {
            return Ok(dt);
        }
        self.elapsed += dt;
        let delay = self.timing.delay;
        if self.elapsed < delay {
            return Ok(0.0);
        }
        // Portion of this tick past the delay window.
        let local = self.elapsed - delay;
        let usable = dt.min(local);
        match &mut self.kind {
            InstKind::Tween { applier } => {
                let duration = self.timing.duration;
                let t = if duration > 0.0 {
                    (local / duration).min(1.0)
                } else {
                    1.0
                };
                if applier.apply(ease(self.timing.easing, t)) == ApplyStatus::TargetGone {
                    log::trace!("tween target gone, apply skipped");
                }
                if t >= 1.0 {
                    self.state = State::Completed;
                    return Ok((local - duration).max(0.0));
                }
                Ok(0.0)
            }
            InstKind::Wait => {
                let duration = self.timing.duration;
                if local >= duration {
                    self.state = State::Completed;
                    return Ok(local - duration);
                }
                Ok(0.0)
            }
            InstKind::WaitUntil { until } => {
                if until.eval() {
                    self.state = State::Completed;
                }
                Ok(0.0)
            }
            InstKind::Sequence { children, current } => {
                let mut budget = usable;
                loop {
                    let child = match children.get_mut(*current) {
                        Some(child) => child,
                        None => {
                            self.state = State::Completed;
                            return Ok(budget);
                        }
                    };
                    budget = child.tick(budget)?;
                    match child.state {
                        State::Completed => {
                            *current += 1;
                            if *current == children.len() {
                                self.state = State::Completed;
                                return Ok(budget);
                            }
                            children[*current].start();
                        }
                        State::Stopped => {
                            self.state = State::Stopped;
                            return Ok(budget);
                        }
                        _ => return Ok(0.0),
                    }
                }
            }
            InstKind::Parallel { children, policy } => {
                let mut complete = true;
                for child in children.iter_mut() {
                    if !child.state.is_terminal() {
                        child.tick(usable)?;
                    }
                    let done = match policy {
                        JoinPolicy::AllCompleted => child.state == State::Completed,
                        JoinPolicy::AllTerminal => child.state.is_terminal(),
                    };
                    complete = complete && done;
                }
                if complete {
                    self.state = State::Completed;
                }
                Ok(0.0)
            }
            InstKind::RepeatUntil {
                child,
                until,
                counter,
            } => {
                child.tick(usable)?;
                match child.state {
                    State::Completed => {
                        if let Some(counter) = counter {
                            counter.increment();
                        }
                        if until.eval() {
                            self.state = State::Completed;
                        } else {
                            // One replay per tick; leftover time is dropped so
                            // a zero-duration child cannot spin within a tick.
                            child.start();
                        }
                    }
                    State::Stopped => self.state = State::Stopped,
                    _ => {}
                }
                Ok(0.0)
            }
            InstKind::Conditional { child, engaged, .. } => {
                if !*engaged {
                    self.state = State::Completed;
                    return Ok(usable);
                }
                child.tick(usable)?;
                match child.state {
                    State::Completed => self.state = State::Completed,
                    State::Stopped => self.state = State::Stopped,
                    _ => {}
                }
                Ok(0.0)
            }
            InstKind::Custom { node } => {
                match node.tick(usable)? {
                    CustomStatus::Running => {}
                    CustomStatus::Completed => self.state = State::Completed,
                    CustomStatus::Stopped => self.state = State::Stopped,
                }
                Ok(0.0)
            }
        }
    }

    /// Last normalized (non-eased) progress. 1.0 once completed; nodes with
    /// no finite span report 0.0 while running.
    pub(crate) fn progress(&self) -> f32 {
        if self.state == State::Completed {
            return 1.0;
        }
        let local = (self.elapsed - self.timing.delay).max(0.0);
        match &self.kind {
            InstKind::Tween { .. } | InstKind::Wait => {
                let duration = self.timing.duration;
                if duration > 0.0 {
                    (local / duration).min(1.0)
                } else {
                    0.0
                }
            }
            InstKind::Sequence { .. } | InstKind::Parallel { .. } => match self.nominal_duration()
            {
                Some(total) if total > 0.0 => (self.elapsed / total).clamp(0.0, 1.0),
                _ => 0.0,
            },
            InstKind::RepeatUntil { child, .. } => child.progress(),
            InstKind::Conditional { child, engaged, .. } => {
                if *engaged {
                    child.progress()
                } else {
                    0.0
                }
            }
            InstKind::WaitUntil { .. } | InstKind::Custom { .. } => 0.0,
        }
    }

    /// Total span including delay: sum over sequence children, max over
    /// parallel children. `None` for condition-driven nodes.
    fn nominal_duration(&self) -> Option<f32> {
        let lead = self.timing.delay;
        match &self.kind {
            InstKind::Tween { .. } | InstKind::Wait => Some(lead + self.timing.duration),
            InstKind::Sequence { children, .. } => {
                let mut sum = 0.0;
                for child in children {
                    sum += child.nominal_duration()?;
                }
                Some(lead + sum)
            }
            InstKind::Parallel { children, .. } => {
                let mut max = 0.0f32;
                for child in children {
                    max = max.max(child.nominal_duration()?);
                }
                Some(lead + max)
            }
            InstKind::Conditional { child, .. } => child.nominal_duration().map(|d| lead + d),
            InstKind::RepeatUntil { .. } | InstKind::WaitUntil { .. } | InstKind::Custom { .. } => {
                None
            }
        }
    }

    /// Reset in place from a blueprint, reusing child storage when the tree
    /// shapes line up (they always do when replaying the same blueprint).
    pub(crate) fn reinit(&mut self, bp: &Blueprint) {
        self.timing = bp.timing;
        self.state = State::Idle;
        self.elapsed = 0.0;
        match (&mut self.kind, &bp.kind) {
            (InstKind::Tween { applier }, Kind::Tween { applier: src }) => {
                *applier = Rc::clone(src);
            }
            (InstKind::Wait, Kind::Wait) => {}
            (InstKind::Sequence { children, current }, Kind::Sequence { children: src }) => {
                *current = 0;
                reinit_children(children, src);
            }
            (
                InstKind::Parallel { children, policy },
                Kind::Parallel {
                    children: src,
                    policy: src_policy,
                },
            ) => {
                *policy = *src_policy;
                reinit_children(children, src);
            }
            (
                InstKind::RepeatUntil {
                    child,
                    until,
                    counter,
                },
                Kind::RepeatUntil {
                    child: src,
                    until: src_until,
                    counter: src_counter,
                },
            ) => {
                child.reinit(src);
                *until = src_until.clone();
                *counter = src_counter.clone();
            }
            (
                InstKind::Conditional {
                    gate,
                    child,
                    engaged,
                },
                Kind::Conditional {
                    gate: src_gate,
                    child: src,
                },
            ) => {
                *gate = src_gate.clone();
                *engaged = false;
                child.reinit(src);
            }
            (InstKind::WaitUntil { until }, Kind::WaitUntil { until: src }) => {
                *until = src.clone();
            }
            (InstKind::Custom { node }, Kind::Custom { make, .. }) => {
                *node = make();
            }
            (kind, src) => *kind = InstKind::from_kind(src),
        }
    }
}

fn reinit_children(children: &mut Vec<NodeInst>, src: &[Blueprint]) {
    children.truncate(src.len());
    for (child, bp) in children.iter_mut().zip(src) {
        child.reinit(bp);
    }
    for bp in &src[children.len()..] {
        children.push(NodeInst::from_blueprint(bp));
    }
}

impl InstKind {
    fn from_kind(kind: &Kind) -> Self {
        match kind {
            Kind::Tween { applier } => InstKind::Tween {
                applier: Rc::clone(applier),
            },
            Kind::Wait => InstKind::Wait,
            Kind::Sequence { children } => InstKind::Sequence {
                children: children.iter().map(NodeInst::from_blueprint).collect(),
                current: 0,
            },
            Kind::Parallel { children, policy } => InstKind::Parallel {
                children: children.iter().map(NodeInst::from_blueprint).collect(),
                policy: *policy,
            },
            Kind::RepeatUntil {
                child,
                until,
                counter,
            } => InstKind::RepeatUntil {
                child: Box::new(NodeInst::from_blueprint(child)),
                until: until.clone(),
                counter: counter.clone(),
            },
            Kind::Conditional { gate, child } => InstKind::Conditional {
                gate: gate.clone(),
                child: Box::new(NodeInst::from_blueprint(child)),
                engaged: false,
            },
            Kind::WaitUntil { until } => InstKind::WaitUntil {
                until: until.clone(),
            },
            Kind::Custom { make, .. } => InstKind::Custom { node: make() },
        }
    }
}

/// Slot payload: the root node tree plus per-play bookkeeping.
pub(crate) struct Instance {
    pub(crate) kind_key: KindKey,
    pub(crate) root: NodeInst,
    pub(crate) clock: ClockKind,
    pub(crate) speed: f32,
    pub(crate) progress: f32,
    pub(crate) on_complete: Option<Box<dyn FnMut(Handle)>>,
    pub(crate) on_update: Option<Box<dyn FnMut(Handle, f32)>>,
    pub(crate) on_stop: Option<Box<dyn FnMut(Handle)>>,
    pub(crate) waiter: Option<Rc<WaitCell>>,
}

impl Instance {
    pub(crate) fn new(bp: &Blueprint, cfg: &PlayCfg) -> Self {
        Self {
            kind_key: bp.kind_key(),
            root: NodeInst::from_blueprint(bp),
            clock: cfg.clock,
            speed: cfg.speed,
            progress: 0.0,
            on_complete: None,
            on_update: None,
            on_stop: None,
            waiter: None,
        }
    }

    /// Reset a pooled shell for a fresh play. Callback slots and any waiter
    /// from the previous play are cleared.
    pub(crate) fn reinit(&mut self, bp: &Blueprint, cfg: &PlayCfg) {
        self.kind_key = bp.kind_key();
        self.root.reinit(bp);
        self.clock = cfg.clock;
        self.speed = cfg.speed;
        self.progress = 0.0;
        self.on_complete = None;
        self.on_update = None;
        self.on_stop = None;
        self.waiter = None;
    }
}
