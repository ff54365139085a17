//! The scheduling runner: slots, generations, dense active list, pooling.
//!
//! A runner owns every instance it plays. Slots live in one flat vector;
//! the dense active list holds the indices of non-terminal instances and is
//! the only thing the tick loop walks (no hashed lookups on that path).
//! Releasing a slot bumps its generation, which is what invalidates every
//! outstanding handle for that play, and parks the boxed instance shell on
//! its kind's free list for reuse.
//!
//! Multiple runners may coexist; pools, generations and active lists are
//! never shared between them. A process-wide default runner is available
//! through [`with_default_runner`].

use std::cell::RefCell;
use std::rc::Rc;

use hashbrown::HashMap;

use crate::config::Config;
use crate::error::PlayError;
use crate::handle::{Generation, Handle, SlotIx};
use crate::hooks::{Hooks, Mark};
use crate::instance::{ClockKind, Instance, State};
use crate::lifetime::Lifetime;
use crate::node::{Blueprint, KindKey};
use crate::outputs::{Outputs, RunnerEvent};
use crate::suspend::{Completion, Outcome, WaitCell};

/// Marks a slot that is not on the dense active list.
const INACTIVE: u32 = u32::MAX;

/// Per-play configuration.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct PlayCfg {
    /// Scales the delta applied to this instance; 0.0 freezes it without
    /// pausing.
    pub speed: f32,
    /// Which of the two per-frame deltas drives this instance.
    pub clock: ClockKind,
}

impl Default for PlayCfg {
    fn default() -> Self {
        Self {
            speed: 1.0,
            clock: ClockKind::Scaled,
        }
    }
}

/// Read-only pool observability.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PoolStats {
    /// Total slots ever allocated (live plus pooled shells).
    pub slots: usize,
    /// Instances currently on the dense active list.
    pub active: usize,
    /// Released shells parked on free lists.
    pub pooled: usize,
    /// Highest concurrent active count observed.
    pub peak_active: usize,
}

struct Slot {
    generation: u32,
    /// Position on the dense active list, or [`INACTIVE`].
    active_pos: u32,
    instance: Option<Box<Instance>>,
}

pub struct Runner {
    cfg: Config,
    slots: Vec<Slot>,
    active: Vec<u32>,
    free: HashMap<KindKey, Vec<u32>>,
    links: Vec<(Lifetime, Handle)>,
    outputs: Outputs,
    hooks: Option<Box<dyn Hooks>>,
    peak_active: usize,
}

impl Runner {
    pub fn new(cfg: Config) -> Self {
        Self {
            slots: Vec::with_capacity(cfg.slot_capacity),
            active: Vec::with_capacity(cfg.active_capacity),
            free: HashMap::new(),
            links: Vec::new(),
            outputs: Outputs::default(),
            hooks: None,
            peak_active: 0,
            cfg,
        }
    }

    /// Install begin/end profiling markers. `None` removes them.
    pub fn set_hooks(&mut self, hooks: Option<Box<dyn Hooks>>) {
        self.hooks = hooks;
    }

    /// Schedule one play of `bp`, returning a handle to the new instance.
    ///
    /// Reuses a pooled same-kind shell when one is free; otherwise allocates
    /// a new slot (the documented warm-up allocation). Fails only when the
    /// configured hard cap is reached.
    pub fn play(&mut self, bp: &Blueprint, cfg: PlayCfg) -> Result<Handle, PlayError> {
        self.begin(Mark::Play);
        let result = self.play_inner(bp, &cfg);
        self.end(Mark::Play);
        result
    }

    fn play_inner(&mut self, bp: &Blueprint, cfg: &PlayCfg) -> Result<Handle, PlayError> {
        bp.validate()?;
        let key = bp.kind_key();
        let ix = match self.free.get_mut(&key).and_then(Vec::pop) {
            Some(ix) => {
                let slot = &mut self.slots[ix as usize];
                if let Some(shell) = slot.instance.as_deref_mut() {
                    shell.reinit(bp, cfg);
                }
                log::trace!("slot {ix} reused for {key:?}");
                ix
            }
            None => {
                if let Some(cap) = self.cfg.max_slots {
                    if self.slots.len() >= cap {
                        log::warn!(
                            "play rejected, {} slots allocated (cap {cap})",
                            self.slots.len()
                        );
                        return Err(PlayError::CapacityExhausted {
                            in_use: self.slots.len(),
                            cap,
                        });
                    }
                }
                let ix = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    active_pos: INACTIVE,
                    instance: Some(Box::new(Instance::new(bp, cfg))),
                });
                log::debug!("slot pool grew to {} ({key:?})", self.slots.len());
                ix
            }
        };

        let slot = &mut self.slots[ix as usize];
        slot.active_pos = self.active.len() as u32;
        self.active.push(ix);
        self.peak_active = self.peak_active.max(self.active.len());
        if let Some(inst) = slot.instance.as_deref_mut() {
            inst.root.start();
        }
        Ok(Handle {
            slot: SlotIx(ix),
            generation: Generation(slot.generation),
        })
    }

    /// Pre-populate the pool with `count` shells for `bp`'s kind so that
    /// later plays reuse instead of allocating. Returns how many shells were
    /// actually created (the hard cap still applies).
    pub fn warm(&mut self, bp: &Blueprint, count: usize) -> usize {
        let key = bp.kind_key();
        let cfg = PlayCfg::default();
        let mut created = 0;
        for _ in 0..count {
            if let Some(cap) = self.cfg.max_slots {
                if self.slots.len() >= cap {
                    break;
                }
            }
            let ix = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                active_pos: INACTIVE,
                instance: Some(Box::new(Instance::new(bp, &cfg))),
            });
            self.free.entry(key.clone()).or_default().push(ix);
            created += 1;
        }
        log::debug!("warmed {created} shells for {key:?}");
        created
    }

    /// Stop a play. No-op on a stale handle; idempotent. Invokes the stop
    /// callback (not the completion callback) and resolves any waiter with
    /// [`Outcome::Interrupted`].
    pub fn stop(&mut self, handle: Handle) {
        self.begin(Mark::Stop);
        self.stop_inner(handle);
        self.end(Mark::Stop);
    }

    fn stop_inner(&mut self, handle: Handle) {
        if !self.is_valid(handle) {
            return;
        }
        let ix = handle.slot.0;
        let mut inst = match self.slots[ix as usize].instance.take() {
            Some(inst) => inst,
            None => return,
        };
        inst.root.state = State::Stopped;
        if let Some(mut cb) = inst.on_stop.take() {
            cb(handle);
        }
        if let Some(waiter) = inst.waiter.take() {
            waiter.resolve(Outcome::Interrupted);
        }
        self.slots[ix as usize].instance = Some(inst);
        self.release(ix);
    }

    /// Stop every active instance.
    pub fn stop_all(&mut self) {
        while let Some(&ix) = self.active.last() {
            let handle = Handle {
                slot: SlotIx(ix),
                generation: Generation(self.slots[ix as usize].generation),
            };
            self.stop(handle);
        }
    }

    /// Advance every active instance by one frame.
    ///
    /// `dt` is the scaled delta, `unscaled_dt` the raw one; each instance
    /// picks per its clock. The dense list is walked from the back so the
    /// swap-removal of a completing entry never skips or double-processes
    /// another. Returns the events observed this tick.
    pub fn tick(&mut self, dt: f32, unscaled_dt: f32) -> &Outputs {
        self.begin(Mark::Tick);
        self.outputs.clear();
        self.sweep_expired_links();

        let mut i = self.active.len();
        while i > 0 {
            i -= 1;
            let ix = self.active[i];
            let state = self.slots[ix as usize]
                .instance
                .as_deref()
                .map(|inst| inst.root.state);
            if state != Some(State::Playing) {
                continue;
            }
            // Take the instance out of its slot so callbacks and the
            // release path below can borrow the runner freely.
            let mut inst = match self.slots[ix as usize].instance.take() {
                Some(inst) => inst,
                None => continue,
            };
            let step = match inst.clock {
                ClockKind::Scaled => dt,
                ClockKind::Unscaled => unscaled_dt,
            } * inst.speed;
            let handle = Handle {
                slot: SlotIx(ix),
                generation: Generation(self.slots[ix as usize].generation),
            };

            let failure = inst.root.tick(step).err();
            inst.progress = inst.root.progress();

            if let Some(err) = failure {
                log::warn!("instance {ix} failed and was stopped: {err}");
                if let Some(mut cb) = inst.on_stop.take() {
                    cb(handle);
                }
                if let Some(waiter) = inst.waiter.take() {
                    waiter.resolve(Outcome::Interrupted);
                }
                self.push_event(RunnerEvent::Error {
                    handle,
                    message: err.0,
                });
                self.slots[ix as usize].instance = Some(inst);
                self.release(ix);
                continue;
            }

            if let Some(cb) = inst.on_update.as_mut() {
                cb(handle, inst.progress);
            }

            match inst.root.state {
                State::Completed => {
                    inst.progress = 1.0;
                    if let Some(mut cb) = inst.on_complete.take() {
                        cb(handle);
                    }
                    if let Some(waiter) = inst.waiter.take() {
                        waiter.resolve(Outcome::Completed);
                    }
                    self.push_event(RunnerEvent::Completed { handle });
                    self.slots[ix as usize].instance = Some(inst);
                    self.release(ix);
                }
                State::Stopped => {
                    // A node aborted the tree from the inside; release with
                    // stop semantics.
                    if let Some(mut cb) = inst.on_stop.take() {
                        cb(handle);
                    }
                    if let Some(waiter) = inst.waiter.take() {
                        waiter.resolve(Outcome::Interrupted);
                    }
                    self.push_event(RunnerEvent::Stopped { handle });
                    self.slots[ix as usize].instance = Some(inst);
                    self.release(ix);
                }
                _ => {
                    self.slots[ix as usize].instance = Some(inst);
                }
            }
        }

        self.end(Mark::Tick);
        &self.outputs
    }

    /// True while the handle references a live (Playing or Paused) instance.
    pub fn is_playing(&self, handle: Handle) -> bool {
        self.is_valid(handle)
    }

    /// True while the handle is live and currently paused.
    pub fn is_paused(&self, handle: Handle) -> bool {
        self.instance(handle)
            .map(|inst| inst.root.state == State::Paused)
            .unwrap_or(false)
    }

    /// Last computed normalized (non-eased) progress of the play.
    ///
    /// Returns the documented sentinel 0.0 on a stale handle; a completing
    /// instance reads 1.0 up to the moment its slot is released.
    pub fn progress(&self, handle: Handle) -> f32 {
        self.instance(handle).map(|inst| inst.progress).unwrap_or(0.0)
    }

    /// Playing -> Paused; no-op from any other state.
    pub fn pause(&mut self, handle: Handle) {
        if let Some(inst) = self.instance_mut(handle) {
            if inst.root.state == State::Playing {
                inst.root.state = State::Paused;
            }
        }
    }

    /// Paused -> Playing; no-op from any other state.
    pub fn resume(&mut self, handle: Handle) {
        if let Some(inst) = self.instance_mut(handle) {
            if inst.root.state == State::Paused {
                inst.root.state = State::Playing;
            }
        }
    }

    /// Attach the completion callback; the last registration wins.
    pub fn on_complete(&mut self, handle: Handle, cb: impl FnMut(Handle) + 'static) {
        if let Some(inst) = self.instance_mut(handle) {
            inst.on_complete = Some(Box::new(cb));
        }
    }

    /// Attach the per-tick update callback (receives normalized progress);
    /// the last registration wins.
    pub fn on_update(&mut self, handle: Handle, cb: impl FnMut(Handle, f32) + 'static) {
        if let Some(inst) = self.instance_mut(handle) {
            inst.on_update = Some(Box::new(cb));
        }
    }

    /// Attach the stop callback; the last registration wins. Fires on
    /// explicit stop and internal aborts, never on natural completion.
    pub fn on_stop(&mut self, handle: Handle, cb: impl FnMut(Handle) + 'static) {
        if let Some(inst) = self.instance_mut(handle) {
            inst.on_stop = Some(Box::new(cb));
        }
    }

    /// Stop the play automatically once `lifetime`'s owner goes away.
    ///
    /// A weak association: the runner never extends the owner's life, it
    /// only observes expiry at the start of each tick.
    pub fn link_lifetime(&mut self, handle: Handle, lifetime: &Lifetime) {
        if self.is_valid(handle) {
            self.links.push((lifetime.clone(), handle));
        }
    }

    /// Single-resumption wait for the play's terminal state. A second
    /// adapter for the same handle replaces the first; a stale handle
    /// resolves immediately with [`Outcome::Interrupted`].
    pub fn completion(&mut self, handle: Handle) -> Completion {
        match self.instance_mut(handle) {
            Some(inst) => {
                let cell = Rc::new(WaitCell::default());
                inst.waiter = Some(Rc::clone(&cell));
                Completion::new(cell)
            }
            None => Completion::ready(Outcome::Interrupted),
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            slots: self.slots.len(),
            active: self.active.len(),
            pooled: self.free.values().map(Vec::len).sum(),
            peak_active: self.peak_active,
        }
    }

    fn is_valid(&self, handle: Handle) -> bool {
        self.slots
            .get(handle.slot.0 as usize)
            .map(|slot| slot.generation == handle.generation.0 && slot.active_pos != INACTIVE)
            .unwrap_or(false)
    }

    fn instance(&self, handle: Handle) -> Option<&Instance> {
        if !self.is_valid(handle) {
            return None;
        }
        self.slots[handle.slot.0 as usize].instance.as_deref()
    }

    fn instance_mut(&mut self, handle: Handle) -> Option<&mut Instance> {
        if !self.is_valid(handle) {
            return None;
        }
        self.slots[handle.slot.0 as usize].instance.as_deref_mut()
    }

    /// Release an active slot: O(1) swap-removal from the dense list, bump
    /// the generation (stales every handle for this play), park the shell.
    fn release(&mut self, ix: u32) {
        let pos = {
            let slot = &mut self.slots[ix as usize];
            let pos = slot.active_pos as usize;
            slot.active_pos = INACTIVE;
            slot.generation = slot.generation.wrapping_add(1);
            pos
        };
        self.active.swap_remove(pos);
        if let Some(&moved) = self.active.get(pos) {
            self.slots[moved as usize].active_pos = pos as u32;
        }
        if let Some(key) = self.slots[ix as usize]
            .instance
            .as_ref()
            .map(|inst| inst.kind_key.clone())
        {
            self.free.entry(key).or_default().push(ix);
        }
        log::trace!("slot {ix} released");
    }

    /// Stop instances whose linked owner expired; drop links whose handle
    /// already went stale.
    fn sweep_expired_links(&mut self) {
        let mut i = 0;
        while i < self.links.len() {
            let (lifetime, handle) = &self.links[i];
            if lifetime.alive() && self.is_valid(*handle) {
                i += 1;
                continue;
            }
            let (lifetime, handle) = self.links.swap_remove(i);
            if lifetime.expired() && self.is_valid(handle) {
                log::debug!("owner expired, stopping linked instance {}", handle.slot.0);
                self.stop_inner(handle);
                self.push_event(RunnerEvent::Stopped { handle });
            }
        }
    }

    fn push_event(&mut self, event: RunnerEvent) {
        if self.outputs.events.len() < self.cfg.max_events_per_tick {
            self.outputs.events.push(event);
        } else {
            log::warn!("event buffer full, dropping {event:?}");
        }
    }

    fn begin(&self, mark: Mark) {
        if let Some(hooks) = &self.hooks {
            hooks.begin(mark);
        }
    }

    fn end(&self, mark: Mark) {
        if let Some(hooks) = &self.hooks {
            hooks.end(mark);
        }
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

thread_local! {
    static DEFAULT_RUNNER: RefCell<Option<Runner>> = const { RefCell::new(None) };
}

/// Run `f` against the process-wide default runner.
///
/// The runner is constructed with `Config::default()` on first use and again
/// after [`reset_default_runner`]; it persists for the thread's lifetime
/// otherwise.
pub fn with_default_runner<R>(f: impl FnOnce(&mut Runner) -> R) -> R {
    DEFAULT_RUNNER.with(|cell| {
        let mut slot = cell.borrow_mut();
        let runner = slot.get_or_insert_with(Runner::default);
        f(runner)
    })
}

/// Tear down the default runner; the next access transparently recreates it.
pub fn reset_default_runner() {
    DEFAULT_RUNNER.with(|cell| {
        cell.borrow_mut().take();
    });
}
