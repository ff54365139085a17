//! Shared fixtures for the kinetic integration suites: recording appliers,
//! shared probes, and a small named catalog of standard blueprints.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::{anyhow, Result};

use kinetic_tween_core::{then, Blueprint, Easing};

/// Records every eased value applied to it, in order.
#[derive(Clone, Debug, Default)]
pub struct Recorder(Rc<RefCell<Vec<f32>>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closure suitable for [`Blueprint::tween_fn`].
    pub fn applier(&self) -> impl Fn(f32) + 'static {
        let sink = self.0.clone();
        move |value| sink.borrow_mut().push(value)
    }

    pub fn values(&self) -> Vec<f32> {
        self.0.borrow().clone()
    }

    pub fn last(&self) -> Option<f32> {
        self.0.borrow().last().copied()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Shared float probe for comparison conditions.
#[derive(Clone, Debug, Default)]
pub struct SharedValue(Rc<Cell<f32>>);

impl SharedValue {
    pub fn new(initial: f32) -> Self {
        Self(Rc::new(Cell::new(initial)))
    }

    pub fn set(&self, value: f32) {
        self.0.set(value);
    }

    pub fn get(&self) -> f32 {
        self.0.get()
    }

    /// Closure suitable for [`kinetic_tween_core::Condition::compare`].
    pub fn probe(&self) -> impl Fn() -> f32 + 'static {
        let cell = self.0.clone();
        move || cell.get()
    }
}

/// Standard blueprints used across the integration suites, applied onto
/// `recorder`.
pub fn blueprint(name: &str, recorder: &Recorder) -> Result<Blueprint> {
    match name {
        "half-second-linear" => Ok(Blueprint::tween_fn(0.5, recorder.applier())),
        "instant" => Ok(Blueprint::tween_fn(0.0, recorder.applier())),
        "delayed-quad" => Ok(Blueprint::tween_fn(0.4, recorder.applier())
            .with_delay(0.2)
            .with_easing(Easing::QuadIn)),
        "two-step" => {
            let a = Blueprint::tween_fn(0.2, recorder.applier());
            let b = Blueprint::tween_fn(0.3, recorder.applier());
            Ok(then(&a, &b))
        }
        other => Err(anyhow!("unknown blueprint fixture '{other}'")),
    }
}
