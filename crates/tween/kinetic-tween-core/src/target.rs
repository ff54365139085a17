//! Property-apply contract between the kernel and host targets.
//!
//! The kernel never interprets the property being animated; a leaf only
//! pushes eased progress values through this seam. A missing target must not
//! fail the tick, so appliers report [`ApplyStatus::TargetGone`] and the leaf
//! skips the mutation.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Outcome of one apply step.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ApplyStatus {
    Applied,
    TargetGone,
}

/// Applies an eased progress value in [0,1] to some external target.
///
/// Implementations capture their target themselves (typically behind
/// `Rc`/`Weak`) and use interior mutability; apply is called once per tick
/// while the owning leaf is playing, including the completing tick with 1.0.
pub trait Applier {
    fn apply(&self, eased: f32) -> ApplyStatus;
}

impl<F: Fn(f32)> Applier for F {
    fn apply(&self, eased: f32) -> ApplyStatus {
        self(eased);
        ApplyStatus::Applied
    }
}

/// Applier over a weakly referenced host object.
///
/// Skips the mutation once the target has been dropped.
pub struct WeakApplier<T> {
    target: Weak<RefCell<T>>,
    write: fn(&mut T, f32),
}

impl<T> WeakApplier<T> {
    pub fn new(target: &Rc<RefCell<T>>, write: fn(&mut T, f32)) -> Self {
        Self {
            target: Rc::downgrade(target),
            write,
        }
    }
}

impl<T> Applier for WeakApplier<T> {
    fn apply(&self, eased: f32) -> ApplyStatus {
        match self.target.upgrade() {
            Some(target) => {
                (self.write)(&mut target.borrow_mut(), eased);
                ApplyStatus::Applied
            }
            None => ApplyStatus::TargetGone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_always_report_applied() {
        let applier = |_: f32| {};
        assert_eq!(applier.apply(0.5), ApplyStatus::Applied);
    }

    #[test]
    fn weak_applier_writes_while_target_lives() {
        let target = Rc::new(RefCell::new(0.0f32));
        let applier = WeakApplier::new(&target, |t, v| *t = v);
        assert_eq!(applier.apply(0.75), ApplyStatus::Applied);
        assert_eq!(*target.borrow(), 0.75);
    }

    #[test]
    fn weak_applier_skips_after_target_drops() {
        let target = Rc::new(RefCell::new(0.0f32));
        let applier = WeakApplier::new(&target, |t, v| *t = v);
        drop(target);
        assert_eq!(applier.apply(0.75), ApplyStatus::TargetGone);
    }
}
