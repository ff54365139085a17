//! Suspension adapter: await a play's terminal state.
//!
//! [`Completion`] bridges handle completion to a single-resumption suspend
//! point. One waiter per handle; creating a second adapter for the same
//! handle replaces the first. A stopped instance still resumes its waiter,
//! with the distinct [`Outcome::Interrupted`], so a waiter never hangs.
//! The future never blocks the thread; a later tick on the same thread
//! drives it to readiness.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// How a play finished, as observed by a completion waiter.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The instance ran to natural completion.
    Completed,
    /// The instance was stopped, or the handle was already stale when the
    /// adapter was created.
    Interrupted,
}

/// Shared cell between a [`Completion`] future and the instance it waits on.
#[derive(Debug, Default)]
pub(crate) struct WaitCell {
    outcome: Cell<Option<Outcome>>,
    waker: RefCell<Option<Waker>>,
}

impl WaitCell {
    /// Record the outcome (first write wins) and wake any stored waker.
    pub(crate) fn resolve(&self, outcome: Outcome) {
        if self.outcome.get().is_none() {
            self.outcome.set(Some(outcome));
        }
        if let Some(waker) = self.waker.borrow_mut().take() {
            waker.wake();
        }
    }
}

/// Future resolving when the referenced play reaches a terminal state.
pub struct Completion {
    cell: Rc<WaitCell>,
}

impl Completion {
    pub(crate) fn new(cell: Rc<WaitCell>) -> Self {
        Self { cell }
    }

    pub(crate) fn ready(outcome: Outcome) -> Self {
        let cell = WaitCell::default();
        cell.outcome.set(Some(outcome));
        Self {
            cell: Rc::new(cell),
        }
    }

    /// Non-blocking probe for the recorded outcome.
    pub fn outcome(&self) -> Option<Outcome> {
        self.cell.outcome.get()
    }
}

impl Future for Completion {
    type Output = Outcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Outcome> {
        match self.cell.outcome.get() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                *self.cell.waker.borrow_mut() = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
