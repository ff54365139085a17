//! Optional profiling hooks.
//!
//! Hosts that want timing markers around scheduling operations install a
//! [`Hooks`] implementation on the runner; everything is a no-op otherwise.

/// Scheduling operation being marked.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Mark {
    Play,
    Stop,
    Tick,
}

/// Begin/end markers around scheduling operations.
pub trait Hooks {
    fn begin(&self, mark: Mark) {
        let _ = mark;
    }
    fn end(&self, mark: Mark) {
        let _ = mark;
    }
}
