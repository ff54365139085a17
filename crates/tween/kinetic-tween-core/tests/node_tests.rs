use std::cell::Cell;
use std::rc::Rc;

use kinetic_test_fixtures::{blueprint, Recorder, SharedValue};
use kinetic_tween_core::{
    Blueprint, CmpOp, Condition, Config, CustomNode, CustomStatus, Easing, JoinPolicy, NodeError,
    PlayCfg, Runner,
};

fn runner() -> Runner {
    Runner::new(Config::default())
}

fn play(runner: &mut Runner, bp: &Blueprint) -> kinetic_tween_core::Handle {
    runner.play(bp, PlayCfg::default()).unwrap()
}

/// it should complete a zero-duration leaf on its first tick with a single
/// apply of 1.0
#[test]
fn zero_duration_leaf() {
    let mut runner = runner();
    let rec = Recorder::new();
    let h = play(&mut runner, &blueprint("instant", &rec).unwrap());

    assert!(runner.is_playing(h), "completion waits for the first tick");
    runner.tick(0.016, 0.016);
    assert!(!runner.is_playing(h));
    assert_eq!(rec.values(), vec![1.0]);
}

/// it should not apply anything until the delay has elapsed
#[test]
fn delay_gates_applies() {
    let mut runner = runner();
    let rec = Recorder::new();
    // 0.4s QuadIn tween behind a 0.2s delay.
    let h = play(&mut runner, &blueprint("delayed-quad", &rec).unwrap());

    runner.tick(0.1, 0.1);
    assert!(rec.is_empty());
    assert!(runner.is_playing(h));

    runner.tick(0.2, 0.2);
    // 0.1s into the 0.4s duration: t = 0.25, eased t^2 = 0.0625.
    let eased = rec.last().unwrap();
    assert!((eased - 0.0625).abs() < 1e-3, "got {eased}");

    runner.tick(0.4, 0.4);
    assert!(!runner.is_playing(h));
    assert_eq!(rec.last(), Some(1.0));
}

/// it should apply eased values while reporting non-eased progress
#[test]
fn progress_is_not_eased() {
    let mut runner = runner();
    let rec = Recorder::new();
    let bp = Blueprint::tween_fn(1.0, rec.applier()).with_easing(Easing::QuadIn);
    let h = play(&mut runner, &bp);

    runner.tick(0.5, 0.5);
    assert!((rec.last().unwrap() - 0.25).abs() < 1e-6);
    assert!((runner.progress(h) - 0.5).abs() < 1e-6);
}

/// it should push non-decreasing values through the applier for a monotone
/// easing, ending exactly at 1.0
#[test]
fn applies_are_monotone() {
    let mut runner = runner();
    let rec = Recorder::new();
    let bp = Blueprint::tween_fn(1.0, rec.applier()).with_easing(Easing::CubicInOut);
    play(&mut runner, &bp);

    for _ in 0..12 {
        runner.tick(0.1, 0.1);
    }
    let values = rec.values();
    assert!(values.windows(2).all(|w| w[1] >= w[0]), "{values:?}");
    assert_eq!(values.last(), Some(&1.0));
}

/// it should complete a wait leaf without ever touching a target
#[test]
fn wait_applies_nothing() {
    let mut runner = runner();
    let h = play(&mut runner, &Blueprint::wait(0.3));
    let completed = Rc::new(Cell::new(false));
    let flag = completed.clone();
    runner.on_complete(h, move |_| flag.set(true));

    runner.tick(0.2, 0.2);
    assert!(!completed.get());
    runner.tick(0.2, 0.2);
    assert!(completed.get());
}

/// it should complete wait_until on the first tick its condition reads true
#[test]
fn wait_until_watches_the_condition() {
    let mut runner = runner();
    let value = SharedValue::new(0.0);
    let bp = Blueprint::wait_until(Condition::compare(value.probe(), CmpOp::Greater, 0.5));
    let h = play(&mut runner, &bp);

    runner.tick(1.0, 1.0);
    runner.tick(1.0, 1.0);
    assert!(runner.is_playing(h), "condition still false");

    value.set(0.9);
    runner.tick(1.0, 1.0);
    assert!(!runner.is_playing(h));
}

/// it should turn a false-gated conditional into a first-tick no-op that
/// never ticks its child
#[test]
fn conditional_false_gate_is_a_noop() {
    let mut runner = runner();
    let rec = Recorder::new();
    let bp = Blueprint::when(
        Condition::custom(|| false),
        Blueprint::tween_fn(0.5, rec.applier()),
    );
    let h = play(&mut runner, &bp);

    runner.tick(0.1, 0.1);
    assert!(!runner.is_playing(h));
    assert!(rec.is_empty(), "the child must never receive applies");
}

/// it should pass through to the child when the gate reads true at play
#[test]
fn conditional_true_gate_passes_through() {
    let mut runner = runner();
    let rec = Recorder::new();
    let bp = Blueprint::when(
        Condition::custom(|| true),
        Blueprint::tween_fn(0.25, rec.applier()),
    );
    let h = play(&mut runner, &bp);

    runner.tick(0.3, 0.3);
    assert!(!runner.is_playing(h));
    assert_eq!(rec.last(), Some(1.0));
}

/// it should sample the gate exactly once, at play
#[test]
fn conditional_gate_samples_once() {
    let mut runner = runner();
    let gate_reads = Rc::new(Cell::new(0u32));
    let reads = gate_reads.clone();
    let bp = Blueprint::when(
        Condition::custom(move || {
            reads.set(reads.get() + 1);
            true
        }),
        Blueprint::wait(1.0),
    );
    play(&mut runner, &bp);

    runner.tick(0.1, 0.1);
    runner.tick(0.1, 0.1);
    assert_eq!(gate_reads.get(), 1);
}

/// it should bound a repeat of a zero-duration child to one replay per tick
/// and complete after exactly the requested number of runs
#[test]
fn repeat_times_bounds_replays_per_tick() {
    let mut runner = runner();
    let rec = Recorder::new();
    let bp = Blueprint::repeat_times(Blueprint::tween_fn(0.0, rec.applier()), 3);
    let h = play(&mut runner, &bp);

    runner.tick(0.1, 0.1);
    assert_eq!(rec.len(), 1, "one replay per tick, never a same-tick spin");
    assert!(runner.is_playing(h));

    runner.tick(0.1, 0.1);
    assert_eq!(rec.len(), 2);
    assert!(runner.is_playing(h));

    runner.tick(0.1, 0.1);
    assert_eq!(rec.len(), 3);
    assert!(!runner.is_playing(h), "third completion satisfies the count");
}

/// it should replay until an external condition turns true
#[test]
fn repeat_until_external_condition() {
    let mut runner = runner();
    let rec = Recorder::new();
    let value = SharedValue::new(0.0);
    let bp = Blueprint::repeat_until(
        Blueprint::tween_fn(0.0, rec.applier()),
        Condition::compare(value.probe(), CmpOp::Greater, 0.5),
    );
    let h = play(&mut runner, &bp);

    for _ in 0..4 {
        runner.tick(0.1, 0.1);
    }
    assert!(runner.is_playing(h));
    assert_eq!(rec.len(), 4);

    value.set(1.0);
    runner.tick(0.1, 0.1);
    assert!(!runner.is_playing(h));
    assert_eq!(rec.len(), 5, "the final run still plays out");
}

struct AbortImmediately;

impl CustomNode for AbortImmediately {
    fn reset(&mut self) {}
    fn tick(&mut self, _dt: f32) -> Result<CustomStatus, NodeError> {
        Ok(CustomStatus::Stopped)
    }
}

/// it should keep an AllCompleted join open when a child stops short, and
/// close an AllTerminal join
#[test]
fn join_policy_distinguishes_stopped_children() {
    let mut runner = runner();
    let quick = Blueprint::wait(0.1);
    let aborter = Blueprint::custom("abort", || Box::new(AbortImmediately));

    let strict = Blueprint::parallel(vec![quick.clone(), aborter.clone()]);
    let h = play(&mut runner, &strict);
    for _ in 0..5 {
        runner.tick(0.1, 0.1);
    }
    assert!(
        runner.is_playing(h),
        "a stopped child never counts as completed under AllCompleted"
    );
    runner.stop(h);

    let lenient =
        Blueprint::parallel_with(vec![quick.clone(), aborter.clone()], JoinPolicy::AllTerminal);
    let h = play(&mut runner, &lenient);
    runner.tick(0.1, 0.1);
    runner.tick(0.1, 0.1);
    assert!(!runner.is_playing(h), "any terminal state counts here");
}

/// it should abort a sequence from the inside when a child stops itself,
/// releasing with stop semantics
#[test]
fn sequence_propagates_child_abort() {
    let mut runner = runner();
    let rec = Recorder::new();
    let bp = Blueprint::sequence(vec![
        Blueprint::custom("abort", || Box::new(AbortImmediately)),
        Blueprint::tween_fn(0.5, rec.applier()),
    ]);
    let h = play(&mut runner, &bp);
    let stopped = Rc::new(Cell::new(false));
    let flag = stopped.clone();
    runner.on_stop(h, move |_| flag.set(true));

    runner.tick(0.1, 0.1);
    assert!(!runner.is_playing(h));
    assert!(stopped.get());
    assert!(rec.is_empty(), "later children never start");
}

/// it should honor a composite-level delay before any child ticks
#[test]
fn composite_delay_holds_children_back() {
    let mut runner = runner();
    let rec = Recorder::new();
    let bp = Blueprint::sequence(vec![Blueprint::tween_fn(0.25, rec.applier())]).with_delay(0.5);
    let h = play(&mut runner, &bp);

    runner.tick(0.25, 0.25);
    assert!(rec.is_empty());

    runner.tick(0.5, 0.5);
    assert!(!runner.is_playing(h));
    assert_eq!(rec.last(), Some(1.0));
}
