use std::cell::Cell;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use kinetic_tween_core::{then, Blueprint, Config, PlayCfg, Runner};

fn bench_tick(c: &mut Criterion) {
    c.bench_function("tick_64_leaf_tweens", |b| {
        let mut runner = Runner::new(Config::default());
        let sink = Rc::new(Cell::new(0.0f32));
        let bp = {
            let sink = sink.clone();
            Blueprint::tween_fn(1.0e6, move |v| sink.set(v))
        };
        for _ in 0..64 {
            runner.play(&bp, PlayCfg::default()).unwrap();
        }
        b.iter(|| {
            runner.tick(black_box(0.001), black_box(0.001));
            black_box(sink.get());
        });
    });

    c.bench_function("tick_16_sequences", |b| {
        let mut runner = Runner::new(Config::default());
        let sink = Rc::new(Cell::new(0.0f32));
        let leaf = {
            let sink = sink.clone();
            Blueprint::tween_fn(1.0e6, move |v| sink.set(v))
        };
        let bp = then(&then(&leaf, &leaf), &leaf);
        for _ in 0..16 {
            runner.play(&bp, PlayCfg::default()).unwrap();
        }
        b.iter(|| {
            runner.tick(black_box(0.001), black_box(0.001));
            black_box(sink.get());
        });
    });

    c.bench_function("play_stop_churn", |b| {
        let mut runner = Runner::new(Config::default());
        let bp = Blueprint::wait(1.0e6);
        runner.warm(&bp, 1);
        b.iter(|| {
            let h = runner.play(&bp, PlayCfg::default()).unwrap();
            runner.stop(black_box(h));
        });
    });
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
