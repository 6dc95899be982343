//! Criterion benchmarks for state-machine dispatch.

use std::hint::black_box;

use convoy_bench::{event_script, idle_subsystems};
use convoy_core::{transition, Event, RunState};
use convoy_engine::{Controller, ControllerConfig};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

/// Benchmark: fold 10K events through the pure transition function.
fn bench_transition_10k(c: &mut Criterion) {
    let script = event_script(3, 10_000);

    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(script.len() as u64));
    group.bench_function("transition_10k", |b| {
        b.iter(|| {
            let mut state = RunState::Stopped;
            for e in &script {
                let t = transition(state, *e);
                state = t.to;
                black_box(&t.effects);
            }
            state
        });
    });
    group.finish();
}

/// Benchmark: dispatch 1K events against live worker threads.
///
/// Controller setup and Close (spawn plus join) are outside the timed loop.
fn bench_controller_dispatch_1k(c: &mut Criterion) {
    let script = event_script(11, 1000);
    let Ok(mut controller) = Controller::new(ControllerConfig::default(), idle_subsystems())
    else {
        return;
    };
    let _ = controller.dispatch(Event::Start);

    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(script.len() as u64));
    group.bench_function("controller_dispatch_1k", |b| {
        b.iter(|| {
            for e in &script {
                let _ = black_box(controller.dispatch(*e));
            }
        });
    });
    group.finish();

    let _ = controller.dispatch(Event::Close);
}

criterion_group!(benches, bench_transition_10k, bench_controller_dispatch_1k);
criterion_main!(benches);
