//! Criterion micro-benchmarks for the event queue.

use std::hint::black_box;
use std::sync::Arc;
use std::thread;

use convoy_bench::event_script;
use convoy_core::Event;
use convoy_engine::{Dequeued, EventQueue};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

/// Benchmark: push then pop 1000 events on one thread (no contention).
fn bench_push_pop_1k(c: &mut Criterion) {
    let queue = EventQueue::<Event>::unbounded();
    let script = event_script(42, 1000);

    let mut group = c.benchmark_group("queue");
    group.throughput(Throughput::Elements(script.len() as u64));
    group.bench_function("push_pop_1k", |b| {
        b.iter(|| {
            for e in &script {
                let _ = queue.push(*e);
            }
            while let Some(e) = queue.try_dequeue() {
                black_box(e);
            }
        });
    });
    group.finish();
}

/// Benchmark: 4 producers push 1000 events each while one consumer waits.
fn bench_contended_4x1k(c: &mut Criterion) {
    let scripts: Vec<Vec<Event>> = (0..4).map(|seed| event_script(seed, 1000)).collect();

    let mut group = c.benchmark_group("queue");
    group.throughput(Throughput::Elements(4000));
    group.bench_function("contended_4x1k", |b| {
        b.iter(|| {
            let queue = Arc::new(EventQueue::<Event>::unbounded());
            let producers: Vec<_> = scripts
                .iter()
                .cloned()
                .map(|script| {
                    let q = Arc::clone(&queue);
                    thread::spawn(move || {
                        for e in script {
                            let _ = q.push(e);
                        }
                    })
                })
                .collect();

            let mut received = 0;
            while received < 4000 {
                if let Dequeued::Item(e) = queue.wait_and_dequeue() {
                    black_box(e);
                    received += 1;
                }
            }
            for p in producers {
                let _ = p.join();
            }
        });
    });
    group.finish();
}

criterion_group!(benches, bench_push_pop_1k, bench_contended_4x1k);
criterion_main!(benches);
