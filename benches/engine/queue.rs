//! SPSC ring transfer cost, single-threaded and cross-thread.

use criterion::{Criterion, Throughput};
use matchbook_rs::engine::queue::ring;
use matchbook_rs::prelude::*;
use std::hint::black_box;

pub fn benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("command_queue");
    group.throughput(Throughput::Elements(1));

    group.bench_function("push_pop_same_thread", |b| {
        let (mut tx, mut rx) = ring::<Command>(1 << 12).expect("ring");
        let command = Command::NewOrder(NewOrder::limit(Side::Buy, 100, 10, 1));
        b.iter(|| {
            assert!(tx.try_push(black_box(command)));
            black_box(rx.try_pop()).expect("just pushed");
        });
    });

    group.bench_function("batch_dequeue_16", |b| {
        let (mut tx, mut rx) = ring::<Command>(1 << 12).expect("ring");
        let command = Command::NewOrder(NewOrder::limit(Side::Buy, 100, 10, 1));
        let mut buf = [command; 16];
        b.iter(|| {
            for _ in 0..16 {
                assert!(tx.try_push(command));
            }
            assert_eq!(rx.pop_batch(black_box(&mut buf)), 16);
        });
    });

    group.finish();
}
