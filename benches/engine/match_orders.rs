//! Crossing throughput: takers sweeping pre-seeded resting liquidity.
//!
//! Cores are rebuilt per batch, so the book range is kept small enough
//! that setup stays cheap relative to the measured sweep.

use criterion::{BatchSize, Criterion, Throughput};
use matchbook_rs::prelude::*;
use std::hint::black_box;

const MID: Price = 2_000;

fn bench_config() -> EngineConfig {
    EngineConfig {
        min_price_ticks: 1,
        max_price_ticks: 4_096,
        tick_size_ticks: 1,
        pool_capacity: 1 << 12,
        queue_capacity: 1 << 10,
        shard_id: 0,
        symbol: 1,
        tsc_calibration_path: None,
        risk: RiskConfig {
            performance_mode: true,
            ..RiskConfig::default()
        },
    }
}

fn seeded_core(levels: i64, orders_per_level: i64) -> ShardCore {
    let mut core = ShardCore::new(&bench_config()).expect("core");
    for level in 0..levels {
        for _ in 0..orders_per_level {
            core.process(Command::NewOrder(NewOrder::limit(
                Side::Sell,
                MID + level,
                10,
                1,
            )));
        }
    }
    core
}

pub fn benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_orders");
    group.throughput(Throughput::Elements(1));

    group.bench_function("single_level_full_fill", |b| {
        b.iter_batched_ref(
            || seeded_core(1, 1),
            |core| {
                core.process(black_box(Command::NewOrder(NewOrder::limit(
                    Side::Buy,
                    MID,
                    10,
                    1,
                ))));
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("sweep_four_levels", |b| {
        b.iter_batched_ref(
            || seeded_core(4, 4),
            |core| {
                core.process(black_box(Command::NewOrder(NewOrder::limit(
                    Side::Buy,
                    MID + 3,
                    160,
                    1,
                ))));
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("market_sweep_through_overflow", |b| {
        b.iter_batched_ref(
            || seeded_core(1, 48),
            |core| {
                core.process(black_box(Command::NewOrder(NewOrder::market(
                    Side::Buy,
                    480,
                    1,
                ))));
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}
