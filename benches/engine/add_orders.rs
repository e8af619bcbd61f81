//! Order entry throughput: resting inserts across a band of price levels.

use criterion::{Criterion, Throughput};
use matchbook_rs::prelude::*;
use std::hint::black_box;

fn bench_config() -> EngineConfig {
    EngineConfig {
        min_price_ticks: 1,
        max_price_ticks: 100_000,
        tick_size_ticks: 1,
        pool_capacity: 1 << 20,
        queue_capacity: 1 << 14,
        shard_id: 0,
        symbol: 1,
        tsc_calibration_path: None,
        risk: RiskConfig {
            performance_mode: true,
            ..RiskConfig::default()
        },
    }
}

pub fn benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_orders");
    group.throughput(Throughput::Elements(1));

    group.bench_function("rest_bid_spread_levels", |b| {
        let mut core = ShardCore::new(&bench_config()).expect("core");
        let mut price: Price = 50_000;
        let mut resting: u32 = 0;
        b.iter(|| {
            // Walk a 64-tick band below the mid so inserts never cross;
            // a periodic sweep keeps the pool from filling up.
            price = 49_937 + (price + 1 - 49_937) % 64;
            core.process(black_box(Command::NewOrder(NewOrder::limit(
                Side::Buy,
                price,
                10,
                1,
            ))));
            resting += 1;
            if resting == 64 {
                resting = 0;
                core.process(Command::NewOrder(NewOrder::market(
                    Side::Sell,
                    64 * 10,
                    1,
                )));
            }
        });
    });

    group.bench_function("rest_and_cancel_same_tick", |b| {
        let mut core = ShardCore::new(&bench_config()).expect("core");
        let sink = VecSink::new();
        core.add_sink(Box::new(sink.clone()));
        b.iter(|| {
            core.process(Command::NewOrder(NewOrder::limit(Side::Buy, 50_000, 10, 1)));
            let id = sink
                .drain()
                .iter()
                .find_map(|e| match e {
                    EngineEvent::Accept(a) => Some(a.order_id),
                    _ => None,
                })
                .expect("accept");
            core.process(black_box(Command::Cancel { order_id: id }));
            sink.drain();
        });
    });

    group.finish();
}
