//! Mixed workload: adds, crossing takers and cancels interleaved the way
//! a live feed drives the book.

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
    let mut group = c.benchmark_group("mixed_operations");
    group.throughput(Throughput::Elements(1));

    // 70% adds, 20% takes, 10% cancels around a 16-tick band.
    group.bench_function("mixed_70_20_10", |b| {
        let mut core = ShardCore::new(&bench_config()).expect("core");
        let sink = VecSink::new();
        core.add_sink(Box::new(sink.clone()));

        let mut resting: Vec<u64> = Vec::with_capacity(1 << 16);
        let mut tick: u64 = 0;
        b.iter(|| {
            tick = tick.wrapping_add(1);
            let slot = tick % 10;
            let price = 50_000 - (tick % 16) as Price;
            if slot < 7 {
                core.process(Command::NewOrder(NewOrder::limit(Side::Buy, price, 5, 1)));
            } else if slot < 9 {
                // Sized so takers drain at least as fast as makers add.
                core.process(Command::NewOrder(
                    NewOrder::limit(Side::Sell, 49_984, 25, 1).with_tif(TimeInForce::Ioc),
                ));
            } else if let Some(order_id) = resting.pop() {
                core.process(Command::Cancel { order_id });
            }
            for event in sink.drain() {
                if let EngineEvent::Accept(a) = event {
                    resting.push(black_box(a.order_id));
                }
            }
        });
    });

    group.finish();
}
