//! Synthetic tick replay: a producer thread streams market-data frames
//! and taker orders through the SPSC ring into a running shard worker.

use matchbook_rs::prelude::*;
use std::time::Instant;

const FRAMES: u64 = 20_000;
const MID: Price = 50_000;

fn replay_config() -> EngineConfig {
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

fn frame_at(step: u64) -> MarketDataFrame {
    // A drifting two-level book around the mid.
    let drift = (step % 32) as Price;
    let bids = [
        LevelUpdate {
            price: MID - 1 - drift,
            qty: 10,
        },
        LevelUpdate {
            price: MID - 2 - drift,
            qty: 20,
        },
    ];
    let asks = [
        LevelUpdate {
            price: MID + 1 + drift,
            qty: 10,
        },
        LevelUpdate {
            price: MID + 2 + drift,
            qty: 20,
        },
    ];
    MarketDataFrame::from_levels(1, &bids, &asks)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut handle = spawn_shard(&replay_config(), vec![Box::new(NullSink)])?;
    let started = Instant::now();

    for step in 0..FRAMES {
        let mut command = Command::MarketData(frame_at(step));
        while !handle.submit(command) {
            std::hint::spin_loop();
        }
        // Every fourth frame, an aggressive taker eats the near level.
        if step % 4 == 3 {
            command = Command::NewOrder(NewOrder::market(Side::Buy, 10, 1));
            while !handle.submit(command) {
                std::hint::spin_loop();
            }
        }
    }

    let stats = loop {
        let stats = handle.stats();
        if stats.commands >= FRAMES + FRAMES / 4 {
            break stats;
        }
        std::thread::yield_now();
    };
    let elapsed = started.elapsed();

    let core = handle.shutdown();
    println!(
        "replayed {} commands in {:.3}s ({:.0} cmd/s)",
        stats.commands,
        elapsed.as_secs_f64(),
        stats.commands as f64 / elapsed.as_secs_f64()
    );
    println!(
        "accepted={} rejected={} trades={}",
        stats.accepted, stats.rejected, stats.trades
    );
    println!(
        "final top: bid={:?} ask={:?}",
        core.book().best_bid(),
        core.book().best_ask()
    );
    Ok(())
}
