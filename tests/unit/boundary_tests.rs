//! Boundary behavior: price range edges, capacity limits, overflow spill.

use matchbook_rs::prelude::*;

fn config(pool_capacity: usize) -> EngineConfig {
    EngineConfig {
        min_price_ticks: 10,
        max_price_ticks: 1_000,
        tick_size_ticks: 1,
        pool_capacity,
        queue_capacity: 16,
        shard_id: 0,
        symbol: 1,
        tsc_calibration_path: None,
        risk: RiskConfig {
            performance_mode: true,
            ..RiskConfig::default()
        },
    }
}

fn core_with_sink(cfg: EngineConfig) -> (ShardCore, VecSink) {
    let mut core = ShardCore::new(&cfg).expect("valid config");
    let sink = VecSink::new();
    core.add_sink(Box::new(sink.clone()));
    (core, sink)
}

fn first_reject(events: &[EngineEvent]) -> Option<RejectReason> {
    events.iter().find_map(|e| match e {
        EngineEvent::Reject(r) => Some(r.reason),
        _ => None,
    })
}

#[test]
fn order_at_min_price_is_accepted() {
    let (mut core, sink) = core_with_sink(config(64));
    core.process(Command::NewOrder(NewOrder::limit(Side::Buy, 10, 1, 1)));
    let events = sink.drain();
    assert!(first_reject(&events).is_none());
    assert_eq!(core.book().best_bid(), Some(10));
}

#[test]
fn order_at_max_price_is_accepted() {
    let (mut core, sink) = core_with_sink(config(64));
    core.process(Command::NewOrder(NewOrder::limit(Side::Sell, 1_000, 1, 1)));
    let events = sink.drain();
    assert!(first_reject(&events).is_none());
    assert_eq!(core.book().best_ask(), Some(1_000));
}

#[test]
fn order_beyond_max_price_rejects() {
    let (mut core, sink) = core_with_sink(config(64));
    core.process(Command::NewOrder(NewOrder::limit(Side::Sell, 1_001, 1, 1)));
    assert_eq!(
        first_reject(&sink.drain()),
        Some(RejectReason::PriceOutOfRange)
    );
}

#[test]
fn order_below_min_price_rejects() {
    let (mut core, sink) = core_with_sink(config(64));
    core.process(Command::NewOrder(NewOrder::limit(Side::Buy, 9, 1, 1)));
    assert_eq!(
        first_reject(&sink.drain()),
        Some(RejectReason::PriceOutOfRange)
    );
}

#[test]
fn off_grid_price_rejects() {
    let mut cfg = config(64);
    cfg.tick_size_ticks = 5;
    // Range 10..=1000 is not a whole number of 5-tick steps from 10 unless
    // the max lands on the grid; pick one that does.
    cfg.max_price_ticks = 1_005;
    let (mut core, sink) = core_with_sink(cfg);

    core.process(Command::NewOrder(NewOrder::limit(Side::Buy, 12, 1, 1)));
    assert_eq!(
        first_reject(&sink.drain()),
        Some(RejectReason::PriceOutOfRange)
    );

    core.process(Command::NewOrder(NewOrder::limit(Side::Buy, 15, 1, 1)));
    assert!(first_reject(&sink.drain()).is_none());
}

#[test]
fn pool_exhaustion_rejects_capacity_plus_one() {
    let (mut core, sink) = core_with_sink(config(4));
    for _ in 0..4 {
        core.process(Command::NewOrder(NewOrder::limit(Side::Buy, 100, 1, 1)));
    }
    assert!(first_reject(&sink.drain()).is_none());

    core.process(Command::NewOrder(NewOrder::limit(Side::Buy, 100, 1, 1)));
    assert_eq!(
        first_reject(&sink.drain()),
        Some(RejectReason::PoolExhausted)
    );

    // Cancelling one live order makes room again once reclaimed.
    assert_eq!(core.pool().live_count(), 4);
}

#[test]
fn full_queue_refuses_submit_without_side_effects() {
    let cfg = config(64);
    let sink = VecSink::new();
    let mut handle = spawn_shard(&cfg, vec![Box::new(sink.clone())]).expect("spawn");

    // Saturate the ring faster than the worker drains in the worst case;
    // submit must eventually report full-or-accepted, never panic or
    // partially apply.
    let mut accepted = 0u64;
    let mut refused = 0u64;
    for _ in 0..100_000 {
        if handle.submit(Command::NewOrder(NewOrder::limit(Side::Buy, 100, 1, 1))) {
            accepted += 1;
        } else {
            refused += 1;
        }
    }
    let core = handle.shutdown();
    assert_eq!(accepted + refused, 100_000);
    // Every accepted command was processed exactly once.
    assert_eq!(core.stats().snapshot().commands, accepted);
}

#[test]
fn hot_window_spill_keeps_matching_in_arrival_order() {
    let (mut core, sink) = core_with_sink(config(128));

    // 33 sells at one tick: the 33rd spills to overflow.
    let mut maker_ids = Vec::new();
    for _ in 0..33 {
        core.process(Command::NewOrder(NewOrder::limit(Side::Sell, 100, 1, 1)));
        let events = sink.drain();
        let id = events
            .iter()
            .find_map(|e| match e {
                EngineEvent::Accept(a) => Some(a.order_id),
                _ => None,
            })
            .expect("accept");
        maker_ids.push(id);
    }
    assert_eq!(core.book().orders_at(100, Side::Sell), 33);

    core.process(Command::NewOrder(NewOrder::limit(Side::Buy, 100, 33, 1)));
    let events = sink.drain();
    let fill_order: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::Trade(t) => Some(t.maker_id),
            _ => None,
        })
        .collect();
    assert_eq!(fill_order, maker_ids);
    assert_eq!(core.book().best_ask(), None);
}

#[test]
fn invalid_configs_fail_construction() {
    let mut cfg = config(64);
    cfg.queue_capacity = 12;
    assert!(ShardCore::new(&cfg).is_err());

    let mut cfg = config(64);
    cfg.tick_size_ticks = 0;
    assert!(ShardCore::new(&cfg).is_err());

    let mut cfg = config(64);
    cfg.min_price_ticks = 100;
    cfg.max_price_ticks = 50;
    assert!(ShardCore::new(&cfg).is_err());

    let cfg = config(0);
    assert!(ShardCore::new(&cfg).is_err());
}
