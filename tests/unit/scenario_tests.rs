//! End-to-end order-entry scenarios driven through a shard core.

use matchbook_rs::prelude::*;

fn test_config() -> EngineConfig {
    EngineConfig {
        min_price_ticks: 1,
        max_price_ticks: 10_000,
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

fn core_with_sink(config: EngineConfig) -> (ShardCore, VecSink) {
    let mut core = ShardCore::new(&config).expect("valid config");
    let sink = VecSink::new();
    core.add_sink(Box::new(sink.clone()));
    (core, sink)
}

fn limit(side: Side, price: Price, qty: Quantity) -> Command {
    Command::NewOrder(NewOrder::limit(side, price, qty, 1))
}

fn trades(events: &[EngineEvent]) -> Vec<Trade> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::Trade(t) => Some(*t),
            _ => None,
        })
        .collect()
}

fn accepts(events: &[EngineEvent]) -> Vec<Accept> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::Accept(a) => Some(*a),
            _ => None,
        })
        .collect()
}

fn rejects(events: &[EngineEvent]) -> Vec<Reject> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::Reject(r) => Some(*r),
            _ => None,
        })
        .collect()
}

/// S1: full fill. The resting sell earns the only accept; the fully
/// filled buy emits a trade and nothing else.
#[test]
fn scenario_simple_cross_full_fill() {
    let (mut core, sink) = core_with_sink(test_config());

    core.process(limit(Side::Sell, 100, 10));
    let sell_events = sink.drain();
    let sell_accepts = accepts(&sell_events);
    assert_eq!(sell_accepts.len(), 1);
    let sell_id = sell_accepts[0].order_id;

    core.process(limit(Side::Buy, 100, 10));
    let buy_events = sink.drain();
    let buy_trades = trades(&buy_events);
    assert_eq!(buy_trades.len(), 1);
    assert_eq!(buy_trades[0].maker_id, sell_id);
    assert_eq!(buy_trades[0].price, 100);
    assert_eq!(buy_trades[0].qty, 10);
    assert!(accepts(&buy_events).is_empty());
    assert!(rejects(&buy_events).is_empty());
}

/// S2: partial fill; the residual rests on the bid side.
#[test]
fn scenario_partial_fill_residual_rests() {
    let (mut core, sink) = core_with_sink(test_config());

    core.process(limit(Side::Sell, 100, 10));
    sink.drain();

    core.process(limit(Side::Buy, 100, 15));
    let events = sink.drain();
    let buy_trades = trades(&events);
    assert_eq!(buy_trades.len(), 1);
    assert_eq!(buy_trades[0].qty, 10);

    let buy_accepts = accepts(&events);
    assert_eq!(buy_accepts.len(), 1);

    assert_eq!(core.book().best_bid(), Some(100));
    assert_eq!(core.book().best_ask(), None);
    assert_eq!(core.book().quantity_at(100, Side::Buy), 5);
}

/// S3: price-time priority across two makers at one tick.
#[test]
fn scenario_price_time_priority() {
    let (mut core, sink) = core_with_sink(test_config());

    core.process(limit(Side::Sell, 100, 5));
    let a_id = accepts(&sink.drain())[0].order_id;
    core.process(limit(Side::Sell, 100, 5));
    let b_id = accepts(&sink.drain())[0].order_id;

    core.process(limit(Side::Buy, 100, 7));
    let events = sink.drain();
    let buy_trades = trades(&events);
    assert_eq!(buy_trades.len(), 2);
    assert_eq!(buy_trades[0].maker_id, a_id);
    assert_eq!(buy_trades[0].qty, 5);
    assert_eq!(buy_trades[1].maker_id, b_id);
    assert_eq!(buy_trades[1].qty, 2);

    assert_eq!(core.book().quantity_at(100, Side::Sell), 3);
}

/// S4: the second cancel of the same id is an unknown order.
#[test]
fn scenario_cancel_idempotence() {
    let (mut core, sink) = core_with_sink(test_config());

    core.process(limit(Side::Buy, 100, 1));
    let id = accepts(&sink.drain())[0].order_id;

    core.process(Command::Cancel { order_id: id });
    let first = sink.drain();
    assert_eq!(accepts(&first).len(), 1);
    assert!(rejects(&first).is_empty());

    core.process(Command::Cancel { order_id: id });
    let second = sink.drain();
    let second_rejects = rejects(&second);
    assert_eq!(second_rejects.len(), 1);
    assert_eq!(second_rejects[0].reason, RejectReason::UnknownOrder);
}

/// S5: FOK with insufficient depth rejects without trades or book damage.
#[test]
fn scenario_fok_rejection() {
    let (mut core, sink) = core_with_sink(test_config());

    core.process(limit(Side::Sell, 100, 3));
    core.process(limit(Side::Sell, 101, 4));
    sink.drain();

    let fok = NewOrder::limit(Side::Buy, 101, 10, 1).with_tif(TimeInForce::Fok);
    core.process(Command::NewOrder(fok));
    let events = sink.drain();

    assert!(trades(&events).is_empty());
    let fok_rejects = rejects(&events);
    assert_eq!(fok_rejects.len(), 1);
    assert_eq!(fok_rejects[0].reason, RejectReason::InsufficientLiquidity);

    assert_eq!(core.book().quantity_at(100, Side::Sell), 3);
    assert_eq!(core.book().quantity_at(101, Side::Sell), 4);
}

/// S6: risk denial leaves the pool untouched.
#[test]
fn scenario_risk_denial() {
    let mut config = test_config();
    config.risk.max_order_qty = 100;
    let (mut core, sink) = core_with_sink(config);

    core.process(limit(Side::Buy, 50, 101));
    let events = sink.drain();
    let denials = rejects(&events);
    assert_eq!(denials.len(), 1);
    assert_eq!(denials[0].reason, RejectReason::ExceedsMaxQty);
    assert_eq!(core.pool().live_count(), 0);
}

/// Zero-quantity orders reject without consuming a pool slot.
#[test]
fn scenario_zero_quantity_reject() {
    let (mut core, sink) = core_with_sink(test_config());
    core.process(limit(Side::Buy, 100, 0));
    let events = sink.drain();
    assert_eq!(rejects(&events)[0].reason, RejectReason::InvalidQuantity);
    assert_eq!(core.pool().live_count(), 0);
}

/// Cancelling a filled order's id reports an unknown order.
#[test]
fn scenario_cancel_of_filled_order() {
    let (mut core, sink) = core_with_sink(test_config());

    core.process(limit(Side::Sell, 100, 10));
    let sell_id = accepts(&sink.drain())[0].order_id;
    core.process(limit(Side::Buy, 100, 10));
    sink.drain();

    core.process(Command::Cancel { order_id: sell_id });
    let events = sink.drain();
    assert_eq!(rejects(&events)[0].reason, RejectReason::UnknownOrder);
}

/// Event ordering within one command: trades first, the terminal event
/// last, a book update in between when the top moved.
#[test]
fn scenario_event_ordering_within_command() {
    let (mut core, sink) = core_with_sink(test_config());

    core.process(limit(Side::Sell, 100, 5));
    sink.drain();

    core.process(limit(Side::Buy, 100, 8));
    let events = sink.drain();

    assert!(matches!(events.first(), Some(EngineEvent::Trade(_))));
    assert!(matches!(events.last(), Some(EngineEvent::Accept(_))));
    let update_pos = events
        .iter()
        .position(|e| matches!(e, EngineEvent::BookUpdate(_)))
        .expect("top moved");
    assert!(update_pos > 0 && update_pos < events.len() - 1);
}
