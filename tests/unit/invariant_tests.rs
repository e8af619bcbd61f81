//! Randomized command sequences checked against a shadow model and the
//! book's structural invariants.

use matchbook_rs::engine::TokenBucket;
use matchbook_rs::prelude::*;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::HashMap;

const PRICE_LO: Price = 1;
const PRICE_HI: Price = 40;

fn test_config() -> EngineConfig {
    EngineConfig {
        min_price_ticks: PRICE_LO,
        max_price_ticks: PRICE_HI,
        tick_size_ticks: 1,
        pool_capacity: 512,
        queue_capacity: 64,
        shard_id: 0,
        symbol: 1,
        tsc_calibration_path: None,
        risk: RiskConfig {
            performance_mode: true,
            ..RiskConfig::default()
        },
    }
}

/// Generator-level description of one command.
#[derive(Debug, Clone)]
enum Op {
    Limit {
        side: Side,
        tif: TimeInForce,
        price: Price,
        qty: Quantity,
    },
    Market {
        side: Side,
        qty: Quantity,
    },
    /// Cancel the n-th still-tracked resting order (modulo).
    CancelLive(usize),
    /// Cancel a fabricated id that was never issued.
    CancelBogus(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let side = prop_oneof![Just(Side::Buy), Just(Side::Sell)];
    let tif = prop_oneof![
        Just(TimeInForce::Gtc),
        Just(TimeInForce::Gtc),
        Just(TimeInForce::Ioc),
        Just(TimeInForce::Fok),
    ];
    prop_oneof![
        6 => (side.clone(), tif, PRICE_LO..=PRICE_HI, 1i64..=20).prop_map(
            |(side, tif, price, qty)| Op::Limit {
                side,
                tif,
                price,
                qty,
            }
        ),
        1 => (prop_oneof![Just(Side::Buy), Just(Side::Sell)], 1i64..=30)
            .prop_map(|(side, qty)| Op::Market { side, qty }),
        2 => (0usize..64).prop_map(Op::CancelLive),
        1 => proptest::num::u64::ANY.prop_map(Op::CancelBogus),
    ]
}

/// Shadow model: id -> (side, price, remaining) for every resting order.
#[derive(Default)]
struct Shadow {
    resting: HashMap<u64, (Side, Price, Quantity)>,
}

impl Shadow {
    fn total(&self) -> Quantity {
        self.resting.values().map(|(_, _, qty)| qty).sum()
    }

    fn book_total(core: &ShardCore) -> Quantity {
        let mut total = 0;
        for price in PRICE_LO..=PRICE_HI {
            total += core.book().quantity_at(price, Side::Buy);
            total += core.book().quantity_at(price, Side::Sell);
        }
        total
    }

    /// Applies one command's event stream to the mirror.
    fn apply(&mut self, submitted: Option<(Side, Price, Quantity)>, events: &[EngineEvent]) {
        let mut traded: Quantity = 0;
        for event in events {
            match event {
                EngineEvent::Trade(t) => {
                    traded += t.qty;
                    if let Some(entry) = self.resting.get_mut(&t.maker_id) {
                        entry.2 -= t.qty;
                        if entry.2 == 0 {
                            let maker_id = t.maker_id;
                            self.resting.remove(&maker_id);
                        }
                    }
                }
                EngineEvent::Accept(a) => match submitted {
                    Some((side, price, qty)) => {
                        self.resting.insert(a.order_id, (side, price, qty - traded));
                    }
                    // Cancel acknowledgement.
                    None => {
                        self.resting.remove(&a.order_id);
                    }
                },
                EngineEvent::Reject(_) | EngineEvent::BookUpdate(_) => {}
            }
        }
    }
}

fn run_sequence(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let mut core = ShardCore::new(&test_config()).expect("valid config");
    let sink = VecSink::new();
    core.add_sink(Box::new(sink.clone()));
    let mut shadow = Shadow::default();
    let mut live_ids: Vec<u64> = Vec::new();

    for op in ops {
        let submitted = match &op {
            Op::Limit {
                side, price, qty, ..
            } => Some((*side, *price, *qty)),
            Op::Market { side, qty } => Some((*side, 0, *qty)),
            _ => None,
        };
        let (command, submitted_qty) = match op {
            Op::Limit {
                side,
                tif,
                price,
                qty,
            } => (
                Command::NewOrder(NewOrder::limit(side, price, qty, 1).with_tif(tif)),
                Some((tif, qty)),
            ),
            Op::Market { side, qty } => {
                (Command::NewOrder(NewOrder::market(side, qty, 1)), None)
            }
            Op::CancelLive(n) => {
                let order_id = if live_ids.is_empty() {
                    0
                } else {
                    live_ids[n % live_ids.len()]
                };
                (Command::Cancel { order_id }, None)
            }
            Op::CancelBogus(order_id) => (Command::Cancel { order_id }, None),
        };

        core.process(command);
        let events = sink.drain();

        // Structural invariants hold after every command.
        core.book()
            .check_consistency(core.pool())
            .map_err(TestCaseError::fail)?;

        // Per-command event policy.
        let trade_total: Quantity = events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::Trade(t) => Some(t.qty),
                _ => None,
            })
            .sum();
        if let Some((tif, qty)) = submitted_qty {
            match tif {
                TimeInForce::Fok => {
                    // All or nothing, atomically.
                    prop_assert!(trade_total == qty || trade_total == 0);
                    if trade_total == 0 {
                        prop_assert!(
                            events
                                .iter()
                                .any(|e| matches!(e, EngineEvent::Reject(_)))
                        );
                    }
                }
                TimeInForce::Ioc => {
                    // Never rests.
                    prop_assert!(!events.iter().any(|e| matches!(e, EngineEvent::Accept(_))));
                }
                TimeInForce::Gtc => {}
            }
        }

        // Mirror bookkeeping, then conservation.
        shadow.apply(submitted, &events);
        for event in &events {
            match event {
                EngineEvent::Accept(a) if submitted.is_some() => live_ids.push(a.order_id),
                _ => {}
            }
        }
        live_ids.retain(|id| shadow.resting.contains_key(id));

        prop_assert_eq!(shadow.total(), Shadow::book_total(&core));
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_command_sequences_preserve_invariants(
        ops in proptest::collection::vec(op_strategy(), 1..120)
    ) {
        run_sequence(ops)?;
    }
}

/// Over any window, accepted orders never exceed capacity + refill.
#[test]
fn rate_limit_bound_over_one_second() {
    let capacity = 10u32;
    let per_second = 25u32;
    let mut bucket = TokenBucket::new(capacity, per_second);

    let window_start: u64 = 5_000_000_000;
    let mut accepted = 0u64;
    // Hammer the bucket every 10 microseconds for one second.
    let mut now = window_start;
    while now < window_start + 1_000_000_000 {
        if bucket.try_acquire(now) {
            accepted += 1;
        }
        now += 10_000;
    }
    assert!(accepted <= u64::from(capacity + per_second));
    // The refill keeps tokens flowing inside the window.
    assert!(accepted >= u64::from(per_second));
}

/// A cancel with a stale generation is rejected exactly once and mutates
/// nothing.
#[test]
fn stale_generation_cancel_is_inert() {
    let mut core = ShardCore::new(&test_config()).expect("valid config");
    let sink = VecSink::new();
    core.add_sink(Box::new(sink.clone()));

    core.process(Command::NewOrder(NewOrder::limit(Side::Buy, 10, 5, 1)));
    let id = sink
        .drain()
        .iter()
        .find_map(|e| match e {
            EngineEvent::Accept(a) => Some(a.order_id),
            _ => None,
        })
        .expect("accept");

    let (shard, generation, index) = decode_order_id(id);
    let stale = encode_order_id(shard, generation.wrapping_add(4), index);
    core.process(Command::Cancel { order_id: stale });

    let events = sink.drain();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        EngineEvent::Reject(r) if r.reason == RejectReason::UnknownOrder
    ));
    assert_eq!(core.book().quantity_at(10, Side::Buy), 5);
    core.book().check_consistency(core.pool()).expect("consistent");
}
