//! Minimal walkthrough: a few orders through a shard core, events printed
//! as they happen.

use matchbook_rs::prelude::*;

struct PrintSink;

impl EventSink for PrintSink {
    fn on_trade(&self, trade: &Trade) {
        println!(
            "TRADE   maker={:#018x} taker={:#018x} {} @ {}",
            trade.maker_id, trade.taker_id, trade.qty, trade.price
        );
    }

    fn on_accept(&self, accept: &Accept) {
        println!("ACCEPT  id={:#018x}", accept.order_id);
    }

    fn on_reject(&self, reject: &Reject) {
        println!("REJECT  id={:#018x} reason={}", reject.order_id, reject.reason);
    }

    fn on_book_update(&self, update: &BookUpdate) {
        println!(
            "TOP     bid={:?} ask={:?}",
            update.best_bid, update.best_ask
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = EngineConfig::example();
    let mut core = ShardCore::new(&config)?;
    core.add_sink(Box::new(PrintSink));
    let capture = VecSink::new();
    core.add_sink(Box::new(capture.clone()));

    // Build a small book.
    core.process(Command::NewOrder(NewOrder::limit(Side::Sell, 102, 50, 1)));
    core.process(Command::NewOrder(NewOrder::limit(Side::Sell, 101, 30, 1)));
    capture.drain();

    core.process(Command::NewOrder(NewOrder::limit(Side::Buy, 99, 40, 1)));
    let bid_id = capture
        .drain()
        .iter()
        .find_map(|e| match e {
            EngineEvent::Accept(a) => Some(a.order_id),
            _ => None,
        })
        .expect("resting bid accepted");

    // Cross the spread, filling 101 then part of 102.
    core.process(Command::NewOrder(NewOrder::limit(Side::Buy, 102, 60, 1)));

    // An IOC that cannot fully fill drops its residual.
    core.process(Command::NewOrder(
        NewOrder::limit(Side::Buy, 102, 500, 1).with_tif(TimeInForce::Ioc),
    ));

    // Cancel the resting bid.
    core.process(Command::Cancel { order_id: bid_id });

    println!(
        "final top: bid={:?} ask={:?}",
        core.book().best_bid(),
        core.book().best_ask()
    );
    println!(
        "stats: {}",
        serde_json::to_string_pretty(&core.stats().snapshot())?
    );
    Ok(())
}
