//--------------------------------------------------------------------------------------------------
// INTEGRATION TESTS
//--------------------------------------------------------------------------------------------------
// Cross-component scenarios driving the engine through its public surface:
// price-time priority across instructions, replace semantics, event delivery to
// sinks and the broadcast bridge, and a randomized instruction stream checking
// the book invariants that must hold after every instruction.
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use lob_matching::{
    EngineError, EventBus, EventBusBridge, MatchingEngine, OrderDescriptor, OrderStatus,
    RecordingSink, RemainderDisposition, Side, TimeInForce,
};

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_test_writer()
        .try_init();
}

fn submit_limit(engine: &mut MatchingEngine, side: Side, price: i64, quantity: u64) -> Uuid {
    match engine.submit(OrderDescriptor::limit(side, price, quantity)) {
        Ok(report) => report.order_id,
        Err(e) => panic!("failed to submit {side:?} {quantity}@{price}: {e}"),
    }
}

#[test]
fn book_is_never_crossed_between_instructions() {
    let mut engine = MatchingEngine::new();
    submit_limit(&mut engine, Side::Bid, 100, 10);
    submit_limit(&mut engine, Side::Ask, 105, 10);
    submit_limit(&mut engine, Side::Bid, 104, 3);
    submit_limit(&mut engine, Side::Ask, 101, 3);

    if let (Some(bid), Some(ask)) = (engine.best_bid(), engine.best_ask()) {
        assert!(bid < ask, "book crossed: bid {bid} >= ask {ask}");
    }
    assert!(!engine.is_halted());
}

#[test]
fn price_time_priority_across_levels_and_time() {
    let mut engine = MatchingEngine::new();
    let worse_price = submit_limit(&mut engine, Side::Bid, 99, 5);
    let first_at_best = submit_limit(&mut engine, Side::Bid, 100, 5);
    let second_at_best = submit_limit(&mut engine, Side::Bid, 100, 5);

    // Price beats time; at equal price, the earlier order wins.
    let report = match engine.submit(OrderDescriptor::limit(Side::Ask, 99, 15)) {
        Ok(report) => report,
        Err(e) => panic!("sweep failed: {e}"),
    };
    assert_eq!(report.trades.len(), 3);
    assert_eq!(report.trades[0].maker_order_id, first_at_best);
    assert_eq!(report.trades[1].maker_order_id, second_at_best, "time priority broken");
    assert_eq!(report.trades[2].maker_order_id, worse_price);
    assert_eq!(report.trades[0].price, 100);
    assert_eq!(report.trades[2].price, 99);
}

#[test]
fn cancel_then_query_best_returns_none() {
    let mut engine = MatchingEngine::new();
    let id = submit_limit(&mut engine, Side::Ask, 50, 5);
    assert!(engine.cancel(id).is_ok());
    assert_eq!(engine.query_best(Side::Ask), None);
}

#[test]
fn cancel_is_idempotent_safe() {
    let mut engine = MatchingEngine::new();
    let id = submit_limit(&mut engine, Side::Ask, 50, 5);
    submit_limit(&mut engine, Side::Ask, 51, 5);

    assert!(engine.cancel(id).is_ok());
    assert_eq!(engine.cancel(id), Err(EngineError::NotFound(id)));
    assert_eq!(engine.cancel(id), Err(EngineError::NotFound(id)));

    // The rest of the book is intact and still tradable.
    assert_eq!(engine.query_best(Side::Ask), Some(51));
    let report = match engine.submit(OrderDescriptor::limit(Side::Bid, 51, 5)) {
        Ok(report) => report,
        Err(e) => panic!("post-cancel trade failed: {e}"),
    };
    assert_eq!(report.trades.len(), 1);
}

#[test]
fn cancelling_filled_order_returns_not_found() {
    let mut engine = MatchingEngine::new();
    let id = submit_limit(&mut engine, Side::Bid, 100, 5);
    submit_limit(&mut engine, Side::Ask, 100, 5);

    assert_eq!(engine.cancel(id), Err(EngineError::NotFound(id)));
}

#[test]
fn replace_resets_time_priority_at_same_price() {
    let mut engine = MatchingEngine::new();
    let a = submit_limit(&mut engine, Side::Bid, 100, 5);
    let b = submit_limit(&mut engine, Side::Bid, 100, 5);

    assert!(engine.replace(a, 100, 5).is_ok());

    let report = match engine.submit(OrderDescriptor::limit(Side::Ask, 100, 10)) {
        Ok(report) => report,
        Err(e) => panic!("crossing sell failed: {e}"),
    };
    assert_eq!(report.trades.len(), 2);
    assert_eq!(report.trades[0].maker_order_id, b, "replaced order kept priority");
    assert_eq!(report.trades[1].maker_order_id, a);
}

#[test]
fn replace_keeps_identifier_live_with_new_terms() {
    let mut engine = MatchingEngine::new();
    let id = submit_limit(&mut engine, Side::Ask, 105, 8);

    let report = match engine.replace(id, 103, 4) {
        Ok(report) => report,
        Err(e) => panic!("replace failed: {e}"),
    };
    assert_eq!(report.order_id, id);
    assert!(report.sequence > report.previous_sequence);
    assert_eq!(report.status, OrderStatus::Unfilled);
    assert_eq!(engine.query_best(Side::Ask), Some(103));

    let depth = engine.query_depth(Side::Ask, 1);
    assert_eq!(depth[0].quantity, 4);

    // The identifier still cancels normally after the replace.
    assert!(engine.cancel(id).is_ok());
    assert_eq!(engine.open_orders(), 0);
}

#[test]
fn market_order_on_empty_book_reports_cancelled() {
    let mut engine = MatchingEngine::new();
    let report = match engine.submit(OrderDescriptor::market(Side::Bid, 10)) {
        Ok(report) => report,
        Err(e) => panic!("market order should report a status: {e}"),
    };
    assert!(report.trades.is_empty());
    assert_eq!(report.status, OrderStatus::Cancelled);
    assert_eq!(report.disposition, RemainderDisposition::Cancelled);
    assert_eq!(engine.query_best(Side::Bid), None);
    assert_eq!(engine.query_best(Side::Ask), None);
}

#[test]
fn fok_never_partially_executes() {
    let mut engine = MatchingEngine::new();
    submit_limit(&mut engine, Side::Ask, 100, 3);
    submit_limit(&mut engine, Side::Ask, 101, 3);

    let kill = OrderDescriptor::limit(Side::Bid, 100, 5).with_time_in_force(TimeInForce::FOK);
    let report = match engine.submit(kill) {
        Ok(report) => report,
        Err(e) => panic!("FOK submission failed: {e}"),
    };
    assert_eq!(report.disposition, RemainderDisposition::Killed);
    assert!(report.trades.is_empty());

    // Both asks untouched; a FOK within reach fills completely.
    assert_eq!(engine.query_depth(Side::Ask, 2).len(), 2);
    let fill = OrderDescriptor::limit(Side::Bid, 101, 6).with_time_in_force(TimeInForce::FOK);
    let report = match engine.submit(fill) {
        Ok(report) => report,
        Err(e) => panic!("FOK submission failed: {e}"),
    };
    assert_eq!(report.status, OrderStatus::Filled);
    assert_eq!(report.trades.iter().map(|t| t.quantity).sum::<u64>(), 6);
}

#[test]
fn sink_and_report_agree_on_event_order() {
    let sink = Arc::new(Mutex::new(RecordingSink::new(0)));
    let mut engine = MatchingEngine::with_sink(Box::new(Arc::clone(&sink)));

    submit_limit(&mut engine, Side::Bid, 100, 4);
    submit_limit(&mut engine, Side::Bid, 100, 4);
    let report = match engine.submit(OrderDescriptor::limit(Side::Ask, 100, 6)) {
        Ok(report) => report,
        Err(e) => panic!("crossing sell failed: {e}"),
    };

    let kinds: Vec<&str> = report.events.iter().map(|e| e.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            "TradeExecuted",
            "OrderFilled",
            "TradeExecuted",
            "OrderPartiallyFilled",
            "OrderFilled",
        ]
    );

    // The sink saw the same transitions, in the same order, after the two
    // acceptance events from the resting bids.
    let history = sink.lock().history().to_vec();
    let seen: Vec<&str> = history.iter().map(|e| e.kind()).collect();
    assert_eq!(&seen[..2], &["OrderAccepted", "OrderAccepted"]);
    assert_eq!(&seen[2..], &kinds[..]);
}

#[tokio::test]
async fn broadcast_bridge_delivers_to_async_subscribers() {
    let bus = EventBus::new(64);
    let mut receiver = bus.subscribe();
    let mut engine = MatchingEngine::with_sink(Box::new(EventBusBridge::new(bus)));

    submit_limit(&mut engine, Side::Bid, 100, 5);
    submit_limit(&mut engine, Side::Ask, 100, 5);

    let mut kinds = Vec::new();
    for _ in 0..4 {
        match receiver.recv().await {
            Ok(event) => kinds.push(event.kind().to_string()),
            Err(e) => panic!("bridge dropped an event: {e}"),
        }
    }
    assert_eq!(
        kinds,
        vec!["OrderAccepted", "TradeExecuted", "OrderFilled", "OrderFilled"]
    );
}

/// Randomized instruction stream: after every instruction the book must be
/// uncrossed, per-instruction traded quantity must never exceed the incoming
/// quantity, and open-order accounting must match what the stream did.
#[test]
fn randomized_stream_preserves_invariants() {
    let mut rng = StdRng::seed_from_u64(0x10b_5eed);
    let mut engine = MatchingEngine::new();
    let mut live: Vec<Uuid> = Vec::new();

    for _ in 0..2_000 {
        let action: u8 = rng.gen_range(0..10);
        match action {
            // Mostly submissions, mixed sides and occasionally markets.
            0..=6 => {
                let side = if rng.gen_bool(0.5) { Side::Bid } else { Side::Ask };
                let quantity = rng.gen_range(1..=50);
                let descriptor = if rng.gen_bool(0.1) {
                    OrderDescriptor::market(side, quantity)
                } else {
                    let price = rng.gen_range(90..=110);
                    OrderDescriptor::limit(side, price, quantity)
                };
                let report = match engine.submit(descriptor) {
                    Ok(report) => report,
                    Err(e) => panic!("random submission failed: {e}"),
                };
                let traded: u64 = report.trades.iter().map(|t| t.quantity).sum();
                assert!(traded <= quantity, "traded {traded} out of {quantity}");
                // Makers may have been consumed; refresh liveness from the engine.
                live.retain(|id| engine.order(id).is_some());
                if report.disposition == RemainderDisposition::Rested {
                    live.push(report.order_id);
                }
            }
            7..=8 => {
                if let Some(idx) = (!live.is_empty()).then(|| rng.gen_range(0..live.len())) {
                    let id = live.swap_remove(idx);
                    match engine.cancel(id) {
                        Ok(report) => assert!(report.order.status.is_terminal()),
                        Err(EngineError::NotFound(_)) => {}
                        Err(e) => panic!("cancel failed unexpectedly: {e}"),
                    }
                }
            }
            _ => {
                if let Some(idx) = (!live.is_empty()).then(|| rng.gen_range(0..live.len())) {
                    let id = live[idx];
                    let price = rng.gen_range(90..=110);
                    let quantity = rng.gen_range(1..=50);
                    match engine.replace(id, price, quantity) {
                        Ok(report) => {
                            if report.disposition != RemainderDisposition::Rested {
                                live.swap_remove(idx);
                            }
                        }
                        Err(EngineError::NotFound(_)) => {
                            live.swap_remove(idx);
                        }
                        Err(e) => panic!("replace failed unexpectedly: {e}"),
                    }
                }
            }
        }

        if let (Some(bid), Some(ask)) = (engine.best_bid(), engine.best_ask()) {
            assert!(bid < ask, "book crossed after instruction: {bid} >= {ask}");
        }
        assert!(!engine.is_halted());
    }

    // Drain everything; the book must empty cleanly.
    live.retain(|id| engine.order(id).is_some());
    for id in live {
        if let Err(e) = engine.cancel(id) {
            panic!("final drain cancel failed: {e}");
        }
    }
    assert_eq!(engine.open_orders(), 0);
    assert_eq!(engine.query_best(Side::Bid), None);
    assert_eq!(engine.query_best(Side::Ask), None);
}
