//! Concurrency test
//!
//! Markets share one engine but no lock: submissions for different
//! symbols run in parallel, and submissions for the same symbol are
//! serialized by the book's write section.

use std::sync::Arc;
use std::thread;

use matching_engine::{EngineEvent, EngineConfig, EventPublisher, MatchingEngine, MemoryOrderStore};
use types::ids::{AccountId, MarketId, OrderId};
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

fn engine() -> (Arc<MatchingEngine>, tokio::sync::mpsc::UnboundedReceiver<EngineEvent>) {
    let (publisher, rx) = EventPublisher::channel();
    let engine = MatchingEngine::new(
        Arc::new(MemoryOrderStore::new()),
        publisher,
        EngineConfig::default(),
    );
    (Arc::new(engine), rx)
}

fn order(id: u64, symbol: &MarketId, side: Side) -> Order {
    Order::new(
        OrderId::new(id),
        AccountId::new(id % 7),
        symbol.clone(),
        side,
        Price::from_u64(50000),
        Quantity::from_u64(1),
        id as i64,
    )
}

fn trade_count(rx: &mut tokio::sync::mpsc::UnboundedReceiver<EngineEvent>) -> usize {
    let mut trades = 0;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, EngineEvent::Trade(_)) {
            trades += 1;
        }
    }
    trades
}

#[test]
fn test_concurrent_markets() {
    let (engine, mut rx) = engine();
    let symbols: Vec<MarketId> = ["btcusdt", "ethusdt", "solusdt", "dogeusdt"]
        .into_iter()
        .map(MarketId::new)
        .collect();
    for symbol in &symbols {
        engine.new_market(symbol.clone());
    }

    let handles: Vec<_> = symbols
        .iter()
        .enumerate()
        .map(|(m, symbol)| {
            let engine = Arc::clone(&engine);
            let symbol = symbol.clone();
            thread::spawn(move || {
                let base = (m as u64 + 1) * 1_000_000;
                for i in 0..500 {
                    let id = base + i * 2;
                    engine.submit(order(id, &symbol, Side::SELL)).unwrap();
                    engine.submit(order(id + 1, &symbol, Side::BUY)).unwrap();
                }
                let summary = engine.market_summary(&symbol).unwrap();
                assert_eq!(summary.resting_orders, 0);
                summary.last_trade_id.map(|t| t.as_u64()).unwrap_or_default()
            })
        })
        .collect();

    for handle in handles {
        // Trade IDs are per market
        assert_eq!(handle.join().unwrap(), 500);
    }
    assert_eq!(trade_count(&mut rx), 2000);
}

#[test]
fn test_same_market_contention_keeps_book_consistent() {
    let (engine, mut rx) = engine();
    let symbol = MarketId::new("btcusdt");
    engine.new_market(symbol.clone());

    let handles: Vec<_> = [Side::SELL, Side::BUY]
        .into_iter()
        .enumerate()
        .map(|(t, side)| {
            let engine = Arc::clone(&engine);
            let symbol = symbol.clone();
            thread::spawn(move || {
                for i in 0..1_000u64 {
                    let id = (t as u64 + 1) * 10_000 + i;
                    engine.submit(order(id, &symbol, side)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Every sell meets a buy at the same price, whatever the interleaving
    let summary = engine.market_summary(&symbol).unwrap();
    assert_eq!(summary.resting_orders, 0);
    assert_eq!(trade_count(&mut rx), 1_000);
}

#[test]
fn test_queries_run_alongside_submissions() {
    let (engine, _rx) = engine();
    let symbol = MarketId::new("btcusdt");
    engine.new_market(symbol.clone());

    let writer = {
        let engine = Arc::clone(&engine);
        let symbol = symbol.clone();
        thread::spawn(move || {
            for i in 0..2_000u64 {
                engine.submit(order(i + 1, &symbol, Side::BUY)).unwrap();
            }
        })
    };
    let reader = {
        let engine = Arc::clone(&engine);
        let symbol = symbol.clone();
        thread::spawn(move || {
            for _ in 0..2_000 {
                let depth = engine.fetch_order_book(&symbol, 1).unwrap();
                // A single level whose total is a whole number of orders
                if let Some((price, total)) = depth.bids.first() {
                    assert_eq!(*price, Price::from_u64(50000));
                    assert!(!total.is_zero());
                }
            }
        })
    };
    writer.join().unwrap();
    reader.join().unwrap();

    let depth = engine.fetch_order_book(&symbol, 1).unwrap();
    assert_eq!(depth.bids, vec![(Price::from_u64(50000), Quantity::from_u64(2_000))]);
}
