//! External order store
//!
//! The engine never persists book state. On startup and on reload it asks
//! the store which markets are enabled, which orders are still open and what
//! the last trade price was, then rebuilds the book from that.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;
use types::errors::EngineError;
use types::ids::{MarketId, OrderId};
use types::numeric::Price;
use types::order::Order;

/// Store access errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt record for order {order_id}: {reason}")]
    Corrupt { order_id: OrderId, reason: String },
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::Store {
            message: err.to_string(),
        }
    }
}

/// Source of truth for markets, open orders and last trade prices
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Symbols of every enabled market
    async fn enabled_markets(&self) -> Result<Vec<MarketId>, StoreError>;

    /// Orders of `symbol` that are pending or partially filled
    async fn open_orders(&self, symbol: &MarketId) -> Result<Vec<Order>, StoreError>;

    /// Last trade price of `symbol`, None when it never traded
    async fn last_trade_price(&self, symbol: &MarketId) -> Result<Option<Price>, StoreError>;
}

#[derive(Debug, Default)]
struct MarketRecord {
    enabled: bool,
    orders: HashMap<OrderId, Order>,
    last_trade_price: Option<Price>,
}

/// In-memory store for the standalone binary and tests
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    markets: RwLock<HashMap<MarketId, MarketRecord>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a market, enabled
    pub fn add_market(&self, symbol: MarketId) {
        self.markets.write().entry(symbol).or_default().enabled = true;
    }

    pub fn set_enabled(&self, symbol: &MarketId, enabled: bool) {
        if let Some(record) = self.markets.write().get_mut(symbol) {
            record.enabled = enabled;
        }
    }

    /// Insert or replace an order; terminal orders are dropped from the open set
    pub fn put_order(&self, order: Order) {
        let mut markets = self.markets.write();
        let record = markets.entry(order.symbol.clone()).or_default();
        if order.status.is_terminal() || order.is_filled() {
            record.orders.remove(&order.order_id);
        } else {
            record.orders.insert(order.order_id, order);
        }
    }

    pub fn remove_order(&self, symbol: &MarketId, order_id: &OrderId) -> Option<Order> {
        self.markets
            .write()
            .get_mut(symbol)
            .and_then(|record| record.orders.remove(order_id))
    }

    pub fn set_last_trade_price(&self, symbol: &MarketId, price: Price) {
        self.markets
            .write()
            .entry(symbol.clone())
            .or_default()
            .last_trade_price = Some(price);
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn enabled_markets(&self) -> Result<Vec<MarketId>, StoreError> {
        let mut symbols: Vec<MarketId> = self
            .markets
            .read()
            .iter()
            .filter(|(_, record)| record.enabled)
            .map(|(symbol, _)| symbol.clone())
            .collect();
        symbols.sort();
        Ok(symbols)
    }

    async fn open_orders(&self, symbol: &MarketId) -> Result<Vec<Order>, StoreError> {
        let markets = self.markets.read();
        let mut orders: Vec<Order> = markets
            .get(symbol)
            .map(|record| record.orders.values().cloned().collect())
            .unwrap_or_default();
        orders.sort_by_key(|o| o.order_id);
        Ok(orders)
    }

    async fn last_trade_price(&self, symbol: &MarketId) -> Result<Option<Price>, StoreError> {
        Ok(self
            .markets
            .read()
            .get(symbol)
            .and_then(|record| record.last_trade_price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::AccountId;
    use types::numeric::Quantity;
    use types::order::Side;

    fn order(id: u64, symbol: &str) -> Order {
        Order::new(
            OrderId::new(id),
            AccountId::new(1),
            MarketId::new(symbol),
            Side::BUY,
            Price::from_u64(10),
            Quantity::from_u64(1),
            id as i64,
        )
    }

    #[tokio::test]
    async fn test_enabled_markets_sorted_and_filtered() {
        let store = MemoryOrderStore::new();
        store.add_market(MarketId::new("ethusdt"));
        store.add_market(MarketId::new("btcusdt"));
        store.add_market(MarketId::new("dogeusdt"));
        store.set_enabled(&MarketId::new("dogeusdt"), false);

        let markets = store.enabled_markets().await.unwrap();
        assert_eq!(markets, vec![MarketId::new("btcusdt"), MarketId::new("ethusdt")]);
    }

    #[tokio::test]
    async fn test_open_orders_by_id() {
        let store = MemoryOrderStore::new();
        store.add_market(MarketId::new("btcusdt"));
        store.put_order(order(3, "btcusdt"));
        store.put_order(order(1, "btcusdt"));
        store.put_order(order(2, "ethusdt"));

        let ids: Vec<u64> = store
            .open_orders(&MarketId::new("btcusdt"))
            .await
            .unwrap()
            .iter()
            .map(|o| o.order_id.as_u64())
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_filled_order_leaves_open_set() {
        let store = MemoryOrderStore::new();
        let mut o = order(1, "btcusdt");
        store.put_order(o.clone());
        o.add_fill(Quantity::from_u64(1), 2);
        store.put_order(o);

        assert!(store.open_orders(&MarketId::new("btcusdt")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_last_trade_price() {
        let store = MemoryOrderStore::new();
        let symbol = MarketId::new("btcusdt");
        assert_eq!(store.last_trade_price(&symbol).await.unwrap(), None);
        store.set_last_trade_price(&symbol, Price::from_u64(42));
        assert_eq!(store.last_trade_price(&symbol).await.unwrap(), Some(Price::from_u64(42)));
    }

    #[test]
    fn test_store_error_converts() {
        let err: EngineError = StoreError::Unavailable("connection refused".into()).into();
        assert!(matches!(err, EngineError::Store { .. }));
    }
}
