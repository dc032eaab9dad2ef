//! Dormant stop orders
//!
//! Stop orders wait here until the market price reaches their stop price.
//! Buy stops trigger when the market price rises to or above the stop price,
//! sell stops when it falls to or below it. Each side is ordered so the
//! order closest to triggering comes first, then by creation time.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use types::ids::OrderId;
use types::numeric::Price;
use types::order::{Order, Side};

type BuyStopKey = (Price, i64, OrderId);
type SellStopKey = (Reverse<Price>, i64, OrderId);

/// Whether a stop order on `side` with `stop_price` has triggered
///
/// A market without any trade yet (price zero) triggers nothing.
pub fn is_triggered(side: Side, stop_price: Price, market_price: Price) -> bool {
    if market_price.is_zero() {
        return false;
    }
    match side {
        Side::BUY => market_price >= stop_price,
        Side::SELL => market_price <= stop_price,
    }
}

/// Book of dormant stop orders for one market
#[derive(Debug, Clone, Default)]
pub struct StopBook {
    /// Buy stops, lowest stop price first
    stop_bids: BTreeMap<BuyStopKey, Order>,
    /// Sell stops, highest stop price first
    stop_asks: BTreeMap<SellStopKey, Order>,
    /// Order ID to (side, stop price, created_at) for removal by ID
    index: HashMap<OrderId, (Side, Price, i64)>,
}

impl StopBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a stop order. Orders without a stop price are ignored.
    pub fn insert(&mut self, order: Order) {
        let Some(stop_price) = order.stop_price else {
            return;
        };
        let id = order.order_id;
        let created_at = order.created_at;
        self.index.insert(id, (order.side, stop_price, created_at));

        match order.side {
            Side::BUY => {
                self.stop_bids.insert((stop_price, created_at, id), order);
            }
            Side::SELL => {
                self.stop_asks.insert((Reverse(stop_price), created_at, id), order);
            }
        }
    }

    pub fn remove(&mut self, order_id: &OrderId) -> Option<Order> {
        let (side, stop_price, created_at) = self.index.remove(order_id)?;
        match side {
            Side::BUY => self.stop_bids.remove(&(stop_price, created_at, *order_id)),
            Side::SELL => self
                .stop_asks
                .remove(&(Reverse(stop_price), created_at, *order_id)),
        }
    }

    pub fn get(&self, order_id: &OrderId) -> Option<&Order> {
        let (side, stop_price, created_at) = self.index.get(order_id)?;
        match side {
            Side::BUY => self.stop_bids.get(&(*stop_price, *created_at, *order_id)),
            Side::SELL => self
                .stop_asks
                .get(&(Reverse(*stop_price), *created_at, *order_id)),
        }
    }

    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.index.contains_key(order_id)
    }

    /// Dequeue every stop order triggered at `market_price`
    ///
    /// Within a side, orders come out closest-to-trigger first, then by
    /// creation time. When both sides have triggered orders, the side the
    /// price moved towards goes first: buy stops on a rise, sell stops on a
    /// fall.
    pub fn take_triggered(&mut self, market_price: Price, rising: bool) -> Vec<Order> {
        let mut bids = self.take_triggered_bids(market_price);
        let mut asks = self.take_triggered_asks(market_price);

        for order in bids.iter().chain(asks.iter()) {
            self.index.remove(&order.order_id);
        }

        if rising {
            bids.append(&mut asks);
            bids
        } else {
            asks.append(&mut bids);
            asks
        }
    }

    fn take_triggered_bids(&mut self, market_price: Price) -> Vec<Order> {
        let mut triggered = Vec::new();
        while let Some(entry) = self.stop_bids.first_entry() {
            if !is_triggered(Side::BUY, entry.key().0, market_price) {
                break;
            }
            triggered.push(entry.remove());
        }
        triggered
    }

    fn take_triggered_asks(&mut self, market_price: Price) -> Vec<Order> {
        let mut triggered = Vec::new();
        while let Some(entry) = self.stop_asks.first_entry() {
            if !is_triggered(Side::SELL, entry.key().0 .0, market_price) {
                break;
            }
            triggered.push(entry.remove());
        }
        triggered
    }

    /// Number of dormant stop orders
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Dormant orders on one side in trigger order
    pub fn orders(&self, side: Side) -> Vec<&Order> {
        match side {
            Side::BUY => self.stop_bids.values().collect(),
            Side::SELL => self.stop_asks.values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use types::ids::{AccountId, MarketId};
    use types::numeric::Quantity;

    fn stop(id: u64, side: Side, stop_price: &str, created_at: i64) -> Order {
        Order::market(
            OrderId::new(id),
            AccountId::new(1),
            MarketId::new("btcusdt"),
            side,
            Quantity::from_u64(1),
            created_at,
        )
        .with_stop_price(Price::from_str(stop_price).unwrap())
    }

    fn ids(orders: &[Order]) -> Vec<u64> {
        orders.iter().map(|o| o.order_id.as_u64()).collect()
    }

    #[test]
    fn test_is_triggered() {
        let p = |s: &str| Price::from_str(s).unwrap();
        assert!(is_triggered(Side::BUY, p("10"), p("10")));
        assert!(is_triggered(Side::BUY, p("10"), p("11")));
        assert!(!is_triggered(Side::BUY, p("10"), p("9.99")));
        assert!(is_triggered(Side::SELL, p("10"), p("9")));
        assert!(!is_triggered(Side::SELL, p("10"), p("10.01")));
        assert!(!is_triggered(Side::SELL, p("10"), Price::zero()));
    }

    #[test]
    fn test_buy_stops_trigger_lowest_first_then_time() {
        let mut book = StopBook::new();
        book.insert(stop(1, Side::BUY, "105", 1));
        book.insert(stop(2, Side::BUY, "101", 2));
        book.insert(stop(3, Side::BUY, "101", 3));
        book.insert(stop(4, Side::BUY, "110", 4));

        let triggered = book.take_triggered(Price::from_u64(105), true);
        assert_eq!(ids(&triggered), vec![2, 3, 1]);
        assert_eq!(book.len(), 1);
        assert!(book.contains(&OrderId::new(4)));
    }

    #[test]
    fn test_sell_stops_trigger_highest_first() {
        let mut book = StopBook::new();
        book.insert(stop(1, Side::SELL, "95", 1));
        book.insert(stop(2, Side::SELL, "99", 2));
        book.insert(stop(3, Side::SELL, "90", 3));

        let triggered = book.take_triggered(Price::from_u64(94), false);
        assert_eq!(ids(&triggered), vec![2, 1]);
        assert_eq!(book.orders(Side::SELL).len(), 1);
    }

    #[test]
    fn test_remove_by_id() {
        let mut book = StopBook::new();
        book.insert(stop(1, Side::BUY, "105", 1));
        book.insert(stop(2, Side::SELL, "95", 2));

        assert_eq!(book.get(&OrderId::new(2)).unwrap().side, Side::SELL);
        assert!(book.remove(&OrderId::new(2)).is_some());
        assert!(book.remove(&OrderId::new(2)).is_none());
        assert_eq!(book.len(), 1);

        assert!(book.take_triggered(Price::from_u64(90), false).is_empty());
    }

    #[test]
    fn test_non_stop_orders_are_ignored() {
        let mut book = StopBook::new();
        let plain = Order::market(
            OrderId::new(1),
            AccountId::new(1),
            MarketId::new("btcusdt"),
            Side::BUY,
            Quantity::from_u64(1),
            0,
        );
        book.insert(plain);
        assert!(book.is_empty());
    }
}
