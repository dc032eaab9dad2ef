//! Bid (buy-side) order book
//!
//! Maintains buy orders sorted by price descending (best bid first).
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;
use types::numeric::Price;
use types::order::Side;

use super::{LevelBook, PriceLevel};

/// Bid (buy) side order book
///
/// The map is ascending, so every "best first" walk goes from the back.
#[derive(Debug, Clone, Default)]
pub struct BidBook {
    levels: BTreeMap<Price, PriceLevel>,
}

impl BidBook {
    /// Create a new empty bid book
    pub fn new() -> Self {
        Self::default()
    }
}

impl LevelBook for BidBook {
    fn side(&self) -> Side {
        Side::BUY
    }

    fn levels(&self) -> &BTreeMap<Price, PriceLevel> {
        &self.levels
    }

    fn levels_mut(&mut self) -> &mut BTreeMap<Price, PriceLevel> {
        &mut self.levels
    }

    fn next_price(&self, after: Option<Price>) -> Option<Price> {
        match after {
            None => self.levels.keys().next_back().copied(),
            Some(price) => self.levels.range(..price).next_back().map(|(p, _)| *p),
        }
    }

    fn iter_levels(&self) -> impl Iterator<Item = (Price, &PriceLevel)> + '_ {
        self.levels.iter().rev().map(|(p, l)| (*p, l))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use types::ids::{AccountId, MarketId, OrderId};
    use types::numeric::Quantity;
    use types::order::Order;

    fn create_test_order(id: u64, price_val: u64, qty_str: &str) -> Order {
        Order::new(
            OrderId::new(id),
            AccountId::new(1),
            MarketId::new("btcusdt"),
            Side::BUY,
            Price::from_u64(price_val),
            Quantity::from_str(qty_str).unwrap(),
            id as i64,
        )
    }

    #[test]
    fn test_bid_book_best_bid() {
        let mut book = BidBook::new();
        book.insert(create_test_order(1, 50000, "1.0"));
        book.insert(create_test_order(2, 51000, "2.0"));
        book.insert(create_test_order(3, 49000, "1.5"));

        let (best_price, best_qty) = book.best().unwrap();
        assert_eq!(best_price, Price::from_u64(51000));
        assert_eq!(best_qty, Quantity::from_str("2.0").unwrap());
    }

    #[test]
    fn test_bid_book_remove() {
        let mut book = BidBook::new();
        let order = create_test_order(1, 50000, "1.0");
        let price = order.price;
        book.insert(order);
        book.insert(create_test_order(2, 50000, "2.0"));

        let removed = book.remove(&OrderId::new(1), price).unwrap();
        assert_eq!(removed.order_id, OrderId::new(1));
        assert_eq!(book.level_count(), 1);
        assert_eq!(book.best().unwrap().1, Quantity::from_str("2.0").unwrap());
    }

    #[test]
    fn test_bid_book_depth_snapshot() {
        let mut book = BidBook::new();
        book.insert(create_test_order(1, 50000, "1.0"));
        book.insert(create_test_order(2, 51000, "2.0"));
        book.insert(create_test_order(3, 49000, "1.5"));
        book.insert(create_test_order(4, 52000, "0.5"));

        let depth = book.depth_snapshot(2);

        assert_eq!(depth.len(), 2);
        assert_eq!(depth[0].0, Price::from_u64(52000));
        assert_eq!(depth[1].0, Price::from_u64(51000));
    }

    #[test]
    fn test_bid_book_next_price_walks_downwards() {
        let mut book = BidBook::new();
        book.insert(create_test_order(1, 100, "1"));
        book.insert(create_test_order(2, 98, "1"));
        book.insert(create_test_order(3, 99, "1"));

        let first = book.next_price(None).unwrap();
        let second = book.next_price(Some(first)).unwrap();
        assert_eq!(first, Price::from_u64(100));
        assert_eq!(second, Price::from_u64(99));
        assert_eq!(book.next_price(Some(Price::from_u64(98))), None);
    }

    #[test]
    fn test_bid_book_get_order() {
        let mut book = BidBook::new();
        book.insert(create_test_order(7, 100, "3"));

        let found = book.get_order(&OrderId::new(7), Price::from_u64(100)).unwrap();
        assert_eq!(found.quantity, Quantity::from_u64(3));
        assert!(book.get_order(&OrderId::new(7), Price::from_u64(101)).is_none());
    }
}
