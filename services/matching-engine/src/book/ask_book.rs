//! Ask (sell-side) order book
//!
//! Maintains sell orders sorted by price ascending (best ask first).
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};
use types::numeric::Price;
use types::order::Side;

use super::{LevelBook, PriceLevel};

/// Ask (sell) side order book
///
/// Orders are sorted by price ascending, so the lowest ask is first.
/// At each price level, orders are maintained in FIFO order.
#[derive(Debug, Clone, Default)]
pub struct AskBook {
    levels: BTreeMap<Price, PriceLevel>,
}

impl AskBook {
    /// Create a new empty ask book
    pub fn new() -> Self {
        Self::default()
    }
}

impl LevelBook for AskBook {
    fn side(&self) -> Side {
        Side::SELL
    }

    fn levels(&self) -> &BTreeMap<Price, PriceLevel> {
        &self.levels
    }

    fn levels_mut(&mut self) -> &mut BTreeMap<Price, PriceLevel> {
        &mut self.levels
    }

    fn next_price(&self, after: Option<Price>) -> Option<Price> {
        match after {
            None => self.levels.keys().next().copied(),
            Some(price) => self
                .levels
                .range((Excluded(price), Unbounded))
                .next()
                .map(|(p, _)| *p),
        }
    }

    fn iter_levels(&self) -> impl Iterator<Item = (Price, &PriceLevel)> + '_ {
        self.levels.iter().map(|(p, l)| (*p, l))
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
            Side::SELL,
            Price::from_u64(price_val),
            Quantity::from_str(qty_str).unwrap(),
            id as i64,
        )
    }

    #[test]
    fn test_ask_book_insert() {
        let mut book = AskBook::new();
        book.insert(create_test_order(1, 50000, "1.0"));

        assert_eq!(book.level_count(), 1);
        assert!(!book.is_empty());
    }

    #[test]
    fn test_ask_book_best_ask() {
        let mut book = AskBook::new();
        book.insert(create_test_order(1, 50000, "1.0"));
        book.insert(create_test_order(2, 51000, "2.0"));
        book.insert(create_test_order(3, 49000, "1.5"));

        let (best_price, best_qty) = book.best().unwrap();
        assert_eq!(best_price, Price::from_u64(49000));
        assert_eq!(best_qty, Quantity::from_str("1.5").unwrap());
    }

    #[test]
    fn test_ask_book_remove_drops_empty_level() {
        let mut book = AskBook::new();
        let order = create_test_order(1, 50000, "1.0");
        let price = order.price;
        book.insert(order);

        let removed = book.remove(&OrderId::new(1), price);
        assert!(removed.is_some());
        assert!(book.is_empty());
        assert!(book.remove(&OrderId::new(1), price).is_none());
    }

    #[test]
    fn test_ask_book_depth_snapshot() {
        let mut book = AskBook::new();
        book.insert(create_test_order(1, 50000, "1.0"));
        book.insert(create_test_order(2, 51000, "2.0"));
        book.insert(create_test_order(3, 49000, "1.5"));
        book.insert(create_test_order(4, 52000, "0.5"));

        let depth = book.depth_snapshot(2);

        assert_eq!(depth.len(), 2);
        assert_eq!(depth[0].0, Price::from_u64(49000));
        assert_eq!(depth[1].0, Price::from_u64(50000));
    }

    #[test]
    fn test_ask_book_next_price_walks_upwards() {
        let mut book = AskBook::new();
        book.insert(create_test_order(1, 100, "1"));
        book.insert(create_test_order(2, 102, "1"));
        book.insert(create_test_order(3, 101, "1"));

        let first = book.next_price(None).unwrap();
        let second = book.next_price(Some(first)).unwrap();
        let third = book.next_price(Some(second)).unwrap();
        assert_eq!(
            (first, second, third),
            (Price::from_u64(100), Price::from_u64(101), Price::from_u64(102))
        );
        assert_eq!(book.next_price(Some(third)), None);
    }

    #[test]
    fn test_ask_book_same_price_aggregates() {
        let mut book = AskBook::new();
        book.insert(create_test_order(1, 50000, "1.0"));
        book.insert(create_test_order(2, 50000, "2.0"));

        assert_eq!(book.level_count(), 1);
        assert_eq!(book.order_count(), 2);

        let (price, total_qty) = book.best().unwrap();
        assert_eq!(price, Price::from_u64(50000));
        assert_eq!(total_qty, Quantity::from_str("3.0").unwrap());
    }
}
