//! Order book infrastructure module
//!
//! Contains price levels, the bid and ask books, and the dormant stop book.
//! Both sides implement [`LevelBook`] so one sweep routine can walk either
//! side in best-price-first order.

pub mod ask_book;
pub mod bid_book;
pub mod price_level;
pub mod stop_book;

pub use ask_book::AskBook;
pub use bid_book::BidBook;
pub use price_level::PriceLevel;
pub use stop_book::StopBook;

use std::collections::BTreeMap;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

/// One side of the live book: price levels reachable in priority order
pub trait LevelBook {
    /// Side of the orders stored here
    fn side(&self) -> Side;

    fn levels(&self) -> &BTreeMap<Price, PriceLevel>;

    fn levels_mut(&mut self) -> &mut BTreeMap<Price, PriceLevel>;

    /// Next price in priority order strictly after `after`, or the best
    /// price when `after` is None
    fn next_price(&self, after: Option<Price>) -> Option<Price>;

    /// Levels in priority order (best first)
    fn iter_levels(&self) -> impl Iterator<Item = (Price, &PriceLevel)> + '_;

    /// Append an order to the tail of its price level
    fn insert(&mut self, order: Order) {
        self.levels_mut()
            .entry(order.price)
            .or_insert_with(PriceLevel::new)
            .add(order);
    }

    /// Remove an order from the book
    ///
    /// Empty levels are dropped so the book never holds a level without
    /// resident orders.
    fn remove(&mut self, order_id: &OrderId, price: Price) -> Option<Order> {
        let level = self.levels_mut().get_mut(&price)?;
        let removed = level.remove(order_id)?;
        if level.is_empty() {
            self.levels_mut().remove(&price);
        }
        Some(removed)
    }

    fn level(&self, price: Price) -> Option<&PriceLevel> {
        self.levels().get(&price)
    }

    fn level_mut(&mut self, price: Price) -> Option<&mut PriceLevel> {
        self.levels_mut().get_mut(&price)
    }

    /// Drop the level at `price` if it has no orders left
    fn prune(&mut self, price: Price) {
        if self.levels().get(&price).is_some_and(PriceLevel::is_empty) {
            self.levels_mut().remove(&price);
        }
    }

    fn get_order(&self, order_id: &OrderId, price: Price) -> Option<&Order> {
        self.level(price)?.get(order_id)
    }

    fn best_price(&self) -> Option<Price> {
        self.next_price(None)
    }

    /// Best price and its aggregate quantity
    fn best(&self) -> Option<(Price, Quantity)> {
        self.iter_levels().next().map(|(p, l)| (p, l.total()))
    }

    /// Get depth snapshot (top N price levels, best first)
    fn depth_snapshot(&self, depth: usize) -> Vec<(Price, Quantity)> {
        self.iter_levels()
            .take(depth)
            .map(|(price, level)| (price, level.total()))
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.levels().is_empty()
    }

    fn level_count(&self) -> usize {
        self.levels().len()
    }

    fn order_count(&self) -> usize {
        self.levels().values().map(PriceLevel::order_count).sum()
    }
}
