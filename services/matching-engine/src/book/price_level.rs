//! Price level implementation with FIFO queue
//!
//! A price level contains all resting orders at one price on one side.
//! Orders are kept in arrival order to enforce time priority; the book's
//! clock guarantees arrival order equals `created_at` order.

use std::collections::VecDeque;
use types::ids::OrderId;
use types::numeric::Quantity;
use types::order::Order;

/// A price level containing orders at a specific price
///
/// Tracks the aggregate unfilled quantity incrementally. `total()` must
/// always equal `recomputed_total()`.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    /// Queue of orders at this price level (FIFO order)
    orders: VecDeque<Order>,
    /// Total unfilled quantity available at this level
    total_quantity: Quantity,
}

impl PriceLevel {
    /// Create a new empty price level
    pub fn new() -> Self {
        Self {
            orders: VecDeque::new(),
            total_quantity: Quantity::zero(),
        }
    }

    /// Append an order at the back of the queue (time priority)
    pub fn add(&mut self, order: Order) {
        self.total_quantity = self.total_quantity + order.unfilled();
        self.orders.push_back(order);
    }

    /// Remove an order from the queue by OrderId, wherever it sits
    ///
    /// Returns the removed order, or None if not found
    pub fn remove(&mut self, order_id: &OrderId) -> Option<Order> {
        let position = self.orders.iter().position(|o| &o.order_id == order_id)?;
        let order = self.orders.remove(position)?;

        self.total_quantity = self.total_quantity.saturating_sub(order.unfilled());

        Some(order)
    }

    /// Oldest resident order
    pub fn top(&self) -> Option<&Order> {
        self.orders.front()
    }

    pub fn get(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| &o.order_id == order_id)
    }

    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.get(order_id).is_some()
    }

    /// Order at `index` in time priority
    pub fn order_at(&self, index: usize) -> Option<&Order> {
        self.orders.get(index)
    }

    /// Fill the order at `index` by `quantity`
    ///
    /// Returns a snapshot of the order after the fill. A fully filled order
    /// is removed from the level; a partially filled one keeps its position.
    ///
    /// # Panics
    /// Panics if `quantity` exceeds the order's unfilled quantity
    pub fn fill_at(&mut self, index: usize, quantity: Quantity, timestamp: i64) -> Option<Order> {
        let order = self.orders.get_mut(index)?;
        order.add_fill(quantity, timestamp);
        self.total_quantity = self.total_quantity.saturating_sub(quantity);

        if order.is_filled() {
            self.orders.remove(index)
        } else {
            Some(order.clone())
        }
    }

    /// Check if the price level is empty
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Aggregate unfilled quantity, tracked incrementally
    pub fn total(&self) -> Quantity {
        self.total_quantity
    }

    /// Aggregate unfilled quantity, summed from the resident orders
    pub fn recomputed_total(&self) -> Quantity {
        self.orders.iter().map(Order::unfilled).sum()
    }

    /// Get the number of orders at this level
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Resident orders in time priority
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self::new()
    }
}
