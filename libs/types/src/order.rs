//! Order lifecycle types
//!
//! An order's identity (ids, symbol, side, type, prices, original quantity)
//! is fixed at creation. Only the fill state, status and timestamps change
//! while it moves through the book.

use crate::errors::OrderError;
use crate::ids::{AccountId, MarketId, OrderId};
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    BUY,
    /// Sell order (ask)
    SELL,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::BUY => Side::SELL,
            Side::SELL => Side::BUY,
        }
    }
}

/// Pricing type of an order
///
/// A stop order is not a separate type: it is a limit or market order that
/// carries a `stop_price`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// Crosses only at its limit price or better; remainder may rest
    LIMIT,
    /// Crosses at any price; never rests
    MARKET,
}

/// Execution qualifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// Good-Till-Cancel: remains until filled or explicitly canceled
    #[default]
    GTC,
    /// Immediate-Or-Cancel: match immediately, cancel remainder
    IOC,
    /// All-Or-None: fill the whole quantity in one pass or not at all
    AON,
}

/// Order status
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason")]
pub enum OrderStatus {
    /// Accepted, resting or dormant, no fills yet
    #[serde(rename = "PENDING")]
    Pending,

    /// Partially matched
    #[serde(rename = "PARTIAL")]
    Partial,

    /// Completely matched (terminal)
    #[serde(rename = "FILLED")]
    Filled,

    /// Canceled by user or by execution rules (terminal)
    #[serde(rename = "CANCELED")]
    Canceled(CancelReason),

    /// Refused by the book (terminal)
    #[serde(rename = "REJECTED")]
    Rejected(RejectReason),
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled(_) | OrderStatus::Rejected(_)
        )
    }

    /// Get the state ID for wire protocol
    pub fn state_id(&self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Partial => 1,
            OrderStatus::Filled => 2,
            OrderStatus::Canceled(_) => 3,
            OrderStatus::Rejected(_) => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancelReason {
    UserRequested,
    /// Unfilled remainder of an IOC order
    ImmediateOrCancel,
    /// Unfilled remainder of a market order once liquidity ran out
    NoLiquidity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    /// AON order that could not be filled completely on arrival
    AonUnsatisfiable,
}

/// Complete order structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub uuid: Uuid,
    pub account_id: AccountId,
    pub symbol: MarketId,
    pub side: Side,
    pub order_type: OrderType,
    #[serde(default)]
    pub time_in_force: TimeInForce,
    /// Limit price; zero for market orders
    #[serde(default)]
    pub price: Price,
    #[serde(default)]
    pub stop_price: Option<Price>,
    pub quantity: Quantity,
    #[serde(default)]
    pub filled_quantity: Quantity,
    #[serde(default = "pending")]
    pub status: OrderStatus,
    pub created_at: i64, // Unix nanos
    #[serde(default)]
    pub updated_at: i64, // Unix nanos
}

fn pending() -> OrderStatus {
    OrderStatus::Pending
}

impl Order {
    /// Create a new pending GTC limit order
    pub fn new(
        order_id: OrderId,
        account_id: AccountId,
        symbol: MarketId,
        side: Side,
        price: Price,
        quantity: Quantity,
        timestamp: i64,
    ) -> Self {
        Self {
            order_id,
            uuid: Uuid::now_v7(),
            account_id,
            symbol,
            side,
            order_type: OrderType::LIMIT,
            time_in_force: TimeInForce::GTC,
            price,
            stop_price: None,
            quantity,
            filled_quantity: Quantity::zero(),
            status: OrderStatus::Pending,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Create a new pending market order
    pub fn market(
        order_id: OrderId,
        account_id: AccountId,
        symbol: MarketId,
        side: Side,
        quantity: Quantity,
        timestamp: i64,
    ) -> Self {
        Self {
            order_type: OrderType::MARKET,
            ..Self::new(order_id, account_id, symbol, side, Price::zero(), quantity, timestamp)
        }
    }

    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }

    pub fn with_stop_price(mut self, stop_price: Price) -> Self {
        self.stop_price = Some(stop_price);
        self
    }

    /// Validate the static fields before the order touches a book
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.quantity.is_zero() || self.quantity.as_decimal().is_sign_negative() {
            return Err(OrderError::InvalidQuantity(self.quantity.to_string()));
        }
        if self.filled_quantity > self.quantity {
            return Err(OrderError::InvalidQuantity(format!(
                "filled {} exceeds quantity {}",
                self.filled_quantity, self.quantity
            )));
        }
        if self.price.as_decimal().is_sign_negative() && !self.price.is_zero() {
            return Err(OrderError::InvalidPrice(self.price.to_string()));
        }
        if self.order_type == OrderType::LIMIT && self.price.is_zero() {
            return Err(OrderError::MissingPrice);
        }
        if let Some(stop) = self.stop_price {
            if stop.is_zero() || stop.as_decimal().is_sign_negative() {
                return Err(OrderError::InvalidStopPrice(stop.to_string()));
            }
        }
        Ok(())
    }

    /// Quantity still open: original minus filled
    pub fn unfilled(&self) -> Quantity {
        self.quantity.saturating_sub(self.filled_quantity)
    }

    /// Check quantity invariant: 0 <= filled <= total
    pub fn check_invariant(&self) -> bool {
        self.filled_quantity <= self.quantity
    }

    /// Check if order is completely filled
    pub fn is_filled(&self) -> bool {
        self.unfilled().is_zero()
    }

    /// Check if order has any fills
    pub fn has_fills(&self) -> bool {
        !self.filled_quantity.is_zero()
    }

    pub fn is_market(&self) -> bool {
        self.order_type == OrderType::MARKET
    }

    pub fn is_aon(&self) -> bool {
        self.time_in_force == TimeInForce::AON
    }

    pub fn is_ioc(&self) -> bool {
        self.time_in_force == TimeInForce::IOC
    }

    pub fn is_stop(&self) -> bool {
        self.stop_price.is_some()
    }

    /// Limit price, or None for market orders
    pub fn limit_price(&self) -> Option<Price> {
        match self.order_type {
            OrderType::LIMIT => Some(self.price),
            OrderType::MARKET => None,
        }
    }

    /// Update filled quantity and adjust status
    ///
    /// # Panics
    /// Panics if the fill would exceed total quantity
    pub fn add_fill(&mut self, fill_quantity: Quantity, timestamp: i64) {
        let new_filled = self.filled_quantity + fill_quantity;

        assert!(new_filled <= self.quantity, "Fill would exceed order quantity");

        self.filled_quantity = new_filled;

        if self.is_filled() {
            self.status = OrderStatus::Filled;
        } else if self.has_fills() {
            self.status = OrderStatus::Partial;
        }

        self.updated_at = timestamp;
    }

    /// Cancel the order
    ///
    /// # Panics
    /// Panics if order is already in terminal state
    pub fn cancel(&mut self, reason: CancelReason, timestamp: i64) {
        assert!(!self.status.is_terminal(), "Cannot cancel terminal order");

        self.status = OrderStatus::Canceled(reason);
        self.updated_at = timestamp;
    }

    /// Reject the order
    pub fn reject(&mut self, reason: RejectReason, timestamp: i64) {
        self.status = OrderStatus::Rejected(reason);
        self.updated_at = timestamp;
    }
}
