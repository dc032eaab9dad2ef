//! Event structures for matching engine
//!
//! Outbound contract consumed by the ledger service and the depth-cache
//! projector. Events are produced inside a book's critical section and
//! published after it is released.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::ids::{AccountId, MarketId, OrderId, TradeId};
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderStatus, Side};
use types::trade::Trade;
use uuid::Uuid;

/// Every event the engine emits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum EngineEvent {
    Trade(TradeEvent),
    OrderUpdate(OrderUpdateEvent),
    CancelAck(CancelAckEvent),
}

impl EngineEvent {
    pub fn symbol(&self) -> &MarketId {
        match self {
            EngineEvent::Trade(e) => &e.symbol,
            EngineEvent::OrderUpdate(e) => &e.symbol,
            EngineEvent::CancelAck(e) => &e.symbol,
        }
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            EngineEvent::Trade(_) => "trade",
            EngineEvent::OrderUpdate(_) => "order-update",
            EngineEvent::CancelAck(_) => "cancel-ack",
        }
    }
}

/// Trade executed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub trade_id: TradeId,
    pub symbol: MarketId,
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    pub maker_account_id: AccountId,
    pub taker_account_id: AccountId,
    pub price: Price,
    pub quantity: Quantity,
    pub total: Decimal,
    pub maker_side: Side,
    pub timestamp: i64,
}

impl From<&Trade> for TradeEvent {
    fn from(trade: &Trade) -> Self {
        Self {
            trade_id: trade.trade_id,
            symbol: trade.symbol.clone(),
            maker_order_id: trade.maker_order_id,
            taker_order_id: trade.taker_order_id,
            maker_account_id: trade.maker_account_id,
            taker_account_id: trade.taker_account_id,
            price: trade.price,
            quantity: trade.quantity,
            total: trade.total,
            maker_side: trade.maker_side,
            timestamp: trade.executed_at,
        }
    }
}

/// Fill-state change of a single order
///
/// Emitted for maker and taker on every fill, and for terminal outcomes
/// that happen without a resting phase (IOC/market remainder discard, AON
/// rejection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdateEvent {
    pub order_id: OrderId,
    pub uuid: Uuid,
    pub symbol: MarketId,
    pub filled_quantity: Quantity,
    pub unfilled_quantity: Quantity,
    #[serde(flatten)]
    pub state: OrderStatus,
    pub timestamp: i64,
}

impl OrderUpdateEvent {
    pub fn from_order(order: &Order, timestamp: i64) -> Self {
        Self {
            order_id: order.order_id,
            uuid: order.uuid,
            symbol: order.symbol.clone(),
            filled_quantity: order.filled_quantity,
            unfilled_quantity: order.unfilled(),
            state: order.status.clone(),
            timestamp,
        }
    }
}

/// Who canceled the order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CancelSource {
    User,
    System,
}

/// Order canceled acknowledgement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelAckEvent {
    pub order_id: OrderId,
    pub symbol: MarketId,
    pub canceled_by: CancelSource,
    pub filled_quantity: Quantity,
    pub unfilled_quantity: Quantity,
    pub timestamp: i64,
}

impl CancelAckEvent {
    pub fn user(order: &Order, timestamp: i64) -> Self {
        Self {
            order_id: order.order_id,
            symbol: order.symbol.clone(),
            canceled_by: CancelSource::User,
            filled_quantity: order.filled_quantity,
            unfilled_quantity: order.unfilled(),
            timestamp,
        }
    }
}
