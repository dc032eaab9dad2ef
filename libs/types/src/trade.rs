//! Trade execution types

use crate::ids::{AccountId, MarketId, OrderId, TradeId};
use crate::numeric::{Price, Quantity};
use crate::order::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single fill between a resting maker and an incoming taker
///
/// Always executes at the maker's price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    pub symbol: MarketId,

    // Order references
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,

    // Account references
    pub maker_account_id: AccountId,
    pub taker_account_id: AccountId,

    /// Side of the resting order
    pub maker_side: Side,
    pub price: Price,
    pub quantity: Quantity,
    /// price × quantity, in quote currency
    pub total: Decimal,

    pub executed_at: i64, // Unix nanos
}

impl Trade {
    /// Create a new trade; `total` is derived from price and quantity
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        trade_id: TradeId,
        symbol: MarketId,
        maker_order_id: OrderId,
        taker_order_id: OrderId,
        maker_account_id: AccountId,
        taker_account_id: AccountId,
        maker_side: Side,
        price: Price,
        quantity: Quantity,
        executed_at: i64,
    ) -> Self {
        Self {
            trade_id,
            symbol,
            maker_order_id,
            taker_order_id,
            maker_account_id,
            taker_account_id,
            maker_side,
            price,
            quantity,
            total: price.notional(quantity),
            executed_at,
        }
    }

    /// Side of the incoming order
    pub fn taker_side(&self) -> Side {
        self.maker_side.opposite()
    }

    /// Order ID of the buying party
    pub fn buyer_order_id(&self) -> OrderId {
        match self.maker_side {
            Side::BUY => self.maker_order_id,
            Side::SELL => self.taker_order_id,
        }
    }

    /// Order ID of the selling party
    pub fn seller_order_id(&self) -> OrderId {
        match self.maker_side {
            Side::SELL => self.maker_order_id,
            Side::BUY => self.taker_order_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample() -> Trade {
        Trade::new(
            TradeId::new(1),
            MarketId::new("btcusdt"),
            OrderId::new(1),
            OrderId::new(2),
            AccountId::new(100),
            AccountId::new(200),
            Side::SELL,
            Price::from_str("20.10").unwrap(),
            Quantity::from_u64(2),
            1708123456789000000,
        )
    }

    #[test]
    fn test_trade_total() {
        assert_eq!(sample().total, Decimal::from_str_exact("40.20").unwrap());
    }

    #[test]
    fn test_trade_parties() {
        let trade = sample();
        assert_eq!(trade.taker_side(), Side::BUY);
        assert_eq!(trade.buyer_order_id(), OrderId::new(2));
        assert_eq!(trade.seller_order_id(), OrderId::new(1));
    }

    #[test]
    fn test_trade_serialization() {
        let trade = sample();
        let json = serde_json::to_string(&trade).unwrap();
        let back: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, back);
    }
}
