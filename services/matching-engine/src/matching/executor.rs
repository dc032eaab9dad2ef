//! Trade execution logic
//!
//! Turns a fill between a maker and a taker into a `Trade` with an
//! engine-local, monotonically increasing trade ID.

use types::ids::{MarketId, TradeId};
use types::numeric::{Price, Quantity};
use types::order::Order;
use types::trade::Trade;

/// Match executor for handling trade generation
#[derive(Debug, Clone)]
pub struct MatchExecutor {
    symbol: MarketId,
    sequence_counter: u64,
}

impl MatchExecutor {
    /// Create a new match executor; the first trade gets `starting_sequence`
    pub fn new(symbol: MarketId, starting_sequence: u64) -> Self {
        Self {
            symbol,
            sequence_counter: starting_sequence,
        }
    }

    /// Get next sequence number (monotonically increasing)
    fn next_sequence(&mut self) -> u64 {
        let seq = self.sequence_counter;
        self.sequence_counter += 1;
        seq
    }

    /// Execute a trade between a maker and a taker order
    ///
    /// `price` is the maker's resting price.
    pub fn execute_trade(
        &mut self,
        maker: &Order,
        taker: &Order,
        price: Price,
        quantity: Quantity,
        timestamp: i64,
    ) -> Trade {
        let trade_id = TradeId::new(self.next_sequence());

        Trade::new(
            trade_id,
            self.symbol.clone(),
            maker.order_id,
            taker.order_id,
            maker.account_id,
            taker.account_id,
            maker.side,
            price,
            quantity,
            timestamp,
        )
    }

    /// ID the next trade will receive
    pub fn next_trade_id(&self) -> TradeId {
        TradeId::new(self.sequence_counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::{AccountId, OrderId};
    use types::order::Side;

    fn order(id: u64, side: Side) -> Order {
        Order::new(
            OrderId::new(id),
            AccountId::new(id * 10),
            MarketId::new("btcusdt"),
            side,
            Price::from_u64(50000),
            Quantity::from_u64(1),
            0,
        )
    }

    #[test]
    fn test_execute_trade() {
        let mut executor = MatchExecutor::new(MarketId::new("btcusdt"), 1000);
        let maker = order(1, Side::SELL);
        let taker = order(2, Side::BUY);

        let trade = executor.execute_trade(&maker, &taker, maker.price, Quantity::from_u64(1), 5);

        assert_eq!(trade.trade_id, TradeId::new(1000));
        assert_eq!(trade.maker_order_id, OrderId::new(1));
        assert_eq!(trade.taker_account_id, AccountId::new(20));
        assert_eq!(trade.maker_side, Side::SELL);
        assert_eq!(trade.price, Price::from_u64(50000));
    }

    #[test]
    fn test_sequence_monotonic() {
        let mut executor = MatchExecutor::new(MarketId::new("btcusdt"), 1);
        let maker = order(1, Side::BUY);
        let taker = order(2, Side::SELL);

        let t1 = executor.execute_trade(&maker, &taker, maker.price, Quantity::from_u64(1), 1);
        let t2 = executor.execute_trade(&maker, &taker, maker.price, Quantity::from_u64(1), 2);

        assert_eq!(t1.trade_id, TradeId::new(1));
        assert_eq!(t2.trade_id, TradeId::new(2));
        assert_eq!(executor.next_trade_id(), TradeId::new(3));
    }
}
