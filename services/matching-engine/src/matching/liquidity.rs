//! Side-effect-free walk over opposing liquidity
//!
//! Mirrors the sweep exactly (same crossing rule, same AON maker skipping)
//! without mutating the book. The AON pre-check and market-order quotes both
//! rely on it, so what it reports is what a real sweep would fill.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::numeric::{Price, Quantity};
use types::order::Side;

use super::crossing::incoming_can_match;
use crate::book::LevelBook;

/// How much a hypothetical taker wants to consume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Budget {
    /// Base-currency quantity
    Quantity(Quantity),
    /// Quote-currency funds to spend
    Funds(Decimal),
}

/// Outcome of a liquidity walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LiquidityWalk {
    /// Base quantity that would be filled
    pub quantity: Quantity,
    /// Quote value of that quantity at maker prices
    pub total: Decimal,
    /// Number of price levels touched
    pub levels: usize,
}

/// Walk `book` from the best price as a taker on `taker_side` would
///
/// `limit` is None for market orders.
pub fn walk<B: LevelBook>(
    book: &B,
    taker_side: Side,
    limit: Option<Price>,
    budget: Budget,
) -> LiquidityWalk {
    let mut result = LiquidityWalk::default();

    for (price, level) in book.iter_levels() {
        if exhausted(&result, budget) || !incoming_can_match(taker_side, limit, price) {
            break;
        }
        let mut touched = false;

        for maker in level.iter() {
            let maker_unfilled = maker.unfilled();
            let take = match budget {
                Budget::Quantity(wanted) => {
                    let remaining = wanted.saturating_sub(result.quantity);
                    if remaining.is_zero() {
                        break;
                    }
                    if maker.is_aon() && maker_unfilled > remaining {
                        continue;
                    }
                    maker_unfilled.min(remaining)
                }
                Budget::Funds(funds) => {
                    let remaining = funds - result.total;
                    if remaining <= Decimal::ZERO {
                        break;
                    }
                    let Some(affordable) = remaining.checked_div(price.as_decimal()) else {
                        continue;
                    };
                    let affordable = Quantity::try_new(affordable).unwrap_or_default();
                    if maker.is_aon() && maker_unfilled > affordable {
                        continue;
                    }
                    maker_unfilled.min(affordable)
                }
            };
            if take.is_zero() {
                continue;
            }
            result.quantity = result.quantity + take;
            result.total += price.notional(take);
            touched = true;
        }

        if touched {
            result.levels += 1;
        }
    }

    result
}

fn exhausted(result: &LiquidityWalk, budget: Budget) -> bool {
    match budget {
        Budget::Quantity(wanted) => result.quantity >= wanted,
        Budget::Funds(funds) => result.total >= funds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::AskBook;
    use std::str::FromStr;
    use types::ids::{AccountId, MarketId, OrderId};
    use types::order::{Order, TimeInForce};

    fn ask(id: u64, price: &str, qty: &str) -> Order {
        Order::new(
            OrderId::new(id),
            AccountId::new(1),
            MarketId::new("btcusdt"),
            Side::SELL,
            Price::from_str(price).unwrap(),
            Quantity::from_str(qty).unwrap(),
            id as i64,
        )
    }

    fn book() -> AskBook {
        let mut book = AskBook::new();
        book.insert(ask(1, "10", "1"));
        book.insert(ask(2, "11", "2"));
        book.insert(ask(3, "12", "3"));
        book
    }

    #[test]
    fn test_walk_by_quantity_market() {
        let walk = walk(&book(), Side::BUY, None, Budget::Quantity(Quantity::from_u64(2)));
        assert_eq!(walk.quantity, Quantity::from_u64(2));
        assert_eq!(walk.total, Decimal::from(21));
        assert_eq!(walk.levels, 2);
    }

    #[test]
    fn test_walk_respects_limit() {
        let walk = walk(
            &book(),
            Side::BUY,
            Some(Price::from_u64(11)),
            Budget::Quantity(Quantity::from_u64(10)),
        );
        assert_eq!(walk.quantity, Quantity::from_u64(3));
        assert_eq!(walk.total, Decimal::from(32));
    }

    #[test]
    fn test_walk_by_funds() {
        let walk = walk(&book(), Side::BUY, None, Budget::Funds(Decimal::from(32)));
        assert_eq!(walk.quantity, Quantity::from_u64(3));
        assert_eq!(walk.total, Decimal::from(32));

        let walk = super::walk(&book(), Side::BUY, None, Budget::Funds(Decimal::from(5)));
        assert_eq!(walk.quantity, Quantity::from_str("0.5").unwrap());
        assert_eq!(walk.total, Decimal::from(5));
    }

    #[test]
    fn test_walk_skips_aon_maker_larger_than_remaining() {
        let mut book = AskBook::new();
        book.insert(ask(1, "10", "5").with_time_in_force(TimeInForce::AON));
        book.insert(ask(2, "10", "1"));
        book.insert(ask(3, "11", "1"));

        let walk = walk(&book, Side::BUY, None, Budget::Quantity(Quantity::from_u64(2)));
        assert_eq!(walk.quantity, Quantity::from_u64(2));
        assert_eq!(walk.total, Decimal::from(21));
    }
}
