//! Crossing detection logic
//!
//! Determines when an incoming order may trade against a resting price

use types::numeric::Price;
use types::order::Side;

/// Check if an incoming order can match against a resting price
///
/// `limit` is None for market orders, which cross at any price.
/// - Buy crosses while resting ask <= limit
/// - Sell crosses while resting bid >= limit
pub fn incoming_can_match(incoming_side: Side, limit: Option<Price>, resting_price: Price) -> bool {
    let Some(limit) = limit else {
        return true;
    };
    match incoming_side {
        Side::BUY => limit >= resting_price,
        Side::SELL => limit <= resting_price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn p(s: &str) -> Price {
        Price::from_str(s).unwrap()
    }

    #[test]
    fn test_incoming_buy_can_match() {
        assert!(incoming_can_match(Side::BUY, Some(p("20.12")), p("20.10")));
        assert!(incoming_can_match(Side::BUY, Some(p("20.10")), p("20.10")));
        assert!(!incoming_can_match(Side::BUY, Some(p("20.09")), p("20.10")));
    }

    #[test]
    fn test_incoming_sell_can_match() {
        assert!(incoming_can_match(Side::SELL, Some(p("49000")), p("50000")));
        assert!(!incoming_can_match(Side::SELL, Some(p("50001")), p("50000")));
    }

    #[test]
    fn test_market_order_always_crosses() {
        assert!(incoming_can_match(Side::BUY, None, p("1000000")));
        assert!(incoming_can_match(Side::SELL, None, p("0.0001")));
    }
}
