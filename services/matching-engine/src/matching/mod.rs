//! Matching logic module
//!
//! Implements the price-time priority sweep and its helpers

pub mod crossing;
pub mod executor;
pub mod liquidity;

pub use crossing::incoming_can_match;
pub use executor::MatchExecutor;
pub use liquidity::{walk, Budget, LiquidityWalk};
