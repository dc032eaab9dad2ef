//! Types library for the exchange matching services
//!
//! Shared domain types so that the engine, its command sources and its event
//! consumers agree on one representation.
//!
//! # Modules
//! - `ids`: Identifiers (OrderId, TradeId, AccountId, MarketId)
//! - `numeric`: Exact decimal types (Price, Quantity)
//! - `order`: Order lifecycle types
//! - `trade`: Trade execution types
//! - `clock`: Exchange timestamp source
//! - `errors`: Error taxonomy

pub mod clock;
pub mod errors;
pub mod ids;
pub mod numeric;
pub mod order;
pub mod trade;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::clock::*;
    pub use crate::errors::*;
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::order::*;
    pub use crate::trade::*;
}
