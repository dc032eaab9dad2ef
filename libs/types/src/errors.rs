//! Error types for the matching engine
//!
//! Comprehensive error taxonomy using thiserror. Duplicate submissions and
//! cancels of unknown orders are deliberately absent: both are successful
//! no-ops so that at-least-once delivery upstream stays harmless.

use thiserror::Error;

/// Top-level engine error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Unknown market: {symbol}")]
    UnknownMarket { symbol: String },

    #[error("Market not ready: {symbol}")]
    MarketNotReady { symbol: String },

    #[error("Order store error: {message}")]
    Store { message: String },

    #[error("Malformed command: {message}")]
    Decode { message: String },
}

/// Order validation errors, raised before any book mutation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid stop price: {0}")]
    InvalidStopPrice(String),

    #[error("Limit order requires a positive price")]
    MissingPrice,

    #[error("Order for {order_symbol} submitted to book {book_symbol}")]
    SymbolMismatch {
        order_symbol: String,
        book_symbol: String,
    },
}
