//! Matching Engine Service
//!
//! Price-time priority matching for a multi-market exchange. Each market
//! holds one in-memory order book rebuilt from the external order store on
//! startup; trades and order updates are handed to downstream consumers
//! asynchronously.
//!
//! **Key Invariants:**
//! - Price-time priority strictly enforced, trades at the maker's price
//! - AON orders fill completely or not at all
//! - IOC and market orders never rest
//! - A level's aggregate always equals the sum of its resident orders
//! - Matching state is never rolled back once applied

pub mod book;
pub mod command;
pub mod config;
pub mod engine;
pub mod events;
pub mod matching;
pub mod order_book;
pub mod publisher;
pub mod store;
pub mod trade_book;

pub use command::{Command, CommandOutcome, OrderKey, ReloadTarget};
pub use config::{EngineConfig, StopActivation};
pub use engine::MatchingEngine;
pub use events::EngineEvent;
pub use order_book::{OrderBook, OrderRef};
pub use publisher::{BalanceUpdater, EventPublisher, EventSink};
pub use store::{MemoryOrderStore, OrderStore};
