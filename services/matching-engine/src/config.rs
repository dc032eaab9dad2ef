//! Engine configuration

use serde::{Deserialize, Serialize};
use types::clock::NANOS_PER_SECOND;

/// When a stop order may enter matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopActivation {
    /// A stop order whose stop price is already reached on arrival matches
    /// right away; others wait for the market price to reach them
    #[default]
    Immediate,
    /// Every stop order waits; it is activated by the next trade that moves
    /// the market price to or through its stop price
    NextTrade,
}

/// Retry policy of the event hand-off worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Attempts after the first failure before an event is dropped
    pub max_retries: u32,
    /// Base backoff, doubled on every retry
    pub retry_backoff_ms: u64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_backoff_ms: 50,
        }
    }
}

/// Configuration for the matching engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rolling window of trades kept in memory per market
    pub trade_retention_secs: u64,
    /// Hard cap on trades kept in memory per market
    pub trade_history_limit: usize,
    /// Depth used when a query asks for 0 levels
    pub default_depth_limit: usize,
    pub stop_activation: StopActivation,
    pub publisher: PublisherConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trade_retention_secs: 86_400,
            trade_history_limit: 100_000,
            default_depth_limit: 50,
            stop_activation: StopActivation::Immediate,
            publisher: PublisherConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Settings a single order book needs
    pub fn book(&self) -> BookConfig {
        BookConfig {
            stop_activation: self.stop_activation,
            trade_retention_nanos: i64::try_from(self.trade_retention_secs)
                .unwrap_or(i64::MAX)
                .saturating_mul(NANOS_PER_SECOND),
            trade_history_limit: self.trade_history_limit,
        }
    }
}

/// Per-book settings derived from [`EngineConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookConfig {
    pub stop_activation: StopActivation,
    pub trade_retention_nanos: i64,
    pub trade_history_limit: usize,
}

impl Default for BookConfig {
    fn default() -> Self {
        EngineConfig::default().book()
    }
}
