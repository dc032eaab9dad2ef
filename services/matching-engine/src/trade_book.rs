//! Recent trade history for one market
//!
//! Append-only in trade ID order. Trades older than the retention window
//! (measured against the newest trade) or beyond the size cap are evicted
//! from the front. Eviction is best-effort housekeeping, not part of
//! matching correctness.

use std::collections::VecDeque;

use types::ids::{MarketId, TradeId};
use types::trade::Trade;

/// Bounded trade history cache
#[derive(Debug, Clone)]
pub struct TradeBook {
    symbol: MarketId,
    /// Oldest first
    history: VecDeque<Trade>,
    /// Maximum age in nanoseconds
    retention_nanos: i64,
    /// Maximum history cache size
    max_history: usize,
}

impl TradeBook {
    pub fn new(symbol: MarketId, retention_nanos: i64, max_history: usize) -> Self {
        Self {
            symbol,
            history: VecDeque::new(),
            retention_nanos,
            max_history,
        }
    }

    /// Append a trade and evict what fell out of the window
    pub fn record(&mut self, trade: Trade) {
        let cutoff = trade.executed_at.saturating_sub(self.retention_nanos);
        self.history.push_back(trade);

        while self.history.len() > self.max_history {
            self.history.pop_front();
        }
        while self
            .history
            .front()
            .is_some_and(|oldest| oldest.executed_at < cutoff)
        {
            self.history.pop_front();
        }
    }

    /// Get recent trades from history (newest first)
    pub fn recent(&self, limit: usize) -> Vec<Trade> {
        self.history.iter().rev().take(limit).cloned().collect()
    }

    /// Trades with an ID strictly greater than `after`, oldest first
    pub fn since(&self, after: TradeId) -> Vec<Trade> {
        self.history
            .iter()
            .filter(|t| t.trade_id > after)
            .cloned()
            .collect()
    }

    pub fn last(&self) -> Option<&Trade> {
        self.history.back()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn symbol(&self) -> &MarketId {
        &self.symbol
    }
}
