//! Asynchronous event hand-off
//!
//! Books produce events inside their critical section; the engine pushes
//! them onto an unbounded channel after the lock is released. A single
//! worker task drains the channel in order, publishes each event with
//! retry and exponential backoff, and applies trades to the balance
//! ledger when one is configured. A failure here never unwinds a fill.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::PublisherConfig;
use crate::events::{EngineEvent, TradeEvent};

/// Event delivery errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("Event sink unavailable: {0}")]
    Unavailable(String),

    #[error("Balance update failed: {0}")]
    Balance(String),

    #[error("Publisher worker has stopped")]
    Closed,
}

/// Downstream consumer of engine events (message bus, socket, stdout)
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: &EngineEvent) -> Result<(), PublishError>;
}

/// Ledger that debits and credits accounts for every trade
#[async_trait]
pub trait BalanceUpdater: Send + Sync {
    async fn apply_trade(&self, trade: &TradeEvent) -> Result<(), PublishError>;
}

/// Counters reported by the worker when it stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherStats {
    pub published: u64,
    pub retries: u64,
    pub dropped: u64,
    pub balance_updates: u64,
    pub balance_failures: u64,
}

/// Sending half of the hand-off queue
///
/// Cloning is cheap; the worker stops once every clone is dropped and the
/// queue is drained.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EventPublisher {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn(
        sink: Arc<dyn EventSink>,
        balance: Option<Arc<dyn BalanceUpdater>>,
        config: PublisherConfig,
    ) -> (Self, JoinHandle<PublisherStats>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = PublishWorker {
            sink,
            balance,
            config,
            stats: PublisherStats::default(),
        };
        let handle = tokio::spawn(worker.run(rx));
        (Self { tx }, handle)
    }

    /// A publisher backed by a bare channel, for callers that consume
    /// events themselves
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue events in order. Never blocks.
    pub fn publish_all(&self, events: Vec<EngineEvent>) -> Result<(), PublishError> {
        for event in events {
            self.tx.send(event).map_err(|_| PublishError::Closed)?;
        }
        Ok(())
    }
}

struct PublishWorker {
    sink: Arc<dyn EventSink>,
    balance: Option<Arc<dyn BalanceUpdater>>,
    config: PublisherConfig,
    stats: PublisherStats,
}

impl PublishWorker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<EngineEvent>) -> PublisherStats {
        info!(
            max_retries = self.config.max_retries,
            retry_backoff_ms = self.config.retry_backoff_ms,
            balance_updates = self.balance.is_some(),
            "Event publisher started"
        );

        while let Some(event) = rx.recv().await {
            self.deliver(&event).await;
        }

        info!(
            published = self.stats.published,
            dropped = self.stats.dropped,
            retries = self.stats.retries,
            "Event publisher stopped"
        );
        self.stats
    }

    async fn deliver(&mut self, event: &EngineEvent) {
        let sink = Arc::clone(&self.sink);
        let (result, retries) = retry(&self.config, event.label(), || sink.publish(event)).await;
        self.stats.retries += u64::from(retries);
        match result {
            Ok(()) => {
                self.stats.published += 1;
                debug!(event = event.label(), symbol = %event.symbol(), "Event published");
            }
            Err(err) => {
                self.stats.dropped += 1;
                error!(
                    event = event.label(),
                    symbol = %event.symbol(),
                    error = %err,
                    "Giving up on event"
                );
            }
        }

        let (EngineEvent::Trade(trade), Some(balance)) = (event, self.balance.clone()) else {
            return;
        };
        let (result, retries) = retry(&self.config, "balance", || balance.apply_trade(trade)).await;
        self.stats.retries += u64::from(retries);
        match result {
            Ok(()) => self.stats.balance_updates += 1,
            Err(err) => {
                self.stats.balance_failures += 1;
                error!(
                    trade_id = %trade.trade_id,
                    symbol = %trade.symbol,
                    error = %err,
                    "Giving up on balance update"
                );
            }
        }
    }
}

/// Run `op` until it succeeds or retries run out; returns the last result
/// and the number of retries spent
async fn retry<F, Fut>(config: &PublisherConfig, what: &str, mut op: F) -> (Result<(), PublishError>, u32)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), PublishError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(()) => return (Ok(()), attempt),
            Err(err) if attempt < config.max_retries => {
                let backoff_ms = config
                    .retry_backoff_ms
                    .saturating_mul(1u64 << attempt.min(16));
                attempt += 1;
                warn!(
                    what,
                    attempt,
                    backoff_ms,
                    error = %err,
                    "Delivery failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
            Err(err) => return (Err(err), attempt),
        }
    }
}
