//! Matching engine core
//!
//! Market registry and command dispatch. Each market owns one
//! `OrderBook` behind a single `RwLock`: submit, cancel and the stop
//! cascade they trigger all run inside one write section, queries share
//! the read lock. Markets never contend with each other.
//!
//! Events are collected inside the write section and handed to the
//! publisher only after the lock is released.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};
use types::clock::now_nanos;
use types::errors::EngineError;
use types::ids::{MarketId, TradeId};
use types::numeric::Price;
use types::order::{Order, Side};
use types::trade::Trade;

use crate::command::{Command, CommandOutcome, OrderKey, ReloadTarget};
use crate::config::EngineConfig;
use crate::events::EngineEvent;
use crate::matching::Budget;
use crate::order_book::{BookSummary, MarketOrderQuote, OrderBook, OrderBookSnapshot, OrderRef};
use crate::publisher::EventPublisher;
use crate::store::OrderStore;

/// One market: its book and whether the book may be used
#[derive(Debug)]
pub struct Market {
    book: RwLock<OrderBook>,
    /// False while a reload is rebuilding the book
    ready: AtomicBool,
}

impl Market {
    fn new(book: OrderBook, ready: bool) -> Self {
        Self {
            book: RwLock::new(book),
            ready: AtomicBool::new(ready),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

/// Main matching engine
pub struct MatchingEngine {
    /// Markets by symbol
    markets: DashMap<String, Arc<Market>>,
    store: Arc<dyn OrderStore>,
    publisher: EventPublisher,
    config: EngineConfig,
}

impl MatchingEngine {
    pub fn new(store: Arc<dyn OrderStore>, publisher: EventPublisher, config: EngineConfig) -> Self {
        Self {
            markets: DashMap::new(),
            store,
            publisher,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Load every enabled market from the store
    pub async fn start(&self) -> Result<CommandOutcome, EngineError> {
        info!("Matching engine starting");
        self.reload_all().await
    }

    /// Route a command to the market it addresses
    pub async fn dispatch(&self, command: Command) -> Result<CommandOutcome, EngineError> {
        debug!(action = command.label(), symbol = ?command.symbol(), "Dispatching command");

        match command {
            Command::Submit { order } => self.submit(order),
            Command::Cancel(key) => self.cancel(&key),
            Command::Reload {
                target: ReloadTarget::All,
            } => self.reload_all().await,
            Command::Reload {
                target: ReloadTarget::Market(symbol),
            } => self.reload(&symbol).await,
            Command::New { symbol } => Ok(self.new_market(symbol)),
        }
    }

    /// Submit an order to its market
    pub fn submit(&self, order: Order) -> Result<CommandOutcome, EngineError> {
        let market = self.market(&order.symbol)?;
        let symbol = order.symbol.clone();
        let order_id = order.order_id;

        let outcome = {
            let mut book = market.book.write();
            book.add(order, now_nanos())?
        };

        debug!(
            %symbol,
            %order_id,
            matched = outcome.matched,
            duplicate = outcome.duplicate,
            events = outcome.events.len(),
            "Order submitted"
        );

        let result = CommandOutcome {
            matched: outcome.matched,
            noop: outcome.duplicate,
            events: outcome.events.len(),
            markets: 0,
        };
        self.publish(outcome.events);
        Ok(result)
    }

    /// Cancel the order `key` points at
    ///
    /// A key that matches nothing is a successful no-op.
    pub fn cancel(&self, key: &OrderKey) -> Result<CommandOutcome, EngineError> {
        let market = self.market(&key.symbol)?;

        let outcome = {
            let mut book = market.book.write();
            if book.fetch_order(key.side, key.price, key.reference).is_none() {
                None
            } else {
                Some(book.cancel(key.reference, now_nanos()))
            }
        };

        let Some(outcome) = outcome.filter(|o| o.canceled.is_some()) else {
            debug!(symbol = %key.symbol, reference = ?key.reference, "Cancel matched no order");
            return Ok(CommandOutcome {
                noop: true,
                ..CommandOutcome::default()
            });
        };

        let result = CommandOutcome {
            events: outcome.events.len(),
            ..CommandOutcome::default()
        };
        self.publish(outcome.events);
        Ok(result)
    }

    /// Rebuild one market from the store
    ///
    /// The market is not ready while loading. Open orders are replayed in
    /// ascending ID order through the normal submit path, so only crosses
    /// that never happened before produce events. On failure the market
    /// stays not ready until a later reload succeeds.
    pub async fn reload(&self, symbol: &MarketId) -> Result<CommandOutcome, EngineError> {
        let market = Arc::clone(
            &*self
                .markets
                .entry(symbol.to_string())
                .or_insert_with(|| Arc::new(Market::new(self.empty_book(symbol), false))),
        );
        market.ready.store(false, Ordering::Release);
        info!(%symbol, "Market reload started");

        let market_price = self.store.last_trade_price(symbol).await?;
        let mut orders = self.store.open_orders(symbol).await?;
        orders.sort_by_key(|o| o.order_id);

        // Replay under the write lock so the trade sequence carries over
        let mut current = market.book.write();
        let mut book = self
            .empty_book(symbol)
            .with_market_price(market_price.unwrap_or_default())
            .with_history(&current);
        let timestamp = now_nanos();
        let mut events: Vec<EngineEvent> = Vec::new();
        let mut matched = false;
        let mut replayed = 0usize;
        let mut skipped = 0usize;

        for order in orders {
            let order_id = order.order_id;
            match book.add(order, timestamp) {
                Ok(outcome) => {
                    replayed += 1;
                    matched |= outcome.matched;
                    events.extend(outcome.events);
                }
                Err(err) => {
                    skipped += 1;
                    warn!(%symbol, %order_id, error = %err, "Skipping stored order");
                }
            }
        }

        let next_trade_id = book.next_trade_id();
        *current = book;
        drop(current);
        market.ready.store(true, Ordering::Release);

        info!(
            %symbol,
            replayed,
            skipped,
            %next_trade_id,
            new_events = events.len(),
            "Market reload finished"
        );

        let result = CommandOutcome {
            matched,
            noop: false,
            events: events.len(),
            markets: 1,
        };
        self.publish(events);
        Ok(result)
    }

    /// Rebuild every enabled market
    ///
    /// Markets are independent: one failing reload does not stop the
    /// others. The first error is returned after all were attempted.
    pub async fn reload_all(&self) -> Result<CommandOutcome, EngineError> {
        let symbols = self.store.enabled_markets().await?;
        let mut total = CommandOutcome::default();
        let mut first_error = None;

        for symbol in &symbols {
            match self.reload(symbol).await {
                Ok(outcome) => {
                    total.matched |= outcome.matched;
                    total.events += outcome.events;
                    total.markets += outcome.markets;
                }
                Err(err) => {
                    error!(%symbol, error = %err, "Market reload failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        info!(markets = total.markets, requested = symbols.len(), "Markets loaded");
        match first_error {
            Some(err) => Err(err),
            None => Ok(total),
        }
    }

    /// Start an empty, ready book for a newly enabled market
    ///
    /// A market that already exists is left as is.
    pub fn new_market(&self, symbol: MarketId) -> CommandOutcome {
        let mut created = false;
        self.markets.entry(symbol.to_string()).or_insert_with(|| {
            created = true;
            Arc::new(Market::new(self.empty_book(&symbol), true))
        });

        if created {
            info!(%symbol, "Market created");
        } else {
            debug!(%symbol, "Market already exists");
        }
        CommandOutcome {
            noop: !created,
            markets: usize::from(created),
            ..CommandOutcome::default()
        }
    }

    /// Symbols of all registered markets, sorted
    pub fn markets(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.markets.iter().map(|e| e.key().clone()).collect();
        symbols.sort();
        symbols
    }

    pub fn is_ready(&self, symbol: &MarketId) -> bool {
        self.markets
            .get(symbol.as_str())
            .is_some_and(|m| m.is_ready())
    }

    /// Fetch a resting or dormant order by its full key
    pub fn fetch_order(
        &self,
        symbol: &MarketId,
        side: Side,
        price: Price,
        reference: OrderRef,
    ) -> Result<Option<Order>, EngineError> {
        let market = self.market(symbol)?;
        let book = market.book.read();
        Ok(book.fetch_order(side, price, reference).cloned())
    }

    pub fn fetch_market_price(&self, symbol: &MarketId) -> Result<Price, EngineError> {
        let market = self.market(symbol)?;
        let price = market.book.read().market_price();
        Ok(price)
    }

    /// Aggregated depth; `depth_limit` 0 uses the configured default
    pub fn fetch_order_book(
        &self,
        symbol: &MarketId,
        depth_limit: usize,
    ) -> Result<OrderBookSnapshot, EngineError> {
        let limit = if depth_limit == 0 {
            self.config.default_depth_limit
        } else {
            depth_limit
        };
        let market = self.market(symbol)?;
        let snapshot = market.book.read().depth(limit);
        Ok(snapshot)
    }

    /// Quote a hypothetical market order without mutating the book
    pub fn calc_market_order(
        &self,
        symbol: &MarketId,
        side: Side,
        budget: Budget,
    ) -> Result<MarketOrderQuote, EngineError> {
        let market = self.market(symbol)?;
        let quote = market.book.read().calc_market_order(side, budget);
        Ok(quote)
    }

    /// Newest first
    pub fn recent_trades(&self, symbol: &MarketId, limit: usize) -> Result<Vec<Trade>, EngineError> {
        let market = self.market(symbol)?;
        let trades = market.book.read().recent_trades(limit);
        Ok(trades)
    }

    /// Retained trades after `after`, oldest first
    pub fn trades_since(&self, symbol: &MarketId, after: TradeId) -> Result<Vec<Trade>, EngineError> {
        let market = self.market(symbol)?;
        let trades = market.book.read().trades_since(after);
        Ok(trades)
    }

    pub fn market_summary(&self, symbol: &MarketId) -> Result<BookSummary, EngineError> {
        let market = self.market(symbol)?;
        let summary = market.book.read().summary();
        Ok(summary)
    }

    /// Resolve a ready market
    fn market(&self, symbol: &MarketId) -> Result<Arc<Market>, EngineError> {
        let Some(market) = self.markets.get(symbol.as_str()).map(|m| Arc::clone(&m)) else {
            warn!(%symbol, "Command for unknown market");
            return Err(EngineError::UnknownMarket {
                symbol: symbol.to_string(),
            });
        };
        if !market.is_ready() {
            warn!(%symbol, "Command for market that is not ready");
            return Err(EngineError::MarketNotReady {
                symbol: symbol.to_string(),
            });
        }
        Ok(market)
    }

    fn empty_book(&self, symbol: &MarketId) -> OrderBook {
        OrderBook::new(symbol.clone(), self.config.book())
    }

    fn publish(&self, events: Vec<EngineEvent>) {
        if events.is_empty() {
            return;
        }
        if let Err(err) = self.publisher.publish_all(events) {
            error!(error = %err, "Event hand-off failed");
        }
    }
}
