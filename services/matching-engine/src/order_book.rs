//! Order book for a single market
//!
//! Owns both live sides, the dormant stop book, the last traded price and
//! the recent trade history, and implements the matching algorithm:
//!
//! 1. Stop orders that have not triggered are parked in the stop book.
//! 2. AON orders are checked against the liquidity they are willing to cross.
//! 3. The taker sweeps the opposing side best price first, oldest order
//!    first, trading at the maker's price. AON makers are only ever filled
//!    completely and are skipped by takers too small to do so.
//! 4. Remainders of market and IOC orders are canceled; limit remainders rest.
//! 5. Every change of the market price moves triggered stop orders into a
//!    pending queue that is drained only after the current taker finishes.
//!
//! All mutation happens through `&mut self`; callers provide the exclusive
//! section (see `engine::Market`). Events are returned, never published from
//! here.

use std::collections::{HashMap, VecDeque};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::errors::OrderError;
use types::ids::{MarketId, OrderId, TradeId};
use types::numeric::{Price, Quantity};
use types::order::{CancelReason, Order, OrderStatus, RejectReason, Side};
use types::trade::Trade;
use uuid::Uuid;

use crate::book::{stop_book, AskBook, BidBook, LevelBook, StopBook};
use crate::config::{BookConfig, StopActivation};
use crate::events::{CancelAckEvent, EngineEvent, OrderUpdateEvent, TradeEvent};
use crate::matching::{crossing, liquidity, Budget, MatchExecutor};
use crate::trade_book::TradeBook;

/// Reference to an order by store ID or by client-facing UUID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderRef {
    Id(OrderId),
    Uuid(Uuid),
}

impl From<OrderId> for OrderRef {
    fn from(id: OrderId) -> Self {
        OrderRef::Id(id)
    }
}

/// Where a live order currently sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Resting { side: Side, price: Price },
    Dormant,
}

/// Result of `OrderBook::add`
#[derive(Debug, Clone, Default)]
pub struct AddOutcome {
    /// At least one trade happened, including trades of stop orders the
    /// submission activated
    pub matched: bool,
    /// The order ID was already in the book; nothing changed
    pub duplicate: bool,
    pub events: Vec<EngineEvent>,
}

impl AddOutcome {
    pub fn trades(&self) -> impl Iterator<Item = &TradeEvent> {
        self.events.iter().filter_map(|e| match e {
            EngineEvent::Trade(t) => Some(t),
            _ => None,
        })
    }
}

/// Result of `OrderBook::cancel`
#[derive(Debug, Clone, Default)]
pub struct CancelOutcome {
    /// The canceled order, None when nothing matched the reference
    pub canceled: Option<Order>,
    pub events: Vec<EngineEvent>,
}

/// Aggregated depth, best price first on both sides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub symbol: String,
    pub market_price: Price,
    pub bids: Vec<(Price, Quantity)>,
    pub asks: Vec<(Price, Quantity)>,
}

/// What a hypothetical market order would consume right now
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketOrderQuote {
    pub side: Side,
    /// Base quantity that would fill
    pub quantity: Quantity,
    /// Quote value of the fill at maker prices
    pub total: Decimal,
    /// Funds the order must lock: quote total for buys, base quantity for sells
    pub locked: Decimal,
    pub levels: usize,
}

/// Book statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSummary {
    pub symbol: String,
    pub market_price: Price,
    pub best_bid: Option<(Price, Quantity)>,
    pub best_ask: Option<(Price, Quantity)>,
    pub bid_levels: usize,
    pub ask_levels: usize,
    pub resting_orders: usize,
    pub dormant_stops: usize,
    pub last_trade_id: Option<TradeId>,
}

/// One maker fill produced by a sweep
#[derive(Debug)]
struct Fill {
    /// Maker after the fill
    maker: Order,
    price: Price,
    quantity: Quantity,
    /// Taker's cumulative filled quantity after this fill
    taker_filled: Quantity,
}

/// Matching state of one market
#[derive(Debug, Clone)]
pub struct OrderBook {
    symbol: MarketId,
    bids: BidBook,
    asks: AskBook,
    stops: StopBook,
    /// Last trade price; zero before the first trade
    market_price: Price,
    locations: HashMap<OrderId, Location>,
    uuids: HashMap<Uuid, OrderId>,
    /// Triggered stop orders waiting for the current taker to finish
    pending: VecDeque<Order>,
    /// Stops parked under `NextTrade` whose trigger was already met
    armed: Vec<OrderId>,
    executor: MatchExecutor,
    trades: TradeBook,
    /// Last time priority handed out
    last_stamp: i64,
    stop_activation: StopActivation,
}

impl OrderBook {
    pub fn new(symbol: MarketId, config: BookConfig) -> Self {
        Self {
            bids: BidBook::new(),
            asks: AskBook::new(),
            stops: StopBook::new(),
            market_price: Price::zero(),
            locations: HashMap::new(),
            uuids: HashMap::new(),
            pending: VecDeque::new(),
            armed: Vec::new(),
            executor: MatchExecutor::new(symbol.clone(), 1),
            trades: TradeBook::new(
                symbol.clone(),
                config.trade_retention_nanos,
                config.trade_history_limit,
            ),
            last_stamp: i64::MIN,
            stop_activation: config.stop_activation,
            symbol,
        }
    }

    /// Seed the last traded price, e.g. from the trade store on reload
    pub fn with_market_price(mut self, price: Price) -> Self {
        self.market_price = price;
        self
    }

    /// Continue the trade sequence, trade history and time priority of
    /// `previous`, a book being rebuilt
    pub fn with_history(mut self, previous: &OrderBook) -> Self {
        self.executor = previous.executor.clone();
        self.trades = previous.trades.clone();
        self.last_stamp = self.last_stamp.max(previous.last_stamp);
        self
    }

    /// ID the next trade will get
    pub fn next_trade_id(&self) -> TradeId {
        self.executor.next_trade_id()
    }

    pub fn symbol(&self) -> &MarketId {
        &self.symbol
    }

    pub fn market_price(&self) -> Price {
        self.market_price
    }

    pub fn bids(&self) -> &BidBook {
        &self.bids
    }

    pub fn asks(&self) -> &AskBook {
        &self.asks
    }

    pub fn stops(&self) -> &StopBook {
        &self.stops
    }

    /// Submit an order
    ///
    /// Validation failures leave the book untouched. Re-submitting an order
    /// that is already resting or dormant is a successful no-op.
    pub fn add(&mut self, mut order: Order, timestamp: i64) -> Result<AddOutcome, OrderError> {
        order.validate()?;
        if order.symbol != self.symbol {
            return Err(OrderError::SymbolMismatch {
                order_symbol: order.symbol.to_string(),
                book_symbol: self.symbol.to_string(),
            });
        }
        if order.is_filled() || order.status.is_terminal() {
            return Err(OrderError::InvalidQuantity(format!(
                "order {} has nothing left to fill",
                order.order_id
            )));
        }
        if self.locations.contains_key(&order.order_id) {
            debug!(
                symbol = %self.symbol,
                order_id = %order.order_id,
                "Duplicate submission ignored"
            );
            return Ok(AddOutcome {
                duplicate: true,
                ..AddOutcome::default()
            });
        }

        order.created_at = self.stamp(order.created_at);

        let mut events = Vec::new();
        let mut matched = self.process(order, timestamp, false, &mut events);

        while let Some(activated) = self.pending.pop_front() {
            matched |= self.process(activated, timestamp, true, &mut events);
        }

        Ok(AddOutcome {
            matched,
            duplicate: false,
            events,
        })
    }

    /// Cancel a resting or dormant order
    ///
    /// Unknown references are a no-op.
    pub fn cancel(&mut self, reference: OrderRef, timestamp: i64) -> CancelOutcome {
        let Some(order_id) = self.resolve(reference) else {
            debug!(symbol = %self.symbol, ?reference, "Cancel of unknown order ignored");
            return CancelOutcome::default();
        };
        let Some(location) = self.locations.get(&order_id).copied() else {
            debug!(symbol = %self.symbol, %order_id, "Cancel of unknown order ignored");
            return CancelOutcome::default();
        };

        let removed = match location {
            Location::Resting { side: Side::BUY, price } => self.bids.remove(&order_id, price),
            Location::Resting { side: Side::SELL, price } => self.asks.remove(&order_id, price),
            Location::Dormant => {
                self.armed.retain(|id| *id != order_id);
                self.stops.remove(&order_id)
            }
        };
        let Some(mut order) = removed else {
            self.locations.remove(&order_id);
            return CancelOutcome::default();
        };

        self.forget(&order);
        order.cancel(CancelReason::UserRequested, timestamp);
        debug!(symbol = %self.symbol, %order_id, "Order canceled");

        let events = vec![EngineEvent::CancelAck(CancelAckEvent::user(&order, timestamp))];
        CancelOutcome {
            canceled: Some(order),
            events,
        }
    }

    /// Handle one order that is either new or a just-activated stop order
    ///
    /// Returns whether it traded.
    fn process(
        &mut self,
        mut order: Order,
        timestamp: i64,
        activated: bool,
        events: &mut Vec<EngineEvent>,
    ) -> bool {
        if !activated && self.should_park(&order) {
            debug!(
                symbol = %self.symbol,
                order_id = %order.order_id,
                stop_price = ?order.stop_price,
                "Stop order parked"
            );
            if self.trigger_met(&order) {
                self.armed.push(order.order_id);
            }
            self.remember(&order, Location::Dormant);
            self.stops.insert(order);
            return false;
        }

        if order.is_aon() && !self.can_fill_completely(&order) {
            if order.is_market() {
                order.reject(RejectReason::AonUnsatisfiable, timestamp);
                events.push(EngineEvent::OrderUpdate(OrderUpdateEvent::from_order(
                    &order, timestamp,
                )));
            } else {
                self.rest(order);
            }
            return false;
        }

        let fills = match order.side {
            Side::BUY => sweep(&mut self.asks, &mut order, timestamp),
            Side::SELL => sweep(&mut self.bids, &mut order, timestamp),
        };
        let matched = !fills.is_empty();

        for fill in fills {
            self.settle_fill(&order, fill, timestamp, events);
        }

        if !order.is_filled() {
            if order.is_market() {
                order.cancel(CancelReason::NoLiquidity, timestamp);
                events.push(EngineEvent::OrderUpdate(OrderUpdateEvent::from_order(
                    &order, timestamp,
                )));
            } else if order.is_ioc() {
                order.cancel(CancelReason::ImmediateOrCancel, timestamp);
                events.push(EngineEvent::OrderUpdate(OrderUpdateEvent::from_order(
                    &order, timestamp,
                )));
            } else {
                self.rest(order);
            }
        }

        matched
    }

    fn should_park(&self, order: &Order) -> bool {
        let Some(stop_price) = order.stop_price else {
            return false;
        };
        match self.stop_activation {
            StopActivation::NextTrade => true,
            StopActivation::Immediate => !self.trigger_met(order),
        }
    }

    fn trigger_met(&self, order: &Order) -> bool {
        order
            .stop_price
            .is_some_and(|stop| stop_book::is_triggered(order.side, stop, self.market_price))
    }

    /// Whether the liquidity `order` may cross covers all of it
    fn can_fill_completely(&self, order: &Order) -> bool {
        let wanted = order.unfilled();
        let budget = Budget::Quantity(wanted);
        let walk = match order.side {
            Side::BUY => liquidity::walk(&self.asks, Side::BUY, order.limit_price(), budget),
            Side::SELL => liquidity::walk(&self.bids, Side::SELL, order.limit_price(), budget),
        };
        walk.quantity >= wanted
    }

    fn rest(&mut self, order: Order) {
        debug!(
            symbol = %self.symbol,
            order_id = %order.order_id,
            price = %order.price,
            unfilled = %order.unfilled(),
            "Order resting"
        );
        self.remember(
            &order,
            Location::Resting {
                side: order.side,
                price: order.price,
            },
        );
        match order.side {
            Side::BUY => self.bids.insert(order),
            Side::SELL => self.asks.insert(order),
        }
    }

    fn settle_fill(&mut self, taker: &Order, fill: Fill, timestamp: i64, events: &mut Vec<EngineEvent>) {
        let trade = self
            .executor
            .execute_trade(&fill.maker, taker, fill.price, fill.quantity, timestamp);

        let taker_status = if fill.taker_filled >= taker.quantity {
            OrderStatus::Filled
        } else {
            OrderStatus::Partial
        };

        events.push(EngineEvent::Trade(TradeEvent::from(&trade)));
        events.push(EngineEvent::OrderUpdate(OrderUpdateEvent::from_order(
            &fill.maker,
            timestamp,
        )));
        events.push(EngineEvent::OrderUpdate(OrderUpdateEvent {
            order_id: taker.order_id,
            uuid: taker.uuid,
            symbol: taker.symbol.clone(),
            filled_quantity: fill.taker_filled,
            unfilled_quantity: taker.quantity.saturating_sub(fill.taker_filled),
            state: taker_status,
            timestamp,
        }));

        if fill.maker.is_filled() {
            self.forget(&fill.maker);
        }
        self.trades.record(trade);
        self.update_market_price(fill.price, timestamp);
    }

    /// Record a trade price and queue every stop order it triggers
    fn update_market_price(&mut self, price: Price, timestamp: i64) {
        let previous = self.market_price;
        self.market_price = price;
        if price == previous {
            return;
        }

        let rising = price > previous;
        let mut released: Vec<Order> = std::mem::take(&mut self.armed)
            .into_iter()
            .filter_map(|order_id| self.stops.remove(&order_id))
            .collect();
        released.extend(self.stops.take_triggered(price, rising));
        for mut order in released {
            self.forget(&order);
            order.created_at = self.stamp(timestamp);
            debug!(
                symbol = %self.symbol,
                order_id = %order.order_id,
                market_price = %price,
                "Stop order triggered"
            );
            self.pending.push_back(order);
        }
    }

    /// Next time priority, never earlier than `proposed`
    fn stamp(&mut self, proposed: i64) -> i64 {
        let stamp = proposed.max(self.last_stamp.saturating_add(1));
        self.last_stamp = stamp;
        stamp
    }

    fn remember(&mut self, order: &Order, location: Location) {
        self.locations.insert(order.order_id, location);
        self.uuids.insert(order.uuid, order.order_id);
    }

    fn forget(&mut self, order: &Order) {
        self.locations.remove(&order.order_id);
        self.uuids.remove(&order.uuid);
    }

    fn resolve(&self, reference: OrderRef) -> Option<OrderId> {
        match reference {
            OrderRef::Id(id) => Some(id),
            OrderRef::Uuid(uuid) => self.uuids.get(&uuid).copied(),
        }
    }

    /// Look up a resting or dormant order
    pub fn get_order(&self, reference: OrderRef) -> Option<&Order> {
        let order_id = self.resolve(reference)?;
        match self.locations.get(&order_id)? {
            Location::Resting { side: Side::BUY, price } => self.bids.get_order(&order_id, *price),
            Location::Resting { side: Side::SELL, price } => self.asks.get_order(&order_id, *price),
            Location::Dormant => self.stops.get(&order_id),
        }
    }

    /// Look up an order by its full key
    ///
    /// Side and price must match the order's own side and limit price.
    pub fn fetch_order(&self, side: Side, price: Price, reference: OrderRef) -> Option<&Order> {
        self.get_order(reference)
            .filter(|o| o.side == side && o.price == price)
    }

    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.locations.contains_key(order_id)
    }

    /// Aggregated depth for up to `limit` levels per side
    pub fn depth(&self, limit: usize) -> OrderBookSnapshot {
        OrderBookSnapshot {
            symbol: self.symbol.to_string(),
            market_price: self.market_price,
            bids: self.bids.depth_snapshot(limit),
            asks: self.asks.depth_snapshot(limit),
        }
    }

    /// Quote a market order of `side` without touching the book
    pub fn calc_market_order(&self, side: Side, budget: Budget) -> MarketOrderQuote {
        let walk = match side {
            Side::BUY => liquidity::walk(&self.asks, Side::BUY, None, budget),
            Side::SELL => liquidity::walk(&self.bids, Side::SELL, None, budget),
        };
        let locked = match side {
            Side::BUY => walk.total,
            Side::SELL => walk.quantity.as_decimal(),
        };
        MarketOrderQuote {
            side,
            quantity: walk.quantity,
            total: walk.total,
            locked,
            levels: walk.levels,
        }
    }

    /// Newest first
    pub fn recent_trades(&self, limit: usize) -> Vec<Trade> {
        self.trades.recent(limit)
    }

    /// Retained trades after `after`, oldest first
    pub fn trades_since(&self, after: TradeId) -> Vec<Trade> {
        self.trades.since(after)
    }

    pub fn summary(&self) -> BookSummary {
        BookSummary {
            symbol: self.symbol.to_string(),
            market_price: self.market_price,
            best_bid: self.bids.best(),
            best_ask: self.asks.best(),
            bid_levels: self.bids.level_count(),
            ask_levels: self.asks.level_count(),
            resting_orders: self.bids.order_count() + self.asks.order_count(),
            dormant_stops: self.stops.len(),
            last_trade_id: self.trades.last().map(|t| t.trade_id),
        }
    }

    /// Check the structural invariants of the book
    ///
    /// Every level's tracked total equals the sum of its orders, no filled
    /// or terminal order is resident, and the ID index covers exactly the
    /// resident and dormant orders.
    pub fn audit(&self) -> Result<(), String> {
        let mut resident = 0usize;
        for (side, levels) in [(Side::BUY, self.bids.levels()), (Side::SELL, self.asks.levels())] {
            for (price, level) in levels {
                if level.is_empty() {
                    return Err(format!("empty {side:?} level at {price}"));
                }
                if level.total() != level.recomputed_total() {
                    return Err(format!(
                        "{side:?} level {price}: tracked {} != resident {}",
                        level.total(),
                        level.recomputed_total()
                    ));
                }
                for order in level.iter() {
                    if order.is_filled() || order.status.is_terminal() {
                        return Err(format!("order {} resident but done", order.order_id));
                    }
                    if order.side != side || order.price != *price {
                        return Err(format!("order {} filed under wrong key", order.order_id));
                    }
                    resident += 1;
                }
            }
        }
        if let Some(order_id) = self.armed.iter().find(|id| !self.stops.contains(id)) {
            return Err(format!("armed stop {order_id} is not parked"));
        }
        if resident + self.stops.len() != self.locations.len() {
            return Err(format!(
                "index holds {} orders, book holds {}",
                self.locations.len(),
                resident + self.stops.len()
            ));
        }
        Ok(())
    }
}

/// Sweep `book` with `taker` in price-time priority
///
/// Fills the taker in place, removes completely filled makers and empty
/// levels, and returns the fills in execution order.
fn sweep<B: LevelBook>(book: &mut B, taker: &mut Order, timestamp: i64) -> Vec<Fill> {
    let mut fills = Vec::new();
    let limit = taker.limit_price();
    let mut cursor = None;

    while !taker.is_filled() {
        let Some(price) = book.next_price(cursor) else {
            break;
        };
        if !crossing::incoming_can_match(taker.side, limit, price) {
            break;
        }
        cursor = Some(price);

        let Some(level) = book.level_mut(price) else {
            break;
        };
        let mut index = 0;
        while !taker.is_filled() {
            let (maker_unfilled, maker_aon) = match level.order_at(index) {
                Some(maker) => (maker.unfilled(), maker.is_aon()),
                None => break,
            };
            let taker_unfilled = taker.unfilled();
            if maker_aon && maker_unfilled > taker_unfilled {
                index += 1;
                continue;
            }

            let quantity = maker_unfilled.min(taker_unfilled);
            let Some(maker) = level.fill_at(index, quantity, timestamp) else {
                break;
            };
            taker.add_fill(quantity, timestamp);
            if !maker.is_filled() {
                index += 1;
            }
            fills.push(Fill {
                maker,
                price,
                quantity,
                taker_filled: taker.filled_quantity,
            });
        }
        book.prune(price);
    }

    fills
}
