//! Time-stepped replay of candles against a strategy
mod builder;
mod window;

pub use builder::SimulationEngineBuilder;
pub use window::SlidingWindow;

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, DateTime};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::fees::{FeeState, FeeTier};
use crate::input::{Candle, CandleSource};
use crate::orderbook::{FillModel, LimitOrderType, OrderQueue, PendingOrder};
use crate::position::{Position, PositionBook};
use crate::stats::{OrderType, StatisticsSink, TransactionRecord};
use crate::strategy::{Intent, PriceBundle, Strategy};
use crate::wallet::Wallet;

/// Where an asset sits in its trade cycle.
///
/// Limit orders pass through the pending states, market orders jump straight between `Flat` and
/// `InTrade`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum AssetState {
    Flat,
    PendingEntry,
    InTrade,
    PendingExit,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub enum RunOutcome {
    /// Every candle in the source was replayed
    Completed,
    /// Wallet value fell below the minimum tradable value and the run stopped early
    Ruined { at: DateTime, value: f64 },
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub steps: usize,
    pub transactions: usize,
    pub starting_value: f64,
    pub final_value: f64,
    pub fee_tier: FeeTier,
    pub open_positions: Vec<Position>,
    pub pending_orders: Vec<PendingOrder>,
}

/// Once the engine leaves `Running` it stops mutating state, any further `step` returns `None`.
#[derive(Clone, Debug)]
enum EngineState {
    Running,
    Finished(RunOutcome),
    Failed,
}

/// Replays a [CandleSource] against one [Strategy] for one trader.
///
/// Each step handles one timestamp of the source:
/// * Updates the wallet price of every asset with a candle at this timestamp to the candle's open
/// * Settles pending limit orders against the new candles
/// * Pushes each candle into its asset's window and asks the strategy to decide once the window
///   is full
/// * Executes the resulting intent, market orders immediately and limit orders into the queue
/// * Records executed orders and the wallet value into the [StatisticsSink]
///
/// The engine owns all of the trader's mutable state. The candle source is only ever read, so the
/// same [Arc] can back any number of engines running on other threads.
pub struct SimulationEngine<S, K>
where
    S: Strategy,
    K: StatisticsSink,
{
    config: EngineConfig,
    source: Arc<CandleSource>,
    clock: Clock,
    strategy: S,
    sink: K,
    wallet: Wallet,
    positions: PositionBook,
    orders: OrderQueue,
    fill_model: FillModel,
    fees: FeeState,
    windows: HashMap<String, SlidingWindow>,
    window_length: usize,
    steps: usize,
    transactions: usize,
    state: EngineState,
}

impl<S, K> SimulationEngine<S, K>
where
    S: Strategy,
    K: StatisticsSink,
{
    /// Validates the configuration and the strategy's window before anything runs. A series
    /// shorter than the window is accepted: that asset's window never fills, so it is never
    /// decided on, and the other assets run as normal.
    pub fn new(
        config: EngineConfig,
        source: Arc<CandleSource>,
        strategy: S,
        sink: K,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        if source.is_empty() {
            return Err(EngineError::EmptySource);
        }

        let window_length = strategy.window_length();
        if window_length == 0 {
            return Err(EngineError::EmptyWindow);
        }
        for symbol in source.symbols() {
            let supplied = source.series_len(symbol);
            if supplied < window_length {
                warn!(
                    "ENGINE: {} has {:?} candles, fewer than the window of {:?}",
                    symbol, supplied, window_length
                );
            }
        }

        let wallet = Wallet::new(config.main_currency.clone(), config.starting_fund)?;
        let fees = FeeState::new(
            config.fee_schedule()?,
            config.fee_window_secs,
            config.fee_refresh,
        );
        let fill_model = FillModel::new(
            config.bid_fill_probability,
            config.ask_fill_probability,
            config.seed,
        );
        let windows = source
            .symbols()
            .map(|symbol| (symbol.to_string(), SlidingWindow::new(window_length)))
            .collect();

        Ok(Self {
            clock: source.clock(),
            config,
            source,
            strategy,
            sink,
            wallet,
            positions: PositionBook::new(),
            orders: OrderQueue::new(),
            fill_model,
            fees,
            windows,
            window_length,
            steps: 0,
            transactions: 0,
            state: EngineState::Running,
        })
    }

    /// Runs until the source is exhausted or the wallet is ruined.
    pub fn run(&mut self) -> Result<RunReport, EngineError> {
        while self.step()?.is_some() {}
        Ok(self.report())
    }

    /// Processes the next timestamp. Returns the timestamp processed, or `None` once the run has
    /// finished.
    pub fn step(&mut self) -> Result<Option<DateTime>, EngineError> {
        if !matches!(self.state, EngineState::Running) {
            return Ok(None);
        }

        let now = match self.clock.tick() {
            Some(now) => now,
            None => {
                info!(
                    "ENGINE: Completed after {:?} steps with value {:?}",
                    self.steps,
                    self.wallet.value()
                );
                self.state = EngineState::Finished(RunOutcome::Completed);
                return Ok(None);
            }
        };

        match self.process(now) {
            Ok(()) => Ok(Some(now)),
            Err(err) => {
                warn!("ENGINE: Run failed at {}: {}", now, err);
                self.state = EngineState::Failed;
                Err(err)
            }
        }
    }

    fn process(&mut self, now: DateTime) -> Result<(), EngineError> {
        self.steps += 1;
        self.fees.on_step(now);
        if let Some(max_age) = self.config.order_expiry_secs {
            for order in self.orders.expire(now, max_age) {
                debug!(
                    "ENGINE: {:?} for {} queued at {} expired",
                    order.order_type, order.asset, order.queued_at
                );
            }
        }

        let source = Arc::clone(&self.source);
        let candles: Vec<(&str, &Candle)> = source
            .symbols()
            .filter_map(|symbol| source.get_candle(&now, symbol).map(|c| (symbol, c)))
            .collect();

        for (asset, candle) in &candles {
            self.wallet.set_price(asset, candle.open);
        }

        for (asset, candle) in &candles {
            let spread = self.config.spread_for(asset);
            if let Some(order) = self
                .orders
                .settle(asset, candle, spread, &mut self.fill_model)
            {
                self.fill_limit_order(order, now)?;
            }
        }

        for (asset, candle) in &candles {
            if let Some(intent) = self.decide(asset, candle)? {
                self.execute_intent(asset, intent, now)?;
            }
        }

        let value = self.wallet.value();
        self.sink.snapshot(now, value);
        if value < self.config.min_tradable_value {
            info!(
                "ENGINE: Wallet value {:?} below {:?} at {}, stopping run",
                value, self.config.min_tradable_value, now
            );
            self.state = EngineState::Finished(RunOutcome::Ruined { at: now, value });
        }
        Ok(())
    }

    /// Adds the candle to the asset's window and, once the window is full, asks the strategy for
    /// an intent. The window handed over always ends with `candle`.
    fn decide(&mut self, asset: &str, candle: &Candle) -> Result<Option<Intent>, EngineError> {
        let declared = self.strategy.window_length();
        let window = self
            .windows
            .entry(asset.to_string())
            .or_insert_with(|| SlidingWindow::new(self.window_length));
        if declared != self.window_length {
            return Err(EngineError::WindowMismatch {
                asset: asset.to_string(),
                declared,
                supplied: window.len(),
            });
        }

        window.push(candle.clone());
        if !window.is_full() {
            return Ok(None);
        }
        let candles = window.candles();
        let price = PriceBundle::from_candle(candle, self.config.spread_for(asset));
        let intent = self.strategy.decide(asset, candles, &price);
        Ok(Some(intent))
    }

    /// Applies an intent. Intents that do not fit the asset's current state are dropped: they
    /// model an exchange rejecting the order, not a failure of the run.
    fn execute_intent(
        &mut self,
        asset: &str,
        intent: Intent,
        now: DateTime,
    ) -> Result<(), EngineError> {
        let state = self.asset_state(asset);
        match intent {
            Intent::Hold => {}
            Intent::Buy => {
                if self.positions.is_open(asset) {
                    self.reject(asset, intent, state, "position already open");
                    return Ok(());
                }
                if self.wallet.main_amount() <= 0.0 {
                    self.reject(asset, intent, state, "no main currency");
                    return Ok(());
                }
                let price = self.wallet.get_price(asset);
                if price <= 0.0 {
                    self.reject(asset, intent, state, "no price");
                    return Ok(());
                }
                if self.orders.delete_order(asset).is_some() {
                    debug!("ENGINE: Market buy on {} cancelled pending bid", asset);
                }
                let taker = self.fees.taker();
                self.enter(OrderType::Buy, asset, price, taker, now)?;
            }
            Intent::Sell => {
                if self.wallet.get_amount(asset) <= 0.0 {
                    self.reject(asset, intent, state, "nothing to sell");
                    return Ok(());
                }
                if self.orders.delete_order(asset).is_some() {
                    debug!("ENGINE: Market sell on {} cancelled pending ask", asset);
                }
                let price = self.wallet.get_price(asset);
                let taker = self.fees.taker();
                self.exit(OrderType::Sell, asset, price, taker, now)?;
            }
            Intent::Bid(price) => {
                Self::check_limit_price(asset, price)?;
                if self.positions.is_open(asset) {
                    self.reject(asset, intent, state, "position already open");
                    return Ok(());
                }
                if self.wallet.main_amount() <= 0.0 {
                    self.reject(asset, intent, state, "no main currency");
                    return Ok(());
                }
                self.orders
                    .insert_order(PendingOrder::bid(asset, price, now));
            }
            Intent::Ask(price) => {
                Self::check_limit_price(asset, price)?;
                if !self.positions.is_open(asset) || self.wallet.get_amount(asset) <= 0.0 {
                    self.reject(asset, intent, state, "nothing to sell");
                    return Ok(());
                }
                self.orders
                    .insert_order(PendingOrder::ask(asset, price, now));
            }
        }
        Ok(())
    }

    /// A limit price that isn't a positive number can only come from a broken strategy.
    fn check_limit_price(asset: &str, price: f64) -> Result<(), EngineError> {
        if price.is_finite() && price > 0.0 {
            return Ok(());
        }
        Err(EngineError::InvalidIntent {
            asset: asset.to_string(),
            reason: format!("limit price {} is not a positive number", price),
        })
    }

    fn reject(
        &self,
        asset: &str,
        intent: Intent,
        state: AssetState,
        reason: &str,
    ) {
        debug!(
            "ENGINE: Rejected {:?} on {} in state {:?}: {}",
            intent, asset, state, reason
        );
    }

    fn fill_limit_order(&mut self, order: PendingOrder, now: DateTime) -> Result<(), EngineError> {
        let maker = self.fees.maker();
        match order.order_type {
            LimitOrderType::Bid => {
                //Another asset may have taken the main currency since this was queued
                if self.positions.is_open(&order.asset) || self.wallet.main_amount() <= 0.0 {
                    debug!(
                        "ENGINE: Dropped bid on {} at {:?}, no longer fundable",
                        order.asset, order.price
                    );
                    return Ok(());
                }
                self.enter(OrderType::Bid, &order.asset, order.price, maker, now)
            }
            LimitOrderType::Ask => {
                if self.wallet.get_amount(&order.asset) <= 0.0 {
                    debug!(
                        "ENGINE: Dropped ask on {} at {:?}, nothing to sell",
                        order.asset, order.price
                    );
                    return Ok(());
                }
                self.exit(OrderType::Ask, &order.asset, order.price, maker, now)
            }
        }
    }

    /// Moves all main currency into `asset` at `price`.
    fn enter(
        &mut self,
        order_type: OrderType,
        asset: &str,
        price: f64,
        fee_rate: f64,
        now: DateTime,
    ) -> Result<(), EngineError> {
        let spread = self.config.spread_for(asset);
        let main = self.config.main_currency.clone();
        let currency = self.wallet.main_amount();
        let amount = currency * (1.0 - fee_rate) * (1.0 - spread) / price;

        self.wallet.set_amount(&main, 0.0)?;
        let held = self.wallet.get_amount(asset);
        self.wallet.set_amount(asset, held + amount)?;
        self.positions.open(asset, price, now)?;

        let record = TransactionRecord {
            order_type,
            asset: asset.to_string(),
            timestamp: now,
            execution_price: price * (1.0 - spread),
            volume: amount,
            volume_in_reference_currency: currency * self.config.reference_rate,
            fee_rate,
            fee_amount: currency * fee_rate,
            value: currency,
        };
        self.complete(record);
        Ok(())
    }

    /// Liquidates all of `asset` into main currency at `price`.
    fn exit(
        &mut self,
        order_type: OrderType,
        asset: &str,
        price: f64,
        fee_rate: f64,
        now: DateTime,
    ) -> Result<(), EngineError> {
        let spread = self.config.spread_for(asset);
        let main = self.config.main_currency.clone();
        let amount = self.wallet.get_amount(asset);
        let gross = amount * price;
        let proceeds = amount * (1.0 - fee_rate) * (1.0 - spread) * price;

        self.wallet.set_amount(asset, 0.0)?;
        let held = self.wallet.main_amount();
        self.wallet.set_amount(&main, held + proceeds)?;
        self.positions.close(asset);

        let record = TransactionRecord {
            order_type,
            asset: asset.to_string(),
            timestamp: now,
            execution_price: price * (1.0 - spread),
            volume: amount,
            volume_in_reference_currency: gross * self.config.reference_rate,
            fee_rate,
            fee_amount: gross * fee_rate,
            value: proceeds,
        };
        self.complete(record);
        Ok(())
    }

    fn complete(&mut self, record: TransactionRecord) {
        info!(
            "ENGINE: {:?} {:?} {} at {:?} on {}, fee {:?}",
            record.order_type,
            record.volume,
            record.asset,
            record.execution_price,
            record.timestamp,
            record.fee_amount
        );
        self.transactions += 1;
        self.fees
            .record_transaction(record.timestamp, record.volume_in_reference_currency);
        self.sink.record(&record);
        self.strategy.on_transaction(&record);
    }

    pub fn asset_state(&self, asset: &str) -> AssetState {
        let pending = self.orders.get(asset).map(|order| order.order_type);
        match (self.positions.is_open(asset), pending) {
            (false, Some(LimitOrderType::Bid)) => AssetState::PendingEntry,
            (false, _) => AssetState::Flat,
            (true, Some(LimitOrderType::Ask)) => AssetState::PendingExit,
            (true, _) => AssetState::InTrade,
        }
    }

    pub fn is_in_trade(&self, asset: &str) -> bool {
        self.positions.is_open(asset)
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        match &self.state {
            EngineState::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn report(&self) -> RunReport {
        let mut open_positions: Vec<Position> = self
            .source
            .symbols()
            .filter_map(|symbol| self.positions.get(symbol).cloned())
            .collect();
        open_positions.sort_by(|a, b| a.asset.cmp(&b.asset));
        RunReport {
            outcome: self
                .outcome()
                .cloned()
                .unwrap_or(RunOutcome::Completed),
            steps: self.steps,
            transactions: self.transactions,
            starting_value: self.config.starting_fund,
            final_value: self.wallet.value(),
            fee_tier: self.fees.current(),
            open_positions,
            pending_orders: self.orders.orders().cloned().collect(),
        }
    }

    /// Returns the trader to its starting state so the same engine can replay the source again.
    /// The strategy is left as it is, strategies with internal state need resetting by the caller.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        self.wallet.reset(self.config.starting_fund)?;
        self.positions.clear();
        self.orders.clear();
        self.fees.reset();
        for window in self.windows.values_mut() {
            window.clear();
        }
        self.fill_model = FillModel::new(
            self.config.bid_fill_probability,
            self.config.ask_fill_probability,
            self.config.seed,
        );
        self.clock = self.source.clock();
        self.steps = 0;
        self.transactions = 0;
        self.state = EngineState::Running;
        Ok(())
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn positions(&self) -> &PositionBook {
        &self.positions
    }

    pub fn orders(&self) -> &OrderQueue {
        &self.orders
    }

    pub fn fees(&self) -> &FeeState {
        &self.fees
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn into_parts(self) -> (S, K) {
        (self.strategy, self.sink)
    }
}
