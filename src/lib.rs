//! # What is Arran?
//!
//! Arran replays candle data against a trading strategy and simulates what a single trader would
//! have done with it: market orders that fill immediately, limit orders that wait for a candle to
//! trade through them, fees that fall as trading volume builds up, and a wallet that is only ever
//! fully in currency or fully in one asset per position.
//!
//! A run is composed of a [CandleSource](crate::input::CandleSource), a
//! [Strategy](crate::strategy::Strategy), and a [StatisticsSink](crate::stats::StatisticsSink).
//! The [SimulationEngine](crate::engine::SimulationEngine) owns everything else: the
//! [Wallet](crate::wallet::Wallet), the [PositionBook](crate::position::PositionBook), the
//! [OrderQueue](crate::orderbook::OrderQueue), and the [FeeState](crate::fees::FeeState).
//!
//! ## Execution
//!
//! The engine steps through every timestamp in the source in order. Within a step, pending limit
//! orders are settled against the new candle before the strategy sees it, so an order can never
//! fill on the candle that caused it to be placed. The strategy is only called once it has a full
//! window of candles for an asset, and it can hold at most one position or pending order per asset
//! at any time. Intents that don't make sense in the asset's current state (selling something you
//! don't hold, buying twice) are logged and dropped rather than stopping the run.
//!
//! Fee tiers are set by trailing volume over a rolling window, thirty days by default. The default
//! is to recompute the tier only when a trade happens, which means a trader that stops trading
//! keeps the tier it last earned. [FeeRefresh::EveryStep](crate::fees::FeeRefresh) changes that so
//! volume drops out of the window as time passes.
//!
//! The run finishes when the source is exhausted or when the wallet's value falls below the
//! minimum tradable value.
//!
//! ## Populations
//!
//! Runs don't share any mutable state, the source is read-only once built and can be wrapped in
//! an [Arc](std::sync::Arc). [run_population](crate::population::run_population) uses this to run
//! many traders concurrently on tokio's blocking pool.
//!
//! ## Example
//!
//! ```
//!     use std::sync::Arc;
//!
//!     use arran::config::EngineConfig;
//!     use arran::engine::SimulationEngineBuilder;
//!     use arran::input::{random_walk, Candle};
//!     use arran::stats::TradeLog;
//!     use arran::strategy::{Intent, PriceBundle, Strategy};
//!
//!     struct Momentum;
//!
//!     impl Strategy for Momentum {
//!         fn window_length(&self) -> usize {
//!             2
//!         }
//!
//!         fn decide(&mut self, _asset: &str, candles: &[Candle], _price: &PriceBundle) -> Intent {
//!             if candles[1].close > candles[0].close {
//!                 Intent::Buy
//!             } else {
//!                 Intent::Sell
//!             }
//!         }
//!     }
//!
//!     let source = Arc::new(random_walk(&["ABC"], 100, 1609750800, 3600, 0.01, 42).unwrap());
//!     let mut engine = SimulationEngineBuilder::new()
//!         .with_config(EngineConfig::default())
//!         .with_source(source)
//!         .with_strategy(Momentum)
//!         .with_sink(TradeLog::new())
//!         .build()
//!         .unwrap();
//!
//!     let report = engine.run().unwrap();
//!     let summary = engine.sink().summary();
//!     assert_eq!(summary.transactions, report.transactions);
//! ```
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod fees;
pub mod input;
pub mod orderbook;
pub mod population;
pub mod position;
pub mod stats;
pub mod strategy;
pub mod wallet;
