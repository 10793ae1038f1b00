//! Runs many independent traders over one candle source
//!
//! Each trader gets its own [SimulationEngine] and therefore its own wallet, positions, order
//! queue and windows. The only thing shared is the [CandleSource], which nothing writes to once
//! built.
use std::sync::Arc;

use log::{info, warn};
use tokio::task::JoinSet;

use crate::config::EngineConfig;
use crate::engine::{RunReport, SimulationEngine};
use crate::error::EngineError;
use crate::input::CandleSource;
use crate::stats::StatisticsSink;
use crate::strategy::Strategy;

/// One member of a population, run with its own config so traders can differ in funding, fees or
/// seed as well as strategy.
pub struct Trader<S, K>
where
    S: Strategy,
    K: StatisticsSink,
{
    pub name: String,
    pub config: EngineConfig,
    pub strategy: S,
    pub sink: K,
}

impl<S, K> Trader<S, K>
where
    S: Strategy,
    K: StatisticsSink,
{
    pub fn new(name: impl Into<String>, config: EngineConfig, strategy: S, sink: K) -> Self {
        Self {
            name: name.into(),
            config,
            strategy,
            sink,
        }
    }
}

/// Everything a trader leaves behind after a run completes. The strategy and sink are handed back
/// so callers can inspect learned state or recorded trades.
pub struct TraderRun<S, K> {
    pub name: String,
    pub report: RunReport,
    pub strategy: S,
    pub sink: K,
}

fn run_trader<S, K>(
    source: Arc<CandleSource>,
    trader: Trader<S, K>,
) -> Result<TraderRun<S, K>, EngineError>
where
    S: Strategy,
    K: StatisticsSink,
{
    let Trader {
        name,
        config,
        strategy,
        sink,
    } = trader;
    let mut engine = SimulationEngine::new(config, source, strategy, sink)?;
    let report = engine.run()?;
    let (strategy, sink) = engine.into_parts();
    Ok(TraderRun {
        name,
        report,
        strategy,
        sink,
    })
}

/// Runs every trader to completion on tokio's blocking pool.
///
/// Results come back in the same order as `traders`. A failure in one trader, including a panic
/// inside its strategy, is returned in that trader's slot and does not affect the others.
pub async fn run_population<S, K>(
    source: Arc<CandleSource>,
    traders: Vec<Trader<S, K>>,
) -> Vec<Result<TraderRun<S, K>, EngineError>>
where
    S: Strategy + Send + 'static,
    K: StatisticsSink + Send + 'static,
{
    let count = traders.len();
    info!("POPULATION: Starting {:?} traders", count);

    let mut set = JoinSet::new();
    let mut ids = Vec::with_capacity(count);
    for (pos, trader) in traders.into_iter().enumerate() {
        let source = Arc::clone(&source);
        ids.push(trader.name.clone());
        set.spawn_blocking(move || (pos, run_trader(source, trader)));
    }

    let mut slots: Vec<Option<Result<TraderRun<S, K>, EngineError>>> =
        (0..count).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((pos, res)) => {
                if let Err(err) = &res {
                    warn!("POPULATION: Trader {} failed: {}", ids[pos], err);
                }
                slots[pos] = Some(res);
            }
            //Slot for a panicked task stays empty and is filled below
            Err(err) => warn!("POPULATION: Trader task did not finish: {}", err),
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(pos, slot)| {
            slot.unwrap_or_else(|| {
                Err(EngineError::Aborted {
                    reason: format!("trader {} did not finish", ids[pos]),
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{run_population, Trader};
    use crate::config::EngineConfig;
    use crate::error::EngineError;
    use crate::input::{random_walk, Candle};
    use crate::stats::TradeLog;
    use crate::strategy::{Intent, PriceBundle, Strategy};

    /// Buys once the window is full, and panics instead if asked to.
    struct BuyOnce {
        window: usize,
        explode: bool,
    }

    impl Strategy for BuyOnce {
        fn window_length(&self) -> usize {
            self.window
        }

        fn decide(&mut self, _asset: &str, _candles: &[Candle], _price: &PriceBundle) -> Intent {
            if self.explode {
                panic!("strategy failure");
            }
            Intent::Buy
        }
    }

    fn trader(name: &str, window: usize, explode: bool) -> Trader<BuyOnce, TradeLog> {
        Trader::new(
            name,
            EngineConfig::default(),
            BuyOnce { window, explode },
            TradeLog::new(),
        )
    }

    #[tokio::test]
    async fn test_that_population_returns_results_in_input_order() {
        let source = Arc::new(random_walk(&["ABC", "BCD"], 50, 0, 60, 0.01, 7).unwrap());
        let traders = vec![
            trader("first", 2, false),
            trader("second", 100, false),
            trader("third", 5, true),
            trader("fourth", 3, false),
        ];

        let results = run_population(source, traders).await;
        assert_eq!(results.len(), 4);

        let first = results[0].as_ref().unwrap();
        assert_eq!(first.name, "first");
        assert!(!first.sink.transactions().is_empty());

        //Window longer than every series: runs to completion without deciding anything
        let second = results[1].as_ref().unwrap();
        assert_eq!(second.report.steps, 50);
        assert!(second.sink.transactions().is_empty());
        assert_eq!(second.report.final_value, 1000.0);
        assert!(matches!(results[2], Err(EngineError::Aborted { .. })));
        assert_eq!(results[3].as_ref().unwrap().name, "fourth");
    }
}
