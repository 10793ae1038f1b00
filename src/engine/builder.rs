use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::input::CandleSource;
use crate::stats::StatisticsSink;
use crate::strategy::Strategy;

use super::SimulationEngine;

/// Creates a [SimulationEngine]. Config falls back to [EngineConfig::default] if not given, the
/// source, strategy and sink have no sensible default and must be set.
pub struct SimulationEngineBuilder<S, K>
where
    S: Strategy,
    K: StatisticsSink,
{
    config: Option<EngineConfig>,
    source: Option<Arc<CandleSource>>,
    strategy: Option<S>,
    sink: Option<K>,
}

impl<S, K> Default for SimulationEngineBuilder<S, K>
where
    S: Strategy,
    K: StatisticsSink,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, K> SimulationEngineBuilder<S, K>
where
    S: Strategy,
    K: StatisticsSink,
{
    pub fn with_config(&mut self, config: EngineConfig) -> &mut Self {
        self.config = Some(config);
        self
    }

    pub fn with_source(&mut self, source: Arc<CandleSource>) -> &mut Self {
        self.source = Some(source);
        self
    }

    pub fn with_strategy(&mut self, strategy: S) -> &mut Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_sink(&mut self, sink: K) -> &mut Self {
        self.sink = Some(sink);
        self
    }

    /// Takes the parts out of the builder, so a second call without setting them again will fail.
    pub fn build(&mut self) -> Result<SimulationEngine<S, K>, EngineError> {
        let source = self.source.take().ok_or_else(|| missing("source"))?;
        let strategy = self.strategy.take().ok_or_else(|| missing("strategy"))?;
        let sink = self.sink.take().ok_or_else(|| missing("statistics sink"))?;
        let config = self.config.take().unwrap_or_default();
        SimulationEngine::new(config, source, strategy, sink)
    }

    pub fn new() -> Self {
        Self {
            config: None,
            source: None,
            strategy: None,
            sink: None,
        }
    }
}

fn missing(part: &str) -> EngineError {
    EngineError::Incomplete {
        missing: part.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::SimulationEngineBuilder;
    use crate::error::EngineError;
    use crate::input::{Candle, CandleSourceBuilder};
    use crate::stats::NullSink;
    use crate::strategy::{Intent, PriceBundle, Strategy};

    struct Holder;

    impl Strategy for Holder {
        fn window_length(&self) -> usize {
            1
        }

        fn decide(&mut self, _asset: &str, _candles: &[Candle], _price: &PriceBundle) -> Intent {
            Intent::Hold
        }
    }

    #[test]
    fn test_that_builder_without_source_fails() {
        let res = SimulationEngineBuilder::new()
            .with_strategy(Holder)
            .with_sink(NullSink)
            .build();
        assert!(matches!(res, Err(EngineError::Incomplete { .. })));
    }

    #[test]
    fn test_that_builder_uses_default_config() {
        let mut source = CandleSourceBuilder::new();
        source.add_candle("ABC", Candle::flat(100, 10.0));
        let engine = SimulationEngineBuilder::new()
            .with_source(Arc::new(source.build().unwrap()))
            .with_strategy(Holder)
            .with_sink(NullSink)
            .build()
            .unwrap();
        assert_eq!(engine.wallet().main_currency(), "EUR");
        assert_eq!(engine.wallet().value(), 1000.0);
    }
}
