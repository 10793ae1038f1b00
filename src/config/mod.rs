//! Per-run configuration
//!
//! Everything a run needs is held in [EngineConfig] and handed to the engine when it is built.
//! Nothing is read from the environment or shared between runs.
use std::collections::HashMap;
use std::path::Path;

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

use crate::fees::{
    standard_tiers, FeeRefresh, FeeSchedule, FeeScheduleError, FeeTier, DEFAULT_FEE_WINDOW_SECS,
};

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display(fmt = "Could not read config at {}", path)]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[display(fmt = "Could not parse config")]
    Parse { source: serde_json::Error },
    #[display(fmt = "Invalid fee schedule")]
    Fees { source: FeeScheduleError },
    #[display(fmt = "Invalid config: {}", reason)]
    Invalid { reason: String },
}

impl ConfigError {
    fn invalid(reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub main_currency: String,
    pub starting_fund: f64,
    /// Fractional spread per asset, assets not listed use `default_spread`
    pub spread: HashMap<String, f64>,
    pub default_spread: f64,
    pub fee_tiers: Vec<FeeTier>,
    pub fee_window_secs: i64,
    pub fee_refresh: FeeRefresh,
    pub bid_fill_probability: f64,
    pub ask_fill_probability: f64,
    /// Run stops once total wallet value falls below this
    pub min_tradable_value: f64,
    /// Converts main currency into the currency fee tiers are denominated in
    pub reference_rate: f64,
    /// Pending limit orders older than this are cancelled, `None` keeps them until filled
    pub order_expiry_secs: Option<i64>,
    /// Seed for the fill model, `None` draws one from the OS
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            main_currency: "EUR".to_string(),
            starting_fund: 1000.0,
            spread: HashMap::new(),
            default_spread: 0.0,
            fee_tiers: standard_tiers(),
            fee_window_secs: DEFAULT_FEE_WINDOW_SECS,
            fee_refresh: FeeRefresh::OnTransaction,
            bid_fill_probability: 1.0,
            ask_fill_probability: 1.0,
            min_tradable_value: 20.0,
            reference_rate: 1.0,
            order_expiry_secs: None,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|source| ConfigError::Parse { source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn spread_for(&self, asset: &str) -> f64 {
        self.spread
            .get(asset)
            .copied()
            .unwrap_or(self.default_spread)
    }

    pub fn fee_schedule(&self) -> Result<FeeSchedule, ConfigError> {
        FeeSchedule::new(self.fee_tiers.clone()).map_err(|source| ConfigError::Fees { source })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.main_currency.is_empty() {
            return Err(ConfigError::invalid("main currency is empty"));
        }
        if !(self.starting_fund > 0.0) || !self.starting_fund.is_finite() {
            return Err(ConfigError::invalid("starting fund must be positive"));
        }
        let spreads = std::iter::once(&self.default_spread).chain(self.spread.values());
        for spread in spreads {
            if !(0.0..1.0).contains(spread) {
                return Err(ConfigError::invalid(format!(
                    "spread {} outside [0, 1)",
                    spread
                )));
            }
        }
        for probability in [self.bid_fill_probability, self.ask_fill_probability] {
            if !(0.0..=1.0).contains(&probability) {
                return Err(ConfigError::invalid(format!(
                    "fill probability {} outside [0, 1]",
                    probability
                )));
            }
        }
        if !(self.min_tradable_value >= 0.0) {
            return Err(ConfigError::invalid("minimum tradable value is negative"));
        }
        if !(self.reference_rate > 0.0) {
            return Err(ConfigError::invalid("reference rate must be positive"));
        }
        if self.fee_window_secs <= 0 {
            return Err(ConfigError::invalid("fee window must be positive"));
        }
        if matches!(self.order_expiry_secs, Some(secs) if secs <= 0) {
            return Err(ConfigError::invalid("order expiry must be positive"));
        }
        self.fee_schedule()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineConfig};
    use crate::fees::FeeRefresh;

    #[test]
    fn test_that_missing_fields_take_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{"starting_fund": 500.0, "spread": {"BTC": 0.001}, "seed": 9}"#,
        )
        .unwrap();
        assert_eq!(config.starting_fund, 500.0);
        assert_eq!(config.main_currency, "EUR");
        assert_eq!(config.spread_for("BTC"), 0.001);
        assert_eq!(config.spread_for("ETH"), 0.0);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.fee_refresh, FeeRefresh::OnTransaction);
        assert_eq!(config.fee_schedule().unwrap().tier_for(0.0).taker, 0.0026);
    }

    #[test]
    fn test_that_fee_tiers_and_refresh_are_read_from_json() {
        let config = EngineConfig::from_json_str(
            r#"{
                "fee_tiers": [
                    {"volume_threshold": 0.0, "maker": 0.002, "taker": 0.003},
                    {"volume_threshold": 100.0, "maker": 0.001, "taker": 0.002}
                ],
                "fee_refresh": "EveryStep"
            }"#,
        )
        .unwrap();
        let schedule = config.fee_schedule().unwrap();
        assert_eq!(schedule.tier_for(150.0).maker, 0.001);
        assert_eq!(config.fee_refresh, FeeRefresh::EveryStep);
    }

    #[test]
    fn test_that_invalid_probability_is_rejected() {
        let res = EngineConfig::from_json_str(r#"{"bid_fill_probability": 1.5}"#);
        assert!(matches!(res, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_that_schedule_without_floor_is_rejected() {
        let res = EngineConfig::from_json_str(
            r#"{"fee_tiers": [{"volume_threshold": 10.0, "maker": 0.002, "taker": 0.003}]}"#,
        );
        assert!(matches!(res, Err(ConfigError::Fees { .. })));
    }

    #[test]
    fn test_that_malformed_json_is_a_parse_error() {
        let res = EngineConfig::from_json_str("{ not json");
        assert!(matches!(res, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_that_missing_file_is_an_io_error() {
        let res = EngineConfig::from_path("/definitely/not/here.json");
        assert!(matches!(res, Err(ConfigError::Io { .. })));
    }
}
