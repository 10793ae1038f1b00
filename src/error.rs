//! Fatal errors that stop a run
//!
//! Rejected intents are not errors, the engine downgrades them to a hold and carries on. Anything
//! in [EngineError] means the strategy or the wiring around the engine is wrong, and the run for
//! that trader cannot continue.
use derive_more::{Display, Error};

use crate::config::ConfigError;
use crate::input::SourceError;
use crate::position::AlreadyOpen;
use crate::wallet::InvalidAmount;

#[derive(Debug, Display, Error)]
pub enum EngineError {
    #[display(fmt = "Strategy declared a window of zero candles")]
    EmptyWindow,
    #[display(
        fmt = "Strategy window for {} is {} candles but {} were supplied",
        asset,
        declared,
        supplied
    )]
    WindowMismatch {
        asset: String,
        declared: usize,
        supplied: usize,
    },
    #[display(fmt = "Strategy returned an invalid intent for {}: {}", asset, reason)]
    InvalidIntent { asset: String, reason: String },
    #[display(fmt = "Candle source has no candles")]
    EmptySource,
    #[display(fmt = "Engine built without {}", missing)]
    Incomplete { missing: String },
    #[display(fmt = "Run aborted: {}", reason)]
    Aborted { reason: String },
    #[display(fmt = "Position book out of sync with engine")]
    Position { source: AlreadyOpen },
    #[display(fmt = "Wallet rejected an update")]
    Wallet { source: InvalidAmount },
    #[display(fmt = "Invalid engine configuration")]
    Config { source: ConfigError },
    #[display(fmt = "Invalid candle source")]
    Source { source: SourceError },
}

impl From<AlreadyOpen> for EngineError {
    fn from(source: AlreadyOpen) -> Self {
        EngineError::Position { source }
    }
}

impl From<InvalidAmount> for EngineError {
    fn from(source: InvalidAmount) -> Self {
        EngineError::Wallet { source }
    }
}

impl From<ConfigError> for EngineError {
    fn from(source: ConfigError) -> Self {
        EngineError::Config { source }
    }
}

impl From<SourceError> for EngineError {
    fn from(source: SourceError) -> Self {
        EngineError::Source { source }
    }
}
