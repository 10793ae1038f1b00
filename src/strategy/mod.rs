//! Decision-making contract for the replay
//!
//! Strategies live outside this crate. The engine only needs two things from one: how many
//! trailing candles it wants to see, and what it wants to do once it has seen them.
use serde::{Deserialize, Serialize};

use crate::input::Candle;
use crate::stats::TransactionRecord;

/// What a strategy wants to do with an asset after looking at its window.
///
/// `Bid` and `Ask` carry the limit price. Every variant moves the whole balance: there is no
/// order size.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub enum Intent {
    Buy,
    Sell,
    Bid(f64),
    Ask(f64),
    Hold,
}

/// Prices the strategy sees for the candle it is deciding on.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct PriceBundle {
    pub market_buy: f64,
    pub market_sell: f64,
    pub last_traded: f64,
    pub spread: f64,
}

impl PriceBundle {
    /// Spread is fractional so the buy and sell prices sit either side of the close by the same
    /// proportion.
    pub fn from_candle(candle: &Candle, spread: f64) -> Self {
        Self {
            market_buy: candle.close * (1.0 + spread),
            market_sell: candle.close * (1.0 - spread),
            last_traded: candle.close,
            spread,
        }
    }
}

/// Generates intents for the engine to act on.
///
/// `decide` is only called once the engine holds exactly `window_length` candles for the asset,
/// oldest first, ending with the candle being decided on. The engine checks intents against its
/// own position state and silently drops any that make no sense (selling while flat, buying
/// twice), so strategies do not need to guard against that themselves.
pub trait Strategy {
    fn window_length(&self) -> usize;
    fn decide(&mut self, asset: &str, candles: &[Candle], price: &PriceBundle) -> Intent;
    /// Called after every executed order, including limit orders filled on later steps.
    fn on_transaction(&mut self, _record: &TransactionRecord) {}
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn window_length(&self) -> usize {
        (**self).window_length()
    }

    fn decide(&mut self, asset: &str, candles: &[Candle], price: &PriceBundle) -> Intent {
        (**self).decide(asset, candles, price)
    }

    fn on_transaction(&mut self, record: &TransactionRecord) {
        (**self).on_transaction(record)
    }
}
