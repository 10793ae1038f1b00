#![allow(dead_code)]

use std::collections::HashMap;

use arran::input::{Candle, CandleSource, CandleSourceBuilder};
use arran::stats::TransactionRecord;
use arran::strategy::{Intent, PriceBundle, Strategy};

/// Never trades.
pub struct Holder {
    pub window: usize,
}

impl Strategy for Holder {
    fn window_length(&self) -> usize {
        self.window
    }

    fn decide(&mut self, _asset: &str, _candles: &[Candle], _price: &PriceBundle) -> Intent {
        Intent::Hold
    }
}

/// Plays back a fixed list of intents per asset, then holds.
pub struct Scripted {
    window: usize,
    script: HashMap<String, Vec<Intent>>,
}

impl Scripted {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            script: HashMap::new(),
        }
    }

    pub fn with(mut self, asset: &str, intents: Vec<Intent>) -> Self {
        self.script
            .insert(asset.to_string(), intents.into_iter().rev().collect());
        self
    }
}

impl Strategy for Scripted {
    fn window_length(&self) -> usize {
        self.window
    }

    fn decide(&mut self, asset: &str, _candles: &[Candle], _price: &PriceBundle) -> Intent {
        self.script
            .get_mut(asset)
            .and_then(|intents| intents.pop())
            .unwrap_or(Intent::Hold)
    }
}

/// Buys when the latest close is above the window's mean close, sells when it is below. Places
/// limit orders a fixed fraction away from the market when `limit_offset` is set.
pub struct MeanCross {
    pub window: usize,
    pub limit_offset: Option<f64>,
    pub fills: Vec<TransactionRecord>,
}

impl MeanCross {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            limit_offset: None,
            fills: Vec::new(),
        }
    }

    pub fn with_limits(window: usize, offset: f64) -> Self {
        Self {
            window,
            limit_offset: Some(offset),
            fills: Vec::new(),
        }
    }
}

impl Strategy for MeanCross {
    fn window_length(&self) -> usize {
        self.window
    }

    fn decide(&mut self, _asset: &str, candles: &[Candle], price: &PriceBundle) -> Intent {
        let mean = candles.iter().map(|c| c.close).sum::<f64>() / candles.len() as f64;
        let last = candles[candles.len() - 1].close;
        match (last > mean, self.limit_offset) {
            (true, None) => Intent::Buy,
            (false, None) => Intent::Sell,
            (true, Some(offset)) => Intent::Bid(price.market_buy * (1.0 - offset)),
            (false, Some(offset)) => Intent::Ask(price.market_sell * (1.0 + offset)),
        }
    }

    fn on_transaction(&mut self, record: &TransactionRecord) {
        self.fills.push(record.clone());
    }
}

/// Flat candles for one asset, one per `step` seconds starting at `start`.
pub fn flat_series(asset: &str, start: i64, step: i64, prices: &[f64]) -> CandleSource {
    let mut builder = CandleSourceBuilder::new();
    for (i, price) in prices.iter().enumerate() {
        builder.add_candle(asset, Candle::flat(start + i as i64 * step, *price));
    }
    builder.build().unwrap()
}
