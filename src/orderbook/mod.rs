//! Resting limit orders and the candle-based fill simulation
//!
//! Market orders never rest here, the engine executes them at once. Limit orders wait in the
//! [OrderQueue] and are checked against each new candle: a bid fills when the candle's low,
//! adjusted for spread, touches or undercuts the bid price; an ask fills when the adjusted high
//! touches or exceeds the ask price. A touch alone does not guarantee a fill, [FillModel] applies
//! a per-side probability to approximate competition for the same price level.
use std::collections::BTreeMap;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::clock::DateTime;
use crate::input::Candle;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum LimitOrderType {
    Bid,
    Ask,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PendingOrder {
    pub order_type: LimitOrderType,
    pub asset: String,
    pub price: f64,
    pub queued_at: DateTime,
}

impl PendingOrder {
    pub fn bid(asset: impl Into<String>, price: f64, queued_at: impl Into<DateTime>) -> Self {
        Self {
            order_type: LimitOrderType::Bid,
            asset: asset.into(),
            price,
            queued_at: queued_at.into(),
        }
    }

    pub fn ask(asset: impl Into<String>, price: f64, queued_at: impl Into<DateTime>) -> Self {
        Self {
            order_type: LimitOrderType::Ask,
            asset: asset.into(),
            price,
            queued_at: queued_at.into(),
        }
    }

    /// Whether the candle trades through this order's price once spread is applied.
    pub fn is_touched_by(&self, candle: &Candle, spread: f64) -> bool {
        match self.order_type {
            LimitOrderType::Bid => candle.low * (1.0 + spread) <= self.price,
            LimitOrderType::Ask => candle.high * (1.0 - spread) >= self.price,
        }
    }
}

/// Decides whether a touched order actually fills.
///
/// A probability of one (or more) always fills and never consumes randomness, so deterministic
/// runs do not depend on the seed at all.
#[derive(Clone, Debug)]
pub struct FillModel {
    bid_probability: f64,
    ask_probability: f64,
    rng: StdRng,
}

impl FillModel {
    pub fn new(bid_probability: f64, ask_probability: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            bid_probability,
            ask_probability,
            rng,
        }
    }

    pub fn deterministic() -> Self {
        Self::new(1.0, 1.0, Some(0))
    }

    pub fn fills(&mut self, order_type: LimitOrderType) -> bool {
        let probability = match order_type {
            LimitOrderType::Bid => self.bid_probability,
            LimitOrderType::Ask => self.ask_probability,
        };
        if probability >= 1.0 {
            return true;
        }
        if probability <= 0.0 {
            return false;
        }
        self.rng.gen::<f64>() < probability
    }
}

/// Pending limit orders, at most one per asset.
///
/// One order per asset follows from all-or-nothing sizing: a trader is either trying to get into
/// an asset or trying to get out of it, never both, and a second order on the same side replaces
/// the first.
#[derive(Clone, Debug, Default)]
pub struct OrderQueue {
    //Ordered by asset so settlement consumes randomness in a stable order
    inner: BTreeMap<String, PendingOrder>,
}

impl OrderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an order, returning the order it replaced if one was pending for the asset.
    pub fn insert_order(&mut self, order: PendingOrder) -> Option<PendingOrder> {
        debug!(
            "ORDERBOOK: Queued {:?} for {} at {:?}",
            order.order_type, order.asset, order.price
        );
        self.inner.insert(order.asset.clone(), order)
    }

    pub fn delete_order(&mut self, asset: &str) -> Option<PendingOrder> {
        self.inner.remove(asset)
    }

    pub fn get(&self, asset: &str) -> Option<&PendingOrder> {
        self.inner.get(asset)
    }

    pub fn has_pending(&self, asset: &str, order_type: LimitOrderType) -> bool {
        self.inner
            .get(asset)
            .is_some_and(|order| order.order_type == order_type)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn orders(&self) -> impl Iterator<Item = &PendingOrder> {
        self.inner.values()
    }

    /// Checks the asset's pending order against a new candle. A filled order is removed from the
    /// queue and returned, anything else stays queued for the next candle.
    ///
    /// Orders can only fill on a candle that starts after they were queued.
    pub fn settle(
        &mut self,
        asset: &str,
        candle: &Candle,
        spread: f64,
        fill_model: &mut FillModel,
    ) -> Option<PendingOrder> {
        let order = self.inner.get(asset)?;
        if order.queued_at >= candle.timestamp || !order.is_touched_by(candle, spread) {
            return None;
        }
        if !fill_model.fills(order.order_type) {
            debug!(
                "ORDERBOOK: {:?} for {} touched at {} but missed the fill",
                order.order_type, asset, candle.timestamp
            );
            return None;
        }
        self.inner.remove(asset)
    }

    /// Removes orders queued more than `max_age_secs` before `now`.
    pub fn expire(&mut self, now: DateTime, max_age_secs: i64) -> Vec<PendingOrder> {
        let cutoff = now.seconds_ago(max_age_secs);
        let expired_assets: Vec<String> = self
            .inner
            .values()
            .filter(|order| order.queued_at < cutoff)
            .map(|order| order.asset.clone())
            .collect();
        expired_assets
            .iter()
            .filter_map(|asset| self.inner.remove(asset))
            .collect()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}
