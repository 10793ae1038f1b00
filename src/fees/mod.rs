//! Volume-tiered maker/taker fees
//!
//! A trader's fee rates depend on how much they have traded over a trailing window (30 days by
//! default). [FeeSchedule] maps volume to a [FeeTier], [VolumeTracker] keeps the trailing volume,
//! and [FeeState] ties the two together and caches the active tier for the engine.
mod volume;

pub use volume::VolumeTracker;

use derive_more::{Display, Error};
use log::info;
use serde::{Deserialize, Serialize};

use crate::clock::{DateTime, SECS_IN_DAY};

pub const DEFAULT_FEE_WINDOW_SECS: i64 = 30 * SECS_IN_DAY;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct FeeTier {
    pub volume_threshold: f64,
    pub maker: f64,
    pub taker: f64,
}

impl FeeTier {
    pub fn new(volume_threshold: f64, maker: f64, taker: f64) -> Self {
        Self {
            volume_threshold,
            maker,
            taker,
        }
    }
}

#[derive(Clone, Debug, Display, Error, PartialEq)]
pub enum FeeScheduleError {
    #[display(fmt = "Fee schedule has no tier with a zero volume threshold")]
    MissingFloorTier,
    #[display(fmt = "Fee schedule has two tiers at threshold {}", threshold)]
    DuplicateThreshold { threshold: f64 },
    #[display(fmt = "Fee tier at threshold {} is invalid", threshold)]
    InvalidTier { threshold: f64 },
}

/// Tiered table of fee rates, sorted by volume threshold.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeeSchedule {
    tiers: Vec<FeeTier>,
}

impl FeeSchedule {
    /// Tiers can be given in any order. A tier at threshold zero must exist so that every
    /// non-negative volume maps to a tier.
    pub fn new(mut tiers: Vec<FeeTier>) -> Result<Self, FeeScheduleError> {
        for tier in &tiers {
            let rates_ok = (0.0..1.0).contains(&tier.maker) && (0.0..1.0).contains(&tier.taker);
            if !(tier.volume_threshold >= 0.0) || !tier.volume_threshold.is_finite() || !rates_ok {
                return Err(FeeScheduleError::InvalidTier {
                    threshold: tier.volume_threshold,
                });
            }
        }
        tiers.sort_by(|a, b| a.volume_threshold.total_cmp(&b.volume_threshold));
        for pair in tiers.windows(2) {
            if pair[0].volume_threshold == pair[1].volume_threshold {
                return Err(FeeScheduleError::DuplicateThreshold {
                    threshold: pair[0].volume_threshold,
                });
            }
        }
        match tiers.first() {
            Some(floor) if floor.volume_threshold == 0.0 => Ok(Self { tiers }),
            _ => Err(FeeScheduleError::MissingFloorTier),
        }
    }

    /// Schedule used when the configuration does not supply one. Rates fall as volume rises,
    /// starting at 0.16% maker / 0.26% taker.
    pub fn standard() -> Self {
        Self {
            tiers: standard_tiers(),
        }
    }

    /// Tier with the largest threshold not exceeding `volume`. A volume sitting exactly on a
    /// threshold gets that (higher) tier.
    pub fn tier_for(&self, volume: f64) -> FeeTier {
        //Thresholds are sorted and the first one is zero
        let pos = self
            .tiers
            .partition_point(|tier| tier.volume_threshold <= volume);
        self.tiers[pos.saturating_sub(1)]
    }

    pub fn tiers(&self) -> &[FeeTier] {
        &self.tiers
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::standard()
    }
}

pub fn standard_tiers() -> Vec<FeeTier> {
    vec![
        FeeTier::new(0.0, 0.0016, 0.0026),
        FeeTier::new(50_000.0, 0.0014, 0.0024),
        FeeTier::new(100_000.0, 0.0012, 0.0022),
        FeeTier::new(250_000.0, 0.0010, 0.0020),
        FeeTier::new(500_000.0, 0.0008, 0.0018),
        FeeTier::new(1_000_000.0, 0.0006, 0.0016),
        FeeTier::new(2_500_000.0, 0.0004, 0.0014),
        FeeTier::new(5_000_000.0, 0.0002, 0.0012),
        FeeTier::new(10_000_000.0, 0.0, 0.0010),
    ]
}

/// When the active tier is recalculated.
///
/// `OnTransaction` only recalculates when a new transaction is recorded, so a trader that stops
/// trading keeps whatever tier they last reached even after that volume leaves the window. This
/// reproduces historical results. `EveryStep` also evicts aged transactions at every step and
/// recalculates when anything was evicted.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub enum FeeRefresh {
    #[default]
    OnTransaction,
    EveryStep,
}

/// Active fee tier for one trader.
#[derive(Clone, Debug)]
pub struct FeeState {
    schedule: FeeSchedule,
    tracker: VolumeTracker,
    refresh: FeeRefresh,
    current: FeeTier,
}

impl FeeState {
    pub fn new(schedule: FeeSchedule, window_secs: i64, refresh: FeeRefresh) -> Self {
        let current = schedule.tier_for(0.0);
        Self {
            schedule,
            tracker: VolumeTracker::new(window_secs),
            refresh,
            current,
        }
    }

    pub fn maker(&self) -> f64 {
        self.current.maker
    }

    pub fn taker(&self) -> f64 {
        self.current.taker
    }

    pub fn current(&self) -> FeeTier {
        self.current
    }

    pub fn volume(&self) -> f64 {
        self.tracker.volume()
    }

    /// Adds an executed transaction, in reference currency, and recalculates the tier.
    pub fn record_transaction(&mut self, timestamp: DateTime, volume: f64) {
        self.tracker.record(timestamp, volume);
        self.refresh_tier();
    }

    /// Called once per step. Only does anything under [FeeRefresh::EveryStep].
    pub fn on_step(&mut self, now: DateTime) {
        if self.refresh == FeeRefresh::EveryStep && self.tracker.prune(now) {
            self.refresh_tier();
        }
    }

    fn refresh_tier(&mut self) {
        let tier = self.schedule.tier_for(self.tracker.volume());
        if tier != self.current {
            info!(
                "FEES: Moving to tier {:?} with maker {:?} taker {:?} on volume {:?}",
                tier.volume_threshold,
                tier.maker,
                tier.taker,
                self.tracker.volume()
            );
        }
        self.current = tier;
    }

    pub fn reset(&mut self) {
        self.tracker.clear();
        self.current = self.schedule.tier_for(0.0);
    }
}
