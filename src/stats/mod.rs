//! Executed transactions and the statistics calculated from them
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::clock::DateTime;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub enum OrderType {
    Buy,
    Sell,
    Bid,
    Ask,
}

impl OrderType {
    /// Buy and Bid move main currency into an asset.
    pub fn is_entry(&self) -> bool {
        matches!(self, OrderType::Buy | OrderType::Bid)
    }

    pub fn is_market(&self) -> bool {
        matches!(self, OrderType::Buy | OrderType::Sell)
    }
}

/// One executed order. Attempted orders that were rejected never produce a record.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TransactionRecord {
    pub order_type: OrderType,
    pub asset: String,
    pub timestamp: DateTime,
    pub execution_price: f64,
    /// Quantity of the asset bought or sold
    pub volume: f64,
    pub volume_in_reference_currency: f64,
    pub fee_rate: f64,
    /// Fee in main currency
    pub fee_amount: f64,
    /// Main currency spent (entries) or received (exits), after fees and spread
    pub value: f64,
}

/// Consumer of a run's output.
///
/// `record` is called for every executed order, `snapshot` once at the end of every step with the
/// wallet's total value.
pub trait StatisticsSink {
    fn record(&mut self, record: &TransactionRecord);
    fn snapshot(&mut self, _timestamp: DateTime, _value: f64) {}
}

/// Sink that discards everything, for runs where only the final wallet matters.
#[derive(Clone, Debug, Default)]
pub struct NullSink;

impl StatisticsSink for NullSink {
    fn record(&mut self, _record: &TransactionRecord) {}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EquitySnapshot {
    pub timestamp: DateTime,
    pub value: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct RunSummary {
    pub transactions: usize,
    pub round_trips: usize,
    pub wins: usize,
    pub losses: usize,
    pub fees_paid: f64,
    pub traded_volume: f64,
    pub realised_profit: f64,
    pub starting_value: Option<f64>,
    pub final_value: Option<f64>,
    /// Percentage change from first to last snapshot
    pub total_return: Option<f64>,
    /// Largest peak-to-trough fall across snapshots, as a negative percentage
    pub max_drawdown: f64,
}

/// In-memory sink holding every transaction and equity snapshot.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TradeLog {
    transactions: Vec<TransactionRecord>,
    snapshots: Vec<EquitySnapshot>,
}

impl TradeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transactions(&self) -> &[TransactionRecord] {
        &self.transactions
    }

    pub fn snapshots(&self) -> &[EquitySnapshot] {
        &self.snapshots
    }

    pub fn transactions_between(&self, start: &DateTime, end: &DateTime) -> Vec<&TransactionRecord> {
        self.transactions
            .iter()
            .filter(|record| record.timestamp >= *start && record.timestamp <= *end)
            .collect()
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            transactions: self.transactions.len(),
            ..RunSummary::default()
        };

        //Entries are matched to the next exit on the same asset. All-or-nothing sizing means
        //there is never more than one open entry per asset.
        let mut open_entries: HashMap<&str, f64> = HashMap::new();
        for record in &self.transactions {
            summary.fees_paid += record.fee_amount;
            summary.traded_volume += record.volume_in_reference_currency;
            if record.order_type.is_entry() {
                open_entries.insert(record.asset.as_str(), record.value);
            } else if let Some(cost) = open_entries.remove(record.asset.as_str()) {
                let profit = record.value - cost;
                summary.round_trips += 1;
                summary.realised_profit += profit;
                if profit > 0.0 {
                    summary.wins += 1;
                } else {
                    summary.losses += 1;
                }
            }
        }

        let values: Vec<f64> = self.snapshots.iter().map(|snap| snap.value).collect();
        summary.starting_value = values.first().copied();
        summary.final_value = values.last().copied();
        if let (Some(first), Some(last)) = (summary.starting_value, summary.final_value) {
            if first > 0.0 {
                summary.total_return = Some(((last / first) - 1.0) * 100.0);
            }
        }
        summary.max_drawdown = max_drawdown(&values);
        summary
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn clear(&mut self) {
        self.transactions.clear();
        self.snapshots.clear();
    }
}

impl StatisticsSink for TradeLog {
    fn record(&mut self, record: &TransactionRecord) {
        self.transactions.push(record.clone());
    }

    fn snapshot(&mut self, timestamp: DateTime, value: f64) {
        self.snapshots.push(EquitySnapshot { timestamp, value });
    }
}

fn max_drawdown(values: &[f64]) -> f64 {
    let mut maxdd = 0.0;
    let mut peak = f64::MIN;
    for value in values {
        if *value > peak {
            peak = *value;
        } else if peak > 0.0 {
            let drawdown = (value / peak) - 1.0;
            if drawdown < maxdd {
                maxdd = drawdown;
            }
        }
    }
    maxdd * 100.0
}

#[cfg(test)]
mod tests {
    use super::{OrderType, StatisticsSink, TradeLog, TransactionRecord};

    fn record(order_type: OrderType, asset: &str, timestamp: i64, value: f64) -> TransactionRecord {
        TransactionRecord {
            order_type,
            asset: asset.to_string(),
            timestamp: timestamp.into(),
            execution_price: 100.0,
            volume: 1.0,
            volume_in_reference_currency: 100.0,
            fee_rate: 0.001,
            fee_amount: 0.1,
            value,
        }
    }

    #[test]
    fn test_that_summary_pairs_entries_with_exits() {
        let mut log = TradeLog::new();
        log.record(&record(OrderType::Buy, "ABC", 1, 100.0));
        log.record(&record(OrderType::Bid, "BCD", 2, 50.0));
        log.record(&record(OrderType::Sell, "ABC", 3, 110.0));
        log.record(&record(OrderType::Ask, "BCD", 4, 45.0));
        log.record(&record(OrderType::Buy, "ABC", 5, 110.0));

        let summary = log.summary();
        assert_eq!(summary.transactions, 5);
        assert_eq!(summary.round_trips, 2);
        assert_eq!(summary.wins, 1);
        assert_eq!(summary.losses, 1);
        assert!((summary.realised_profit - 5.0).abs() < 1e-9);
        assert!((summary.fees_paid - 0.5).abs() < 1e-9);
        assert!((summary.traded_volume - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_that_drawdown_and_return_use_snapshots() {
        let mut log = TradeLog::new();
        for (i, value) in [100.0, 120.0, 90.0, 110.0, 60.0, 130.0].iter().enumerate() {
            log.snapshot((i as i64).into(), *value);
        }
        let summary = log.summary();
        assert_eq!(summary.starting_value, Some(100.0));
        assert_eq!(summary.final_value, Some(130.0));
        assert!((summary.total_return.unwrap() - 30.0).abs() < 1e-9);
        assert!((summary.max_drawdown - -50.0).abs() < 1e-9);
    }

    #[test]
    fn test_that_transactions_between_is_inclusive() {
        let mut log = TradeLog::new();
        log.record(&record(OrderType::Buy, "ABC", 1, 100.0));
        log.record(&record(OrderType::Sell, "ABC", 3, 100.0));
        log.record(&record(OrderType::Buy, "ABC", 5, 100.0));
        assert_eq!(log.transactions_between(&1.into(), &3.into()).len(), 2);
        assert!(log.to_json().unwrap().contains("\"Sell\""));
    }
}
