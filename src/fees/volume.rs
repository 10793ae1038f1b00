use std::collections::VecDeque;

use crate::clock::DateTime;

/// Trailing traded volume over a fixed window of simulation time.
///
/// Eviction is relative to the latest timestamp the tracker has seen, never wall-clock time.
#[derive(Clone, Debug)]
pub struct VolumeTracker {
    window_secs: i64,
    entries: VecDeque<(DateTime, f64)>,
    latest: Option<DateTime>,
    total: f64,
}

impl VolumeTracker {
    pub fn new(window_secs: i64) -> Self {
        Self {
            window_secs,
            entries: VecDeque::new(),
            latest: None,
            total: 0.0,
        }
    }

    pub fn record(&mut self, timestamp: DateTime, volume: f64) {
        self.entries.push_back((timestamp, volume));
        self.total += volume;
        self.prune(timestamp);
    }

    /// Evicts entries older than the window ending at `now` (or at the latest timestamp seen,
    /// whichever is later). Returns true if anything was evicted.
    pub fn prune(&mut self, now: DateTime) -> bool {
        let latest = match self.latest {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        self.latest = Some(latest);

        let cutoff = latest.seconds_ago(self.window_secs);
        let mut evicted = false;
        while let Some((timestamp, volume)) = self.entries.front().copied() {
            if timestamp >= cutoff {
                break;
            }
            self.entries.pop_front();
            self.total -= volume;
            evicted = true;
        }
        if self.entries.is_empty() {
            //Stops float drift accumulating across many add/remove cycles
            self.total = 0.0;
        }
        evicted
    }

    /// Volume recorded at or after `since`.
    pub fn volume_since(&self, since: DateTime) -> f64 {
        self.entries
            .iter()
            .filter(|(timestamp, _)| *timestamp >= since)
            .map(|(_, volume)| volume)
            .sum()
    }

    /// Volume currently inside the window.
    pub fn volume(&self) -> f64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.latest = None;
        self.total = 0.0;
    }
}
