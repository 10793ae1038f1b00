//! Simulation time shared by the replay components

use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const SECS_IN_DAY: i64 = 86_400;

///[DateTime] is a wrapper around the epoch time, in seconds, as i64. Candles, pending orders and
///transaction records all carry this representation.
//Formatting goes through the time package but that should stay hidden from clients, everything
//else only ever needs the raw integer.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, PartialOrd, Ord, Deserialize, Serialize)]
pub struct DateTime(i64);

impl DateTime {
    pub fn days_ago(&self, days: i64) -> Self {
        Self(self.0 - days * SECS_IN_DAY)
    }

    pub fn seconds_ago(&self, seconds: i64) -> Self {
        Self(self.0 - seconds)
    }
}

impl Deref for DateTime {
    type Target = i64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for DateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        //Out-of-range timestamps are still valid simulation time, they just can't be rendered as
        //a date
        match OffsetDateTime::from_unix_timestamp(self.0)
            .ok()
            .and_then(|date| date.format(&Rfc3339).ok())
        {
            Some(formatted) => write!(f, "{}", formatted),
            None => write!(f, "{}", self.0),
        }
    }
}

impl From<OffsetDateTime> for DateTime {
    fn from(value: OffsetDateTime) -> Self {
        value.unix_timestamp().into()
    }
}

impl From<DateTime> for i64 {
    fn from(v: DateTime) -> Self {
        v.0
    }
}

impl From<i64> for DateTime {
    fn from(v: i64) -> Self {
        DateTime(v)
    }
}

/// Steps through every timestamp present in a candle source, oldest first.
///
/// The dates are held behind an [Arc] so a clock can be created for each run from the same source
/// without copying. Each clock keeps its own position, so two runs never advance each other.
#[derive(Clone, Debug)]
pub struct Clock {
    dates: Arc<Vec<DateTime>>,
    //Number of dates already handed out by tick
    pos: usize,
}

impl Clock {
    /// Last date returned by [Clock::tick], `None` before the first tick.
    pub fn now(&self) -> Option<DateTime> {
        if self.pos == 0 {
            return None;
        }
        self.dates.get(self.pos - 1).copied()
    }

    pub fn has_next(&self) -> bool {
        self.pos < self.dates.len()
    }

    /// Moves to the next date and returns it. Returns `None` once every date has been seen, the
    /// clock does not wrap.
    pub fn tick(&mut self) -> Option<DateTime> {
        let next = self.dates.get(self.pos).copied();
        if next.is_some() {
            self.pos += 1;
        }
        next
    }

    // Doesn't change the iteration state
    pub fn peek(&self) -> impl Iterator<Item = DateTime> + '_ {
        self.dates.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Dates are sorted and deduplicated so callers can pass the raw union of per-asset
    /// timestamps.
    pub fn from_dates(mut dates: Vec<DateTime>) -> Self {
        dates.sort();
        dates.dedup();
        Self {
            dates: Arc::new(dates),
            pos: 0,
        }
    }

    pub(crate) fn from_shared(dates: Arc<Vec<DateTime>>) -> Self {
        Self { dates, pos: 0 }
    }
}
