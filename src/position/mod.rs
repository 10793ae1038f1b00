//! Open positions, at most one per asset
use std::collections::HashMap;

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

use crate::clock::DateTime;

/// A position was opened on an asset that already had one. The engine checks the book before
/// opening so this only surfaces if that invariant has been broken.
#[derive(Clone, Debug, Display, Error, PartialEq)]
#[display(fmt = "Position already open for {}", asset)]
pub struct AlreadyOpen {
    pub asset: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Position {
    pub asset: String,
    pub enter_price: f64,
    pub enter_timestamp: DateTime,
}

/// Record of which assets currently hold a position. Absence of an entry means the asset is flat.
#[derive(Clone, Debug, Default)]
pub struct PositionBook {
    inner: HashMap<String, Position>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self, asset: &str) -> bool {
        self.inner.contains_key(asset)
    }

    pub fn open(
        &mut self,
        asset: &str,
        price: f64,
        timestamp: impl Into<DateTime>,
    ) -> Result<(), AlreadyOpen> {
        if self.is_open(asset) {
            return Err(AlreadyOpen {
                asset: asset.to_string(),
            });
        }
        self.inner.insert(
            asset.to_string(),
            Position {
                asset: asset.to_string(),
                enter_price: price,
                enter_timestamp: timestamp.into(),
            },
        );
        Ok(())
    }

    /// Returns the closed position, closing a flat asset does nothing.
    pub fn close(&mut self, asset: &str) -> Option<Position> {
        self.inner.remove(asset)
    }

    pub fn entry_price(&self, asset: &str) -> Option<f64> {
        self.inner.get(asset).map(|position| position.enter_price)
    }

    pub fn get(&self, asset: &str) -> Option<&Position> {
        self.inner.get(asset)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{AlreadyOpen, PositionBook};

    #[test]
    fn test_that_opening_twice_fails() {
        let mut book = PositionBook::new();
        book.open("BTC", 100.0, 10).unwrap();

        let res = book.open("BTC", 120.0, 11);
        assert_eq!(
            res,
            Err(AlreadyOpen {
                asset: "BTC".to_string()
            })
        );
        //First entry is kept
        assert_eq!(book.entry_price("BTC"), Some(100.0));
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_that_close_is_noop_when_flat() {
        let mut book = PositionBook::new();
        assert!(book.close("BTC").is_none());

        book.open("BTC", 100.0, 10).unwrap();
        let closed = book.close("BTC").unwrap();
        assert_eq!(*closed.enter_timestamp, 10);
        assert!(!book.is_open("BTC"));
        assert!(book.close("BTC").is_none());
    }

    #[test]
    fn test_that_positions_are_tracked_per_asset() {
        let mut book = PositionBook::new();
        book.open("BTC", 100.0, 10).unwrap();
        book.open("ETH", 10.0, 10).unwrap();
        assert!(book.is_open("BTC"));
        assert!(book.is_open("ETH"));
        assert!(!book.is_open("XRP"));
        assert_eq!(book.entry_price("XRP"), None);
    }
}
