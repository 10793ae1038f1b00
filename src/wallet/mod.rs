//! Balances held by one trader
use std::collections::HashMap;

use derive_more::{Display, Error};
use log::info;

/// A wallet amount was set below zero.
#[derive(Clone, Debug, Display, Error, PartialEq)]
#[display(fmt = "Invalid amount {} for {}", value, asset)]
pub struct InvalidAmount {
    pub asset: String,
    pub value: f64,
}

/// Per-asset balances plus the main currency balance, and the last observed price of each asset.
///
/// The main currency is stored alongside the other assets but is always priced at one. Unknown
/// assets have zero amount and zero price, there is no error for asking about them.
#[derive(Clone, Debug)]
pub struct Wallet {
    main_currency: String,
    amounts: HashMap<String, f64>,
    prices: HashMap<String, f64>,
}

impl Wallet {
    pub fn new(main_currency: impl Into<String>, starting_fund: f64) -> Result<Self, InvalidAmount> {
        let mut wallet = Self {
            main_currency: main_currency.into(),
            amounts: HashMap::new(),
            prices: HashMap::new(),
        };
        let main = wallet.main_currency.clone();
        wallet.set_amount(&main, starting_fund)?;
        Ok(wallet)
    }

    pub fn main_currency(&self) -> &str {
        &self.main_currency
    }

    pub fn get_amount(&self, asset: &str) -> f64 {
        self.amounts.get(asset).copied().unwrap_or_default()
    }

    pub fn main_amount(&self) -> f64 {
        self.get_amount(&self.main_currency)
    }

    pub fn set_amount(&mut self, asset: &str, value: f64) -> Result<(), InvalidAmount> {
        //NaN fails this check too
        if !(value >= 0.0) {
            return Err(InvalidAmount {
                asset: asset.to_string(),
                value,
            });
        }
        self.amounts.insert(asset.to_string(), value);
        Ok(())
    }

    pub fn get_price(&self, asset: &str) -> f64 {
        if asset == self.main_currency {
            return 1.0;
        }
        self.prices.get(asset).copied().unwrap_or_default()
    }

    pub fn set_price(&mut self, asset: &str, value: f64) {
        self.prices.insert(asset.to_string(), value);
    }

    /// Marked value of one asset in main currency.
    pub fn asset_value(&self, asset: &str) -> f64 {
        self.get_amount(asset) * self.get_price(asset)
    }

    /// Total value in main currency: main currency amount plus every asset marked at its last
    /// price.
    pub fn value(&self) -> f64 {
        self.amounts
            .keys()
            .map(|asset| self.asset_value(asset))
            .sum()
    }

    /// Assets, excluding main currency, with a non-zero balance.
    pub fn holdings(&self) -> Vec<(String, f64)> {
        let mut holdings: Vec<(String, f64)> = self
            .amounts
            .iter()
            .filter(|(asset, amount)| **asset != self.main_currency && **amount > 0.0)
            .map(|(asset, amount)| (asset.clone(), *amount))
            .collect();
        holdings.sort_by(|a, b| a.0.cmp(&b.0));
        holdings
    }

    /// Clears every balance and price, then deposits the starting fund again. Used between
    /// independent runs.
    pub fn reset(&mut self, starting_fund: f64) -> Result<(), InvalidAmount> {
        info!(
            "WALLET: Resetting with {:?} {}",
            starting_fund, self.main_currency
        );
        self.amounts.clear();
        self.prices.clear();
        let main = self.main_currency.clone();
        self.set_amount(&main, starting_fund)
    }
}

#[cfg(test)]
mod tests {
    use super::{InvalidAmount, Wallet};

    fn setup() -> Wallet {
        let mut wallet = Wallet::new("EUR", 1000.0).unwrap();
        wallet.set_amount("BTC", 2.0).unwrap();
        wallet.set_price("BTC", 100.0);
        wallet
    }

    #[test]
    fn test_that_total_value_marks_assets_at_last_price() {
        let mut wallet = setup();
        assert_eq!(wallet.value(), 1200.0);
        assert_eq!(wallet.asset_value("BTC"), 200.0);

        wallet.set_price("BTC", 150.0);
        assert_eq!(wallet.value(), 1300.0);
    }

    #[test]
    fn test_that_unknown_asset_defaults_to_zero() {
        let wallet = setup();
        assert_eq!(wallet.get_amount("ETH"), 0.0);
        assert_eq!(wallet.get_price("ETH"), 0.0);
        assert_eq!(wallet.asset_value("ETH"), 0.0);
    }

    #[test]
    fn test_that_negative_amount_is_rejected() {
        let mut wallet = setup();
        let res = wallet.set_amount("BTC", -0.1);
        assert_eq!(
            res,
            Err(InvalidAmount {
                asset: "BTC".to_string(),
                value: -0.1
            })
        );
        //Balance is untouched after a rejected update
        assert_eq!(wallet.get_amount("BTC"), 2.0);
        assert!(wallet.set_amount("BTC", f64::NAN).is_err());
    }

    #[test]
    fn test_that_main_currency_is_priced_at_one() {
        let wallet = setup();
        assert_eq!(wallet.get_price("EUR"), 1.0);
        assert_eq!(wallet.main_amount(), 1000.0);
        assert_eq!(wallet.holdings(), vec![("BTC".to_string(), 2.0)]);
    }

    #[test]
    fn test_that_reset_restores_starting_fund() {
        let mut wallet = setup();
        wallet.reset(500.0).unwrap();
        assert_eq!(wallet.value(), 500.0);
        assert_eq!(wallet.get_price("BTC"), 0.0);
        assert!(wallet.holdings().is_empty());
    }
}
