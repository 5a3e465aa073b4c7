//! In-memory market data
//!
//! Static quote tables implementing all collaborator traits. Used by the
//! test suite and by offline runs where prices are supplied up front.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::reports::performance::Period;

use super::{AssetRegistry, DividendEvent, DividendSource, PriceSource};

/// Fixed price/return/dividend tables keyed by symbol, plus an asset-id
/// to symbol registry. Builder-style construction.
#[derive(Debug, Clone, Default)]
pub struct StaticQuotes {
    prices: HashMap<String, Decimal>,
    returns: HashMap<String, Vec<f64>>,
    dividends: HashMap<String, Vec<DividendEvent>>,
    symbols: HashMap<String, String>,
    /// Symbols whose lookups fail, for exercising degraded paths.
    failing: HashSet<String>,
}

impl StaticQuotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, symbol: &str, price: Decimal) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }

    pub fn with_returns(mut self, symbol: &str, returns: Vec<f64>) -> Self {
        self.returns.insert(symbol.to_string(), returns);
        self
    }

    pub fn with_dividend(mut self, symbol: &str, amount: Decimal, ex_date: NaiveDate) -> Self {
        self.dividends
            .entry(symbol.to_string())
            .or_default()
            .push(DividendEvent { amount, ex_date });
        self
    }

    pub fn with_asset(mut self, asset_id: &str, symbol: &str) -> Self {
        self.symbols
            .insert(asset_id.to_string(), symbol.to_string());
        self
    }

    /// Make every lookup for `symbol` return an error.
    pub fn with_failure(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    fn check(&self, symbol: &str) -> Result<()> {
        if self.failing.contains(symbol) {
            return Err(anyhow!("simulated market-data outage for {symbol}"));
        }
        Ok(())
    }
}

#[async_trait]
impl PriceSource for StaticQuotes {
    async fn current_price(&self, symbol: &str) -> Result<Option<Decimal>> {
        self.check(symbol)?;
        Ok(self.prices.get(symbol).copied())
    }

    async fn historical_returns(&self, symbol: &str, _period: Period) -> Result<Vec<f64>> {
        self.check(symbol)?;
        Ok(self.returns.get(symbol).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl DividendSource for StaticQuotes {
    async fn events(&self, symbol: &str, since: NaiveDate) -> Result<Vec<DividendEvent>> {
        self.check(symbol)?;
        Ok(self
            .dividends
            .get(symbol)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.ex_date >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl AssetRegistry for StaticQuotes {
    fn symbol(&self, asset_id: &str) -> Option<String> {
        self.symbols.get(asset_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_static_tables() {
        let quotes = StaticQuotes::new()
            .with_price("AAPL", dec!(180))
            .with_returns("AAPL", vec![0.01, -0.02])
            .with_dividend("AAPL", dec!(0.25), NaiveDate::from_ymd_opt(2025, 2, 1).unwrap())
            .with_asset("asset-1", "AAPL");

        assert_eq!(quotes.current_price("AAPL").await.unwrap(), Some(dec!(180)));
        assert_eq!(
            quotes
                .historical_returns("AAPL", Period::OneYear)
                .await
                .unwrap()
                .len(),
            2
        );
        assert_eq!(quotes.symbol("asset-1").as_deref(), Some("AAPL"));

        let since = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert!(quotes.events("AAPL", since).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_simulated_failure() {
        let quotes = StaticQuotes::new()
            .with_price("AAPL", dec!(180))
            .with_failure("AAPL");
        assert!(quotes.current_price("AAPL").await.is_err());
    }
}
