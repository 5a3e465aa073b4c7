//! Engine configuration
//!
//! Tunables for tax classification and performance analytics, loadable
//! from a TOML file. Defaults match common US assumptions: 365-day
//! long-term threshold, 2% risk-free rate, 252 trading days per year.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Annual risk-free rate in percent, used by Sharpe/Sortino.
    pub risk_free_rate_percent: f64,
    /// Periods per year for annualizing return statistics.
    pub trading_days_per_year: f64,
    /// Holding period strictly greater than this is long-term.
    pub long_term_threshold_days: i64,
    /// TTL for the cached price source.
    pub price_cache_ttl_hours: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk_free_rate_percent: 2.0,
            trading_days_per_year: 252.0,
            long_term_threshold_days: 365,
            price_cache_ttl_hours: 24,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file, falling back to defaults
    /// for any missing keys.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: EngineConfig =
            toml::from_str(&raw).context("failed to parse engine config")?;
        Ok(config)
    }
}
