//! Portfolio performance metrics
//!
//! Risk-adjusted performance over a reporting period: total and
//! annualized return from the ledger's cost basis and current value,
//! plus volatility, Sharpe/Sortino, drawdown and VaR from a periodic
//! return series supplied by the market-data collaborator.
//!
//! Bookkeeping stays in `Decimal`; ratio math happens in `f64` after an
//! explicit conversion. Any metric without enough data is omitted
//! (`None`), never defaulted to zero.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::EngineConfig;
use crate::error::LedgerError;
use crate::stats;

/// Reporting period, with a fixed year-length estimate for
/// annualization. `All` assumes a ten-year horizon when true portfolio
/// inception is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    OneDay,
    OneWeek,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    ThreeYears,
    FiveYears,
    All,
}

impl Period {
    pub fn years(&self) -> f64 {
        match self {
            Period::OneDay => 1.0 / 365.0,
            Period::OneWeek => 7.0 / 365.0,
            Period::OneMonth => 1.0 / 12.0,
            Period::ThreeMonths => 0.25,
            Period::SixMonths => 0.5,
            Period::OneYear => 1.0,
            Period::ThreeYears => 3.0,
            Period::FiveYears => 5.0,
            Period::All => 10.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneDay => "1D",
            Period::OneWeek => "1W",
            Period::OneMonth => "1M",
            Period::ThreeMonths => "3M",
            Period::SixMonths => "6M",
            Period::OneYear => "1Y",
            Period::ThreeYears => "3Y",
            Period::FiveYears => "5Y",
            Period::All => "ALL",
        }
    }
}

impl FromStr for Period {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "1D" => Ok(Period::OneDay),
            "1W" => Ok(Period::OneWeek),
            "1M" => Ok(Period::OneMonth),
            "3M" => Ok(Period::ThreeMonths),
            "6M" => Ok(Period::SixMonths),
            "1Y" => Ok(Period::OneYear),
            "3Y" => Ok(Period::ThreeYears),
            "5Y" => Ok(Period::FiveYears),
            "ALL" => Ok(Period::All),
            other => Err(LedgerError::InvalidInput(format!(
                "unknown reporting period: {other}"
            ))),
        }
    }
}

/// Portfolio-level performance figures. Optional fields mean
/// "insufficient data", distinguishable from a computed zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub period: Period,
    pub total_return: Decimal,
    pub total_return_percent: Decimal,
    pub annualized_return: f64,
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    /// Annualized, in percent.
    pub volatility: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub max_drawdown_percent: Option<f64>,
    pub var_95: Option<f64>,
    pub var_99: Option<f64>,
}

/// Assemble metrics from the valued portfolio and an optional periodic
/// return series. `returns` are fractions per period, oldest first;
/// `None` or a sub-2-point series omits every series-based metric.
pub fn analyze(
    cost_basis: Decimal,
    current_value: Decimal,
    period: Period,
    returns: Option<&[f64]>,
    config: &EngineConfig,
) -> PerformanceMetrics {
    let total_return = current_value - cost_basis;
    let total_return_percent = if cost_basis > Decimal::ZERO {
        total_return / cost_basis * Decimal::from(100)
    } else {
        Decimal::ZERO
    };

    let pct = total_return_percent.to_f64().unwrap_or(0.0);
    let years = period.years();
    let annualized_return = ((1.0 + pct / 100.0).powf(1.0 / years) - 1.0) * 100.0;

    let mut metrics = PerformanceMetrics {
        period,
        total_return,
        total_return_percent,
        annualized_return,
        sharpe_ratio: None,
        sortino_ratio: None,
        alpha: None,
        beta: None,
        volatility: None,
        max_drawdown: None,
        max_drawdown_percent: None,
        var_95: None,
        var_99: None,
    };

    let returns = match returns {
        Some(r) if r.len() >= 2 => r,
        _ => return metrics,
    };

    let annualizer = config.trading_days_per_year.sqrt();

    if let Some(std) = stats::sample_std_dev(returns) {
        let volatility = std * annualizer * 100.0;
        metrics.volatility = Some(volatility);
        if volatility > 0.0 {
            metrics.sharpe_ratio =
                Some((annualized_return - config.risk_free_rate_percent) / volatility);
        }
    }

    if let Some(dd) = stats::downside_deviation(returns) {
        let downside = dd * annualizer * 100.0;
        if downside > 0.0 {
            metrics.sortino_ratio =
                Some((annualized_return - config.risk_free_rate_percent) / downside);
        }
    }

    let curve = stats::growth_curve(returns, 1.0);
    if let Some(dd_fraction) = stats::max_drawdown(&curve) {
        metrics.max_drawdown = Some(dd_fraction * current_value.to_f64().unwrap_or(0.0));
        metrics.max_drawdown_percent = Some(dd_fraction * 100.0);
    }

    metrics.var_95 = stats::var_historical(returns, 0.95);
    metrics.var_99 = stats::var_historical(returns, 0.99);

    metrics
}
