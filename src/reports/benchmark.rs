//! Benchmark-relative analytics
//!
//! Single-factor comparison of the portfolio return series against a
//! benchmark series of equal length: beta from Cov/Var, alpha as the
//! plain excess return, tracking error and information ratio. Every
//! ratio needs at least two paired data points; below that the whole
//! comparison is omitted.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::stats;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub benchmark_symbol: String,
    /// Excess total return in percent (single-factor simplification).
    pub alpha: f64,
    /// Cov(portfolio, benchmark) / Var(benchmark); omitted when the
    /// benchmark shows no variance.
    pub beta: Option<f64>,
    /// Std-dev of per-period return differences.
    pub tracking_error: f64,
    /// Mean excess return over tracking error; undefined at zero TE.
    pub information_ratio: Option<f64>,
    pub portfolio_return_percent: f64,
    pub benchmark_return_percent: f64,
    pub excess_return_percent: f64,
}

/// Compare paired return series, truncating both to the shorter length.
///
/// Returns `None` when fewer than two paired points exist.
pub fn compare(
    portfolio_returns: &[f64],
    benchmark_returns: &[f64],
    benchmark_symbol: &str,
) -> Option<BenchmarkComparison> {
    let n = portfolio_returns.len().min(benchmark_returns.len());
    if n < 2 {
        debug!(
            benchmark_symbol,
            paired_points = n,
            "not enough paired returns for benchmark comparison"
        );
        return None;
    }
    let portfolio = &portfolio_returns[..n];
    let benchmark = &benchmark_returns[..n];

    let portfolio_total = stats::compounded_return(portfolio)? * 100.0;
    let benchmark_total = stats::compounded_return(benchmark)? * 100.0;
    let excess = portfolio_total - benchmark_total;

    let beta = match (
        stats::sample_covariance(portfolio, benchmark),
        stats::sample_variance(benchmark),
    ) {
        (Some(cov), Some(var)) if var > 0.0 => Some(cov / var),
        _ => None,
    };

    let tracking_error = stats::tracking_error(portfolio, benchmark)?;
    let information_ratio = if tracking_error > 0.0 {
        let mean_excess = portfolio
            .iter()
            .zip(benchmark.iter())
            .map(|(p, b)| p - b)
            .sum::<f64>()
            / n as f64;
        Some(mean_excess / tracking_error)
    } else {
        None
    };

    Some(BenchmarkComparison {
        benchmark_symbol: benchmark_symbol.to_string(),
        alpha: excess,
        beta,
        tracking_error,
        information_ratio,
        portfolio_return_percent: portfolio_total,
        benchmark_return_percent: benchmark_total,
        excess_return_percent: excess,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beta_of_leveraged_series_is_two() {
        let bench = vec![0.01, -0.02, 0.015, 0.005, -0.01];
        let portfolio: Vec<f64> = bench.iter().map(|r| r * 2.0).collect();

        let result = compare(&portfolio, &bench, "SPY").unwrap();
        assert!((result.beta.unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(result.benchmark_symbol, "SPY");
    }

    #[test]
    fn test_identical_series_has_zero_te_and_no_ir() {
        let series = vec![0.01, 0.02, -0.01, 0.015];
        let result = compare(&series, &series, "SPY").unwrap();

        assert!(result.tracking_error < 1e-15);
        assert!(result.information_ratio.is_none());
        assert!(result.excess_return_percent.abs() < 1e-9);
    }

    #[test]
    fn test_flat_benchmark_omits_beta() {
        let portfolio = vec![0.01, -0.02, 0.015];
        let bench = vec![0.0, 0.0, 0.0];
        let result = compare(&portfolio, &bench, "CASH").unwrap();
        assert!(result.beta.is_none());
    }

    #[test]
    fn test_single_point_omitted() {
        assert!(compare(&[0.01], &[0.01], "SPY").is_none());
    }

    #[test]
    fn test_series_truncated_to_shorter() {
        let portfolio = vec![0.01, 0.02, 0.03, 0.04];
        let bench = vec![0.01, 0.02];
        let result = compare(&portfolio, &bench, "SPY").unwrap();
        // Only the first two points count on both sides.
        assert!((result.portfolio_return_percent - result.benchmark_return_percent).abs() < 1e-9);
    }
}
