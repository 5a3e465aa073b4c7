//! Pure statistical helpers for portfolio analytics.
//! Stateless f64 functions with no ledger access and no async.
//!
//! Every function returns `None` below two data points; callers surface
//! that as an omitted metric, never as a fabricated zero.

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// Sample variance (n - 1 denominator).
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    Some(values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0))
}

/// Sample covariance of two equal-length prefixes.
pub fn sample_covariance(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let x_mean = xs[..n].iter().sum::<f64>() / nf;
    let y_mean = ys[..n].iter().sum::<f64>() / nf;
    let cov = (0..n)
        .map(|i| (xs[i] - x_mean) * (ys[i] - y_mean))
        .sum::<f64>()
        / (nf - 1.0);
    Some(cov)
}

/// Deviation of negative-return periods only (n - 1 denominator over the
/// full series). `None` when there are no negative periods.
pub fn downside_deviation(returns: &[f64]) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }
    let n = returns.len() as f64;
    let downside: f64 = returns
        .iter()
        .filter(|&&r| r < 0.0)
        .map(|r| r.powi(2))
        .sum();
    if downside == 0.0 {
        return None;
    }
    Some((downside / (n - 1.0)).sqrt())
}

/// Largest peak-to-trough decline of a value series, as a positive
/// fraction of the peak (0.15 = 15%).
pub fn max_drawdown(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mut peak = values[0];
    let mut max_dd = 0.0_f64;
    for &v in values {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            let dd = (peak - v) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    Some(max_dd)
}

/// Historical-simulation VaR at `confidence` (0.95, 0.99), as a positive
/// loss fraction.
pub fn var_historical(returns: &[f64], confidence: f64) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }
    let mut sorted: Vec<f64> = returns.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let idx = ((1.0 - confidence) * sorted.len() as f64).floor() as usize;
    let idx = idx.min(sorted.len() - 1);
    Some(-sorted[idx])
}

/// Tracking error: standard deviation of per-period return differences.
pub fn tracking_error(portfolio: &[f64], benchmark: &[f64]) -> Option<f64> {
    let n = portfolio.len().min(benchmark.len());
    if n < 2 {
        return None;
    }
    let diffs: Vec<f64> = (0..n).map(|i| portfolio[i] - benchmark[i]).collect();
    sample_std_dev(&diffs)
}

/// Cumulative growth curve from a return series, starting at `base`.
pub fn growth_curve(returns: &[f64], base: f64) -> Vec<f64> {
    let mut curve = Vec::with_capacity(returns.len() + 1);
    let mut value = base;
    curve.push(value);
    for r in returns {
        value *= 1.0 + r;
        curve.push(value);
    }
    curve
}

/// Total compounded return of a series, as a fraction.
pub fn compounded_return(returns: &[f64]) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }
    Some(returns.iter().map(|r| 1.0 + r).product::<f64>() - 1.0)
}
