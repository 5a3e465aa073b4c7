//! Dividend yield
//!
//! Trailing yield and yield-on-cost from a 365-day window of dividend
//! events. When fewer than twelve months of history exist, the total is
//! annualized linearly (`total * 12 / months_of_data`). That linear
//! extrapolation is a known simplification with no variance correction;
//! it is kept as-is rather than silently "improved".

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::DividendEvent;

/// Mean Gregorian month length in days, for months-of-data estimation.
const DAYS_PER_MONTH: Decimal = Decimal::from_parts(3044, 0, 0, false, 2); // 30.44

/// Omitted (`None`) fields mean the underlying lookup was unavailable,
/// never a computed zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DividendYield {
    /// Trailing dividend total, annualized when history is partial.
    pub annual_dividend: Option<Decimal>,
    /// Percent of current price.
    pub dividend_yield: Option<Decimal>,
    /// Percent of the average open-lot purchase price.
    pub yield_on_cost: Option<Decimal>,
}

impl DividendYield {
    /// The all-omitted value for when the dividend history itself could
    /// not be fetched.
    pub fn unavailable() -> Self {
        Self {
            annual_dividend: None,
            dividend_yield: None,
            yield_on_cost: None,
        }
    }
}

/// Compute trailing yield over the 365 days ending at `as_of`.
///
/// `current_price` is `None` when the price lookup failed or returned
/// nothing; the yield is then omitted while yield-on-cost still comes
/// from the ledger. A non-positive price or cost yields zero.
pub fn trailing_yield(
    events: &[DividendEvent],
    current_price: Option<Decimal>,
    average_cost: Decimal,
    as_of: NaiveDate,
) -> DividendYield {
    let window_start = as_of.checked_sub_days(Days::new(365)).unwrap_or(as_of);
    let in_window: Vec<&DividendEvent> = events
        .iter()
        .filter(|e| e.ex_date > window_start && e.ex_date <= as_of)
        .collect();

    let total: Decimal = in_window.iter().map(|e| e.amount).sum();

    let annual_dividend = if let Some(oldest) = in_window.iter().map(|e| e.ex_date).min() {
        let days_of_data = Decimal::from((as_of - oldest).num_days().max(1));
        let months_of_data = (days_of_data / DAYS_PER_MONTH).max(Decimal::ONE);
        if months_of_data < Decimal::from(12) {
            total * Decimal::from(12) / months_of_data
        } else {
            total
        }
    } else {
        Decimal::ZERO
    };

    let dividend_yield = current_price.map(|price| {
        if price > Decimal::ZERO {
            annual_dividend / price * Decimal::from(100)
        } else {
            Decimal::ZERO
        }
    });

    let yield_on_cost = if average_cost > Decimal::ZERO {
        annual_dividend / average_cost * Decimal::from(100)
    } else {
        Decimal::ZERO
    };

    DividendYield {
        annual_dividend: Some(annual_dividend),
        dividend_yield,
        yield_on_cost: Some(yield_on_cost),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(amount: Decimal, ex_date: NaiveDate) -> DividendEvent {
        DividendEvent { amount, ex_date }
    }

    #[test]
    fn test_quarterly_history_close_to_total() {
        let as_of = date(2025, 6, 1);
        // Quarterly $1 payments spanning nearly the whole trailing year:
        // the oldest event sits ~11.5 months back, so the linear scaling
        // nudges the total up only slightly.
        let events = vec![
            event(dec!(1), date(2024, 6, 15)),
            event(dec!(1), date(2024, 9, 15)),
            event(dec!(1), date(2024, 12, 15)),
            event(dec!(1), date(2025, 3, 15)),
        ];
        let result = trailing_yield(&events, Some(dec!(100)), dec!(80), as_of);

        let annual = result.annual_dividend.unwrap();
        assert!(annual > dec!(4));
        assert!(annual < dec!(4.2));
        let yield_pct = result.dividend_yield.unwrap();
        assert!(yield_pct > dec!(4) && yield_pct < dec!(4.2));
        assert!(result.yield_on_cost.unwrap() > dec!(5));
    }

    #[test]
    fn test_partial_history_is_annualized() {
        let as_of = date(2025, 6, 1);
        // One payment ~3 months back: roughly 4x scaling.
        let events = vec![event(dec!(1), date(2025, 3, 1))];
        let result = trailing_yield(&events, Some(dec!(100)), dec!(100), as_of);

        // 92 days -> ~3.02 months of data; 1 * 12 / 3.02 ≈ 3.97
        let annual = result.annual_dividend.unwrap();
        assert!(annual > dec!(3.9));
        assert!(annual < dec!(4.1));
    }

    #[test]
    fn test_events_outside_window_excluded() {
        let as_of = date(2025, 6, 1);
        let events = vec![
            event(dec!(10), date(2023, 1, 1)), // stale
            event(dec!(1), date(2025, 5, 1)),
        ];
        let result = trailing_yield(&events, Some(dec!(100)), dec!(100), as_of);
        // Only the recent event counts, annualized from one month of data.
        let annual = result.annual_dividend.unwrap();
        assert!(annual <= dec!(12));
        assert!(annual > dec!(11));
    }

    #[test]
    fn test_missing_price_omits_yield() {
        let as_of = date(2025, 6, 1);
        let events = vec![event(dec!(1), date(2025, 3, 1))];
        let result = trailing_yield(&events, None, dec!(100), as_of);
        assert!(result.dividend_yield.is_none());
        assert!(result.yield_on_cost.unwrap() > Decimal::ZERO);
    }

    #[test]
    fn test_non_positive_price_guard() {
        let as_of = date(2025, 6, 1);
        let events = vec![event(dec!(1), date(2025, 3, 1))];
        let result = trailing_yield(&events, Some(dec!(0)), dec!(0), as_of);
        assert_eq!(result.dividend_yield, Some(dec!(0)));
        assert_eq!(result.yield_on_cost, Some(dec!(0)));
    }

    #[test]
    fn test_no_events() {
        let result = trailing_yield(&[], Some(dec!(100)), dec!(100), date(2025, 6, 1));
        assert_eq!(result.annual_dividend, Some(dec!(0)));
        assert_eq!(result.dividend_yield, Some(dec!(0)));
    }

    #[test]
    fn test_unavailable_omits_everything() {
        let result = DividendYield::unavailable();
        assert!(result.annual_dividend.is_none());
        assert!(result.dividend_yield.is_none());
        assert!(result.yield_on_cost.is_none());
    }
}
