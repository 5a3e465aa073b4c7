//! Mark-to-market valuation of open lots
//!
//! Builds per-asset unrealized gain/loss positions from the open side of
//! the ledger and a current price. Assets without a usable price are
//! skipped by the caller, never reported as zero.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::TaxLot;

/// Per-asset aggregate over open lots at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnrealizedPosition {
    pub asset_id: String,
    pub symbol: String,
    pub quantity: Decimal,
    pub cost_basis: Decimal,
    pub current_value: Decimal,
    pub unrealized_gain: Decimal,
    pub unrealized_gain_percent: Decimal,
    /// Quantity-weighted mean age of the open lots, in days.
    pub holding_period_days: Decimal,
    pub is_long_term: bool,
}

/// Aggregate the open lots of one asset at `current_price`.
///
/// Returns `None` when there is nothing open to value.
pub fn position_from_lots(
    asset_id: &str,
    symbol: &str,
    open_lots: &[TaxLot],
    current_price: Decimal,
    as_of: NaiveDate,
    long_term_threshold_days: i64,
) -> Option<UnrealizedPosition> {
    let open: Vec<&TaxLot> = open_lots.iter().filter(|l| l.is_open()).collect();
    if open.is_empty() {
        return None;
    }

    let quantity: Decimal = open.iter().map(|l| l.quantity).sum();
    let cost_basis: Decimal = open.iter().map(|l| l.quantity * l.purchase_price).sum();
    let current_value = current_price * quantity;
    let unrealized_gain = current_value - cost_basis;
    let unrealized_gain_percent = if cost_basis > Decimal::ZERO {
        unrealized_gain / cost_basis * Decimal::from(100)
    } else {
        Decimal::ZERO
    };

    let weighted_days: Decimal = open
        .iter()
        .map(|l| l.quantity * Decimal::from(l.holding_period_days(as_of)))
        .sum();
    let holding_period_days = if quantity > Decimal::ZERO {
        weighted_days / quantity
    } else {
        Decimal::ZERO
    };
    let is_long_term = holding_period_days > Decimal::from(long_term_threshold_days);

    Some(UnrealizedPosition {
        asset_id: asset_id.to_string(),
        symbol: symbol.to_string(),
        quantity,
        cost_basis,
        current_value,
        unrealized_gain,
        unrealized_gain_percent,
        holding_period_days,
        is_long_term,
    })
}
