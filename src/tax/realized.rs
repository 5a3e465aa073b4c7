//! Realized gain records
//!
//! Turns an applied consumption plan into an immutable per-sale record.
//! This is the only code path that closes lots in the ledger; everything
//! downstream (tax reports, 1099-B rows) aggregates the records it emits.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::ledger::selector::ConsumptionPlan;
use crate::ledger::TaxLotLedger;

/// Profit or loss locked in by one sale, keyed by tax year.
///
/// Immutable once created. `holding_period_days` is the quantity-weighted
/// mean holding period of the consumed lots, and `is_long_term` is the
/// classification of that weighted average, frozen at sale time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealizedGainRecord {
    pub id: u64,
    pub asset_id: String,
    pub symbol: String,
    pub sale_date: NaiveDate,
    pub sale_price: Decimal,
    pub quantity: Decimal,
    pub cost_basis: Decimal,
    pub proceeds: Decimal,
    pub realized_gain: Decimal,
    pub realized_gain_percent: Decimal,
    /// Quantity-weighted mean days held across consumed lots.
    pub holding_period_days: Decimal,
    pub is_long_term: bool,
    /// Earliest purchase date among consumed lots (1099-B acquisition date).
    pub acquired_date: NaiveDate,
    /// The closed lots this sale consumed (split sub-lots included).
    pub lot_ids: Vec<u64>,
}

impl RealizedGainRecord {
    pub fn tax_year(&self) -> i32 {
        self.sale_date.year()
    }
}

/// Close the planned lots at the sale price and build the realized-gain
/// record from what was actually closed.
///
/// Mutates the ledger via `close_lots` as a side effect; a stale plan
/// fails before any lot is touched.
pub fn record_sale(
    ledger: &TaxLotLedger,
    plan: &ConsumptionPlan,
    record_id: u64,
    symbol: &str,
    sale_price: Decimal,
    sale_date: NaiveDate,
    long_term_threshold_days: i64,
) -> Result<RealizedGainRecord, LedgerError> {
    if sale_price <= Decimal::ZERO {
        return Err(LedgerError::InvalidInput(format!(
            "sale price must be > 0, got {sale_price}"
        )));
    }

    let closed = ledger.close_lots(plan, sale_date, sale_price)?;

    let quantity: Decimal = closed.iter().map(|l| l.quantity).sum();
    let cost_basis: Decimal = closed.iter().map(|l| l.quantity * l.purchase_price).sum();
    let proceeds = sale_price * quantity;
    let realized_gain = proceeds - cost_basis;
    let realized_gain_percent = if cost_basis > Decimal::ZERO {
        realized_gain / cost_basis * Decimal::from(100)
    } else {
        Decimal::ZERO
    };

    let weighted_days: Decimal = closed
        .iter()
        .map(|l| l.quantity * Decimal::from((sale_date - l.purchase_date).num_days()))
        .sum();
    let holding_period_days = if quantity > Decimal::ZERO {
        weighted_days / quantity
    } else {
        Decimal::ZERO
    };
    let is_long_term = holding_period_days > Decimal::from(long_term_threshold_days);

    let acquired_date = closed
        .iter()
        .map(|l| l.purchase_date)
        .min()
        .unwrap_or(sale_date);

    Ok(RealizedGainRecord {
        id: record_id,
        asset_id: plan.asset_id.clone(),
        symbol: symbol.to_string(),
        sale_date,
        sale_price,
        quantity,
        cost_basis,
        proceeds,
        realized_gain,
        realized_gain_percent,
        holding_period_days,
        is_long_term,
        acquired_date,
        lot_ids: closed.iter().map(|l| l.id).collect(),
    })
}
