//! Tax-year reports
//!
//! Aggregates realized-gain records for a tax year into short/long-term
//! gain and loss buckets, a per-symbol rollup, and a 1099-B style
//! listing. Losses are carried as positive magnitudes; net figures
//! subtract them.

use chrono::NaiveDate;
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::tax::realized::RealizedGainRecord;

/// Per-symbol rollup inside a [`TaxReport`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetTaxSummary {
    pub realized_gains: Decimal,
    /// Positive magnitude of realized losses.
    pub realized_losses: Decimal,
    pub net_gains: Decimal,
}

/// Aggregate view of one tax year's realized activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxReport {
    pub year: i32,
    pub short_term_gains: Decimal,
    pub short_term_losses: Decimal,
    pub long_term_gains: Decimal,
    pub long_term_losses: Decimal,
    pub total_gains: Decimal,
    pub total_losses: Decimal,
    pub net_realized_gains: Decimal,
    /// Wash-sale adjustment. Not implemented upstream; always zero so
    /// consumers see an explicit zero rather than a missing concept.
    pub wash_sales: Decimal,
    pub by_asset: HashMap<String, AssetTaxSummary>,
    pub records: Vec<RealizedGainRecord>,
}

/// One row of the 1099-B style listing, one per realized-gain record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form1099BRow {
    /// "<quantity> <symbol>"
    pub description: String,
    /// Earliest purchase date among the consumed lots.
    pub date_acquired: NaiveDate,
    pub date_sold: NaiveDate,
    pub proceeds: Decimal,
    pub cost_basis: Decimal,
    pub gain_loss: Decimal,
    pub short_term: bool,
}

/// Build the tax report for `year` from the full record history.
pub fn generate_tax_report(records: &[RealizedGainRecord], year: i32) -> TaxReport {
    let mut report = TaxReport {
        year,
        short_term_gains: Decimal::ZERO,
        short_term_losses: Decimal::ZERO,
        long_term_gains: Decimal::ZERO,
        long_term_losses: Decimal::ZERO,
        total_gains: Decimal::ZERO,
        total_losses: Decimal::ZERO,
        net_realized_gains: Decimal::ZERO,
        wash_sales: Decimal::ZERO,
        by_asset: HashMap::new(),
        records: Vec::new(),
    };

    for record in records.iter().filter(|r| r.tax_year() == year) {
        let gain = record.realized_gain;
        if gain >= Decimal::ZERO {
            if record.is_long_term {
                report.long_term_gains += gain;
            } else {
                report.short_term_gains += gain;
            }
        } else if record.is_long_term {
            report.long_term_losses += gain.abs();
        } else {
            report.short_term_losses += gain.abs();
        }

        let summary = report.by_asset.entry(record.symbol.clone()).or_default();
        if gain >= Decimal::ZERO {
            summary.realized_gains += gain;
        } else {
            summary.realized_losses += gain.abs();
        }
        summary.net_gains = summary.realized_gains - summary.realized_losses;

        report.records.push(record.clone());
    }

    report.total_gains = report.short_term_gains + report.long_term_gains;
    report.total_losses = report.short_term_losses + report.long_term_losses;
    report.net_realized_gains = report.total_gains - report.total_losses;
    report
}

/// One row per record sold in `year`, sorted by sale date ascending
/// (record id as the tie-break).
pub fn generate_1099b(records: &[RealizedGainRecord], year: i32) -> Vec<Form1099BRow> {
    records
        .iter()
        .filter(|r| r.tax_year() == year)
        .sorted_by_key(|r| (r.sale_date, r.id))
        .map(|r| Form1099BRow {
            description: format!("{} {}", r.quantity.normalize(), r.symbol),
            date_acquired: r.acquired_date,
            date_sold: r.sale_date,
            proceeds: r.proceeds,
            cost_basis: r.cost_basis,
            gain_loss: r.realized_gain,
            short_term: !r.is_long_term,
        })
        .collect()
}
