//! Tax lot ledger - per-asset bookkeeping of purchase lots
//!
//! The ledger is the sole source of truth for holdings. A lot is created
//! by a purchase, stays open until a sale consumes it, and is frozen once
//! closed. Partial consumption splits the lot: the open lot shrinks and a
//! new closed lot carries the consumed quantity with the sale fields.
//!
//! Lot selection is a pure planning step (see [`selector`]); the ledger
//! applies a plan in a single validated mutation via [`TaxLotLedger::close_lots`],
//! so concurrent readers never observe a half-applied sale.

pub mod selector;

use chrono::NaiveDate;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::error::LedgerError;
use selector::ConsumptionPlan;

/// Holding periods strictly greater than this many days are long-term.
pub const LONG_TERM_THRESHOLD_DAYS: i64 = 365;

/// A discrete purchase of a quantity of an asset at a specific price and
/// date, tracked independently for cost-basis purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxLot {
    pub id: u64,
    pub asset_id: String,
    /// Remaining quantity for open lots; consumed quantity for closed lots.
    pub quantity: Decimal,
    pub purchase_price: Decimal,
    pub purchase_date: NaiveDate,
    pub sale_date: Option<NaiveDate>,
    pub sale_price: Option<Decimal>,
    pub realized_gain: Option<Decimal>,
    pub realized_gain_percent: Option<Decimal>,
}

impl TaxLot {
    /// A lot is open iff it has no sale date.
    pub fn is_open(&self) -> bool {
        self.sale_date.is_none()
    }

    /// Total cost of the lot at its purchase price.
    pub fn cost_basis(&self) -> Decimal {
        self.quantity * self.purchase_price
    }

    /// Days held: to the sale date for closed lots, to `as_of` for open lots.
    pub fn holding_period_days(&self, as_of: NaiveDate) -> i64 {
        let end = self.sale_date.unwrap_or(as_of);
        (end - self.purchase_date).num_days()
    }

    /// Long-term classification at the given threshold (strictly greater).
    pub fn is_long_term(&self, as_of: NaiveDate, threshold_days: i64) -> bool {
        self.holding_period_days(as_of) > threshold_days
    }
}

/// All lots for a single asset plus running conservation totals.
#[derive(Debug, Default)]
struct AssetBook {
    lots: Vec<TaxLot>,
    /// Total quantity ever purchased for this asset.
    purchased: Decimal,
    /// Total quantity consumed by sales.
    consumed: Decimal,
}

impl AssetBook {
    fn open_lots(&self) -> Vec<TaxLot> {
        self.lots.iter().filter(|l| l.is_open()).cloned().collect()
    }

    fn open_quantity(&self) -> Decimal {
        self.lots
            .iter()
            .filter(|l| l.is_open())
            .map(|l| l.quantity)
            .sum()
    }
}

/// Owns the collection of tax lots per asset.
///
/// Books live behind per-asset map entries, so mutations on different
/// assets do not contend. Each method applies its mutation while holding
/// the asset's entry, making individual operations atomic; the engine
/// layers a per-asset sale lock on top for the select-then-close unit.
#[derive(Debug, Default)]
pub struct TaxLotLedger {
    books: DashMap<String, AssetBook>,
    next_lot_id: AtomicU64,
}

impl TaxLotLedger {
    pub fn new() -> Self {
        Self {
            books: DashMap::new(),
            next_lot_id: AtomicU64::new(1),
        }
    }

    fn allocate_lot_id(&self) -> u64 {
        self.next_lot_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Record a purchase as a new open lot.
    ///
    /// Rejects non-positive quantity/price and purchase dates after `today`.
    pub fn add_lot(
        &self,
        asset_id: &str,
        quantity: Decimal,
        purchase_price: Decimal,
        purchase_date: NaiveDate,
        today: NaiveDate,
    ) -> Result<TaxLot, LedgerError> {
        if quantity <= Decimal::ZERO {
            return Err(LedgerError::InvalidInput(format!(
                "purchase quantity must be > 0, got {quantity}"
            )));
        }
        if purchase_price <= Decimal::ZERO {
            return Err(LedgerError::InvalidInput(format!(
                "purchase price must be > 0, got {purchase_price}"
            )));
        }
        if purchase_date > today {
            return Err(LedgerError::InvalidInput(format!(
                "purchase date {purchase_date} is in the future"
            )));
        }

        let lot = TaxLot {
            id: self.allocate_lot_id(),
            asset_id: asset_id.to_string(),
            quantity,
            purchase_price,
            purchase_date,
            sale_date: None,
            sale_price: None,
            realized_gain: None,
            realized_gain_percent: None,
        };

        let mut book = self.books.entry(asset_id.to_string()).or_default();
        book.purchased += quantity;
        book.lots.push(lot.clone());
        debug!(
            asset_id,
            lot_id = lot.id,
            %quantity,
            %purchase_price,
            "added tax lot"
        );
        Ok(lot)
    }

    /// Open lots for an asset in insertion order.
    pub fn open_lots(&self, asset_id: &str) -> Result<Vec<TaxLot>, LedgerError> {
        let book = self
            .books
            .get(asset_id)
            .ok_or_else(|| LedgerError::AssetNotFound(asset_id.to_string()))?;
        Ok(book.open_lots())
    }

    /// Total open quantity for an asset (0 if unknown).
    pub fn open_quantity(&self, asset_id: &str) -> Decimal {
        self.books
            .get(asset_id)
            .map(|b| b.open_quantity())
            .unwrap_or(Decimal::ZERO)
    }

    /// Total quantity ever purchased for an asset (0 if unknown).
    pub fn purchased_quantity(&self, asset_id: &str) -> Decimal {
        self.books
            .get(asset_id)
            .map(|b| b.purchased)
            .unwrap_or(Decimal::ZERO)
    }

    /// Total quantity consumed by sales for an asset (0 if unknown).
    pub fn consumed_quantity(&self, asset_id: &str) -> Decimal {
        self.books
            .get(asset_id)
            .map(|b| b.consumed)
            .unwrap_or(Decimal::ZERO)
    }

    /// Asset ids that currently have at least one open lot.
    pub fn assets_with_open_lots(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .books
            .iter()
            .filter(|entry| entry.value().lots.iter().any(|l| l.is_open()))
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Consistent per-asset snapshot of open lots, for read-only reports.
    pub fn open_snapshot(&self) -> Vec<(String, Vec<TaxLot>)> {
        let mut snapshot: Vec<(String, Vec<TaxLot>)> = self
            .books
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().open_lots()))
            .filter(|(_, lots)| !lots.is_empty())
            .collect();
        snapshot.sort_by(|a, b| a.0.cmp(&b.0));
        snapshot
    }

    /// Every lot ever created, open and closed, for external persistence.
    pub fn all_lots(&self) -> Vec<TaxLot> {
        let mut lots: Vec<TaxLot> = self
            .books
            .iter()
            .flat_map(|entry| entry.value().lots.clone())
            .collect();
        lots.sort_by_key(|l| l.id);
        lots
    }

    /// Apply a consumption plan: close planned lots at the sale price,
    /// splitting lots that are only partially consumed.
    ///
    /// The whole plan is validated against current lot state before any
    /// mutation. A referenced lot that is missing, already closed, or
    /// holds less than the planned quantity means the plan went stale
    /// (a racing sale got there first) and the call fails with
    /// [`LedgerError::LotNotFound`], leaving the book untouched.
    ///
    /// Returns the closed lots (split sub-lots included) with sale fields
    /// and per-lot realized gain frozen.
    pub fn close_lots(
        &self,
        plan: &ConsumptionPlan,
        sale_date: NaiveDate,
        sale_price: Decimal,
    ) -> Result<Vec<TaxLot>, LedgerError> {
        let mut book = self
            .books
            .get_mut(&plan.asset_id)
            .ok_or_else(|| LedgerError::AssetNotFound(plan.asset_id.clone()))?;

        // Validation pass: no mutation until the whole plan checks out.
        // Planned quantity is aggregated per lot id, so a plan naming the
        // same lot twice cannot sneak past a per-entry check.
        let mut planned: HashMap<u64, Decimal> = HashMap::new();
        for consumption in &plan.consumptions {
            if consumption.quantity <= Decimal::ZERO {
                return Err(LedgerError::LotNotFound(consumption.lot_id));
            }
            *planned.entry(consumption.lot_id).or_default() += consumption.quantity;
        }
        for (lot_id, quantity) in &planned {
            let lot = book
                .lots
                .iter()
                .find(|l| l.id == *lot_id && l.is_open())
                .ok_or(LedgerError::LotNotFound(*lot_id))?;
            if *quantity > lot.quantity {
                return Err(LedgerError::LotNotFound(*lot_id));
            }
        }

        let mut closed = Vec::with_capacity(plan.consumptions.len());
        for consumption in &plan.consumptions {
            let idx = book
                .lots
                .iter()
                .position(|l| l.id == consumption.lot_id && l.is_open())
                .expect("validated above");

            let consumed_qty = consumption.quantity;
            let purchase_price = book.lots[idx].purchase_price;
            let gain = (sale_price - purchase_price) * consumed_qty;
            let basis = purchase_price * consumed_qty;
            let gain_percent = if basis > Decimal::ZERO {
                gain / basis * Decimal::from(100)
            } else {
                Decimal::ZERO
            };

            if consumed_qty == book.lots[idx].quantity {
                // Full consumption: close the physical lot in place.
                let lot = &mut book.lots[idx];
                lot.sale_date = Some(sale_date);
                lot.sale_price = Some(sale_price);
                lot.realized_gain = Some(gain);
                lot.realized_gain_percent = Some(gain_percent);
                closed.push(lot.clone());
            } else {
                // Split: shrink the open lot, record the consumed part
                // as a new closed lot.
                book.lots[idx].quantity -= consumed_qty;
                let open_lot = book.lots[idx].clone();
                let sub_lot = TaxLot {
                    id: self.allocate_lot_id(),
                    asset_id: open_lot.asset_id.clone(),
                    quantity: consumed_qty,
                    purchase_price,
                    purchase_date: open_lot.purchase_date,
                    sale_date: Some(sale_date),
                    sale_price: Some(sale_price),
                    realized_gain: Some(gain),
                    realized_gain_percent: Some(gain_percent),
                };
                book.lots.push(sub_lot.clone());
                closed.push(sub_lot);
            }

            book.consumed += consumed_qty;
        }

        debug!(
            asset_id = %plan.asset_id,
            lots_closed = closed.len(),
            %sale_price,
            "closed lots"
        );
        Ok(closed)
    }
}
