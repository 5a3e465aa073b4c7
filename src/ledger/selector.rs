//! Cost-basis lot selection
//!
//! Pure planning: given the open lots of an asset and a sale quantity,
//! decide which lots the sale consumes and how much of each. Nothing
//! here mutates the ledger; the resulting [`ConsumptionPlan`] is applied
//! in one step by [`TaxLotLedger::close_lots`](super::TaxLotLedger::close_lots).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashSet;
use std::str::FromStr;

use crate::error::LedgerError;
use crate::ledger::TaxLot;

/// Lot consumption order on sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CostBasisMethod {
    /// First-in-first-out: oldest purchase consumed first.
    Fifo,
    /// Last-in-first-out: newest purchase consumed first.
    Lifo,
    /// Caller explicitly names which lots the sale consumes, in order.
    SpecificId,
}

impl CostBasisMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostBasisMethod::Fifo => "FIFO",
            CostBasisMethod::Lifo => "LIFO",
            CostBasisMethod::SpecificId => "SPECIFIC_ID",
        }
    }
}

impl FromStr for CostBasisMethod {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FIFO" => Ok(CostBasisMethod::Fifo),
            "LIFO" => Ok(CostBasisMethod::Lifo),
            "SPECIFIC_ID" | "SPECIFIC" => Ok(CostBasisMethod::SpecificId),
            other => Err(LedgerError::InvalidInput(format!(
                "unknown cost-basis method: {other}"
            ))),
        }
    }
}

/// One lot's share of a planned sale. Quantity may be less than the
/// lot's open quantity (a split view); the ledger performs the physical
/// split when the plan is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotConsumption {
    pub lot_id: u64,
    pub quantity: Decimal,
    pub purchase_price: Decimal,
    pub purchase_date: NaiveDate,
}

/// Proposed consumption for a single sale, in consumption order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumptionPlan {
    pub asset_id: String,
    pub consumptions: Vec<LotConsumption>,
    pub total_quantity: Decimal,
}

impl ConsumptionPlan {
    /// Total cost basis of the planned consumption.
    pub fn cost_basis(&self) -> Decimal {
        self.consumptions
            .iter()
            .map(|c| c.purchase_price * c.quantity)
            .sum()
    }

    /// Earliest purchase date among consumed lots.
    pub fn earliest_purchase_date(&self) -> Option<NaiveDate> {
        self.consumptions.iter().map(|c| c.purchase_date).min()
    }
}

/// Select which open lots satisfy a sale of `quantity`.
///
/// FIFO and LIFO order by purchase date (ascending/descending) with lot
/// id as the tie-break, so equal-date purchases consume in creation
/// order regardless of how the caller collected the lots. Specific-ID
/// consumes in the caller-given id order.
///
/// Fails fast with [`LedgerError::InsufficientLots`] when the open
/// quantity cannot cover the sale, and [`LedgerError::LotNotFound`] when
/// a specific id does not name an open lot.
pub fn select_lots(
    asset_id: &str,
    open_lots: &[TaxLot],
    quantity: Decimal,
    method: CostBasisMethod,
    specific_lot_ids: Option<&[u64]>,
) -> Result<ConsumptionPlan, LedgerError> {
    if quantity <= Decimal::ZERO {
        return Err(LedgerError::InvalidInput(format!(
            "sale quantity must be > 0, got {quantity}"
        )));
    }

    let ordered: Vec<&TaxLot> = match method {
        CostBasisMethod::Fifo => {
            let mut lots: Vec<&TaxLot> = open_lots.iter().collect();
            lots.sort_by_key(|l| (l.purchase_date, l.id));
            lots
        }
        CostBasisMethod::Lifo => {
            let mut lots: Vec<&TaxLot> = open_lots.iter().collect();
            lots.sort_by_key(|l| (Reverse(l.purchase_date), l.id));
            lots
        }
        CostBasisMethod::SpecificId => {
            let ids = specific_lot_ids.ok_or_else(|| {
                LedgerError::InvalidInput(
                    "specific-identification sale requires lot ids".to_string(),
                )
            })?;
            if ids.is_empty() {
                return Err(LedgerError::InvalidInput(
                    "specific-identification sale requires lot ids".to_string(),
                ));
            }
            let mut seen = HashSet::with_capacity(ids.len());
            let mut lots = Vec::with_capacity(ids.len());
            for id in ids {
                if !seen.insert(*id) {
                    return Err(LedgerError::InvalidInput(format!(
                        "duplicate lot id {id} in specific-identification sale"
                    )));
                }
                let lot = open_lots
                    .iter()
                    .find(|l| l.id == *id)
                    .ok_or(LedgerError::LotNotFound(*id))?;
                lots.push(lot);
            }
            lots
        }
    };

    let available: Decimal = ordered.iter().map(|l| l.quantity).sum();
    if available < quantity {
        return Err(LedgerError::InsufficientLots {
            requested: quantity,
            available,
            shortfall: quantity - available,
        });
    }

    let mut remaining = quantity;
    let mut consumptions = Vec::new();
    for lot in ordered {
        if remaining <= Decimal::ZERO {
            break;
        }
        let consumed = remaining.min(lot.quantity);
        consumptions.push(LotConsumption {
            lot_id: lot.id,
            quantity: consumed,
            purchase_price: lot.purchase_price,
            purchase_date: lot.purchase_date,
        });
        remaining -= consumed;
    }

    Ok(ConsumptionPlan {
        asset_id: asset_id.to_string(),
        consumptions,
        total_quantity: quantity,
    })
}
