//! Error handling for the lot ledger engine
//!
//! Defines the typed failure taxonomy for bookkeeping operations and
//! establishes a unified Result type using anyhow for context chaining.
//! Collaborator failures (price/dividend lookups) are not errors at this
//! level; they degrade the dependent metric to an omitted value.

use rust_decimal::Decimal;
use thiserror::Error;

/// Typed failures surfaced by ledger and engine operations.
///
/// All variants propagate to the caller; none are swallowed. Callers
/// holding an `anyhow::Error` can `downcast_ref::<LedgerError>()` to
/// branch on the variant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// Sale quantity exceeds the open quantity for the asset.
    #[error("insufficient open lots: requested {requested}, available {available} (short {shortfall})")]
    InsufficientLots {
        requested: Decimal,
        available: Decimal,
        shortfall: Decimal,
    },

    /// A specific-identification sale referenced a missing or already
    /// closed lot, or a consumption plan went stale before it was applied.
    #[error("lot {0} not found or already closed")]
    LotNotFound(u64),

    #[error("unknown asset: {0}")]
    AssetNotFound(String),

    /// Non-positive quantity/price, future-dated purchase, and similar.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for engine operations
pub type Result<T> = anyhow::Result<T>;
