//! Lotbook - cost-basis accounting and portfolio performance engine
//!
//! This library tracks purchases as discrete tax lots, matches sales to
//! lots under FIFO, LIFO or specific identification, and derives tax
//! reports, 1099-B listings, harvesting suggestions and risk-adjusted
//! performance metrics from the resulting ledger.

pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod pricing;
pub mod reports;
pub mod stats;
pub mod tax;

pub use config::EngineConfig;
pub use engine::PortfolioEngine;
pub use error::{LedgerError, Result};
pub use ledger::selector::CostBasisMethod;
pub use ledger::{TaxLot, TaxLotLedger};
pub use reports::performance::Period;
