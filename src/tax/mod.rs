// Tax module - realized gains, tax-year reports, loss harvesting

pub mod harvesting;
pub mod realized;
pub mod report;

pub use harvesting::{suggest_candidates, HarvestCandidate};
pub use realized::{record_sale, RealizedGainRecord};
pub use report::{generate_1099b, generate_tax_report, AssetTaxSummary, Form1099BRow, TaxReport};
