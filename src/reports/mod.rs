// Reports module - valuation, income and performance analytics

pub mod benchmark;
pub mod dividends;
pub mod performance;
pub mod unrealized;

pub use benchmark::{compare, BenchmarkComparison};
pub use dividends::{trailing_yield, DividendYield};
pub use performance::{analyze, PerformanceMetrics, Period};
pub use unrealized::{position_from_lots, UnrealizedPosition};
