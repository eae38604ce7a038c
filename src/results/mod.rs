//! Result aggregation
//!
//! Folds the terminal state of every unit into batch totals and derives the
//! values the reporting side consumes.

mod aggregator;
mod report;
mod summary;

pub use aggregator::{AggregateResult, ResultAggregator};
pub use report::{BatchReport, UnitReport};
pub use summary::ReportSummary;
