//! Segmetrics - RFM Customer Segmentation Analytics Core
//!
//! Loads two pre-computed CSV exports (an RFM customer table and a cleaned
//! transaction log), applies one categorical segment filter, and computes
//! the aggregate statistics behind a customer-segmentation dashboard. A
//! rendering layer consumes the derived [`DashboardView`] snapshot; chart
//! drawing itself is out of scope here.

pub mod dashboard;
pub mod data;
pub mod stats;

pub use dashboard::{DashboardView, RawSample, TopCustomer, TransactionSpan, DEFAULT_TOP_N};
pub use data::{load_tables, LoadError, LoadedTables, RfmColumns, TableCache};
pub use stats::{
    filter_by_segment, segment_labels, AggregateError, FilterSelection, SummaryMetrics,
    ALL_SEGMENTS,
};
