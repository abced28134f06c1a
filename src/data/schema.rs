//! Column Schema Module
//! Names of the columns consumed from the two CSV exports, plus the
//! capability set resolved once at load time.

use polars::prelude::DataFrame;
use serde::Serialize;

pub const COL_CUSTOMER_ID: &str = "CustomerID";
pub const COL_RECENCY: &str = "Recency";
pub const COL_FREQUENCY: &str = "Frequency";
pub const COL_MONETARY: &str = "Monetary";
pub const COL_SEGMENT: &str = "Customer_Segment";
pub const COL_INVOICE_DATE: &str = "InvoiceDate";

/// Group label used for rows whose segment value is missing.
pub const UNSEGMENTED_LABEL: &str = "Unsegmented";

/// First-column names that mean the RFM export serialized its row index
/// without a real name.
pub const INDEX_SENTINELS: [&str; 2] = ["Unnamed: 0", "index"];

/// Check whether a DataFrame carries a column with the given name.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Which analytic columns the loaded RFM table actually carries.
///
/// Resolved once by the loader; aggregate callers branch on this instead of
/// re-probing the DataFrame on every call. A missing column is a legitimate
/// state (the export may predate segmentation), not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RfmColumns {
    pub recency: bool,
    pub frequency: bool,
    pub monetary: bool,
    pub segment: bool,
}

impl RfmColumns {
    pub fn resolve(df: &DataFrame) -> Self {
        Self {
            recency: has_column(df, COL_RECENCY),
            frequency: has_column(df, COL_FREQUENCY),
            monetary: has_column(df, COL_MONETARY),
            segment: has_column(df, COL_SEGMENT),
        }
    }

    /// All three numeric RFM columns present.
    pub fn has_rfm(&self) -> bool {
        self.recency && self.frequency && self.monetary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn resolve_reports_missing_columns() {
        let df = df!(
            COL_CUSTOMER_ID => &[1i64, 2],
            COL_RECENCY => &[10i64, 5],
            COL_MONETARY => &[100.0f64, 50.0],
        )
        .unwrap();

        let caps = RfmColumns::resolve(&df);
        assert!(caps.recency);
        assert!(!caps.frequency);
        assert!(caps.monetary);
        assert!(!caps.segment);
        assert!(!caps.has_rfm());
    }
}
