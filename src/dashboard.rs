//! Dashboard View Module
//! Assembles every aggregate the dashboard renders into one serializable
//! snapshot. Sections whose columns are missing degrade to `None` with a
//! recorded warning instead of failing the whole build.

use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::data::schema::{COL_CUSTOMER_ID, COL_INVOICE_DATE, COL_MONETARY, COL_SEGMENT};
use crate::data::LoadedTables;
use crate::stats::{self, AggregateError, FilterSelection, MetricDistribution, SegmentCount,
    SegmentRevenue, SegmentRfmMeans, SegmentSummaryRow, SummaryMetrics, DEFAULT_HISTOGRAM_BINS};

/// Top-customer list length used by the dashboard.
pub const DEFAULT_TOP_N: usize = 10;

/// Rows shown in the raw data sample.
const SAMPLE_ROWS: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct TopCustomer {
    pub customer_id: String,
    pub monetary: f64,
}

/// Row count and invoice date span of the transaction table.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionSpan {
    pub rows: usize,
    pub first_invoice: String,
    pub last_invoice: String,
}

/// First rows of the filtered table, rendered to plain strings for display.
#[derive(Debug, Clone, Serialize)]
pub struct RawSample {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Everything the rendering layer needs for one dashboard pass.
///
/// Section-to-slice mapping follows the dashboard: key metrics, distributions
/// and the raw sample read the FILTERED table; the segment breakdowns, top
/// customers and the summary table always read the full table.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub selection: String,
    pub metrics: SummaryMetrics,
    pub segment_counts: Option<Vec<SegmentCount>>,
    pub segment_rfm_means: Option<Vec<SegmentRfmMeans>>,
    pub segment_revenue: Option<Vec<SegmentRevenue>>,
    pub top_customers: Option<Vec<TopCustomer>>,
    pub distributions: Option<Vec<MetricDistribution>>,
    pub segment_summary: Option<Vec<SegmentSummaryRow>>,
    pub transactions: TransactionSpan,
    pub sample: RawSample,
    pub warnings: Vec<String>,
}

impl DashboardView {
    pub fn build(
        tables: &LoadedTables,
        selection: &FilterSelection,
        top_n: usize,
    ) -> Result<Self, AggregateError> {
        let caps = &tables.columns;
        let mut warnings = Vec::new();

        if !caps.segment {
            warnings.push(format!(
                "{COL_SEGMENT} column not found; showing all data without segment breakdowns"
            ));
        }
        if !caps.has_rfm() {
            warnings.push(
                "one or more RFM columns missing; dependent sections unavailable".to_string(),
            );
        }

        let filtered = stats::filter_by_segment(&tables.rfm, selection)?;
        debug!(
            selection = selection.label(),
            rows = filtered.height(),
            "building dashboard view"
        );

        let metrics = stats::summary_metrics(&filtered, caps)?;

        let segment_counts = if caps.segment {
            Some(stats::segment_counts(&tables.rfm)?)
        } else {
            None
        };
        let segment_rfm_means = if caps.segment && caps.has_rfm() {
            Some(stats::segment_rfm_means(&tables.rfm)?)
        } else {
            None
        };
        let segment_revenue = if caps.segment && caps.monetary {
            Some(stats::segment_revenue(&tables.rfm)?)
        } else {
            None
        };
        let segment_summary = if caps.segment && caps.has_rfm() {
            Some(stats::segment_summary_table(&tables.rfm)?)
        } else {
            None
        };
        let top_customers = if caps.monetary {
            Some(top_customers(&tables.rfm, top_n)?)
        } else {
            None
        };
        let distributions = if caps.has_rfm() {
            Some(stats::rfm_distributions(&filtered, DEFAULT_HISTOGRAM_BINS)?)
        } else {
            None
        };

        Ok(Self {
            selection: selection.label().to_string(),
            metrics,
            segment_counts,
            segment_rfm_means,
            segment_revenue,
            top_customers,
            distributions,
            segment_summary,
            transactions: transaction_span(&tables.transactions)?,
            sample: raw_sample(&filtered, SAMPLE_ROWS)?,
            warnings,
        })
    }
}

fn top_customers(df: &DataFrame, n: usize) -> Result<Vec<TopCustomer>, AggregateError> {
    let top = stats::top_n_by_monetary(df, n)?;
    let ids = top.column(COL_CUSTOMER_ID)?;
    let monetary = top.column(COL_MONETARY)?.cast(&DataType::Float64)?;
    let monetary = monetary.f64()?;

    let mut rows = Vec::with_capacity(top.height());
    for i in 0..top.height() {
        let id = ids.get(i)?.to_string().trim_matches('"').to_string();
        rows.push(TopCustomer {
            customer_id: id,
            monetary: monetary.get(i).unwrap_or(f64::NAN),
        });
    }
    Ok(rows)
}

fn transaction_span(df: &DataFrame) -> Result<TransactionSpan, AggregateError> {
    let out = df
        .clone()
        .lazy()
        .select([
            col(COL_INVOICE_DATE).min().alias("first"),
            col(COL_INVOICE_DATE).max().alias("last"),
        ])
        .collect()?;

    let render = |name: &str| -> Result<String, AggregateError> {
        let value = out.column(name)?.get(0)?;
        Ok(value.to_string().trim_matches('"').to_string())
    };

    Ok(TransactionSpan {
        rows: df.height(),
        first_invoice: render("first")?,
        last_invoice: render("last")?,
    })
}

fn raw_sample(df: &DataFrame, limit: usize) -> Result<RawSample, AggregateError> {
    let head = df.head(Some(limit));
    let columns: Vec<String> = head
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut rows = Vec::with_capacity(head.height());
    for i in 0..head.height() {
        let mut row = Vec::with_capacity(columns.len());
        for column in head.get_columns() {
            let value = column.get(i)?;
            row.push(value.to_string().trim_matches('"').to_string());
        }
        rows.push(row);
    }

    Ok(RawSample { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::{COL_FREQUENCY, COL_RECENCY};
    use crate::data::RfmColumns;

    fn tables(rfm: DataFrame) -> LoadedTables {
        let transactions = df!(
            COL_INVOICE_DATE => &["2010-12-01 08:26:00", "2011-12-09 12:50:00"],
        )
        .unwrap();
        let columns = RfmColumns::resolve(&rfm);
        LoadedTables {
            rfm,
            transactions,
            columns,
        }
    }

    fn sample_tables() -> LoadedTables {
        tables(
            df!(
                COL_CUSTOMER_ID => &[1i64, 2, 3],
                COL_RECENCY => &[10i64, 5, 20],
                COL_FREQUENCY => &[2i64, 1, 5],
                COL_MONETARY => &[100.0f64, 50.0, 300.0],
                COL_SEGMENT => &["A", "B", "A"],
            )
            .unwrap(),
        )
    }

    #[test]
    fn full_view_has_every_section() {
        let tables = sample_tables();
        let view = DashboardView::build(&tables, &FilterSelection::All, 2).unwrap();

        assert_eq!(view.selection, "All");
        assert_eq!(view.metrics.customers, 3);
        assert!(view.warnings.is_empty());

        let counts = view.segment_counts.unwrap();
        assert_eq!(counts.len(), 2);
        assert!(view.segment_rfm_means.is_some());
        assert!(view.segment_revenue.is_some());
        assert!(view.segment_summary.is_some());
        assert_eq!(view.distributions.unwrap().len(), 3);

        let top = view.top_customers.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].customer_id, "3");

        assert_eq!(view.transactions.rows, 2);
        assert_eq!(view.sample.rows.len(), 3);
    }

    #[test]
    fn segment_sections_read_the_full_table() {
        let tables = sample_tables();
        let selection = FilterSelection::Segment("B".to_string());
        let view = DashboardView::build(&tables, &selection, 10).unwrap();

        // Metrics come from the filtered slice, breakdowns from the full table.
        assert_eq!(view.metrics.customers, 1);
        assert!((view.metrics.total_monetary.unwrap() - 50.0).abs() < 1e-9);
        let counts = view.segment_counts.unwrap();
        let total: usize = counts.iter().map(|c| c.count).sum();
        assert_eq!(total, 3);
        assert_eq!(view.top_customers.unwrap().len(), 3);
        assert_eq!(view.sample.rows.len(), 1);
    }

    #[test]
    fn missing_segment_column_degrades_sections() {
        let tables = tables(
            df!(
                COL_CUSTOMER_ID => &[1i64, 2],
                COL_RECENCY => &[10i64, 5],
                COL_FREQUENCY => &[2i64, 1],
                COL_MONETARY => &[100.0f64, 50.0],
            )
            .unwrap(),
        );
        let view = DashboardView::build(&tables, &FilterSelection::All, 10).unwrap();

        assert!(view.segment_counts.is_none());
        assert!(view.segment_rfm_means.is_none());
        assert!(view.segment_revenue.is_none());
        assert!(view.segment_summary.is_none());
        assert!(view.top_customers.is_some());
        assert!(view.distributions.is_some());
        assert!(!view.warnings.is_empty());
        assert_eq!(view.metrics.customers, 2);
    }

    #[test]
    fn view_serializes_to_json() {
        let tables = sample_tables();
        let view = DashboardView::build(&tables, &FilterSelection::All, 10).unwrap();
        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("\"selection\":\"All\""));
        assert!(json.contains("segment_counts"));
    }
}
