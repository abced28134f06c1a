//! Segment Aggregation Module
//! Pure group-by style aggregates over the loaded RFM table. Nothing here
//! mutates its input; every function derives a fresh view.

use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::data::schema::{
    self, COL_FREQUENCY, COL_MONETARY, COL_RECENCY, COL_SEGMENT, UNSEGMENTED_LABEL,
};
use crate::data::RfmColumns;

/// Sentinel selection meaning "no segment filter".
pub const ALL_SEGMENTS: &str = "All";

const COL_COUNT: &str = "Count";
const COL_MEAN_RECENCY: &str = "MeanRecency";
const COL_MEAN_FREQUENCY: &str = "MeanFrequency";
const COL_MEAN_MONETARY: &str = "MeanMonetary";
const COL_TOTAL_MONETARY: &str = "TotalMonetary";

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("Unknown segment '{0}'")]
    UnknownSegment(String),
    #[error("Column '{0}' not present in RFM table")]
    MissingColumn(&'static str),
}

/// The segment filter supplied by the UI layer: either the `All` sentinel or
/// one of the labels present in the loaded table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSelection {
    All,
    Segment(String),
}

impl FilterSelection {
    /// Validate a raw selection against the labels present in the table.
    /// An unknown label is a caller contract violation, rejected here before
    /// it reaches any aggregate.
    pub fn parse(raw: &str, known_labels: &[String]) -> Result<Self, AggregateError> {
        if raw == ALL_SEGMENTS {
            return Ok(Self::All);
        }
        if known_labels.iter().any(|label| label == raw) {
            Ok(Self::Segment(raw.to_string()))
        } else {
            Err(AggregateError::UnknownSegment(raw.to_string()))
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::All => ALL_SEGMENTS,
            Self::Segment(label) => label,
        }
    }
}

/// Customer count and per-column aggregates for one slice of the table.
/// Each optional field is absent when its source column is, or (for the
/// means) when the slice has no rows.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryMetrics {
    pub customers: usize,
    pub mean_recency: Option<f64>,
    pub mean_frequency: Option<f64>,
    pub total_monetary: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentCount {
    pub segment: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentRfmMeans {
    pub segment: String,
    pub mean_recency: f64,
    pub mean_frequency: f64,
    pub mean_monetary: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentRevenue {
    pub segment: String,
    pub revenue: f64,
}

/// One row of the segment summary table: means, revenue and customer count
/// per segment, sorted descending by total revenue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSummaryRow {
    pub segment: String,
    pub mean_recency: f64,
    pub mean_frequency: f64,
    pub mean_monetary: f64,
    pub total_monetary: f64,
    pub customers: usize,
}

/// Segment key used for every grouping: stringified, with missing values
/// bucketed under [`UNSEGMENTED_LABEL`] rather than dropped.
fn segment_expr() -> Expr {
    col(COL_SEGMENT)
        .cast(DataType::String)
        .fill_null(lit(UNSEGMENTED_LABEL))
}

fn require_column(df: &DataFrame, name: &'static str) -> Result<(), AggregateError> {
    if schema::has_column(df, name) {
        Ok(())
    } else {
        Err(AggregateError::MissingColumn(name))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Distinct segment labels present in the table, sorted.
pub fn segment_labels(df: &DataFrame) -> Result<Vec<String>, AggregateError> {
    require_column(df, COL_SEGMENT)?;
    let out = df
        .clone()
        .lazy()
        .select([segment_expr().alias(COL_SEGMENT)])
        .collect()?;

    let mut labels: Vec<String> = out
        .column(COL_SEGMENT)?
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();
    labels.sort();
    labels.dedup();
    Ok(labels)
}

/// Identity on [`FilterSelection::All`]; otherwise the subsequence of rows
/// whose segment equals the selection, original order preserved.
pub fn filter_by_segment(
    df: &DataFrame,
    selection: &FilterSelection,
) -> Result<DataFrame, AggregateError> {
    match selection {
        FilterSelection::All => Ok(df.clone()),
        FilterSelection::Segment(label) => {
            require_column(df, COL_SEGMENT)?;
            let filtered = df
                .clone()
                .lazy()
                .filter(segment_expr().eq(lit(label.as_str())))
                .collect()?;
            Ok(filtered)
        }
    }
}

/// Headline metrics for a (possibly filtered) table slice.
pub fn summary_metrics(
    df: &DataFrame,
    caps: &RfmColumns,
) -> Result<SummaryMetrics, AggregateError> {
    let mean_of = |name: &str| -> Result<Option<f64>, AggregateError> {
        let values = df.column(name)?.cast(&DataType::Float64)?;
        Ok(values.f64()?.mean())
    };

    let total_monetary = if caps.monetary {
        let values = df.column(COL_MONETARY)?.cast(&DataType::Float64)?;
        Some(values.f64()?.sum().unwrap_or(0.0))
    } else {
        None
    };

    Ok(SummaryMetrics {
        customers: df.height(),
        mean_recency: if caps.recency { mean_of(COL_RECENCY)? } else { None },
        mean_frequency: if caps.frequency { mean_of(COL_FREQUENCY)? } else { None },
        total_monetary,
    })
}

/// Customer count per segment, descending by count; counts sum to the table
/// row count.
pub fn segment_counts(df: &DataFrame) -> Result<Vec<SegmentCount>, AggregateError> {
    require_column(df, COL_SEGMENT)?;
    let out = df
        .clone()
        .lazy()
        .group_by([segment_expr().alias(COL_SEGMENT)])
        .agg([len().alias(COL_COUNT)])
        .sort(
            [COL_COUNT, COL_SEGMENT],
            SortMultipleOptions::default().with_order_descending_multi([true, false]),
        )
        .collect()?;

    let segments = out.column(COL_SEGMENT)?.str()?;
    let counts = out.column(COL_COUNT)?.u32()?;

    let mut rows = Vec::with_capacity(out.height());
    for i in 0..out.height() {
        if let (Some(segment), Some(count)) = (segments.get(i), counts.get(i)) {
            rows.push(SegmentCount {
                segment: segment.to_string(),
                count: count as usize,
            });
        }
    }
    Ok(rows)
}

/// Mean R/F/M per segment, rounded to two decimals, sorted by label.
/// This is the heatmap input of the dashboard.
pub fn segment_rfm_means(df: &DataFrame) -> Result<Vec<SegmentRfmMeans>, AggregateError> {
    require_column(df, COL_SEGMENT)?;
    require_column(df, COL_RECENCY)?;
    require_column(df, COL_FREQUENCY)?;
    require_column(df, COL_MONETARY)?;

    let out = df
        .clone()
        .lazy()
        .group_by([segment_expr().alias(COL_SEGMENT)])
        .agg([
            col(COL_RECENCY).mean().alias(COL_MEAN_RECENCY),
            col(COL_FREQUENCY).mean().alias(COL_MEAN_FREQUENCY),
            col(COL_MONETARY).mean().alias(COL_MEAN_MONETARY),
        ])
        .sort([COL_SEGMENT], SortMultipleOptions::default())
        .collect()?;

    let segments = out.column(COL_SEGMENT)?.str()?;
    let recency = out.column(COL_MEAN_RECENCY)?.f64()?;
    let frequency = out.column(COL_MEAN_FREQUENCY)?.f64()?;
    let monetary = out.column(COL_MEAN_MONETARY)?.f64()?;

    let mut rows = Vec::with_capacity(out.height());
    for i in 0..out.height() {
        if let Some(segment) = segments.get(i) {
            rows.push(SegmentRfmMeans {
                segment: segment.to_string(),
                mean_recency: round2(recency.get(i).unwrap_or(f64::NAN)),
                mean_frequency: round2(frequency.get(i).unwrap_or(f64::NAN)),
                mean_monetary: round2(monetary.get(i).unwrap_or(f64::NAN)),
            });
        }
    }
    Ok(rows)
}

/// Total monetary per segment, descending by revenue.
pub fn segment_revenue(df: &DataFrame) -> Result<Vec<SegmentRevenue>, AggregateError> {
    require_column(df, COL_SEGMENT)?;
    require_column(df, COL_MONETARY)?;

    let out = df
        .clone()
        .lazy()
        .group_by([segment_expr().alias(COL_SEGMENT)])
        .agg([col(COL_MONETARY)
            .cast(DataType::Float64)
            .sum()
            .alias(COL_TOTAL_MONETARY)])
        .sort(
            [COL_TOTAL_MONETARY, COL_SEGMENT],
            SortMultipleOptions::default().with_order_descending_multi([true, false]),
        )
        .collect()?;

    let segments = out.column(COL_SEGMENT)?.str()?;
    let revenue = out.column(COL_TOTAL_MONETARY)?.f64()?;

    let mut rows = Vec::with_capacity(out.height());
    for i in 0..out.height() {
        if let Some(segment) = segments.get(i) {
            rows.push(SegmentRevenue {
                segment: segment.to_string(),
                revenue: revenue.get(i).unwrap_or(0.0),
            });
        }
    }
    Ok(rows)
}

/// The `n` rows with the largest monetary value, ties broken by original row
/// order, `n` capped at the table height.
pub fn top_n_by_monetary(df: &DataFrame, n: usize) -> Result<DataFrame, AggregateError> {
    require_column(df, COL_MONETARY)?;
    let sorted = df.sort(
        [COL_MONETARY],
        SortMultipleOptions::default()
            .with_order_descending(true)
            .with_maintain_order(true)
            .with_nulls_last(true),
    )?;
    Ok(sorted.head(Some(n)))
}

/// Per-segment summary rows (means, revenue, count), descending by revenue.
pub fn segment_summary_table(df: &DataFrame) -> Result<Vec<SegmentSummaryRow>, AggregateError> {
    require_column(df, COL_SEGMENT)?;
    require_column(df, COL_RECENCY)?;
    require_column(df, COL_FREQUENCY)?;
    require_column(df, COL_MONETARY)?;

    let out = df
        .clone()
        .lazy()
        .group_by([segment_expr().alias(COL_SEGMENT)])
        .agg([
            col(COL_RECENCY).mean().alias(COL_MEAN_RECENCY),
            col(COL_FREQUENCY).mean().alias(COL_MEAN_FREQUENCY),
            col(COL_MONETARY).mean().alias(COL_MEAN_MONETARY),
            col(COL_MONETARY)
                .cast(DataType::Float64)
                .sum()
                .alias(COL_TOTAL_MONETARY),
            len().alias(COL_COUNT),
        ])
        .sort(
            [COL_TOTAL_MONETARY, COL_SEGMENT],
            SortMultipleOptions::default().with_order_descending_multi([true, false]),
        )
        .collect()?;

    let segments = out.column(COL_SEGMENT)?.str()?;
    let recency = out.column(COL_MEAN_RECENCY)?.f64()?;
    let frequency = out.column(COL_MEAN_FREQUENCY)?.f64()?;
    let monetary = out.column(COL_MEAN_MONETARY)?.f64()?;
    let total = out.column(COL_TOTAL_MONETARY)?.f64()?;
    let counts = out.column(COL_COUNT)?.u32()?;

    let mut rows = Vec::with_capacity(out.height());
    for i in 0..out.height() {
        if let Some(segment) = segments.get(i) {
            rows.push(SegmentSummaryRow {
                segment: segment.to_string(),
                mean_recency: round2(recency.get(i).unwrap_or(f64::NAN)),
                mean_frequency: round2(frequency.get(i).unwrap_or(f64::NAN)),
                mean_monetary: round2(monetary.get(i).unwrap_or(f64::NAN)),
                total_monetary: round2(total.get(i).unwrap_or(0.0)),
                customers: counts.get(i).unwrap_or(0) as usize,
            });
        }
    }
    Ok(rows)
}
