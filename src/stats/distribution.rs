//! Distribution Summary Module
//! Descriptive statistics and histogram bucketing for the three RFM metrics,
//! computed per metric in parallel.

use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

use super::aggregate::AggregateError;
use crate::data::schema::{self, COL_FREQUENCY, COL_MONETARY, COL_RECENCY};

/// Bucket count used by the dashboard's distribution charts.
pub const DEFAULT_HISTOGRAM_BINS: usize = 50;

/// The three numeric RFM dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RfmMetric {
    Recency,
    Frequency,
    Monetary,
}

impl RfmMetric {
    pub const ALL: [Self; 3] = [Self::Recency, Self::Frequency, Self::Monetary];

    pub fn column(self) -> &'static str {
        match self {
            Self::Recency => COL_RECENCY,
            Self::Frequency => COL_FREQUENCY,
            Self::Monetary => COL_MONETARY,
        }
    }

    /// Axis label used by the rendering layer.
    pub fn label(self) -> &'static str {
        match self {
            Self::Recency => "Days Since Last Purchase",
            Self::Frequency => "Number of Purchases",
            Self::Monetary => "Total Spend",
        }
    }
}

/// Descriptive statistics for one metric over one table slice.
#[derive(Debug, Clone, Serialize)]
pub struct DistributionSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub p05: f64,
    pub p95: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Summary plus histogram for one metric.
#[derive(Debug, Clone, Serialize)]
pub struct MetricDistribution {
    pub metric: RfmMetric,
    pub summary: DistributionSummary,
    pub histogram: Vec<HistogramBin>,
}

/// Extract a metric column as finite f64 values (nulls and NaNs dropped).
pub fn metric_values(df: &DataFrame, metric: RfmMetric) -> Result<Vec<f64>, AggregateError> {
    let name = metric.column();
    if !schema::has_column(df, name) {
        return Err(AggregateError::MissingColumn(name));
    }
    let values = df.column(name)?.cast(&DataType::Float64)?;
    Ok(values
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .collect())
}

/// Compute descriptive statistics for an array of values.
pub fn distribution_summary(values: &[f64]) -> DistributionSummary {
    let n = values.len();
    if n == 0 {
        return DistributionSummary {
            count: 0,
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            p05: f64::NAN,
            p95: f64::NAN,
        };
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mean = values.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };

    let variance = if n > 1 {
        values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
    } else {
        0.0
    };

    DistributionSummary {
        count: n,
        mean,
        median,
        std: variance.sqrt(),
        p05: percentile(&sorted, 5.0),
        p95: percentile(&sorted, 95.0),
    }
}

/// Calculate percentile using linear interpolation (NumPy compatible).
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    let n = sorted_values.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted_values[0];
    }

    let rank = (p / 100.0) * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = (rank.ceil() as usize).min(n - 1);
    let frac = rank - lower as f64;

    if lower == upper {
        sorted_values[lower]
    } else {
        sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
    }
}

/// Bucket values into `bins` equal-width histogram bins spanning min..max.
/// The maximum value lands in the last bin; a constant column collapses to a
/// single bin.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in values {
        if v < lo {
            lo = v;
        }
        if v > hi {
            hi = v;
        }
    }

    if lo == hi {
        return vec![HistogramBin {
            lower: lo,
            upper: hi,
            count: values.len(),
        }];
    }

    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &v in values {
        let mut idx = ((v - lo) / width) as usize;
        if idx >= bins {
            idx = bins - 1;
        }
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: lo + i as f64 * width,
            upper: lo + (i + 1) as f64 * width,
            count,
        })
        .collect()
}

/// Summary and histogram for all three RFM metrics, computed in parallel.
/// Requires all three columns; callers degrade the section otherwise.
pub fn rfm_distributions(
    df: &DataFrame,
    bins: usize,
) -> Result<Vec<MetricDistribution>, AggregateError> {
    RfmMetric::ALL
        .par_iter()
        .map(|&metric| {
            let values = metric_values(df, metric)?;
            Ok(MetricDistribution {
                metric,
                summary: distribution_summary(&values),
                histogram: histogram(&values, bins),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_of_known_values() {
        let values = [10.0, 5.0, 20.0, 15.0];
        let summary = distribution_summary(&values);
        assert_eq!(summary.count, 4);
        assert!((summary.mean - 12.5).abs() < 1e-9);
        assert!((summary.median - 12.5).abs() < 1e-9);
        assert!(summary.std > 0.0);
        assert!(summary.p05 >= 5.0 && summary.p05 <= 10.0);
        assert!(summary.p95 >= 15.0 && summary.p95 <= 20.0);
    }

    #[test]
    fn summary_of_empty_slice_is_nan_not_a_crash() {
        let summary = distribution_summary(&[]);
        assert_eq!(summary.count, 0);
        assert!(summary.mean.is_nan());
        assert!(summary.median.is_nan());
    }

    #[test]
    fn histogram_counts_cover_every_value() {
        let values: Vec<f64> = (0..100).map(f64::from).collect();
        let bins = histogram(&values, 10);
        assert_eq!(bins.len(), 10);
        let total: usize = bins.iter().map(|b| b.count).sum();
        assert_eq!(total, values.len());
        // The maximum lands in the last bin.
        assert!(bins.last().unwrap().count > 0);
    }

    #[test]
    fn constant_values_collapse_to_one_bin() {
        let bins = histogram(&[7.0, 7.0, 7.0], 50);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].count, 3);
    }

    #[test]
    fn distributions_require_all_three_columns() {
        let df = df!(
            COL_RECENCY => &[10i64, 5],
            COL_FREQUENCY => &[2i64, 1],
        )
        .unwrap();
        assert!(matches!(
            rfm_distributions(&df, DEFAULT_HISTOGRAM_BINS),
            Err(AggregateError::MissingColumn(COL_MONETARY))
        ));
    }

    #[test]
    fn distributions_cover_each_metric_once() {
        let df = df!(
            COL_RECENCY => &[10i64, 5, 20],
            COL_FREQUENCY => &[2i64, 1, 5],
            COL_MONETARY => &[100.0f64, 50.0, 300.0],
        )
        .unwrap();

        let dists = rfm_distributions(&df, DEFAULT_HISTOGRAM_BINS).unwrap();
        assert_eq!(dists.len(), 3);
        for dist in &dists {
            assert_eq!(dist.summary.count, 3);
            let total: usize = dist.histogram.iter().map(|b| b.count).sum();
            assert_eq!(total, 3);
        }
    }
}
