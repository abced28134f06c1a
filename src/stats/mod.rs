//! Stats module - segment aggregation and distribution summaries

mod aggregate;
mod distribution;

pub use aggregate::{
    filter_by_segment, segment_counts, segment_labels, segment_revenue, segment_rfm_means,
    segment_summary_table, summary_metrics, top_n_by_monetary, AggregateError, FilterSelection,
    SegmentCount, SegmentRevenue, SegmentRfmMeans, SegmentSummaryRow, SummaryMetrics,
    ALL_SEGMENTS,
};
pub use distribution::{
    distribution_summary, histogram, metric_values, rfm_distributions, DistributionSummary,
    HistogramBin, MetricDistribution, RfmMetric, DEFAULT_HISTOGRAM_BINS,
};
