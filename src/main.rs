//! Segmetrics CLI
//! Loads the RFM and transaction exports and prints the dashboard
//! aggregates as text tables or JSON.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use segmetrics::{
    segment_labels, DashboardView, FilterSelection, TableCache, ALL_SEGMENTS, DEFAULT_TOP_N,
};

#[derive(Parser, Debug)]
#[command(name = "segmetrics", about = "RFM customer segmentation analytics")]
struct Args {
    /// Path to the RFM analysis CSV
    #[arg(long, default_value = "data/rfm_analysis.csv")]
    rfm: String,

    /// Path to the cleaned transaction CSV
    #[arg(long, default_value = "data/cleaned_online_retail.csv")]
    transactions: String,

    /// Segment to filter on ("All" disables filtering)
    #[arg(long, default_value = ALL_SEGMENTS)]
    segment: String,

    /// Number of top customers to list
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top: usize,

    /// Emit the full snapshot as JSON instead of text tables
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let cache = TableCache::new();
    let tables = cache
        .get_or_load(&args.rfm, &args.transactions)
        .context("loading input tables")?;

    let selection = if tables.columns.segment {
        let labels = segment_labels(&tables.rfm)?;
        FilterSelection::parse(&args.segment, &labels)?
    } else {
        anyhow::ensure!(
            args.segment == ALL_SEGMENTS,
            "no segment column in the RFM table; only --segment All is valid"
        );
        FilterSelection::All
    };

    let view = DashboardView::build(&tables, &selection, args.top)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_view(&view);
    }
    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.1}"))
}

fn print_view(view: &DashboardView) {
    println!("Customer Segmentation Analysis");
    println!("==============================");
    println!("Selection: {}", view.selection);
    for warning in &view.warnings {
        println!("warning: {warning}");
    }

    println!();
    println!("Key Metrics");
    println!("  Total Customers:   {}", view.metrics.customers);
    println!("  Avg Recency:       {} days", fmt_opt(view.metrics.mean_recency));
    println!("  Avg Frequency:     {}", fmt_opt(view.metrics.mean_frequency));
    match view.metrics.total_monetary {
        Some(total) => println!("  Total Revenue:     ${total:.2}"),
        None => println!("  Total Revenue:     N/A"),
    }

    if let Some(counts) = &view.segment_counts {
        let total: usize = counts.iter().map(|c| c.count).sum();
        println!();
        println!("Customers by Segment");
        for entry in counts {
            let share = if total > 0 {
                100.0 * entry.count as f64 / total as f64
            } else {
                0.0
            };
            println!("  {:<24} {:>8}  ({share:.1}%)", entry.segment, entry.count);
        }
    }

    if let Some(revenue) = &view.segment_revenue {
        println!();
        println!("Revenue by Segment");
        for entry in revenue {
            println!("  {:<24} ${:>14.2}", entry.segment, entry.revenue);
        }
    }

    if let Some(means) = &view.segment_rfm_means {
        println!();
        println!("Average RFM Values by Segment");
        println!("  {:<24} {:>10} {:>10} {:>12}", "Segment", "Recency", "Frequency", "Monetary");
        for row in means {
            println!(
                "  {:<24} {:>10.2} {:>10.2} {:>12.2}",
                row.segment, row.mean_recency, row.mean_frequency, row.mean_monetary
            );
        }
    }

    if let Some(top) = &view.top_customers {
        println!();
        println!("Top {} Customers by Revenue", top.len());
        for (i, customer) in top.iter().enumerate() {
            println!(
                "  {:>3}. Customer {:<12} ${:>12.2}",
                i + 1,
                customer.customer_id,
                customer.monetary
            );
        }
    }

    if let Some(distributions) = &view.distributions {
        println!();
        println!("RFM Distributions");
        for dist in distributions {
            let s = &dist.summary;
            println!(
                "  {:<12} n={:<6} mean={:<10.2} median={:<10.2} std={:<10.2} p05={:<10.2} p95={:.2}",
                format!("{:?}", dist.metric),
                s.count,
                s.mean,
                s.median,
                s.std,
                s.p05,
                s.p95
            );
        }
    }

    if let Some(summary) = &view.segment_summary {
        println!();
        println!("Segment Summary");
        println!(
            "  {:<24} {:>10} {:>10} {:>12} {:>14} {:>10}",
            "Segment", "Avg R", "Avg F", "Avg M", "Revenue", "Customers"
        );
        for row in summary {
            println!(
                "  {:<24} {:>10.2} {:>10.2} {:>12.2} {:>14.2} {:>10}",
                row.segment,
                row.mean_recency,
                row.mean_frequency,
                row.mean_monetary,
                row.total_monetary,
                row.customers
            );
        }
    }

    println!();
    println!(
        "Transactions: {} rows, {} to {}",
        view.transactions.rows, view.transactions.first_invoice, view.transactions.last_invoice
    );
}
