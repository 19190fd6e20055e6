//! retail-insights - retail sales analysis and report generation
//!
//! Reads a transaction CSV and a store-location CSV, runs the cleaning
//! and aggregation pipeline, and writes charts plus a markdown report.

use anyhow::Context;
use clap::Parser;
use retail_insights::agg::{Aggregator, Dimension};
use retail_insights::data::{DataCleaner, ImputePolicy, RecordLoader, StoreDirectory};
use retail_insights::report::{NarrativeReport, Reporter};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "retail-insights", version, about)]
struct Cli {
    /// Transaction CSV file
    #[arg(long)]
    sales: PathBuf,

    /// Store-location CSV file
    #[arg(long)]
    stores: PathBuf,

    /// Output directory for report artifacts
    #[arg(long, default_value = "report")]
    out: PathBuf,

    /// Imputation policy for missing numeric fields
    #[arg(long, value_enum, default_value = "zero")]
    impute: ImputePolicy,

    /// Insert explicit zero rows for months without activity
    #[arg(long)]
    zero_fill: bool,

    /// Number of products in the top/bottom rankings
    #[arg(long, default_value_t = 5)]
    top: usize,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .init();

    debug!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
    run(cli)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let transactions = RecordLoader::load_transactions(&cli.sales)
        .with_context(|| format!("loading transactions from {}", cli.sales.display()))?;
    info!(rows = transactions.height(), "loaded transaction table");

    let stores = RecordLoader::load_stores(&cli.stores)
        .with_context(|| format!("loading store locations from {}", cli.stores.display()))?;
    info!(rows = stores.height(), "loaded store-location table");

    let (cleaned, quality) = DataCleaner::clean(&transactions, cli.impute)
        .context("cleaning transaction table")?;
    quality.log();

    let directory = StoreDirectory::from_frame(&stores).context("indexing store locations")?;
    debug!(stores = directory.len(), "store directory built");
    let (enriched, unmatched_stores) = directory.join(cleaned);

    let overview = Aggregator::overview(&enriched)
        .context("no usable transaction rows after cleaning")?;
    info!(
        orders = overview.order_count,
        total_revenue = overview.total_revenue,
        "aggregating report tables"
    );

    let regions = Aggregator::aggregate(&enriched, &[Dimension::Region]);
    let segments = Aggregator::aggregate(&enriched, &[Dimension::Segment]);
    let channels = Aggregator::aggregate(&enriched, &[Dimension::Channel]);
    let category_margins = Aggregator::aggregate_by_margin(&enriched, &[Dimension::Category]);
    let monthly = Aggregator::monthly_trend(&enriched, cli.zero_fill);

    let products = Aggregator::aggregate(&enriched, &[Dimension::Product]);
    let top_products: Vec<_> = products.iter().take(cli.top).cloned().collect();
    let bottom_products: Vec<_> = Aggregator::aggregate_ascending(&enriched, &[Dimension::Product])
        .into_iter()
        .take(cli.top)
        .collect();

    let report = NarrativeReport {
        overview: &overview,
        regions: &regions,
        segments: &segments,
        top_products: &top_products,
        bottom_products: &bottom_products,
        category_margins: &category_margins,
        channels: &channels,
        monthly: &monthly,
        quality: &quality,
        unmatched_stores,
    };

    Reporter::new(&cli.out)
        .write(&report)
        .with_context(|| format!("writing report artifacts to {}", cli.out.display()))?;

    info!(out = %cli.out.display(), "analysis complete");
    Ok(())
}
