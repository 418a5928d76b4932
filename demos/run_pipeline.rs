//! Incremental crawl example
//!
//! This example runs the full pipeline against SEC.gov:
//! - List the daily master index files of the current year
//! - Create the processed-link table on the first run
//! - Crawl every unprocessed file and store its 13F-HR filings
//!
//! The database is kept in `edgar13f-example.db`, so running the example again only crawls
//! files published since the previous run.
//!
//! Run with: `cargo run --example run_pipeline`

use chrono::Datelike;
use edgar13f::{Edgar, ErrorPolicy, Pipeline, PipelineOptions, RunStatus, Store};
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // SEC.gov requires a user agent in the format: "AppName contact@example.com"
    let edgar = Edgar::new("edgar13f Example user@example.com")?;
    let urls = edgar.urls().clone();
    let store = Store::open("edgar13f-example.db")?;

    println!("=== edgar13f Incremental Crawl Example ===\n");

    // Malformed filings are reported instead of stopping the crawl
    let options = PipelineOptions::new()
        .with_error_policy(ErrorPolicy::Skip)
        .with_batch_size(1000);
    let mut pipeline = Pipeline::new(edgar, urls, store, options);

    let year = chrono::Local::now().year();
    println!("Crawling the {} daily index...", year);
    let mut report = pipeline.run(year, None).await?;

    if report.status == RunStatus::Initialized {
        // The first run only records which files exist; crawl them now
        println!("✓ Link table created, crawling {} files", report.published_links);
        report = pipeline.run(year, None).await?;
    }

    match report.status {
        RunStatus::UpToDate => println!("✓ Nothing new since the last run"),
        _ => {
            println!("✓ Index files processed: {}", report.new_links);
            println!("✓ 13F-HR filings selected: {}", report.filings_selected);
            println!("✓ Filers stored: {}", report.filers_written);
            println!("✓ Filings stored: {}", report.filings_written);
            println!("✓ Holdings stored: {}", report.holdings_written);
            println!("✓ Filings without holdings: {}", report.no_holdings_written);
        }
    }

    for (manifest, reason) in &report.skipped {
        println!("- skipped {}: {}", manifest, reason);
    }

    let holdings = pipeline.store().count(&pipeline.options().tables.holdings)?;
    println!("\nHoldings in the database: {}", holdings);

    Ok(())
}
