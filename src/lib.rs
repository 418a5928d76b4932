//! # edgar13f - Incremental SEC Form 13F-HR crawler
//!
//! edgar13f walks the SEC EDGAR daily index archive, finds the Form 13F-HR filings published
//! since the previous run and stores filer, filing and holdings records in SQLite.
//!
//! ## Features
//!
//! - **Rate-limited HTTP client** - Complies with SEC.gov fair access rules
//! - **Incremental crawling** - Processed daily index files are recorded and skipped
//! - **Master index parsing** - Plain and gzipped pipe-delimited daily indices
//! - **13F extraction** - Filer identity, cover page, summary and every holding line
//! - **Idempotent storage** - Tables created on first use, rows appended by natural key
//!
//! ## Requirements
//!
//! edgar13f is async and requires an async runtime. We recommend
//! [tokio](https://tokio.rs), which is the most widely used async runtime in the Rust ecosystem.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use edgar13f::{Edgar, EdgarConfig, Pipeline, PipelineOptions, Store};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Initialize with a proper user agent (required by SEC.gov)
//!     let edgar = Edgar::new("YourAppName contact@example.com")?;
//!     let urls = edgar.urls().clone();
//!     let store = Store::open("edgar13f.db")?;
//!
//!     let mut pipeline = Pipeline::new(edgar, urls, store, PipelineOptions::new());
//!     let report = pipeline.run(2020, Some(1)).await?;
//!
//!     println!("{} holdings stored", report.holdings_written);
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod crawler;
mod delta;
mod error;
mod index;
mod manifest;
mod options;
pub mod parsing;
mod pipeline;
mod records;
mod sink;
mod store;
mod traits;

pub use config::{EdgarConfig, EdgarUrls};
pub use core::Edgar;
pub use crawler::{Crawler, DEFAULT_PROGRESS_EVERY, DEFAULT_SPEED_BUMP};
pub use delta::{IndexDate, LinkDelta, record_processed, resolve_delta};
pub use error::{EdgarError, Result};
pub use index::{Directory, DirectoryItem, FIRST_ARCHIVE_YEAR, IndexResponse, year_range};
pub use manifest::{
    Classified, DocRef, ManifestEntry, ManifestResolution, NoHoldings, PRIMARY_DOC, classify,
};
pub use options::{ErrorPolicy, FORM_13F_HR, PipelineOptions, TableNames};
pub use parsing::index::{FilingRecord, MasterIndexParser};
pub use parsing::thirteenf::{
    FilerInfo, FilingMetadata, HoldingLine, IncludedManager, OtherManager, Signature,
    SummaryTotals,
};
pub use pipeline::{Pipeline, RunReport, RunStatus};
pub use sink::BatchSink;
pub use store::{Record, Store, column_type};
pub use traits::Fetch;

/// Current crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
