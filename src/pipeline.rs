//! End-to-end crawl of the 13F filings published since the last run.
//!
//! ```text
//! master_index_links ─▶ resolve_delta ─▶ parse_links ─▶ (forms)
//!                                            │
//!                                  filter form type
//!                                            │
//!                                   resolve_manifests ─▶ (no_holdings13f)
//!                                            │
//!                      primary doc + information table per filing
//!                                            │
//!                    (filers13f) ◀── extractors ──▶ (filings13f, holdings13f)
//!                                            │
//!                                 record_processed ─▶ (idx_dates)
//! ```
//!
//! Processed links are recorded last, so an aborted run is retried in full by the next one;
//! the keyed upserts make the retry safe.

use std::collections::HashSet;

use super::config::EdgarUrls;
use super::crawler::Crawler;
use super::delta::{LinkDelta, record_processed, resolve_delta};
use super::error::Result;
use super::manifest::ManifestEntry;
use super::options::PipelineOptions;
use super::parsing::thirteenf::{FilerInfo, FilingMetadata, HoldingLine};
use super::parsing::xml::XmlDocument;
use super::sink::BatchSink;
use super::store::Store;
use super::traits::Fetch;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    /// The link table was created; nothing was crawled.
    #[default]
    Initialized,
    /// No unprocessed master index files.
    UpToDate,
    /// Unseen files were crawled and recorded.
    Completed,
}

/// Counters of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub status: RunStatus,
    /// Master index files published for the requested years.
    pub published_links: usize,
    pub new_links: usize,
    /// Master index rows parsed from the new links, all form types.
    pub forms_parsed: usize,
    /// Rows of the selected form type.
    pub filings_selected: usize,
    pub no_holdings: usize,
    pub forms_written: usize,
    pub no_holdings_written: usize,
    pub filers_written: usize,
    pub filings_written: usize,
    pub holdings_written: usize,
    /// Filings skipped under [`ErrorPolicy::Skip`](crate::ErrorPolicy::Skip), with the reason.
    pub skipped: Vec<(String, String)>,
}

/// Everything extracted from one filing.
struct ExtractedFiling {
    filer: FilerInfo,
    metadata: FilingMetadata,
    holdings: Vec<HoldingLine>,
}

pub struct Pipeline<F> {
    crawler: Crawler<F>,
    store: Store,
    options: PipelineOptions,
}

impl<F: Fetch> Pipeline<F> {
    pub fn new(fetcher: F, urls: EdgarUrls, store: Store, options: PipelineOptions) -> Self {
        let crawler = Crawler::new(fetcher, urls)
            .with_speed_bump(options.speed_bump)
            .with_progress_every(options.progress_every);
        Self {
            crawler,
            store,
            options,
        }
    }

    pub fn crawler(&self) -> &Crawler<F> {
        &self.crawler
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn into_store(self) -> Store {
        self.store
    }

    /// Lists the published master index files and compares them with the link table.
    pub async fn delta(&self, year: i32, prior_years: Option<i32>) -> Result<LinkDelta> {
        let published = self.crawler.master_index_links(year, prior_years).await?;
        resolve_delta(&self.store, &self.options.tables.idx_dates, &published)
    }

    /// Crawls every master index file of the requested years that has not been processed.
    ///
    /// # Errors
    ///
    /// Transport and database errors always abort the run. Filing-level parse errors abort
    /// under [`ErrorPolicy::Abort`](crate::ErrorPolicy::Abort) and are collected in
    /// [`RunReport::skipped`] under `Skip`.
    pub async fn run(&mut self, year: i32, prior_years: Option<i32>) -> Result<RunReport> {
        let mut report = RunReport::default();

        let published = self.crawler.master_index_links(year, prior_years).await?;
        report.published_links = published.len();

        let new_links = match resolve_delta(&self.store, &self.options.tables.idx_dates, &published)? {
            LinkDelta::Initialized => {
                tracing::info!("link table initialized; run again to crawl");
                return Ok(report);
            }
            LinkDelta::UpToDate => {
                tracing::info!("database is up to date");
                report.status = RunStatus::UpToDate;
                return Ok(report);
            }
            LinkDelta::Unseen(links) => links,
        };
        report.new_links = new_links.len();

        let records = self.crawler.parse_links(&new_links).await?;
        report.forms_parsed = records.len();
        report.forms_written = self
            .store
            .upsert(&self.options.tables.forms, &records, "link")?;

        let manifests: Vec<String> = records
            .iter()
            .filter(|record| record.form_type == self.options.form_type)
            .map(|record| record.link.clone())
            .collect();
        report.filings_selected = manifests.len();
        tracing::info!(
            form_type = %self.options.form_type,
            filings = manifests.len(),
            "filings selected"
        );

        let resolution = self
            .crawler
            .resolve_manifests(&manifests, self.options.error_policy)
            .await?;
        report.no_holdings = resolution.no_holdings.len();
        report.no_holdings_written = self.store.upsert(
            &self.options.tables.no_holdings,
            &resolution.no_holdings,
            "link",
        )?;
        report.skipped.extend(resolution.skipped);

        self.store_filings(&resolution.entries, &mut report).await?;

        record_processed(&mut self.store, &self.options.tables.idx_dates, &new_links)?;
        report.status = RunStatus::Completed;

        tracing::info!(
            links = report.new_links,
            filers = report.filers_written,
            filings = report.filings_written,
            holdings = report.holdings_written,
            no_holdings = report.no_holdings_written,
            skipped = report.skipped.len(),
            "run finished"
        );
        Ok(report)
    }

    async fn store_filings(
        &mut self,
        entries: &[ManifestEntry],
        report: &mut RunReport,
    ) -> Result<()> {
        let tables = self.options.tables.clone();
        let batch_size = self.options.batch_size;
        let mut filers = BatchSink::new(tables.filers, "CIK", batch_size);
        let mut filings = BatchSink::new(tables.filings, "file_id", batch_size);
        let mut holdings = BatchSink::new(tables.holdings, "hold_id", batch_size);
        let mut seen_filers = HashSet::new();

        for (n, entry) in entries.iter().enumerate() {
            match self.extract_filing(entry).await {
                Ok(filing) => {
                    if seen_filers.insert(filing.filer.cik.clone()) {
                        filers.push(&mut self.store, filing.filer)?;
                    }
                    filings.push(&mut self.store, filing.metadata)?;
                    holdings.push_all(&mut self.store, filing.holdings)?;
                }
                Err(e) if self.options.error_policy.tolerates(&e) => {
                    tracing::warn!(manifest = %entry.manifest, error = %e, "skipping filing");
                    report.skipped.push((entry.manifest.clone(), e.to_string()));
                }
                Err(e) => return Err(e),
            }

            if self.crawler.is_progress_tick(n + 1) {
                tracing::info!(processed = n + 1, total = entries.len(), "13F filings extracted");
            }
        }

        report.filers_written = filers.finish(&mut self.store)?;
        report.filings_written = filings.finish(&mut self.store)?;
        report.holdings_written = holdings.finish(&mut self.store)?;
        Ok(())
    }

    /// Fetches both documents of a filing and runs the extractors. The primary document is
    /// fetched once and shared by all three.
    async fn extract_filing(&self, entry: &ManifestEntry) -> Result<ExtractedFiling> {
        let primary = XmlDocument::parse(&self.crawler.fetch_bytes(&entry.primary.url).await?)?;
        let filer = FilerInfo::extract(&primary)?;
        let metadata = FilingMetadata::extract(&primary, entry.primary.last_modified)?;

        let table = XmlDocument::parse(&self.crawler.fetch_bytes(&entry.holdings.url).await?)?;
        let holdings = HoldingLine::extract_all(&table, &primary, entry.holdings.last_modified)?;

        Ok(ExtractedFiling {
            filer,
            metadata,
            holdings,
        })
    }
}
