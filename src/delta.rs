//! Incremental crawling: which master index files have not been processed yet.
//!
//! Processed files are recorded in a link table (`idx_dates` by default) holding one row per
//! daily master index, keyed by its URL. [`resolve_delta`] compares the links currently
//! published with that table; [`record_processed`] adds links once a run has stored their
//! filings.

use chrono::NaiveDate;

use super::error::{EdgarError, Result};
use super::store::{Store, check_identifier};

/// A processed daily master index file.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDate {
    pub date: NaiveDate,
    pub link: String,
}

impl IndexDate {
    /// Reads the filing day from a `master.YYYYMMDD.idx` link.
    ///
    /// ```
    /// use edgar13f::IndexDate;
    ///
    /// let idx = IndexDate::from_link(
    ///     "https://www.sec.gov/Archives/edgar/daily-index/2020/QTR1/master.20200102.idx",
    /// )?;
    /// assert_eq!(idx.date.to_string(), "2020-01-02");
    /// # Ok::<(), edgar13f::EdgarError>(())
    /// ```
    pub fn from_link(link: &str) -> Result<Self> {
        let file = link.rsplit('/').next().unwrap_or(link);
        let date = file
            .split('.')
            .nth(1)
            .and_then(|part| NaiveDate::parse_from_str(part, "%Y%m%d").ok())
            .ok_or_else(|| {
                EdgarError::parse(format!("no master.YYYYMMDD date in link: {}", link))
            })?;
        Ok(Self {
            date,
            link: link.to_string(),
        })
    }
}

/// Result of comparing published links with the processed ones.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkDelta {
    /// The link table did not exist and has just been created. Nothing is crawled on this
    /// run; the next one sees every published link as unseen.
    Initialized,
    /// Every published link has been processed.
    UpToDate,
    /// Links not yet processed, in published order.
    Unseen(Vec<String>),
}

impl LinkDelta {
    pub fn links(&self) -> &[String] {
        match self {
            LinkDelta::Unseen(links) => links,
            _ => &[],
        }
    }
}

fn create_link_table(store: &Store, table: &str) -> Result<()> {
    check_identifier(table)?;
    store.execute_batch(&format!(
        "CREATE TABLE \"{table}\" (
            \"Date\" DATE NOT NULL UNIQUE,
            \"Link\" VARCHAR(255) NOT NULL UNIQUE
        );
        CREATE INDEX \"ix_{table}_Date\" ON \"{table}\" (\"Date\");"
    ))
}

/// Returns the links of `published` that are not in `table`, creating the table if needed.
pub fn resolve_delta(store: &Store, table: &str, published: &[String]) -> Result<LinkDelta> {
    if !store.table_exists(table)? {
        create_link_table(store, table)?;
        tracing::info!(table, "link table created");
        return Ok(LinkDelta::Initialized);
    }

    let processed = store.existing_keys(table, "Link")?;
    let unseen: Vec<String> = published
        .iter()
        .filter(|link| !processed.contains(*link))
        .cloned()
        .collect();

    tracing::info!(
        processed = processed.len(),
        unseen = unseen.len(),
        "link delta resolved"
    );
    if unseen.is_empty() {
        Ok(LinkDelta::UpToDate)
    } else {
        Ok(LinkDelta::Unseen(unseen))
    }
}

/// Records `links` as processed. Links already present are left alone.
pub fn record_processed(store: &mut Store, table: &str, links: &[String]) -> Result<usize> {
    let rows = links
        .iter()
        .map(|link| IndexDate::from_link(link))
        .collect::<Result<Vec<_>>>()?;
    if !store.table_exists(table)? {
        create_link_table(store, table)?;
    }
    store.upsert(table, &rows, "Link")
}
