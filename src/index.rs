//! Daily index discovery and master index retrieval.
//!
//! EDGAR publishes a *daily index* for every business day, grouped by year and quarter:
//!
//! ```text
//! daily-index/
//! ├── 2020/index.json            ← lists QTR1..QTR4
//! │   ├── QTR1/index.json        ← lists company.*, form.*, master.* ... files
//! │   │   ├── master.20200102.idx
//! │   │   └── ...
//! ```
//!
//! Only the *master* variant is pipe-delimited, so discovery keeps the listing entries whose
//! name contains `master`. [`Crawler::master_index_links`] walks the tree for a range of years
//! and [`Crawler::parse_links`] turns the selected files into [`FilingRecord`]s.
//!
//! The SEC directory listings use two timestamp formats (`MM/DD/YYYY HH:MM:SS AM/PM` in the
//! index tree, `YYYY-MM-DD HH:MM:SS` in filing folders); `edgar_date_format` accepts both.

use super::crawler::Crawler;
use super::error::{EdgarError, Result};
use super::parsing::index::{FilingRecord, MasterIndexParser};
use super::traits::Fetch;
use chrono::NaiveDateTime;
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// First year covered by the EDGAR daily index archive.
pub const FIRST_ARCHIVE_YEAR: i32 = 1994;

/// Number of leading year-listing entries treated as quarter folders.
const QUARTERS_PER_YEAR: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResponse {
    /// Directory listing payload returned by `index.json`.
    pub directory: Directory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Directory {
    /// Directory items (files and subdirectories).
    #[serde(default)]
    pub item: Vec<DirectoryItem>,

    /// Directory path relative to the site root (e.g. `/Archives/edgar/data/1/000.../`).
    pub name: String,

    /// Parent directory path as reported by the SEC listing.
    #[serde(rename = "parent-dir", default)]
    pub parent_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryItem {
    /// Last modified timestamp.
    #[serde(rename = "last-modified", default, with = "edgar_date_format")]
    pub last_modified: Option<NaiveDateTime>,

    /// Item name (filename or directory name).
    pub name: String,

    /// Item type as reported by the listing (`dir`, `file`, or an icon name in filing folders).
    #[serde(rename = "type", default)]
    pub type_: Option<String>,

    /// Relative URL path.
    #[serde(default)]
    pub href: Option<String>,

    /// File size (human-readable, as provided by the SEC listing).
    #[serde(default)]
    pub size: Option<String>,
}

/// Serde helpers for the EDGAR listing timestamps.
pub(crate) mod edgar_date_format {
    use chrono::NaiveDateTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    const FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %I:%M:%S %p"];

    pub fn parse(s: &str) -> Option<NaiveDateTime> {
        FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s.trim(), fmt).ok())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s))),
        }
    }

    pub fn serialize<S>(date: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_str(&d.format(FORMATS[0]).to_string()),
            None => serializer.serialize_none(),
        }
    }
}

/// Expands an ending year and an optional look-back into the years to crawl, oldest first.
///
/// # Errors
///
/// `InvalidArgument` if `year` precedes 1994, `prior_years` is negative, or the look-back
/// reaches before 1994.
pub fn year_range(year: i32, prior_years: Option<i32>) -> Result<Vec<i32>> {
    if year < FIRST_ARCHIVE_YEAR {
        return Err(EdgarError::invalid(format!(
            "year must be {} or greater, got {}",
            FIRST_ARCHIVE_YEAR, year
        )));
    }
    let prior = prior_years.unwrap_or(0);
    if prior < 0 {
        return Err(EdgarError::invalid(format!(
            "prior_years must not be negative, got {}",
            prior
        )));
    }
    if year - FIRST_ARCHIVE_YEAR < prior {
        return Err(EdgarError::invalid(format!(
            "request precedes archive date limit ({}): {} - {}",
            FIRST_ARCHIVE_YEAR, year, prior
        )));
    }
    Ok((year - prior..=year).collect())
}

/// Returns `true` if the index file is gzipped (`.gz`).
fn is_archive(url: &str) -> bool {
    url.ends_with(".gz")
}

/// Converts raw bytes into UTF-8 text, transparently decompressing `.gz` inputs.
pub(crate) fn decode_index(content: Vec<u8>, url: &str) -> Result<String> {
    if is_archive(url) {
        let mut decoder = GzDecoder::new(&content[..]);
        let mut result = String::new();
        decoder.read_to_string(&mut result)?;
        Ok(result)
    } else {
        Ok(String::from_utf8(content)?)
    }
}

impl<F: Fetch> Crawler<F> {
    /// Lists the daily master index files for `year` and the `prior_years` before it.
    ///
    /// For each year the year listing is fetched and its first four entries are taken as the
    /// quarter folders; each quarter listing contributes every file whose name contains
    /// `master`. The speed bump follows every listing fetch.
    pub async fn master_index_links(
        &self,
        year: i32,
        prior_years: Option<i32>,
    ) -> Result<Vec<String>> {
        let years = year_range(year, prior_years)?;
        let base = &self.urls.daily_index;
        let mut links = Vec::new();

        for y in years {
            let year_url = format!("{}/{}/index.json", base, y);
            let listing: IndexResponse = self.fetch_json(&year_url).await?;

            for quarter in listing.directory.item.iter().take(QUARTERS_PER_YEAR) {
                let qtr_name = quarter.name.trim_end_matches('/');
                let qtr_url = format!("{}/{}/{}/index.json", base, y, qtr_name);
                let qtr_listing: IndexResponse = self.fetch_json(&qtr_url).await?;

                let before = links.len();
                links.extend(
                    qtr_listing
                        .directory
                        .item
                        .iter()
                        .filter(|file| file.name.contains("master"))
                        .map(|file| format!("{}/{}/{}/{}", base, y, qtr_name, file.name)),
                );
                tracing::debug!(
                    year = y,
                    quarter = qtr_name,
                    found = links.len() - before,
                    "quarter listed"
                );
            }
        }

        tracing::info!(count = links.len(), "master index links discovered");
        Ok(links)
    }

    /// Downloads and parses master index files, concatenating their rows in input order.
    ///
    /// # Errors
    ///
    /// `Parse` if a file lacks the `CIK` header marker or has a malformed row; any transport
    /// error aborts the remaining links.
    pub async fn parse_links(&self, links: &[String]) -> Result<Vec<FilingRecord>> {
        let parser = MasterIndexParser::new(&self.urls.archives);
        let mut records = Vec::new();

        for link in links {
            let content = if is_archive(link) {
                decode_index(self.fetch_bytes(link).await?, link)?
            } else {
                self.fetch_text(link).await?
            };
            let parsed = parser
                .parse(&content)
                .map_err(|e| EdgarError::parse(format!("{}: {}", link, e)))?;
            tracing::debug!(link = %link, rows = parsed.len(), "master index parsed");
            records.extend(parsed);
        }

        tracing::info!(
            files = links.len(),
            rows = records.len(),
            "parsed master index links"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compression, write::GzEncoder};
    use std::io::Write;

    #[test]
    fn test_year_range_single_year() {
        assert_eq!(year_range(2020, None).unwrap(), vec![2020]);
        assert_eq!(year_range(2020, Some(0)).unwrap(), vec![2020]);
    }

    #[test]
    fn test_year_range_oldest_first() {
        assert_eq!(year_range(2020, Some(2)).unwrap(), vec![2018, 2019, 2020]);
        assert_eq!(year_range(1995, Some(1)).unwrap(), vec![1994, 1995]);
    }

    #[test]
    fn test_year_range_rejects_invalid_input() {
        assert!(matches!(
            year_range(1993, None),
            Err(EdgarError::InvalidArgument(_))
        ));
        assert!(matches!(
            year_range(2020, Some(-1)),
            Err(EdgarError::InvalidArgument(_))
        ));
        assert!(matches!(
            year_range(1995, Some(2)),
            Err(EdgarError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_listing_timestamps() {
        let json = r#"{"directory": {"name": "x/", "item": [
            {"name": "a", "last-modified": "01/02/2020 10:01:02 PM"},
            {"name": "b", "last-modified": "2020-01-02 16:03:12"},
            {"name": "c"}
        ]}}"#;
        let listing: IndexResponse = serde_json::from_str(json).unwrap();
        let items = &listing.directory.item;
        assert_eq!(
            items[0].last_modified.unwrap().to_string(),
            "2020-01-02 22:01:02"
        );
        assert_eq!(
            items[1].last_modified.unwrap().to_string(),
            "2020-01-02 16:03:12"
        );
        assert!(items[2].last_modified.is_none());
    }

    #[test]
    fn test_decode_gzipped_index() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"CIK|Company Name").unwrap();
        let bytes = encoder.finish().unwrap();

        let text = decode_index(bytes, "https://x/master.20200102.idx.gz").unwrap();
        assert_eq!(text, "CIK|Company Name");
        let plain = decode_index(b"plain".to_vec(), "https://x/master.20200102.idx").unwrap();
        assert_eq!(plain, "plain");
    }
}
