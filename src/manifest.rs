//! Filing folder manifests.
//!
//! Every filing folder in the archive publishes an `index.json` listing its files. For a 13F
//! filing the folder holds the primary document (always `primary_doc.xml`) and an information
//! table whose file name varies by filer agent. [`classify`] picks the two documents out of a
//! listing; filings without an information table go to the no-holdings side channel instead
//! of being dropped.

use chrono::NaiveDateTime;

use super::crawler::Crawler;
use super::error::{EdgarError, Result};
use super::index::{DirectoryItem, IndexResponse};
use super::options::ErrorPolicy;
use super::traits::Fetch;

/// File name of the 13F primary document.
pub const PRIMARY_DOC: &str = "primary_doc.xml";

/// A document inside a filing folder.
#[derive(Debug, Clone, PartialEq)]
pub struct DocRef {
    pub url: String,
    pub last_modified: Option<NaiveDateTime>,
}

/// A filing with both a primary document and an information table.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub manifest: String,
    pub primary: DocRef,
    pub holdings: DocRef,
}

/// A filing folder without an information table.
#[derive(Debug, Clone, PartialEq)]
pub struct NoHoldings {
    /// Filing folder URL.
    pub link: String,
    pub manifest: String,
    /// Last-modified time of `primary_doc.xml`, when the folder lists one.
    pub last_modified: Option<NaiveDateTime>,
}

/// Outcome of classifying a single manifest.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Entry(ManifestEntry),
    NoHoldings(NoHoldings),
}

/// Manifests of one run, split by outcome. Input order is preserved within each list.
#[derive(Debug, Clone, Default)]
pub struct ManifestResolution {
    pub entries: Vec<ManifestEntry>,
    pub no_holdings: Vec<NoHoldings>,
    /// Manifests rejected under [`ErrorPolicy::Skip`], with the reason.
    pub skipped: Vec<(String, String)>,
}

fn is_xml(item: &DirectoryItem) -> bool {
    item.name.to_lowercase().contains(".xml")
}

/// Splits a filing listing into primary document and information table.
///
/// `primary_doc.xml` only counts as the primary document when the folder holds more than one
/// XML file. Every other XML file is a holdings candidate; when several exist the last one
/// listed wins.
///
/// # Errors
///
/// `Parse` if the folder has an information table but no primary document.
pub fn classify(manifest_url: &str, listing: &IndexResponse, www: &str) -> Result<Classified> {
    let folder = manifest_url.strip_suffix("index.json").unwrap_or(manifest_url);
    let doc_ref = |item: &DirectoryItem| DocRef {
        url: format!("{}{}", folder, item.name),
        last_modified: item.last_modified,
    };

    let items = &listing.directory.item;
    let xml_count = items.iter().filter(|item| is_xml(item)).count();

    let mut primary = None;
    let mut holdings = None;
    let mut candidates = 0;
    for item in items {
        if item.name == PRIMARY_DOC {
            if xml_count > 1 {
                primary = Some(doc_ref(item));
            }
        } else if is_xml(item) {
            holdings = Some(doc_ref(item));
            candidates += 1;
        }
    }

    if candidates > 1 {
        tracing::warn!(
            manifest = %manifest_url,
            candidates,
            "several holdings candidates, keeping the last listed"
        );
    }

    match (primary, holdings) {
        (Some(primary), Some(holdings)) => Ok(Classified::Entry(ManifestEntry {
            manifest: manifest_url.to_string(),
            primary,
            holdings,
        })),
        (None, Some(_)) => Err(EdgarError::parse(format!(
            "{}: holdings document without {}",
            manifest_url, PRIMARY_DOC
        ))),
        (_, None) => Ok(Classified::NoHoldings(NoHoldings {
            link: format!("{}{}", www.trim_end_matches('/'), listing.directory.name),
            manifest: manifest_url.to_string(),
            last_modified: items
                .iter()
                .find(|item| item.name == PRIMARY_DOC)
                .and_then(|item| item.last_modified),
        })),
    }
}

impl<F: Fetch> Crawler<F> {
    /// Fetches and classifies filing manifests in order.
    ///
    /// Classification failures follow `policy`; fetch and decode failures always abort.
    pub async fn resolve_manifests(
        &self,
        links: &[String],
        policy: ErrorPolicy,
    ) -> Result<ManifestResolution> {
        let mut resolution = ManifestResolution::default();

        for (n, link) in links.iter().enumerate() {
            let listing: IndexResponse = self.fetch_json(link).await?;

            match classify(link, &listing, &self.urls.www) {
                Ok(Classified::Entry(entry)) => resolution.entries.push(entry),
                Ok(Classified::NoHoldings(no_holdings)) => resolution.no_holdings.push(no_holdings),
                Err(e) if policy.tolerates(&e) => {
                    tracing::warn!(manifest = %link, error = %e, "skipping manifest");
                    resolution.skipped.push((link.clone(), e.to_string()));
                }
                Err(e) => return Err(e),
            }

            if self.is_progress_tick(n + 1) {
                tracing::info!(processed = n + 1, "manifests resolved");
            }
        }

        tracing::info!(
            manifests = links.len(),
            filings = resolution.entries.len(),
            no_holdings = resolution.no_holdings.len(),
            "manifest resolution finished"
        );
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = "https://www.sec.gov/Archives/edgar/data/1000097/000100009720000001/index.json";

    fn listing(files: &[&str]) -> IndexResponse {
        let items: Vec<String> = files
            .iter()
            .map(|name| {
                format!(
                    r#"{{"name": "{}", "last-modified": "2020-01-02 16:03:12", "type": "text.gif"}}"#,
                    name
                )
            })
            .collect();
        let json = format!(
            r#"{{"directory": {{"name": "/Archives/edgar/data/1000097/000100009720000001", "item": [{}]}}}}"#,
            items.join(",")
        );
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_primary_and_holdings() {
        let listing = listing(&[
            "0001000097-20-000001-index-headers.html",
            "0001000097-20-000001.txt",
            "infotable.xml",
            "primary_doc.xml",
        ]);
        let Classified::Entry(entry) = classify(MANIFEST, &listing, "https://www.sec.gov").unwrap()
        else {
            panic!("expected an entry");
        };
        assert_eq!(
            entry.primary.url,
            "https://www.sec.gov/Archives/edgar/data/1000097/000100009720000001/primary_doc.xml"
        );
        assert_eq!(
            entry.holdings.url,
            "https://www.sec.gov/Archives/edgar/data/1000097/000100009720000001/infotable.xml"
        );
        assert_eq!(
            entry.primary.last_modified.unwrap().to_string(),
            "2020-01-02 16:03:12"
        );
    }

    #[test]
    fn test_last_holdings_candidate_wins() {
        let listing = listing(&["a_table.xml", "primary_doc.xml", "B_TABLE.XML"]);
        let Classified::Entry(entry) = classify(MANIFEST, &listing, "https://www.sec.gov").unwrap()
        else {
            panic!("expected an entry");
        };
        assert!(entry.holdings.url.ends_with("/B_TABLE.XML"));
    }

    #[test]
    fn test_primary_doc_alone_has_no_holdings() {
        let listing = listing(&["primary_doc.xml", "0001000097-20-000001.txt"]);
        let Classified::NoHoldings(none) = classify(MANIFEST, &listing, "https://www.sec.gov/").unwrap()
        else {
            panic!("expected no holdings");
        };
        assert_eq!(
            none.link,
            "https://www.sec.gov/Archives/edgar/data/1000097/000100009720000001"
        );
        assert_eq!(none.manifest, MANIFEST);
        assert!(none.last_modified.is_some());
    }

    #[test]
    fn test_folder_without_xml_has_no_holdings() {
        let listing = listing(&["0001000097-20-000001.txt"]);
        let classified = classify(MANIFEST, &listing, "https://www.sec.gov").unwrap();
        assert!(matches!(
            classified,
            Classified::NoHoldings(NoHoldings { last_modified: None, .. })
        ));
    }

    #[test]
    fn test_holdings_without_primary_is_parse_error() {
        let listing = listing(&["infotable.xml", "form13fInfoTable.xml"]);
        assert!(matches!(
            classify(MANIFEST, &listing, "https://www.sec.gov"),
            Err(EdgarError::Parse(_))
        ));
    }
}
