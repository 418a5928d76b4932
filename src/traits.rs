//! The transport seam between the pipeline and the network.
//!
//! Every stage of the crawl reaches the remote archive through [`Fetch`]. The production
//! implementation is [`Edgar`](crate::Edgar), which adds the SEC-required user agent, a
//! token-bucket limiter and status-code mapping. Tests and offline runs can provide their
//! own implementation (a map of canned responses, a local mirror, a recording proxy) without
//! touching any parsing or persistence code.

use super::error::Result;
use async_trait::async_trait;

/// Raw document retrieval.
///
/// Implementations must return `EdgarError::NotFound` for missing resources and one of the
/// other transport variants for anything else that goes wrong on the wire. They must not
/// apply the crawler's post-request delay themselves; [`Crawler`](crate::Crawler) does that.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetches a text resource (JSON listings, master index files, XML documents).
    async fn get(&self, url: &str) -> Result<String>;

    /// Fetches a binary resource (gzipped index files).
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

