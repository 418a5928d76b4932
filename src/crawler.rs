//! Sequential, self-throttling access to the EDGAR archive tree.
//!
//! [`Crawler`] owns a [`Fetch`] implementation and the endpoint roots. Every request it
//! issues is followed by a fixed pause (the "speed bump") before the next network
//! operation, as requested by the SEC fair access policy. The stages of the pipeline
//! (link discovery, master index parsing, manifest resolution, document retrieval) are
//! implemented as methods on `Crawler` in their own modules.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::time::sleep;

use super::config::EdgarUrls;
use super::error::Result;
use super::traits::Fetch;

/// Pause applied after every request unless configured otherwise.
pub const DEFAULT_SPEED_BUMP: Duration = Duration::from_millis(100);

/// Items processed between two progress log lines.
pub const DEFAULT_PROGRESS_EVERY: usize = 500;

#[derive(Debug, Clone)]
pub struct Crawler<F> {
    pub(crate) fetcher: F,
    pub(crate) urls: EdgarUrls,
    pub(crate) speed_bump: Duration,
    pub(crate) progress_every: usize,
}

impl<F: Fetch> Crawler<F> {
    pub fn new(fetcher: F, urls: EdgarUrls) -> Self {
        Self {
            fetcher,
            urls,
            speed_bump: DEFAULT_SPEED_BUMP,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }

    /// Overrides the post-request pause. Zero disables it (offline fixtures, tests).
    pub fn with_speed_bump(mut self, delay: Duration) -> Self {
        self.speed_bump = delay;
        self
    }

    pub fn with_progress_every(mut self, every: usize) -> Self {
        self.progress_every = every.max(1);
        self
    }

    pub fn urls(&self) -> &EdgarUrls {
        &self.urls
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub(crate) fn is_progress_tick(&self, processed: usize) -> bool {
        processed % self.progress_every == 0
    }

    pub(crate) async fn speed_bump(&self) {
        if !self.speed_bump.is_zero() {
            sleep(self.speed_bump).await;
        }
    }

    /// Fetches text, then pauses.
    pub(crate) async fn fetch_text(&self, url: &str) -> Result<String> {
        let body = self.fetcher.get(url).await?;
        self.speed_bump().await;
        Ok(body)
    }

    /// Fetches raw bytes, then pauses.
    pub(crate) async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let body = self.fetcher.get_bytes(url).await?;
        self.speed_bump().await;
        Ok(body)
    }

    /// Fetches and decodes a JSON document, then pauses.
    pub(crate) async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.fetcher.get(url).await?;
        self.speed_bump().await;
        Ok(serde_json::from_str(&body)?)
    }
}
