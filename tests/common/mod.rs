// Each test crate uses a different subset of these helpers.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Instant,
};

use async_trait::async_trait;
use edgar13f::{EdgarError, Fetch, Result};

pub const DAILY_INDEX: &str = "https://www.sec.gov/Archives/edgar/daily-index";
pub const HOLDINGS_FILING: &str =
    "https://www.sec.gov/Archives/edgar/data/1000097/000100009720000001/";
pub const NO_HOLDINGS_FILING: &str =
    "https://www.sec.gov/Archives/edgar/data/1005354/000100535420000002/";

pub fn fixture_path(relative: impl AsRef<Path>) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(relative)
}

pub fn read_fixture(relative: impl AsRef<Path>) -> String {
    fs::read_to_string(fixture_path(relative)).expect("fixture file should be readable")
}

/// Canned responses keyed by URL. Unknown URLs are `NotFound`.
#[derive(Default)]
pub struct StubFetcher {
    responses: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<(String, Instant)>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.responses.insert(url.into(), body.into());
    }

    pub fn with(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.insert(url, body);
        self
    }

    pub fn with_fixture(self, url: impl Into<String>, relative: &str) -> Self {
        self.with(url, read_fixture(relative))
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Requests so far with the instant each was received.
    pub fn timed_requests(&self) -> Vec<(String, Instant)> {
        self.requests.lock().unwrap().clone()
    }

    fn respond(&self, url: &str) -> Result<Vec<u8>> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| EdgarError::NotFound(url.to_string()))
    }
}

#[async_trait]
impl Fetch for StubFetcher {
    async fn get(&self, url: &str) -> Result<String> {
        Ok(String::from_utf8(self.respond(url)?)?)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.respond(url)
    }
}

/// The 2020 daily index tree: four quarters with one master file each. Only the 2 January
/// file lists filings (an 8-K, a Form 4 and two 13F-HR).
pub fn daily_index_2020() -> StubFetcher {
    let mut fetcher = StubFetcher::new().with_fixture(
        format!("{}/2020/index.json", DAILY_INDEX),
        "daily-index/2020.json",
    );
    for (quarter, day) in [(1, "20200102"), (2, "20200401"), (3, "20200701"), (4, "20201001")] {
        fetcher.insert(
            format!("{}/2020/QTR{}/index.json", DAILY_INDEX, quarter),
            read_fixture(format!("daily-index/2020-QTR{}.json", quarter)),
        );
        let master = if day == "20200102" {
            "daily-index/master.20200102.idx"
        } else {
            "daily-index/master.empty.idx"
        };
        fetcher.insert(
            format!("{}/2020/QTR{}/master.{}.idx", DAILY_INDEX, quarter, day),
            read_fixture(master),
        );
    }
    fetcher
}

/// [`daily_index_2020`] plus the filing folders of both 13F-HR filings.
pub fn archive_2020() -> StubFetcher {
    daily_index_2020()
        .with_fixture(
            format!("{}index.json", HOLDINGS_FILING),
            "filings/manifest-holdings.json",
        )
        .with_fixture(
            format!("{}primary_doc.xml", HOLDINGS_FILING),
            "thirteenf/primary_doc.xml",
        )
        .with_fixture(
            format!("{}infotable.xml", HOLDINGS_FILING),
            "thirteenf/infotable.xml",
        )
        .with_fixture(
            format!("{}index.json", NO_HOLDINGS_FILING),
            "filings/manifest-no-holdings.json",
        )
        .with_fixture(
            format!("{}primary_doc.xml", NO_HOLDINGS_FILING),
            "thirteenf/primary_doc_no_holdings.xml",
        )
}
