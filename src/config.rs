use std::time::Duration;

/// Configuration for the Edgar client
#[derive(Debug, Clone)]
pub struct EdgarConfig {
    /// User agent string for HTTP requests
    pub user_agent: String,
    /// Rate limit in requests per second
    pub rate_limit: u32,
    /// HTTP request timeout
    pub timeout: Duration,
    /// Retries for 429 responses and network failures. Zero propagates the first failure.
    pub max_retries: u32,
    /// Base URLs for the EDGAR endpoints the crawler walks
    pub base_urls: EdgarUrls,
}

/// Base URLs for the EDGAR endpoints the crawler walks
#[derive(Debug, Clone)]
pub struct EdgarUrls {
    /// Site root, prefixed to directory names reported by manifests
    pub www: String,
    /// Root of the EDGAR archives, prefixed to index file names
    pub archives: String,
    /// Root of the daily index tree (`{daily_index}/{year}/{quarter}/...`)
    pub daily_index: String,
}

impl Default for EdgarConfig {
    fn default() -> Self {
        Self {
            user_agent: "edgar13f/0.1.0".to_string(),
            rate_limit: 10,
            timeout: Duration::from_secs(30),
            max_retries: 0,
            base_urls: EdgarUrls::default(),
        }
    }
}

impl EdgarConfig {
    /// Creates a new EdgarConfig with custom settings
    ///
    /// # Basic usage
    ///
    /// ```rust
    /// use edgar13f::{Edgar, EdgarConfig};
    /// use std::time::Duration;
    ///
    /// let config = EdgarConfig::new(
    ///     "YourAppName contact@example.com",
    ///     10, // requests per second
    ///     Duration::from_secs(30),
    ///     None,
    /// );
    /// let edgar = Edgar::with_config(config)?;
    /// # Ok::<(), edgar13f::EdgarError>(())
    /// ```
    pub fn new(
        user_agent: impl Into<String>,
        rate_limit: u32,
        timeout: Duration,
        base_urls: Option<EdgarUrls>,
    ) -> Self {
        Self {
            user_agent: user_agent.into(),
            rate_limit,
            timeout,
            max_retries: 0,
            base_urls: base_urls.unwrap_or_default(),
        }
    }

    /// Enables retries with exponential backoff for rate limit responses and network errors.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

impl Default for EdgarUrls {
    fn default() -> Self {
        Self {
            www: "https://www.sec.gov".to_string(),
            archives: "https://www.sec.gov/Archives".to_string(),
            daily_index: "https://www.sec.gov/Archives/edgar/daily-index".to_string(),
        }
    }
}

impl EdgarUrls {
    /// Points every endpoint at a single host, e.g. a local mirror of the archive tree.
    pub fn with_root(root: &str) -> Self {
        let root = root.trim_end_matches('/');
        Self {
            www: root.to_string(),
            archives: format!("{}/Archives", root),
            daily_index: format!("{}/Archives/edgar/daily-index", root),
        }
    }
}
