use async_trait::async_trait;
use governor::{
    Quota, RateLimiter, clock::DefaultClock, middleware::NoOpMiddleware, state::InMemoryState,
    state::NotKeyed,
};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use super::config::{EdgarConfig, EdgarUrls};
use super::error::{EdgarError, Result};
use super::traits::Fetch;

const INITIAL_BACKOFF_MS: u64 = 1000; // 1 second
const MAX_BACKOFF_EXPONENT: u32 = 6; // caps the wait at ~64 seconds

type Governor = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// HTTP transport for the SEC EDGAR archives.
///
/// `Edgar` is the production [`Fetch`] implementation. It identifies itself with the
/// user agent SEC.gov requires, caps the request rate with a token bucket, and maps HTTP
/// status codes onto [`EdgarError`] variants. The crawler's own post-request delay is
/// applied on top of this by [`Crawler`](crate::Crawler).
///
/// # Rate Limiting
///
/// SEC.gov fair access rules allow at most 10 requests per second:
///
/// ```text
/// Token Bucket (capacity: 10 tokens)
/// ┌──────────────────────────┐
/// │ ████████████████████████ │  ← Tokens refill at 10/sec
/// └──────────────────────────┘
///      ↓ consume on request
/// ```
///
/// # Retries
///
/// By default nothing is retried and the first failure is returned to the caller.
/// Setting [`EdgarConfig::max_retries`] enables retries of HTTP 429 responses and network
/// failures with exponential backoff and jitter.
///
/// # Examples
///
/// ```rust
/// # use edgar13f::Edgar;
/// let edgar = Edgar::new("my_app/1.0 (my@email.com)")?;
/// # Ok::<(), edgar13f::EdgarError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Edgar {
    /// HTTP client for making requests
    pub(crate) client: reqwest::Client,

    /// Token bucket rate limiter for SEC compliance
    pub(crate) rate_limiter: Arc<Governor>,

    /// Retry budget for 429 responses and network errors
    pub(crate) max_retries: u32,

    /// Endpoint roots
    pub(crate) urls: EdgarUrls,
}

impl Edgar {
    /// Creates a new Edgar client with sensible defaults.
    ///
    /// The client is limited to 10 requests per second, times out after 30 seconds and
    /// talks to the public SEC.gov endpoints.
    ///
    /// # Arguments
    ///
    /// * `user_agent` - A descriptive identifier for your application, following the format
    ///   "AppName/Version (contact@email.com)". The SEC requires this to contact you if
    ///   your application causes issues.
    pub fn new(user_agent: &str) -> Result<Self> {
        let config = EdgarConfig {
            user_agent: user_agent.to_string(),
            ..EdgarConfig::default()
        };
        Self::with_config(config)
    }

    /// Creates an Edgar client with custom configuration settings.
    ///
    /// # Errors
    ///
    /// Returns `EdgarError::ConfigError` if the user agent is malformed, the rate limit
    /// is zero, or the HTTP client cannot be built with the provided configuration.
    pub fn with_config(config: EdgarConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| EdgarError::ConfigError(format!("Invalid user agent: {}", e)))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| EdgarError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(
            NonZeroU32::new(config.rate_limit).ok_or_else(|| {
                EdgarError::ConfigError("Rate limit must be greater than zero".to_string())
            })?,
        )));

        Ok(Edgar {
            client,
            rate_limiter,
            max_retries: config.max_retries,
            urls: config.base_urls,
        })
    }

    /// Wait before the given retry attempt: `(2^retry × 1000ms) ± 20%`, with the exponent
    /// capped at 6.
    fn calculate_backoff(retry: u32) -> Duration {
        let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(retry.min(MAX_BACKOFF_EXPONENT));
        let jitter = (backoff_ms as f64 * 0.2 * (fastrand::f64() - 0.5)) as i64;
        Duration::from_millis((backoff_ms as i64 + jitter) as u64)
    }

    /// Sends a GET request and returns the successful response.
    ///
    /// 404 becomes `NotFound`, 429 is retried while the retry budget lasts, any other
    /// non-success status becomes `InvalidResponse` with a preview of the body.
    async fn send(&self, url: &str) -> Result<reqwest::Response> {
        let mut retries = 0;

        loop {
            self.rate_limiter.until_ready().await;
            tracing::debug!(url, "GET");

            let response = match self.client.get(url).send().await {
                Ok(response) => response,
                Err(e) => {
                    if retries >= self.max_retries {
                        return Err(EdgarError::RequestError(e));
                    }
                    let backoff = Self::calculate_backoff(retries);
                    tracing::warn!(
                        "Request failed for {}: {:?}. Attempt {}/{}. Retrying in {:?}.",
                        url,
                        e,
                        retries + 1,
                        self.max_retries + 1,
                        backoff
                    );
                    sleep(backoff).await;
                    retries += 1;
                    continue;
                }
            };

            match response.status() {
                status if status.is_success() => return Ok(response),
                reqwest::StatusCode::NOT_FOUND => {
                    return Err(EdgarError::NotFound(url.to_string()));
                }
                reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    if retries >= self.max_retries {
                        return Err(EdgarError::RateLimitExceeded);
                    }

                    let retry_after = response
                        .headers()
                        .get("retry-after")
                        .and_then(|h| h.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .map(Duration::from_secs)
                        .unwrap_or_else(|| Self::calculate_backoff(retries));

                    tracing::warn!(
                        "Rate limit hit (429) for {}. Attempt {}/{}. Waiting for {:?} before retry.",
                        url,
                        retries + 1,
                        self.max_retries + 1,
                        retry_after
                    );
                    sleep(retry_after).await;
                    retries += 1;
                }
                other_status => {
                    let error_body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to read error body".to_string());

                    return Err(EdgarError::InvalidResponse(format!(
                        "Unexpected status code: {} for URL: {}. Response preview: {}",
                        other_status,
                        url,
                        error_body.chars().take(200).collect::<String>()
                    )));
                }
            }
        }
    }

    /// Returns the endpoint roots this client was configured with.
    pub fn urls(&self) -> &EdgarUrls {
        &self.urls
    }
}

#[async_trait]
impl Fetch for Edgar {
    /// Fetches text content, validating that `.json` URLs did not return an HTML error page.
    ///
    /// The SEC sometimes serves JSON with a `text/html` content-type, so a body that looks
    /// like JSON is accepted regardless of the header.
    async fn get(&self, url: &str) -> Result<String> {
        let response = self.send(url).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|val| val.to_str().ok())
            .map(str::to_lowercase);

        let body = response.text().await.map_err(EdgarError::RequestError)?;

        if url.ends_with(".json") {
            if let Some(ct) = content_type.filter(|ct| ct.contains("text/html")) {
                let trimmed = body.trim_start();
                if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
                    return Err(EdgarError::UnexpectedContentType {
                        url: url.to_string(),
                        expected_pattern: "application/json".to_string(),
                        got_content_type: ct,
                        content_preview: body.chars().take(200).collect(),
                    });
                }
                tracing::warn!(
                    "Received text/html content-type for .json URL, but content appears to be JSON: {}",
                    url
                );
            }
        }

        Ok(body)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.send(url).await?;
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(EdgarError::RequestError)
    }
}
