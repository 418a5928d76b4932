use std::time::Duration;

use serde::Deserialize;

use super::crawler::{DEFAULT_PROGRESS_EVERY, DEFAULT_SPEED_BUMP};
use super::error::EdgarError;

/// Default form type selected from the master index.
pub const FORM_13F_HR: &str = "13F-HR";

/// What to do when a single filing cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop the run on the first malformed filing.
    #[default]
    Abort,
    /// Log the filing, record it in the run report and continue.
    Skip,
}

impl ErrorPolicy {
    /// Whether `error` may be skipped under this policy. Transport failures never are.
    pub fn tolerates(&self, error: &EdgarError) -> bool {
        *self == ErrorPolicy::Skip && !error.is_transport()
    }
}

/// Destination table names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub idx_dates: String,
    pub forms: String,
    pub filers: String,
    pub filings: String,
    pub holdings: String,
    pub no_holdings: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            idx_dates: "idx_dates".to_string(),
            forms: "forms".to_string(),
            filers: "filers13f".to_string(),
            filings: "filings13f".to_string(),
            holdings: "holdings13f".to_string(),
            no_holdings: "no_holdings13f".to_string(),
        }
    }
}

/// Options for a [`Pipeline`](crate::Pipeline) run.
///
/// ```
/// use edgar13f::{ErrorPolicy, PipelineOptions};
/// use std::time::Duration;
///
/// let options = PipelineOptions::new()
///     .with_error_policy(ErrorPolicy::Skip)
///     .with_speed_bump(Duration::from_millis(250))
///     .with_batch_size(1000);
/// assert_eq!(options.form_type, "13F-HR");
/// ```
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub form_type: String,
    pub error_policy: ErrorPolicy,
    /// Pause after every request.
    pub speed_bump: Duration,
    /// Rows buffered per table before a flush.
    pub batch_size: usize,
    /// Log progress every this many manifests or filings.
    pub progress_every: usize,
    pub tables: TableNames,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            form_type: FORM_13F_HR.to_string(),
            error_policy: ErrorPolicy::default(),
            speed_bump: DEFAULT_SPEED_BUMP,
            batch_size: 500,
            progress_every: DEFAULT_PROGRESS_EVERY,
            tables: TableNames::default(),
        }
    }
}

impl PipelineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_form_type(mut self, form_type: impl Into<String>) -> Self {
        self.form_type = form_type.into();
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn with_speed_bump(mut self, delay: Duration) -> Self {
        self.speed_bump = delay;
        self
    }

    /// Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Zero is treated as one.
    pub fn with_progress_every(mut self, every: usize) -> Self {
        self.progress_every = every.max(1);
        self
    }

    pub fn with_tables(mut self, tables: TableNames) -> Self {
        self.tables = tables;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = PipelineOptions::default();
        assert_eq!(options.form_type, "13F-HR");
        assert_eq!(options.error_policy, ErrorPolicy::Abort);
        assert_eq!(options.speed_bump, Duration::from_millis(100));
        assert_eq!(options.tables.holdings, "holdings13f");
        assert_eq!(options.tables.no_holdings, "no_holdings13f");
    }

    #[test]
    fn test_builder_clamps_zero() {
        let options = PipelineOptions::new().with_batch_size(0).with_progress_every(0);
        assert_eq!(options.batch_size, 1);
        assert_eq!(options.progress_every, 1);
    }

    #[test]
    fn test_policy_never_tolerates_transport_errors() {
        let parse = EdgarError::Parse("missing cusip".into());
        let missing = EdgarError::NotFound("https://x".into());

        assert!(!ErrorPolicy::Abort.tolerates(&parse));
        assert!(ErrorPolicy::Skip.tolerates(&parse));
        assert!(!ErrorPolicy::Skip.tolerates(&missing));
    }

    #[test]
    fn test_policy_deserializes_lowercase() {
        let policy: ErrorPolicy = serde_json::from_str("\"skip\"").unwrap();
        assert_eq!(policy, ErrorPolicy::Skip);
    }
}
