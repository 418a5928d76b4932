use std::string::FromUtf8Error;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EdgarError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("XML parsing error: {0}")]
    XmlError(String),

    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] FromUtf8Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(
        "Unexpected content type from URL {url}. Expected pattern {expected_pattern}, but got Content-Type: {got_content_type}. Content preview: {content_preview}..."
    )]
    UnexpectedContentType {
        url: String,
        expected_pattern: String,
        got_content_type: String,
        content_preview: String,
    },
}

impl EdgarError {
    /// Returns `true` for failures of the remote side: network errors, non-2xx responses
    /// and listings that could not be decoded. Malformed filing documents (`XmlError`,
    /// `Parse`) are filing-level failures instead.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            EdgarError::RequestError(_)
                | EdgarError::NotFound(_)
                | EdgarError::InvalidResponse(_)
                | EdgarError::RateLimitExceeded
                | EdgarError::FileError(_)
                | EdgarError::JsonError(_)
                | EdgarError::Utf8Error(_)
                | EdgarError::UnexpectedContentType { .. }
        )
    }

    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        EdgarError::Parse(msg.into())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        EdgarError::InvalidArgument(msg.into())
    }
}

impl From<quick_xml::Error> for EdgarError {
    fn from(error: quick_xml::Error) -> Self {
        EdgarError::XmlError(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EdgarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(EdgarError::NotFound("x".into()).is_transport());
        assert!(EdgarError::RateLimitExceeded.is_transport());
        assert!(!EdgarError::parse("missing cik").is_transport());
        assert!(!EdgarError::invalid("year").is_transport());
        assert!(!EdgarError::XmlError("unclosed tag".into()).is_transport());
    }
}
