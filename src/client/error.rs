//! Error types for the client query layer.

use thiserror::Error;

/// Errors surfaced by client queries.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed before a response was received.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// HTTP client configuration error.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// Server answered with a non-success status.
    #[error("server returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// Response body did not match the expected shape.
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ClientError {
    /// Check if this error is retryable.
    ///
    /// Client errors (4xx) and malformed bodies will not improve on retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::HttpRequest(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::HttpClient(_) | Self::JsonParse(_) | Self::InvalidUrl(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        let server = ClientError::Status {
            status: 500,
            body: String::new(),
        };
        let throttled = ClientError::Status {
            status: 429,
            body: String::new(),
        };
        let bad_request = ClientError::Status {
            status: 400,
            body: String::new(),
        };
        assert!(server.is_retryable());
        assert!(throttled.is_retryable());
        assert!(!bad_request.is_retryable());
    }
}
