//! Error types for the CMS layer.

use thiserror::Error;

use crate::cms::collections::CollectionName;

/// Errors that can occur while reading content from the CMS.
#[derive(Debug, Error)]
pub enum CmsError {
    /// Collection name outside the recognized set.
    #[error("invalid collection name: {received}")]
    InvalidCollection {
        /// Name supplied by the caller.
        received: String,
        /// Every recognized collection id.
        expected: Vec<String>,
    },

    /// Backend unreachable or returned a non-success status.
    #[error("failed to fetch collection {collection}: {reason}")]
    RemoteFetch {
        /// Collection being read.
        collection: CollectionName,
        /// Transport error or status description.
        reason: String,
    },

    /// Write attempted against a collection that only supports reads.
    #[error("collection {0} does not support insertion via API")]
    UnsupportedOperation(CollectionName),

    /// Item payload could not be decoded or breaks an item invariant.
    #[error("invalid item in collection {collection}: {reason}")]
    InvalidItem {
        /// Collection the item came from.
        collection: CollectionName,
        /// What was wrong with it.
        reason: String,
    },

    /// Page or limit out of range.
    #[error("invalid pagination parameters: {0}")]
    InvalidPagination(String),

    /// HTTP client configuration error.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// URL parsing error.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl CmsError {
    /// Whether the caller supplied bad input, as opposed to a backend failure.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCollection { .. }
            | Self::UnsupportedOperation(_)
            | Self::InvalidPagination(_)
        )
    }

    /// Check if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteFetch { .. })
    }
}
