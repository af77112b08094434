//! JSON error responses.
//!
//! Every handler failure ends up here; nothing escapes the HTTP boundary as a
//! bare error.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::cms::CmsError;

/// Error body and status returned by a handler.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    /// Map a CMS error to a response.
    ///
    /// Input errors keep their dedicated bodies; anything else becomes a 500
    /// whose `error` is `context` and whose `details` is the error text.
    #[must_use]
    pub fn from_cms(err: CmsError, context: &str) -> Self {
        match err {
            CmsError::InvalidCollection { received, expected } => {
                tracing::warn!(%received, "rejected unknown collection");
                Self {
                    status: StatusCode::BAD_REQUEST,
                    body: json!({
                        "error": "Invalid collection name",
                        "received": received,
                        "expected": expected,
                    }),
                }
            }
            CmsError::UnsupportedOperation(collection) => {
                tracing::info!(%collection, "rejected insertion");
                Self {
                    status: StatusCode::BAD_REQUEST,
                    body: json!({
                        "error": "This collection does not support insertion via API",
                        "collection": collection.as_str(),
                    }),
                }
            }
            CmsError::InvalidPagination(details) => Self {
                status: StatusCode::BAD_REQUEST,
                body: json!({
                    "error": "Invalid pagination parameters",
                    "details": details,
                }),
            },
            other => {
                tracing::error!(error = %other, "{context}");
                Self::internal(context, other.to_string())
            }
        }
    }

    /// A 500 response with `error` and `details`.
    #[must_use]
    pub fn internal(error: &str, details: impl Into<String>) -> Self {
        let details: String = details.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: json!({ "error": error, "details": details }),
        }
    }

    /// Response status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::CollectionName;

    #[test]
    fn test_status_mapping() {
        let invalid = CollectionName::parse("Nope").err();
        let invalid = invalid.map(|e| ApiError::from_cms(e, "ctx").status());
        assert_eq!(invalid, Some(StatusCode::BAD_REQUEST));

        let unsupported =
            ApiError::from_cms(CmsError::UnsupportedOperation(CollectionName::Hero), "ctx");
        assert_eq!(unsupported.status(), StatusCode::BAD_REQUEST);
        assert_eq!(unsupported.body["collection"], "Hero");

        let remote = ApiError::from_cms(
            CmsError::RemoteFetch {
                collection: CollectionName::Hero,
                reason: "timeout".to_string(),
            },
            "Failed to fetch collections",
        );
        assert_eq!(remote.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(remote.body["error"], "Failed to fetch collections");
        assert!(remote.body["details"].as_str().is_some_and(|d| d.contains("timeout")));
    }
}
