//! Remote CMS access.
//!
//! [`CmsBackend`] is the seam between the collection service and the CMS.
//! [`WixBackend`] talks to the Wix Data items query API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::cms::collections::CollectionName;
use crate::cms::error::CmsError;
use crate::config::CmsConfig;

/// Path of the items query endpoint, relative to the API base URL.
const QUERY_PATH: &str = "wix-data/v2/items/query";

/// Window requested from the backend.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Paging {
    /// Maximum number of items.
    pub limit: u32,
    /// Items to skip.
    pub offset: u64,
}

/// Raw result of a backend query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BackendPage {
    /// Item payloads, possibly wrapped in `{ "data": ... }`.
    pub items: Vec<Value>,
    /// Total number of items in the collection, when reported.
    pub total: Option<u64>,
}

/// Read access to the CMS.
#[async_trait]
pub trait CmsBackend: Send + Sync {
    /// Query one window of a collection.
    ///
    /// # Errors
    /// Returns [`CmsError::RemoteFetch`] when the backend is unreachable or
    /// answers with a non-success status.
    async fn query(
        &self,
        collection: CollectionName,
        paging: Paging,
    ) -> Result<BackendPage, CmsError>;
}

/// Wix Data REST backend.
pub struct WixBackend {
    client: reqwest::Client,
    endpoint: Url,
}

impl WixBackend {
    /// Create a backend for the given configuration.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or a credential cannot be
    /// used as a header value.
    pub fn new(config: &CmsConfig) -> Result<Self, CmsError> {
        let endpoint = query_url(&config.api_base_url)?;
        let client = Self::build_client(config)?;
        Ok(Self { client, endpoint })
    }

    fn build_client(config: &CmsConfig) -> Result<reqwest::Client, CmsError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let credentials = [
            ("authorization", &config.api_token),
            ("wix-site-id", &config.site_id),
            ("wix-client-id", &config.client_id),
        ];
        for (name, value) in credentials {
            if let Some(value) = value {
                let mut header = HeaderValue::from_str(value)
                    .map_err(|e| CmsError::HttpClient(format!("invalid {name} header: {e}")))?;
                header.set_sensitive(true);
                headers.insert(HeaderName::from_static(name), header);
            }
        }

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| CmsError::HttpClient(e.to_string()))
    }
}

#[async_trait]
impl CmsBackend for WixBackend {
    async fn query(
        &self,
        collection: CollectionName,
        paging: Paging,
    ) -> Result<BackendPage, CmsError> {
        let remote = |reason: String| CmsError::RemoteFetch { collection, reason };

        let body = QueryRequest {
            data_collection_id: collection.as_str(),
            query: QuerySpec {
                paging: QueryPaging {
                    limit: paging.limit,
                    offset: paging.offset,
                },
            },
        };

        tracing::debug!(
            %collection,
            limit = paging.limit,
            offset = paging.offset,
            "querying CMS"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| remote(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(remote(format!("CMS returned status: {status}")));
        }

        let body: QueryResponse = response.json().await.map_err(|e| remote(e.to_string()))?;
        Ok(BackendPage {
            items: body.data_items,
            total: body.paging_metadata.and_then(|meta| meta.total),
        })
    }
}

/// Resolve the query endpoint against the base URL, keeping any base path.
fn query_url(base: &str) -> Result<Url, CmsError> {
    let mut base = Url::parse(base)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(QUERY_PATH)?)
}

// Wix Data request/response structures

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    data_collection_id: &'a str,
    query: QuerySpec,
}

#[derive(Debug, Serialize)]
struct QuerySpec {
    paging: QueryPaging,
}

#[derive(Debug, Serialize)]
struct QueryPaging {
    limit: u32,
    offset: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    data_items: Vec<Value>,
    #[serde(default)]
    paging_metadata: Option<PagingMetadata>,
}

#[derive(Debug, Deserialize)]
struct PagingMetadata {
    #[serde(default)]
    total: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    /// Headers and body of each request received by the stand-in CMS.
    type Received = Arc<Mutex<Vec<(HeaderMap, Value)>>>;

    async fn items_query(
        State(received): State<Received>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        if let Ok(mut received) = received.lock() {
            received.push((headers, body));
        }
        Json(json!({
            "dataItems": [
                { "_id": "p1", "title": "Yellow corn" },
                { "id": "w2", "data": { "_id": "p2", "title": "Milling wheat" } }
            ],
            "pagingMetadata": { "count": 2, "total": 42 }
        }))
    }

    /// Serve a stand-in CMS on a random local port and return its base URL.
    ///
    /// `/up` answers item queries, `/down` is unavailable.
    async fn serve_cms(received: Received) -> String {
        let app = Router::new()
            .route("/up/wix-data/v2/items/query", post(items_query))
            .route(
                "/down/wix-data/v2/items/query",
                post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
            )
            .with_state(received);

        let listener = match tokio::net::TcpListener::bind("127.0.0.1:0").await {
            Ok(listener) => listener,
            Err(err) => panic!("bind failed: {err}"),
        };
        let addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(err) => panic!("no local address: {err}"),
        };
        tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::error!("stand-in CMS stopped: {err}");
            }
        });
        format!("http://{addr}")
    }

    fn backend(base_url: String) -> WixBackend {
        let config = CmsConfig::default()
            .with_base_url(base_url)
            .with_api_token("token-123")
            .with_site_id("site-456");
        match WixBackend::new(&config) {
            Ok(backend) => backend,
            Err(err) => panic!("backend creation failed: {err}"),
        }
    }

    #[test]
    fn test_query_url_keeps_base_path() {
        let url = query_url("https://www.wixapis.com").map(String::from);
        assert_eq!(
            url.ok().as_deref(),
            Some("https://www.wixapis.com/wix-data/v2/items/query")
        );

        let proxied = query_url("http://localhost:8080/cms").map(String::from);
        assert_eq!(
            proxied.ok().as_deref(),
            Some("http://localhost:8080/cms/wix-data/v2/items/query")
        );
    }

    #[test]
    fn test_query_url_rejects_garbage() {
        assert!(matches!(query_url("::nope"), Err(CmsError::InvalidUrl(_))));
    }

    #[test]
    fn test_request_body_shape() {
        let body = QueryRequest {
            data_collection_id: CollectionName::Products.as_str(),
            query: QuerySpec {
                paging: QueryPaging { limit: 7, offset: 12 },
            },
        };
        let json = serde_json::to_value(&body).unwrap_or_default();
        assert_eq!(
            json,
            serde_json::json!({
                "dataCollectionId": "Import2",
                "query": { "paging": { "limit": 7, "offset": 12 } }
            })
        );
    }

    #[test]
    fn test_response_defaults() {
        let parsed: QueryResponse = serde_json::from_str("{}").unwrap_or(QueryResponse {
            data_items: vec![Value::Null],
            paging_metadata: None,
        });
        assert!(parsed.data_items.is_empty());
        assert!(parsed.paging_metadata.is_none());
    }

    #[test]
    fn test_backend_builds_with_credentials() {
        let config = CmsConfig::default()
            .with_api_token("token")
            .with_site_id("site")
            .with_client_id("client");
        assert!(WixBackend::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_query_over_http() {
        let received = Received::default();
        let base = serve_cms(received.clone()).await;

        let page = backend(format!("{base}/up"))
            .query(CollectionName::Products, Paging { limit: 7, offset: 14 })
            .await;
        let page = match page {
            Ok(page) => page,
            Err(err) => panic!("query failed: {err}"),
        };
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0]["_id"], "p1");
        assert_eq!(page.items[1]["data"]["_id"], "p2");
        assert_eq!(page.total, Some(42));

        let received = received.lock().map(|r| r.clone()).unwrap_or_default();
        assert_eq!(received.len(), 1);
        let (headers, body) = &received[0];
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        assert_eq!(header("authorization"), Some("token-123"));
        assert_eq!(header("wix-site-id"), Some("site-456"));
        assert_eq!(header("wix-client-id"), None);
        assert_eq!(
            body,
            &json!({
                "dataCollectionId": "Import2",
                "query": { "paging": { "limit": 7, "offset": 14 } }
            })
        );
    }

    #[tokio::test]
    async fn test_non_success_status_is_remote_fetch_error() {
        let base = serve_cms(Received::default()).await;

        let result = backend(format!("{base}/down"))
            .query(CollectionName::Stats, Paging { limit: 10, offset: 0 })
            .await;
        match result {
            Err(CmsError::RemoteFetch { collection, reason }) => {
                assert_eq!(collection, CollectionName::Stats);
                assert!(reason.contains("503"), "unexpected reason: {reason}");
            }
            other => panic!("expected remote fetch error, got {other:?}"),
        }
    }
}
