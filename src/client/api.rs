//! HTTP access to the site's own API, as used by page code.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::client::error::ClientError;
use crate::cms::aggregate::AggregateMetadata;
use crate::cms::collections::CollectionName;
use crate::cms::schema::{Envelope, ProductItem};

/// Body of `GET /api/collections` as seen by a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollectionsSnapshot {
    /// Raw payload per collection id: an array, an object, or `null`.
    #[serde(flatten)]
    pub collections: BTreeMap<String, Value>,
    /// Fetch metadata.
    #[serde(rename = "_metadata")]
    pub metadata: AggregateMetadata,
}

impl CollectionsSnapshot {
    /// Raw payload of one collection.
    #[must_use]
    pub fn get(&self, collection: CollectionName) -> Option<&Value> {
        self.collections.get(collection.as_str())
    }
}

/// One loaded page of products, items already unwrapped.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedPage {
    /// Products of the page.
    pub items: Vec<ProductItem>,
    /// Whether another page follows.
    pub has_next: bool,
    /// Collection size, when reported.
    pub total_count: Option<u64>,
}

/// Page body as sent by the server. Missing pagination fields default.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageBody {
    #[serde(default)]
    items: Vec<Envelope<ProductItem>>,
    #[serde(default)]
    has_next: bool,
    #[serde(default)]
    total_count: Option<u64>,
}

impl From<PageBody> for LoadedPage {
    fn from(body: PageBody) -> Self {
        Self {
            items: body.items.into_iter().map(Envelope::into_inner).collect(),
            has_next: body.has_next,
            total_count: body.total_count,
        }
    }
}

/// Decode a products page body.
///
/// # Errors
/// Returns an error when the body is not JSON or an item is neither a bare
/// product nor a `{ "data": product }` envelope.
pub fn decode_page(body: &str) -> Result<LoadedPage, ClientError> {
    let body: PageBody = serde_json::from_str(body)?;
    Ok(body.into())
}

/// Endpoints consumed by the data hooks.
#[async_trait]
pub trait CollectionsApi: Send + Sync {
    /// `GET /api/collections`.
    ///
    /// # Errors
    /// Returns an error on transport failure, non-success status, or
    /// malformed body.
    async fn fetch_all_collections(&self) -> Result<CollectionsSnapshot, ClientError>;

    /// `GET /api/collections/Import2?page={page}&limit={limit}`.
    ///
    /// # Errors
    /// Same as [`CollectionsApi::fetch_all_collections`].
    async fn fetch_products_page(&self, page: u32, limit: u32) -> Result<LoadedPage, ClientError>;
}

/// [`CollectionsApi`] over HTTP.
pub struct HttpCollectionsApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpCollectionsApi {
    /// Create a client for the server at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be
    /// created.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::HttpClient(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    fn collections_url(&self) -> Result<Url, ClientError> {
        Ok(self.base_url.join("api/collections")?)
    }

    fn products_url(&self, page: u32, limit: u32) -> Result<Url, ClientError> {
        let mut url = self
            .base_url
            .join(&format!("api/collections/{}", CollectionName::Products.as_str()))?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string());
        Ok(url)
    }

    async fn get_text(&self, url: Url) -> Result<String, ClientError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        let body = self.get_text(url).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl CollectionsApi for HttpCollectionsApi {
    async fn fetch_all_collections(&self) -> Result<CollectionsSnapshot, ClientError> {
        self.get_json(self.collections_url()?).await
    }

    async fn fetch_products_page(&self, page: u32, limit: u32) -> Result<LoadedPage, ClientError> {
        let body = self.get_text(self.products_url(page, limit)?).await?;
        decode_page(&body)
    }
}
