//! CMS content-aggregation layer.
//!
//! This module reads the site's content from the CMS:
//! - Closed set of collections and their typed schema
//! - Envelope normalization of raw item payloads
//! - Single collection, aggregate, and paginated reads

pub mod aggregate;
pub mod backend;
pub mod collections;
pub mod error;
pub mod schema;

pub use aggregate::{AggregateMetadata, AggregateResponse, CollectionPayload, ProductPage};
pub use backend::{BackendPage, CmsBackend, Paging, WixBackend};
pub use collections::CollectionName;
pub use error::CmsError;
pub use schema::{ContentBase, ContentItem, Envelope, EnvelopeError, Field, ProductItem};

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use serde_json::Value;

use crate::config::CmsConfig;

/// Largest window a full collection read asks for.
pub const COLLECTION_FETCH_LIMIT: u32 = 1000;

/// Largest page size served by [`CollectionService::fetch_page`]; larger
/// requests are clamped to it.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Reads collections from the CMS and shapes them for the API.
#[derive(Clone)]
pub struct CollectionService {
    backend: Arc<dyn CmsBackend>,
}

impl CollectionService {
    /// Create a service over any backend.
    #[must_use]
    pub fn new(backend: Arc<dyn CmsBackend>) -> Self {
        Self { backend }
    }

    /// Create a service talking to the configured CMS.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn from_config(config: &CmsConfig) -> Result<Self, CmsError> {
        Ok(Self::new(Arc::new(WixBackend::new(config)?)))
    }

    /// Fetch every item of one collection.
    ///
    /// # Errors
    /// Returns [`CmsError::RemoteFetch`] when the backend fails, and
    /// [`CmsError::InvalidItem`] when an item cannot be decoded or repeats an
    /// identifier.
    pub async fn fetch_collection(
        &self,
        collection: CollectionName,
    ) -> Result<Vec<ContentItem>, CmsError> {
        let page = self
            .backend
            .query(
                collection,
                Paging {
                    limit: COLLECTION_FETCH_LIMIT,
                    offset: 0,
                },
            )
            .await?;

        let items = decode_items(collection, page.items)?;
        tracing::debug!(%collection, count = items.len(), "fetched collection");
        Ok(items)
    }

    /// Fetch every known collection.
    ///
    /// Reads run concurrently. Any failing collection fails the whole
    /// aggregate.
    ///
    /// # Errors
    /// Returns the first error reported by [`Self::fetch_collection`].
    pub async fn fetch_all_collections(&self) -> Result<AggregateResponse, CmsError> {
        let reads = CollectionName::ALL.into_iter().map(|collection| async move {
            self.fetch_collection(collection)
                .await
                .map(|items| (collection, items))
        });

        let entries = try_join_all(reads).await?;
        let response = AggregateResponse::new(entries, Utc::now());
        tracing::info!(
            collections = response.metadata.total_collections,
            "fetched all collections"
        );
        Ok(response)
    }

    /// Fetch one page of a collection.
    ///
    /// `page` starts at 1 and `limit` is clamped to [`MAX_PAGE_LIMIT`]. One
    /// extra item is requested so that `has_next` is exact; it is dropped
    /// before decoding.
    ///
    /// # Errors
    /// Returns [`CmsError::InvalidPagination`] for a zero page or limit,
    /// otherwise the same errors as [`Self::fetch_collection`].
    pub async fn fetch_page(
        &self,
        collection: CollectionName,
        page: u32,
        limit: u32,
    ) -> Result<ProductPage, CmsError> {
        if page == 0 {
            return Err(CmsError::InvalidPagination(
                "page must be a positive integer".to_string(),
            ));
        }
        if limit == 0 {
            return Err(CmsError::InvalidPagination(
                "limit must be a positive integer".to_string(),
            ));
        }
        let limit = limit.min(MAX_PAGE_LIMIT);

        let offset = u64::from(page - 1) * u64::from(limit);
        let raw = self
            .backend
            .query(
                collection,
                Paging {
                    limit: limit + 1,
                    offset,
                },
            )
            .await?;

        let mut raw_items = raw.items;
        let has_next = raw_items.len() > limit as usize;
        raw_items.truncate(limit as usize);

        Ok(ProductPage {
            items: decode_items(collection, raw_items)?,
            has_next,
            total_count: raw.total,
        })
    }
}

/// Normalize, decode and check a batch of raw payloads.
fn decode_items(collection: CollectionName, raw: Vec<Value>) -> Result<Vec<ContentItem>, CmsError> {
    let mut seen = HashSet::with_capacity(raw.len());
    raw.into_iter()
        .map(|value| {
            let item = schema::decode_item(collection, value)?;
            if !seen.insert(item.base().id.clone()) {
                return Err(CmsError::InvalidItem {
                    collection,
                    reason: format!("duplicate _id {}", item.base().id),
                });
            }
            Ok(item)
        })
        .collect()
}
