//! Infinite pagination over the product catalogue.
//!
//! Pages are requested with a 1-based index. The next index is the number of
//! loaded pages plus one while the last page reports `has_next`; after that
//! the sequence is exhausted. A failed fetch moves to `Error` and keeps the
//! pages loaded so far, so the same page can be requested again.

use std::sync::Arc;

use crate::client::api::{CollectionsApi, LoadedPage};
use crate::client::error::ClientError;
use crate::client::query::QueryClient;
use crate::cms::schema::ProductItem;

/// Products per page when the caller does not choose.
pub const DEFAULT_PRODUCT_LIMIT: u32 = 6;

/// Where the pagination sequence stands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PaginationState {
    /// No page loaded yet.
    Idle,
    /// Pages loaded; the server reported more.
    MoreAvailable,
    /// Pages loaded; the last one had no successor.
    Exhausted,
    /// Last fetch failed.
    Error,
}

/// Paginated product query.
pub struct InfiniteProducts<A: CollectionsApi> {
    client: Arc<QueryClient>,
    api: Arc<A>,
    limit: u32,
    pages: Vec<LoadedPage>,
    state: PaginationState,
    last_error: Option<String>,
}

/// Page through products, `limit` per page (default 6).
#[must_use]
pub fn use_infinite_products<A: CollectionsApi>(
    client: Arc<QueryClient>,
    api: Arc<A>,
    limit: Option<u32>,
) -> InfiniteProducts<A> {
    InfiniteProducts {
        client,
        api,
        limit: limit.unwrap_or(DEFAULT_PRODUCT_LIMIT),
        pages: Vec::new(),
        state: PaginationState::Idle,
        last_error: None,
    }
}

impl<A: CollectionsApi> InfiniteProducts<A> {
    /// Page size.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> PaginationState {
        self.state
    }

    /// Loaded pages, in order.
    #[must_use]
    pub fn pages(&self) -> &[LoadedPage] {
        &self.pages
    }

    /// All loaded products, in order.
    pub fn items(&self) -> impl Iterator<Item = &ProductItem> {
        self.pages.iter().flat_map(|page| page.items.iter())
    }

    /// Message of the last failed fetch.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Total product count reported by the most recent page.
    #[must_use]
    pub fn total_count(&self) -> Option<u64> {
        self.pages.last().and_then(|page| page.total_count)
    }

    /// Index of the page to request next, or `None` once exhausted.
    #[must_use]
    pub fn next_page_param(&self) -> Option<u32> {
        match self.pages.last() {
            None => Some(1),
            Some(last) if last.has_next => u32::try_from(self.pages.len() + 1).ok(),
            Some(_) => None,
        }
    }

    /// Whether another page can be requested.
    #[must_use]
    pub fn has_next_page(&self) -> bool {
        self.next_page_param().is_some()
    }

    /// Load the next page.
    ///
    /// Does nothing once the sequence is exhausted.
    ///
    /// # Errors
    /// Returns the fetch error; the state becomes [`PaginationState::Error`]
    /// and loaded pages are kept.
    pub async fn fetch_next_page(&mut self) -> Result<PaginationState, ClientError> {
        let Some(page) = self.next_page_param() else {
            self.state = PaginationState::Exhausted;
            return Ok(self.state);
        };

        let limit = self.limit;
        let key = format!("products:infinite:{limit}:page:{page}");
        let api = Arc::clone(&self.api);
        let result = self
            .client
            .fetch_query(&key, || {
                let api = Arc::clone(&api);
                async move { api.fetch_products_page(page, limit).await }
            })
            .await;

        match result {
            Ok(loaded) => {
                self.state = if loaded.has_next {
                    PaginationState::MoreAvailable
                } else {
                    PaginationState::Exhausted
                };
                self.pages.push(loaded);
                self.last_error = None;
                tracing::debug!(
                    page,
                    loaded = self.pages.len(),
                    state = ?self.state,
                    "loaded product page"
                );
                Ok(self.state)
            }
            Err(err) => {
                tracing::error!(page, error = %err, "failed to load product page");
                self.state = PaginationState::Error;
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::api::CollectionsSnapshot;
    use crate::client::config::QueryConfig;
    use crate::cms::schema::{ContentBase, Field};
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::Map;
    use std::sync::Mutex;

    struct CatalogueApi {
        total: u32,
        fail_pages: Mutex<Vec<u32>>,
        requests: Mutex<Vec<(u32, u32)>>,
    }

    impl CatalogueApi {
        fn new(total: u32, fail_pages: Vec<u32>) -> Arc<Self> {
            Arc::new(Self {
                total,
                fail_pages: Mutex::new(fail_pages),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<(u32, u32)> {
            self.requests.lock().map(|r| r.clone()).unwrap_or_default()
        }
    }

    fn product(id: u32) -> ProductItem {
        let now = Utc::now();
        ProductItem {
            base: ContentBase {
                id: format!("p{id}"),
                owner: "owner".to_string(),
                created_date: now,
                updated_date: now,
                is_active: Some(true),
            },
            title: Some(Field::Typed(format!("Product {id}"))),
            description: None,
            image: None,
            category: None,
            origin: None,
            slug: None,
            extra: Map::new(),
        }
    }

    #[async_trait]
    impl CollectionsApi for CatalogueApi {
        async fn fetch_all_collections(&self) -> Result<CollectionsSnapshot, ClientError> {
            Err(ClientError::HttpClient("not used".to_string()))
        }

        async fn fetch_products_page(
            &self,
            page: u32,
            limit: u32,
        ) -> Result<LoadedPage, ClientError> {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push((page, limit));
            }
            if let Ok(mut fail) = self.fail_pages.lock() {
                if let Some(pos) = fail.iter().position(|p| *p == page) {
                    fail.remove(pos);
                    return Err(ClientError::Status {
                        status: 400,
                        body: "{\"error\":\"Invalid pagination parameters\"}".to_string(),
                    });
                }
            }
            let start = (page - 1) * limit;
            let end = (start + limit).min(self.total);
            Ok(LoadedPage {
                items: (start..end).map(product).collect(),
                has_next: end < self.total,
                total_count: Some(u64::from(self.total)),
            })
        }
    }

    fn client() -> Arc<QueryClient> {
        Arc::new(QueryClient::new(QueryConfig::default().with_retry(0)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_follows_has_next_until_exhausted() {
        let api = CatalogueApi::new(14, Vec::new());
        let mut products = use_infinite_products(client(), Arc::clone(&api), None);
        assert_eq!(products.state(), PaginationState::Idle);
        assert_eq!(products.next_page_param(), Some(1));

        assert_eq!(products.fetch_next_page().await.ok(), Some(PaginationState::MoreAvailable));
        assert_eq!(products.next_page_param(), Some(2));
        assert_eq!(products.fetch_next_page().await.ok(), Some(PaginationState::MoreAvailable));
        assert_eq!(products.fetch_next_page().await.ok(), Some(PaginationState::Exhausted));
        assert_eq!(products.next_page_param(), None);
        assert!(!products.has_next_page());

        let count = products.items().count() as u64;
        assert_eq!(Some(count), products.total_count());
        assert_eq!(api.requests(), vec![(1, 6), (2, 6), (3, 6)]);

        // No request once exhausted.
        assert_eq!(products.fetch_next_page().await.ok(), Some(PaginationState::Exhausted));
        assert_eq!(api.requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_keeps_loaded_pages() {
        let api = CatalogueApi::new(10, vec![2]);
        let mut products = use_infinite_products(client(), Arc::clone(&api), Some(4));

        assert!(products.fetch_next_page().await.is_ok());
        assert!(products.fetch_next_page().await.is_err());
        assert_eq!(products.state(), PaginationState::Error);
        assert_eq!(products.pages().len(), 1);
        assert!(products.last_error().is_some());
        assert_eq!(products.next_page_param(), Some(2));

        assert_eq!(products.fetch_next_page().await.ok(), Some(PaginationState::MoreAvailable));
        assert_eq!(products.pages().len(), 2);
        assert!(products.last_error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_catalogue_is_exhausted_after_first_page() {
        let api = CatalogueApi::new(0, Vec::new());
        let mut products = use_infinite_products(client(), api, None);
        assert_eq!(products.fetch_next_page().await.ok(), Some(PaginationState::Exhausted));
        assert_eq!(products.items().count(), 0);
        assert_eq!(products.limit(), DEFAULT_PRODUCT_LIMIT);
    }
}
