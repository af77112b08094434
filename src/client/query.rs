//! Cached, retrying queries and the collections hook.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::client::api::{CollectionsApi, CollectionsSnapshot};
use crate::client::cache::QueryCache;
use crate::client::config::QueryConfig;
use crate::client::error::ClientError;

/// Cache key of the aggregate collections query.
pub const ALL_COLLECTIONS_KEY: &str = "all-collections";

/// Lifecycle of a query.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    /// No data and no error yet.
    Pending,
    /// Data available, last fetch succeeded.
    Success,
    /// Last fetch failed; earlier data may still be present.
    Error,
}

/// Observable state of a query.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryState<T> {
    /// Current status.
    pub status: QueryStatus,
    /// Data; `None` (serialized `null`) until the first successful fetch.
    pub data: Option<T>,
    /// Message of the last failure.
    pub error: Option<String>,
    /// Whether the data is due for a refetch.
    pub is_stale: bool,
    /// Failed attempts since the last success.
    pub failure_count: u32,
}

impl<T> QueryState<T> {
    /// State before any response has resolved.
    #[must_use]
    pub const fn placeholder() -> Self {
        Self {
            status: QueryStatus::Pending,
            data: None,
            error: None,
            is_stale: true,
            failure_count: 0,
        }
    }

    /// Whether the last fetch failed.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.status, QueryStatus::Error)
    }
}

/// Shared query cache with single-flight fetching and retries.
pub struct QueryClient {
    config: QueryConfig,
    cache: QueryCache,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(QueryConfig::default())
    }
}

impl QueryClient {
    /// Create a client with the given policy.
    #[must_use]
    pub fn new(config: QueryConfig) -> Self {
        Self {
            cache: QueryCache::new(config.clone()),
            config,
            in_flight: DashMap::new(),
        }
    }

    /// Underlying cache.
    #[must_use]
    pub const fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Current state of `key` without fetching.
    #[must_use]
    pub fn state<T>(&self, key: &str) -> QueryState<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let Some(snapshot) = self.cache.snapshot::<T>(key) else {
            return QueryState::placeholder();
        };

        let status = match (&snapshot.error, &snapshot.data) {
            (Some(_), _) => QueryStatus::Error,
            (None, Some(_)) => QueryStatus::Success,
            (None, None) => QueryStatus::Pending,
        };

        QueryState {
            status,
            data: snapshot.data,
            error: snapshot.error,
            is_stale: snapshot.is_stale,
            failure_count: snapshot.failure_count,
        }
    }

    /// Return fresh cached data for `key`, or fetch it.
    ///
    /// Concurrent calls for the same key wait for a single fetch. Failures
    /// are retried up to `retry` times with exponential backoff, unless the
    /// error is not retryable. The final failure is recorded in the cache
    /// alongside any earlier data.
    ///
    /// # Errors
    /// Returns the last error when every attempt fails.
    pub async fn fetch_query<T, F, Fut>(&self, key: &str, fetcher: F) -> Result<T, ClientError>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        if let Some(data) = self.cache.fresh::<T>(key) {
            return Ok(data);
        }

        let gate = self
            .in_flight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let result = {
            let _guard = gate.lock().await;
            self.fetch_with_retry(key, fetcher).await
        };

        // The gate goes away with its last holder.
        drop(gate);
        self.in_flight.remove_if(key, |_, gate| Arc::strong_count(gate) == 1);
        result
    }

    async fn fetch_with_retry<T, F, Fut>(&self, key: &str, fetcher: F) -> Result<T, ClientError>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        // Another caller may have filled the entry while we waited.
        if let Some(data) = self.cache.fresh::<T>(key) {
            return Ok(data);
        }

        let mut failures = 0;
        loop {
            match fetcher().await {
                Ok(data) => {
                    self.cache.set_data(key, data.clone());
                    return Ok(data);
                }
                Err(err) => {
                    failures += 1;
                    let exhausted = failures > self.config.retry || !err.is_retryable();
                    if exhausted {
                        tracing::warn!(key, failures, error = %err, "query failed");
                        self.cache.set_error(key, err.to_string(), failures);
                        return Err(err);
                    }
                    let delay = self.config.retry_delay(failures - 1);
                    tracing::debug!(key, failures, ?delay, error = %err, "retrying query");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Mark `key` stale.
    pub fn invalidate(&self, key: &str) {
        self.cache.invalidate(key);
    }
}

/// Aggregate collections query bound to a client and an API.
pub struct AllCollections<A: CollectionsApi> {
    client: Arc<QueryClient>,
    api: Arc<A>,
}

/// Query every collection through `GET /api/collections`.
#[must_use]
pub fn use_all_collections<A: CollectionsApi>(
    client: Arc<QueryClient>,
    api: Arc<A>,
) -> AllCollections<A> {
    AllCollections { client, api }
}

impl<A: CollectionsApi> AllCollections<A> {
    /// Current state; data is `None` until a response has resolved.
    #[must_use]
    pub fn state(&self) -> QueryState<CollectionsSnapshot> {
        self.client.state(ALL_COLLECTIONS_KEY)
    }

    /// Ensure data is loaded and fresh, then return the resulting state.
    pub async fn fetch(&self) -> QueryState<CollectionsSnapshot> {
        let api = Arc::clone(&self.api);
        let result = self
            .client
            .fetch_query(ALL_COLLECTIONS_KEY, || {
                let api = Arc::clone(&api);
                async move { api.fetch_all_collections().await }
            })
            .await;

        if let Err(err) = result {
            tracing::error!(error = %err, "failed to load collections");
        }
        self.state()
    }
}
