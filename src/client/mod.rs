//! Client-side data hooks over the site API.
//!
//! - `api`: HTTP access to the JSON endpoints
//! - `cache`: keyed cache with stale and eviction windows
//! - `query`: single-flight, retrying queries and `use_all_collections`
//! - `infinite`: paginated product loading

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod infinite;
pub mod query;

pub use api::{CollectionsApi, CollectionsSnapshot, HttpCollectionsApi, LoadedPage};
pub use cache::QueryCache;
pub use config::QueryConfig;
pub use error::ClientError;
pub use infinite::{use_infinite_products, InfiniteProducts, PaginationState, DEFAULT_PRODUCT_LIMIT};
pub use query::{use_all_collections, AllCollections, QueryClient, QueryState, QueryStatus};
