//! HTTP route handlers for the site API.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::Value;

use crate::client::DEFAULT_PRODUCT_LIMIT;
use crate::cms::{AggregateResponse, CmsError, CollectionName, ProductPage};
use crate::seo;

use super::error::ApiError;
use super::state::AppState;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/collections", get(all_collections))
        .route("/api/collections/{collection}", get(collection_page))
        .route("/api/wix-collections/{collection}", post(insert_item))
        .route("/robots.txt", get(robots_txt))
        .route("/sitemap.xml", get(sitemap_xml))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "agritrade-site",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Every known collection plus fetch metadata.
async fn all_collections(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AggregateResponse>, ApiError> {
    state
        .collections
        .fetch_all_collections()
        .await
        .map(Json)
        .map_err(|e| ApiError::from_cms(e, "Failed to fetch collections"))
}

/// One page of a collection: `?page=1&limit=6`.
async fn collection_page(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ProductPage>, ApiError> {
    let context = "Failed to fetch collection page";
    let collection =
        CollectionName::parse(&collection).map_err(|e| ApiError::from_cms(e, context))?;
    let page =
        pagination_param(&params, "page", 1).map_err(|e| ApiError::from_cms(e, context))?;
    let limit = pagination_param(&params, "limit", DEFAULT_PRODUCT_LIMIT)
        .map_err(|e| ApiError::from_cms(e, context))?;

    state
        .collections
        .fetch_page(collection, page, limit)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_cms(e, context))
}

/// Write-shaped endpoint that never writes.
///
/// The collection name is checked first, then the body must be JSON; a known
/// collection with a well-formed body is still rejected.
async fn insert_item(
    Path(collection): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let context = "Failed to process insertion request";
    let collection =
        CollectionName::parse(&collection).map_err(|e| ApiError::from_cms(e, context))?;

    let _payload: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::from_cms(CmsError::JsonParse(e), context))?;

    Err(ApiError::from_cms(CmsError::UnsupportedOperation(collection), context))
}

async fn robots_txt(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        seo::render_robots(&state.config.site_url),
    )
}

async fn sitemap_xml(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let entries = seo::sitemap_entries(Utc::now());
    (
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        seo::render_sitemap(&state.config.site_url, &entries),
    )
}

/// Parse a positive pagination parameter, falling back to `default` when absent.
fn pagination_param(
    params: &HashMap<String, String>,
    name: &str,
    default: u32,
) -> Result<u32, CmsError> {
    match params.get(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|value| *value > 0)
            .ok_or_else(|| {
                CmsError::InvalidPagination(format!(
                    "{name} must be a positive integer, got {raw:?}"
                ))
            }),
    }
}
