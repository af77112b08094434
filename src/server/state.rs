//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::cms::{CmsBackend, CmsError, CollectionService};
use crate::config::SiteConfig;

/// Shared application state.
pub struct AppState {
    /// Site configuration.
    pub config: SiteConfig,
    /// CMS collection reads.
    pub collections: CollectionService,
}

impl AppState {
    /// Create state talking to the configured CMS.
    ///
    /// # Errors
    /// Returns an error if the CMS client cannot be created.
    pub fn new(config: SiteConfig) -> Result<Arc<Self>, CmsError> {
        let collections = CollectionService::from_config(&config.cms)?;
        Ok(Arc::new(Self {
            config,
            collections,
        }))
    }

    /// Create state over an arbitrary backend.
    #[must_use]
    pub fn with_backend(config: SiteConfig, backend: Arc<dyn CmsBackend>) -> Arc<Self> {
        Arc::new(Self {
            config,
            collections: CollectionService::new(backend),
        })
    }
}
