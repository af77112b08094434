//! Startup helpers for the site server.

use std::process::ExitCode;
use std::sync::Arc;

use crate::config::SiteConfig;
use crate::server::{self, AppState};

/// Run the server until Ctrl+C.
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting agritrade site v{}", env!("CARGO_PKG_VERSION"));

    let (state, port) = match initialize() {
        Ok(initialized) => initialized,
        Err(e) => {
            tracing::error!("Failed to initialize: {e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(server::run_server_with_shutdown(state, port, shutdown_signal())) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    tracing::info!("Server stopped");
    ExitCode::SUCCESS
}

/// Load configuration and build application state without starting the server.
///
/// # Errors
/// Returns an error if configuration is invalid or state creation fails.
pub fn initialize() -> Result<(Arc<AppState>, u16), Box<dyn std::error::Error + Send + Sync>> {
    let config = SiteConfig::from_env()?;
    tracing::info!(
        environment = ?config.environment,
        cms = %config.cms.api_base_url,
        site = %config.site_url,
        "configuration loaded"
    );

    let port = config.port;
    let state = AppState::new(config).map_err(|e| format!("Failed to create state: {e}"))?;
    Ok((state, port))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
