// HTTP server: domain reputation scraping
//
// Loads configuration from the environment, pre-warms the browser pool,
// serves until Ctrl-C/SIGTERM, then tears the pool down before exiting.

use anyhow::Result;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scamcheck_parser::browser_pool::CleanupResult;
use scamcheck_parser::browser_profile::cleanup_stale_profiles;
use scamcheck_parser::config::ServiceConfig;
use scamcheck_parser::server::{Server, shutdown_signal};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let config = ServiceConfig::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scamcheck_parser=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    tracing::info!("Starting scamcheck-parser with {:?}", config);

    match cleanup_stale_profiles() {
        Ok(0) => {}
        Ok(n) => tracing::info!("Removed {} stale browser profiles", n),
        Err(e) => tracing::warn!("Stale profile sweep failed: {:#}", e),
    }

    let mut server = Server::with_chrome(config);
    let warmed = server.start().await;
    if warmed == 0 {
        tracing::warn!("No browser sessions pre-warmed; sessions will be spawned on demand");
    }

    let listener = server.bind().await?;
    let served = server.serve(listener, shutdown_signal()).await;

    let exit = match server.shutdown().await {
        CleanupResult::Success => ExitCode::SUCCESS,
        CleanupResult::PartialFailure(errors) => {
            tracing::error!("{} browser sessions failed to close", errors.len());
            ExitCode::FAILURE
        }
    };

    served?;
    Ok(exit)
}
