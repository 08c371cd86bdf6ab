use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use pricepulse::config::AppConfig;
use pricepulse::extractor::Extractor;
use pricepulse::fetch::FetchClient;
use pricepulse::scheduler::RecheckScheduler;
use pricepulse::store::SqliteStore;
use pricepulse::tracker::ProductTracker;
use pricepulse::web;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pricepulse=debug".parse()?),
        )
        .init();

    let config = AppConfig::from_env()?;
    info!("Starting PricePulse...");

    let store = Arc::new(
        SqliteStore::connect(&config.database.url, config.database.max_connections).await?,
    );
    let fetcher = Arc::new(FetchClient::new(config.scraper.clone())?);
    let tracker = Arc::new(ProductTracker::new(store, Extractor::new(fetcher)));

    let mut scheduler = RecheckScheduler::new(Arc::clone(&tracker), config.scheduler.clone()).await?;
    scheduler.start().await?;

    let app = web::build_router(Arc::clone(&tracker));
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await?;
    info!("Shutting down...");

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
