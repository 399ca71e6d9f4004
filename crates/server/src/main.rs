//! offcache server entry point.
//!
//! Loads configuration, opens the store backend, installs and activates the
//! current version, then serves MCP on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use offcache_client::{FetchClient, FetchConfig};
use offcache_core::manager::{ClientNotice, bootstrap};
use offcache_core::{AppConfig, CacheDb, CacheManager, CacheStorage, MemoryStorage, StorageKind};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(version = %config.version, "Starting offcache server on stdio transport");

    let storage: Arc<dyn CacheStorage> = match config.storage {
        StorageKind::Sqlite => {
            let db = CacheDb::open(&config.db_path).await?;
            let schema = db.schema_version().await?;
            tracing::info!(path = %config.db_path.display(), schema, "opened store database");
            Arc::new(db)
        }
        StorageKind::Memory => Arc::new(MemoryStorage::new()),
    };
    let network = Arc::new(FetchClient::new(FetchConfig::from_app(&config))?);
    tracing::info!(origin = %network.origin(), "upstream origin");
    let manager = Arc::new(CacheManager::new(config.policy(), storage, network));

    spawn_notice_logger(&manager);

    let (installed, activated) = bootstrap(manager.as_ref()).await?;
    tracing::info!(
        store = %installed.store,
        cached = installed.cached.len(),
        failed = installed.failed.len(),
        activated = activated.is_some(),
        "bootstrap complete"
    );

    let handler = handler::OffcacheServer::new(manager);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}

/// Log every client notice; the subscription counts as one controlled client.
fn spawn_notice_logger(manager: &CacheManager) {
    let mut notices = manager.subscribe();
    tokio::spawn(async move {
        loop {
            match notices.recv().await {
                Ok(ClientNotice::ContentUpdated { version }) => {
                    tracing::info!(version = %version, "content updated; clients should reload");
                }
                Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "notice subscriber lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}
