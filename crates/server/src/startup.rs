use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use common::utils::logging::init_logging_from_env;
use configs::AppConfig;
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::errors::StartupError;
use crate::routes;
use crate::state::ServerState;
use service::{runtime, LocalStorage, StorageService};

/// Initialize logging via shared common utils
fn init_logging() {
    init_logging_from_env();
}

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("bind address: {e}")))
}

/// Create the data root and storage areas, returning the shared storage handle.
pub async fn open_storage(cfg: &AppConfig) -> Result<Arc<LocalStorage>, StartupError> {
    runtime::ensure_env(&cfg.storage.data_root).await?;
    let storage = Arc::new(LocalStorage::new(&cfg.storage.data_root));
    storage.initialize().await?;
    Ok(storage)
}

/// Build the router over an already opened storage handle.
pub fn build_app(storage: Arc<LocalStorage>) -> Router {
    routes::build_router(ServerState::new(storage), build_cors())
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging();

    let cfg = AppConfig::load_or_env().map_err(|e| StartupError::InvalidConfig(format!("{e:#}")))?;
    let storage = open_storage(&cfg).await?;
    let app = build_app(storage);

    let addr = bind_addr(&cfg)?;
    info!(%addr, data_root = %cfg.storage.data_root, "starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
