use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use rackwatch_server::app;
use rackwatch_server::config::ServerConfig;
use rackwatch_server::state::AppState;
use rackwatch_storage::MonitorStore;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    rackwatch_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("rackwatch=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1) {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };

    tracing::info!(
        http_port = config.http_port,
        data_dir = %config.data_dir,
        "rackwatch-server starting"
    );

    let data_dir = Path::new(&config.data_dir);
    std::fs::create_dir_all(data_dir)?;
    let store = Arc::new(MonitorStore::open(&data_dir.join("rackwatch.db")).await?);

    let state = AppState::build(store, config.clone()).await?;
    let app = app::build_http_app(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            tracing::info!("Shutting down gracefully");
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
