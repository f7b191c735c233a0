use anyhow::Context;
use axum::{Router, extract::DefaultBodyLimit, middleware::from_fn};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    AppState,
    config::{GalleryServerConfig, StorageConfig},
    metrics::GalleryMetrics,
    middleware::version::add_version_headers,
    routes, storage,
};

pub struct Server;

impl Server {
    pub async fn run(config: GalleryServerConfig) -> anyhow::Result<()> {
        let store = storage::from_config(&config.storage);
        let metrics = GalleryMetrics::new().context("failed to register metrics")?;
        let listen_addr = config.listen_addr.clone();
        let app = build_router(AppState::new(config, store, metrics));

        let listener = TcpListener::bind(&listen_addr)
            .await
            .with_context(|| format!("failed to bind {listen_addr}"))?;
        tracing::info!(addr = %listener.local_addr()?, "gallery server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error")?;

        tracing::info!("gallery server stopped");
        Ok(())
    }
}

pub fn build_router(state: AppState) -> Router {
    let config = state.config();
    let mut router = routes::router();

    if let StorageConfig::LocalDisk(local) = &config.storage {
        router = router.nest_service(&local.public_path, ServeDir::new(&local.root));
    }

    if let Some(dir) = &config.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(from_fn(add_version_headers))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
