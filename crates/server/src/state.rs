use std::sync::Arc;

use crate::{config::GalleryServerConfig, metrics::GalleryMetrics, storage::ObjectStore};

#[derive(Clone)]
pub struct AppState {
    pub config: GalleryServerConfig,
    store: Arc<dyn ObjectStore>,
    metrics: GalleryMetrics,
}

impl AppState {
    pub fn new(
        config: GalleryServerConfig,
        store: Arc<dyn ObjectStore>,
        metrics: GalleryMetrics,
    ) -> Self {
        Self {
            config,
            store,
            metrics,
        }
    }

    pub fn config(&self) -> &GalleryServerConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn metrics(&self) -> &GalleryMetrics {
        &self.metrics
    }
}
