//! Application state shared across handlers.

use std::sync::Arc;

use ops_cost_core::gate::Pin;

use crate::config::TrackerConfig;
use crate::services::CostService;
use crate::store::DocumentStore;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

#[derive(Debug)]
struct AppStateInner {
    config: TrackerConfig,
    costs: CostService,
}

impl AppState {
    /// Build state over a document store.
    #[must_use]
    pub fn new(config: TrackerConfig, store: Arc<dyn DocumentStore>) -> Self {
        let costs = CostService::new(
            store,
            config.firestore.orders_collection.clone(),
            config.firestore.costs_collection.clone(),
            config.save_mode,
        );

        Self {
            inner: Arc::new(AppStateInner { config, costs }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn costs(&self) -> &CostService {
        &self.inner.costs
    }

    #[must_use]
    pub fn pin(&self) -> &Pin {
        &self.inner.config.pin
    }
}
