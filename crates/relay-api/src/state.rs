//! Application state wiring the hub and store together.
//!
//! AppState is built once at startup and handed to every handler through
//! axum's `State` extractor. The hub and the history endpoint share one
//! store instance.

use std::path::Path;
use std::sync::Arc;

use relay_core::hub::{DeliveryQueue, Hub};
use relay_infra::store::DatabaseStore;
use relay_types::config::RelayConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub<DatabaseStore>>,
    pub store: Arc<DatabaseStore>,
    pub config: Arc<RelayConfig>,
}

impl AppState {
    /// Connect to the configured store and build the hub.
    ///
    /// Returns the hub's delivery queue; the caller must drive it with
    /// [`Hub::run`] on a dedicated task.
    pub async fn init(config: &RelayConfig, data_dir: &Path) -> anyhow::Result<(Self, DeliveryQueue)> {
        let store = DatabaseStore::open(&config.database, data_dir).await?;
        Ok(Self::with_store(Arc::new(store), config))
    }

    pub fn with_store(store: Arc<DatabaseStore>, config: &RelayConfig) -> (Self, DeliveryQueue) {
        let (hub, queue) = Hub::new(Arc::clone(&store), &config.hub);
        let state = Self {
            hub,
            store,
            config: Arc::new(config.clone()),
        };
        (state, queue)
    }
}
