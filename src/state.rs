//! Application state management.

use crate::config::Config;
use crate::error::EngineError;
use crate::fetcher::{BackendSource, ChainFetcher, ChainSource, MetricsFetcher, MetricsSource};
use crate::metrics::MetricsPanel;
use crate::polling::PollingController;
use crate::snapshot::SnapshotStore;
use crate::storage::{FileStore, KeyValueStore};
use chain_client::{ChainClient, Selector};
use std::sync::Arc;
use tracing::info;

/// Everything the viewer needs, wired from configuration.
#[derive(Clone)]
pub struct ViewerState {
    /// Application configuration.
    pub config: Config,
    /// Backend client, shared by the sources and the auth commands.
    pub client: ChainClient,
    /// Displayed snapshot and persisted view state.
    pub store: Arc<SnapshotStore>,
    /// Chain polling controller.
    pub controller: PollingController,
    /// Metrics panel.
    pub metrics: Arc<MetricsPanel>,
}

impl ViewerState {
    /// Creates the state with the file store named in the configuration.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid, the store file cannot be
    /// opened, or the client cannot be built.
    pub fn from_config(config: Config) -> Result<Self, EngineError> {
        config.validate()?;
        let kv = Arc::new(FileStore::open(&config.storage.path)?);
        info!(path = %config.storage.path.display(), "opened view state");
        Self::with_store(config, kv)
    }

    /// Creates the state over an arbitrary key/value store.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the client cannot be
    /// built.
    pub fn with_store(config: Config, kv: Arc<dyn KeyValueStore>) -> Result<Self, EngineError> {
        config.validate()?;

        let client = ChainClient::new(config.client_config())?;
        let source = Arc::new(BackendSource::new(client.clone(), config.selector.role));
        let store = Arc::new(SnapshotStore::new(kv));

        let controller = PollingController::new(
            ChainFetcher::new(Arc::clone(&source) as Arc<dyn ChainSource>),
            Arc::clone(&store),
            config.selector(),
            config.poll_interval(),
        );
        let metrics = Arc::new(MetricsPanel::new(
            MetricsFetcher::new(source as Arc<dyn MetricsSource>),
            Arc::clone(&store),
        ));

        Ok(Self {
            config,
            client,
            store,
            controller,
            metrics,
        })
    }

    /// Selector to show: the persisted one, falling back to the configured one.
    #[must_use]
    pub fn selector(&self) -> Selector {
        self.store.selector_or(&self.config.selector())
    }
}
