//! Metrics panel: fetches on selector change and keeps the last outcome.

use super::table::MetricsView;
use crate::error::EngineError;
use crate::fetcher::MetricsFetcher;
use crate::snapshot::SnapshotStore;
use chain_client::{MetricsSnapshot, Selector};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

/// What the panel currently shows.
#[derive(Debug, Clone, Default)]
pub struct PanelState {
    /// Selector of the last fetch attempt.
    pub selector: Option<Selector>,
    /// Metrics of the last successful fetch, cleared by a failed one.
    pub metrics: Option<Arc<MetricsSnapshot>>,
    /// Message of the last failed fetch.
    pub error: Option<String>,
}

/// Selector-driven metrics holder. Failed fetches are not retried.
pub struct MetricsPanel {
    fetcher: MetricsFetcher,
    store: Arc<SnapshotStore>,
    state: RwLock<PanelState>,
}

impl MetricsPanel {
    /// Creates an empty panel.
    #[must_use]
    pub fn new(fetcher: MetricsFetcher, store: Arc<SnapshotStore>) -> Self {
        Self {
            fetcher,
            store,
            state: RwLock::new(PanelState::default()),
        }
    }

    /// Reacts to a selector change.
    ///
    /// Without an expiry date nothing is fetched and `Ok(None)` is returned.
    /// Otherwise the fetched metrics replace the previous ones wholesale; on
    /// failure the previous metrics are dropped and the message is kept.
    ///
    /// # Errors
    /// Returns the fetch error.
    pub async fn on_selector_change(
        &self,
        selector: &Selector,
    ) -> Result<Option<Arc<MetricsSnapshot>>, EngineError> {
        self.store.set_metrics_expiry_date(&selector.expiry_date);

        if !selector.has_expiry() {
            return Ok(None);
        }

        info!(selector = %selector, "fetching metrics");
        let result = self.fetcher.fetch(selector).await;

        let mut state = self.state.write();
        state.selector = Some(selector.clone());
        match result {
            Ok(metrics) => {
                let metrics = Arc::new(metrics);
                state.metrics = Some(Arc::clone(&metrics));
                state.error = None;
                Ok(Some(metrics))
            }
            Err(e) => {
                warn!(selector = %selector, error = %e, "metrics fetch failed");
                state.metrics = None;
                state.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> PanelState {
        self.state.read().clone()
    }

    /// Tables for the current metrics, empty when none are loaded.
    #[must_use]
    pub fn view(&self) -> MetricsView {
        MetricsView::new(self.state.read().metrics.as_deref())
    }
}
