//! Chain and metrics fetchers over a pluggable backend.
//!
//! The polling engine and the metrics panel talk to the backend through the
//! [`ChainSource`] and [`MetricsSource`] traits. [`BackendSource`] implements
//! both over the HTTP [`ChainClient`]; tests substitute scripted sources.

use async_trait::async_trait;
use chain_client::{ChainClient, ChainSnapshot, Error, MetricsSnapshot, Role, Selector};
use std::sync::Arc;
use tracing::{debug, warn};

/// Backend operations the chain side needs.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Asks the backend to materialize a fresh chain for the selector.
    async fn refresh_chain(&self, selector: &Selector) -> Result<(), Error>;

    /// Reads the materialized chain for the selector.
    async fn read_chain(&self, selector: &Selector) -> Result<ChainSnapshot, Error>;
}

/// Backend operation the metrics side needs.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Computes aggregate metrics for the selector.
    async fn calculate_metrics(&self, selector: &Selector) -> Result<MetricsSnapshot, Error>;
}

/// HTTP backend acting for one role.
#[derive(Debug, Clone)]
pub struct BackendSource {
    client: ChainClient,
    role: Role,
}

impl BackendSource {
    /// Creates a source over a client.
    #[must_use]
    pub fn new(client: ChainClient, role: Role) -> Self {
        Self { client, role }
    }

    /// Underlying client.
    #[must_use]
    pub fn client(&self) -> &ChainClient {
        &self.client
    }
}

#[async_trait]
impl ChainSource for BackendSource {
    async fn refresh_chain(&self, selector: &Selector) -> Result<(), Error> {
        self.client.refresh_chain(self.role, selector).await
    }

    async fn read_chain(&self, selector: &Selector) -> Result<ChainSnapshot, Error> {
        self.client.read_chain(selector).await
    }
}

#[async_trait]
impl MetricsSource for BackendSource {
    async fn calculate_metrics(&self, selector: &Selector) -> Result<MetricsSnapshot, Error> {
        self.client.calculate_metrics(selector).await
    }
}

/// Outcome of one two-phase chain fetch.
#[derive(Debug)]
pub struct ChainFetch {
    /// Result of the refresh phase. Its failure does not void the read.
    pub refresh: Result<(), Error>,
    /// Result of the read phase.
    pub snapshot: Result<ChainSnapshot, Error>,
}

impl ChainFetch {
    /// The snapshot, dropping the refresh outcome.
    ///
    /// # Errors
    /// Returns the read-phase error.
    pub fn into_snapshot(self) -> Result<ChainSnapshot, Error> {
        self.snapshot
    }
}

/// Refresh-then-read chain fetcher.
#[derive(Clone)]
pub struct ChainFetcher {
    source: Arc<dyn ChainSource>,
}

impl ChainFetcher {
    /// Creates a fetcher over a source.
    #[must_use]
    pub fn new(source: Arc<dyn ChainSource>) -> Self {
        Self { source }
    }

    /// Runs both phases for the selector.
    ///
    /// The read is attempted even when the refresh fails: the backend may
    /// still hold a stale but valid snapshot.
    pub async fn fetch(&self, selector: &Selector) -> ChainFetch {
        let refresh = self.source.refresh_chain(selector).await;
        if let Err(e) = &refresh {
            warn!(selector = %selector, error = %e, "chain refresh failed, reading stored chain");
        }

        let snapshot = self.source.read_chain(selector).await;
        match &snapshot {
            Ok(s) => debug!(selector = %selector, strikes = s.len(), "chain read"),
            Err(e) => warn!(selector = %selector, error = %e, "chain read failed"),
        }

        ChainFetch { refresh, snapshot }
    }
}

/// Single-request metrics fetcher.
#[derive(Clone)]
pub struct MetricsFetcher {
    source: Arc<dyn MetricsSource>,
}

impl MetricsFetcher {
    /// Creates a fetcher over a source.
    #[must_use]
    pub fn new(source: Arc<dyn MetricsSource>) -> Self {
        Self { source }
    }

    /// Fetches metrics for the selector.
    ///
    /// # Errors
    /// Returns error on a failed request, a non-success status, or a body
    /// without `current_price`.
    pub async fn fetch(&self, selector: &Selector) -> Result<MetricsSnapshot, Error> {
        self.source.calculate_metrics(selector).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedSource, snapshot_with_strikes};

    fn selector() -> Selector {
        Selector::new("NSE_INDEX|Nifty 50", "2024-06-27")
    }

    #[tokio::test]
    async fn test_fetch_runs_both_phases() {
        let source = Arc::new(ScriptedSource::new());
        source.push_read(Ok(snapshot_with_strikes(&[17000.0, 17050.0])));
        let fetcher = ChainFetcher::new(Arc::clone(&source) as Arc<dyn ChainSource>);

        let fetch = fetcher.fetch(&selector()).await;

        assert!(fetch.refresh.is_ok());
        assert_eq!(fetch.into_snapshot().unwrap().len(), 2);
        assert_eq!(source.refresh_count(), 1);
        assert_eq!(source.read_count(), 1);
    }

    #[tokio::test]
    async fn test_read_attempted_after_refresh_failure() {
        let source = Arc::new(ScriptedSource::new());
        source.push_refresh(Err(Error::Http {
            status: 404,
            message: "Role 'Emperor' not found.".to_string(),
        }));
        source.push_read(Ok(snapshot_with_strikes(&[17000.0])));
        let fetcher = ChainFetcher::new(Arc::clone(&source) as Arc<dyn ChainSource>);

        let fetch = fetcher.fetch(&selector()).await;

        assert!(matches!(fetch.refresh, Err(Error::Http { status: 404, .. })));
        assert!(fetch.snapshot.is_ok());
        assert_eq!(source.read_count(), 1);
    }

    #[tokio::test]
    async fn test_both_phases_use_same_selector() {
        let source = Arc::new(ScriptedSource::new());
        let fetcher = ChainFetcher::new(Arc::clone(&source) as Arc<dyn ChainSource>);

        let _ = fetcher.fetch(&selector()).await;

        assert_eq!(source.selectors(), vec![selector(), selector()]);
    }

    #[tokio::test]
    async fn test_metrics_fetch_passes_errors_through() {
        let source = Arc::new(ScriptedSource::new());
        source.push_metrics(Err(Error::NoData("no current_price".to_string())));
        let fetcher = MetricsFetcher::new(Arc::clone(&source) as Arc<dyn MetricsSource>);

        let err = fetcher.fetch(&selector()).await.unwrap_err();

        assert!(matches!(err, Error::NoData(_)));
    }
}
