//! Latest chain snapshot, selector and run flag, kept in memory and persisted.

use crate::storage::KeyValueStore;
use chain_client::{ChainSnapshot, Selector};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::warn;

/// Persisted expiry date of the chain view.
pub const EXPIRY_DATE_KEY: &str = "optionChainExpiryDate";
/// Persisted instrument key of the chain view.
pub const INSTRUMENT_KEY_KEY: &str = "optionChainInstrumentKey";
/// Persisted chain snapshot (JSON, `null` when cleared).
pub const CHAIN_DATA_KEY: &str = "optionChainData";
/// Persisted polling flag (`"true"` / `"false"`).
pub const RUNNING_KEY: &str = "optionChainIsFetching";
/// Persisted expiry date of the metrics view.
pub const METRICS_EXPIRY_DATE_KEY: &str = "metricsExpiryDate";

/// Snapshot currently on display, with the time it was stored locally.
#[derive(Debug, Clone)]
pub struct StoredSnapshot {
    /// The chain.
    pub snapshot: Arc<ChainSnapshot>,
    /// When it replaced the previous one; `None` when restored from disk.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Shared holder of the latest chain snapshot and the persisted view state.
///
/// Writes go to memory first and then to the key/value store. A failed
/// persist is logged and otherwise ignored: the in-memory view stays usable.
pub struct SnapshotStore {
    kv: Arc<dyn KeyValueStore>,
    current: RwLock<Option<StoredSnapshot>>,
}

impl SnapshotStore {
    /// Creates the store, restoring the persisted snapshot if one decodes.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        let restored = kv
            .get(CHAIN_DATA_KEY)
            .and_then(|raw| match serde_json::from_str::<Option<ChainSnapshot>>(&raw) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(error = %e, "discarding undecodable persisted snapshot");
                    None
                }
            })
            .map(|snapshot| StoredSnapshot {
                snapshot: Arc::new(snapshot),
                updated_at: None,
            });

        Self {
            kv,
            current: RwLock::new(restored),
        }
    }

    /// Latest snapshot, if any.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<ChainSnapshot>> {
        self.current.read().as_ref().map(|s| Arc::clone(&s.snapshot))
    }

    /// Latest snapshot with its local timestamp.
    #[must_use]
    pub fn latest_stored(&self) -> Option<StoredSnapshot> {
        self.current.read().clone()
    }

    /// Returns true when no snapshot is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.read().is_none()
    }

    /// Replaces the snapshot wholesale and persists it.
    pub fn replace(&self, snapshot: ChainSnapshot) {
        let encoded = serde_json::to_string(&snapshot);
        *self.current.write() = Some(StoredSnapshot {
            snapshot: Arc::new(snapshot),
            updated_at: Some(Utc::now()),
        });

        match encoded {
            Ok(raw) => self.persist(CHAIN_DATA_KEY, &raw),
            Err(e) => warn!(error = %e, "failed to encode snapshot"),
        }
    }

    /// Drops the snapshot.
    pub fn clear(&self) {
        *self.current.write() = None;
        self.persist(CHAIN_DATA_KEY, "null");
    }

    /// Persisted selector, falling back to `fallback` per missing field.
    #[must_use]
    pub fn selector_or(&self, fallback: &Selector) -> Selector {
        Selector {
            instrument_key: self
                .kv
                .get(INSTRUMENT_KEY_KEY)
                .filter(|key| !key.trim().is_empty())
                .unwrap_or_else(|| fallback.instrument_key.clone()),
            expiry_date: self
                .kv
                .get(EXPIRY_DATE_KEY)
                .unwrap_or_else(|| fallback.expiry_date.clone()),
        }
    }

    /// Persists the selector.
    pub fn save_selector(&self, selector: &Selector) {
        self.persist(INSTRUMENT_KEY_KEY, &selector.instrument_key);
        self.persist(EXPIRY_DATE_KEY, &selector.expiry_date);
    }

    /// Last persisted polling flag; absent or unreadable means stopped.
    #[must_use]
    pub fn running(&self) -> bool {
        self.kv.get(RUNNING_KEY).as_deref() == Some("true")
    }

    /// Persists the polling flag.
    pub fn set_running(&self, running: bool) {
        self.persist(RUNNING_KEY, if running { "true" } else { "false" });
    }

    /// Persisted expiry date of the metrics view.
    #[must_use]
    pub fn metrics_expiry_date(&self) -> Option<String> {
        self.kv.get(METRICS_EXPIRY_DATE_KEY)
    }

    /// Persists the expiry date of the metrics view.
    pub fn set_metrics_expiry_date(&self, expiry_date: &str) {
        self.persist(METRICS_EXPIRY_DATE_KEY, expiry_date);
    }

    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.kv.set(key, value) {
            warn!(key, error = %e, "failed to persist view state");
        }
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("strikes", &self.latest().map(|s| s.len()))
            .finish()
    }
}
