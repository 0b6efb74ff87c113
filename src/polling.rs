//! Periodic chain polling.
//!
//! [`PollingController`] owns the run/stopped state machine. Starting runs one
//! fetch cycle immediately and arms a repeating timer; stopping cancels the
//! timer. A cycle refreshes then reads the chain through the
//! [`ChainFetcher`], replaces the [`SnapshotStore`] contents on a successful
//! read, and broadcasts a [`PollEvent`] describing what happened.

use crate::error::EngineError;
use crate::fetcher::ChainFetcher;
use crate::snapshot::SnapshotStore;
use chain_client::Selector;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

#[cfg(test)]
mod tests;

/// Default period between fetch cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Event types broadcast by the polling controller.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// Polling started.
    Started {
        /// Selector polled.
        selector: Selector,
    },
    /// Polling stopped.
    Stopped,
    /// A read succeeded and replaced the displayed snapshot.
    SnapshotUpdated {
        /// Number of strikes in the new snapshot.
        strikes: usize,
    },
    /// The refresh phase failed; the read was still attempted.
    RefreshFailed {
        /// Error message.
        message: String,
    },
    /// The read phase failed; the displayed snapshot is unchanged.
    ReadFailed {
        /// Error message.
        message: String,
    },
}

enum PollState {
    Idle,
    Active {
        timer: JoinHandle<()>,
        generation: u64,
    },
}

struct Inner {
    fetcher: ChainFetcher,
    store: Arc<SnapshotStore>,
    selector: RwLock<Selector>,
    state: Mutex<PollState>,
    period: Duration,
    /// Run whose cycle is in flight, 0 when none.
    in_flight: AtomicU64,
    generation: AtomicU64,
    event_tx: broadcast::Sender<PollEvent>,
}

/// Run/stopped state machine driving the chain fetch cycle.
///
/// Cloning yields another handle to the same controller.
#[derive(Clone)]
pub struct PollingController {
    inner: Arc<Inner>,
}

impl PollingController {
    /// Creates an idle controller.
    ///
    /// # Arguments
    /// * `fetcher` - Chain fetcher used by every cycle
    /// * `store` - Holder of the displayed snapshot
    /// * `selector` - Initial selector
    /// * `period` - Time between cycles
    #[must_use]
    pub fn new(
        fetcher: ChainFetcher,
        store: Arc<SnapshotStore>,
        selector: Selector,
        period: Duration,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);

        Self {
            inner: Arc::new(Inner {
                fetcher,
                store,
                selector: RwLock::new(selector),
                state: Mutex::new(PollState::Idle),
                period,
                in_flight: AtomicU64::new(0),
                generation: AtomicU64::new(0),
                event_tx,
            }),
        }
    }

    /// Returns a receiver for polling events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PollEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Starts polling `selector`.
    ///
    /// Runs one cycle right away and then one per period. Returns `Ok(false)`
    /// without side effects when already running.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidSelector`] when the selector has no
    /// expiry date.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime.
    pub fn start(&self, selector: Selector) -> Result<bool, EngineError> {
        if !selector.has_expiry() {
            return Err(EngineError::InvalidSelector(format!(
                "no expiry date selected for {}",
                selector.instrument_key
            )));
        }

        let mut state = self.inner.state.lock();
        if matches!(*state, PollState::Active { .. }) {
            debug!(selector = %selector, "polling already active");
            return Ok(false);
        }

        self.inner.store.save_selector(&selector);
        self.inner.store.set_running(true);
        *self.inner.selector.write() = selector.clone();

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.spawn_cycle(generation);
        let timer = spawn_timer(Arc::downgrade(&self.inner), self.inner.period, generation);
        *state = PollState::Active { timer, generation };
        drop(state);

        info!(selector = %selector, period_ms = self.inner.period.as_millis() as u64, "polling started");
        let _ = self.inner.event_tx.send(PollEvent::Started { selector });
        Ok(true)
    }

    /// Stops polling.
    ///
    /// Returns false when already idle. No cycle begins after this returns; a
    /// cycle already in flight runs to completion.
    pub fn stop(&self) -> bool {
        let mut state = self.inner.state.lock();
        let PollState::Active { timer, .. } = std::mem::replace(&mut *state, PollState::Idle)
        else {
            return false;
        };
        timer.abort();
        drop(state);

        self.inner.store.set_running(false);
        info!("polling stopped");
        let _ = self.inner.event_tx.send(PollEvent::Stopped);
        true
    }

    /// Restarts polling if it was running when the state was last persisted.
    ///
    /// The persisted selector is used, falling back to `fallback` per field.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidSelector`] when the resolved selector has
    /// no expiry date.
    pub fn resume(&self, fallback: &Selector) -> Result<bool, EngineError> {
        if !self.inner.store.running() {
            return Ok(false);
        }
        let selector = self.inner.store.selector_or(fallback);
        info!(selector = %selector, "resuming polling");
        self.start(selector)
    }

    /// Changes the selector without restarting; the next cycle uses it.
    pub fn set_selector(&self, selector: Selector) {
        self.inner.store.save_selector(&selector);
        *self.inner.selector.write() = selector;
    }

    /// Current selector.
    #[must_use]
    pub fn selector(&self) -> Selector {
        self.inner.selector.read().clone()
    }

    /// Drops the displayed snapshot.
    pub fn clear(&self) {
        self.inner.store.clear();
    }

    /// Returns true while the timer is armed.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(*self.inner.state.lock(), PollState::Active { .. })
    }

    /// Period between cycles.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.inner.period
    }

    /// Store the cycles write to.
    #[must_use]
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.inner.store
    }
}

impl std::fmt::Debug for PollingController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingController")
            .field("selector", &self.selector())
            .field("running", &self.is_running())
            .field("period", &self.inner.period)
            .finish()
    }
}

fn spawn_timer(inner: Weak<Inner>, period: Duration, generation: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            if !inner.on_tick(generation) {
                break;
            }
        }
    })
}

impl Inner {
    /// Dispatches a cycle if `generation` is still the active run.
    fn on_tick(self: &Arc<Self>, generation: u64) -> bool {
        let state = self.state.lock();
        match &*state {
            PollState::Active { generation: active, .. } if *active == generation => {
                self.spawn_cycle(generation);
                true
            }
            _ => false,
        }
    }

    /// Spawns a cycle for run `generation` unless one of its own is still
    /// in flight. A cycle left over from a stopped run never blocks a new run.
    fn spawn_cycle(self: &Arc<Self>, generation: u64) {
        if self.in_flight.swap(generation, Ordering::SeqCst) == generation {
            warn!(generation, "previous fetch cycle still running, skipping tick");
            return;
        }

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            inner.run_cycle().await;
            let _ = inner.in_flight.compare_exchange(
                generation,
                0,
                Ordering::SeqCst,
                Ordering::SeqCst,
            );
        });
    }

    async fn run_cycle(&self) {
        let selector = self.selector.read().clone();
        let fetch = self.fetcher.fetch(&selector).await;

        if let Err(e) = &fetch.refresh {
            let _ = self.event_tx.send(PollEvent::RefreshFailed {
                message: e.to_string(),
            });
        }

        match fetch.snapshot {
            Ok(snapshot) => {
                let strikes = snapshot.len();
                self.store.replace(snapshot);
                debug!(selector = %selector, strikes, "snapshot replaced");
                let _ = self.event_tx.send(PollEvent::SnapshotUpdated { strikes });
            }
            Err(e) => {
                let _ = self.event_tx.send(PollEvent::ReadFailed {
                    message: e.to_string(),
                });
            }
        }
    }
}
