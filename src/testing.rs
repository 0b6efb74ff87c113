//! Fixtures and a scripted backend shared by unit tests.

use crate::fetcher::{ChainSource, MetricsSource};
use async_trait::async_trait;
use chain_client::{
    BidAskImbalance, BidAskSpread, ChainSnapshot, Error, MarketData, MetricsGroup,
    MetricsSnapshot, OptionGreeks, OptionLeg, Selector, SideSpread, StrikeRecord,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Leg whose thirteen fields are `seed + 1` through `seed + 13` in display order.
pub fn leg(seed: f64) -> OptionLeg {
    OptionLeg {
        market_data: MarketData {
            oi: seed + 1.0,
            volume: seed + 2.0,
            ltp: seed + 4.0,
            bid_price: seed + 5.0,
            bid_qty: seed + 6.0,
            ask_price: seed + 7.0,
            ask_qty: seed + 8.0,
        },
        greeks: OptionGreeks {
            iv: seed + 3.0,
            delta: seed + 9.0,
            gamma: seed + 10.0,
            theta: seed + 11.0,
            vega: seed + 12.0,
            pop: seed + 13.0,
        },
    }
}

pub fn strike(price: f64) -> StrikeRecord {
    StrikeRecord {
        strike_price: price,
        call: leg(100.0),
        put: leg(200.0),
    }
}

pub fn snapshot_with_strikes(prices: &[f64]) -> ChainSnapshot {
    ChainSnapshot::new(prices.iter().copied().map(strike).collect())
}

pub fn metrics(current_price: f64) -> MetricsSnapshot {
    MetricsSnapshot {
        current_price,
        totals: MetricsGroup {
            call: [("oi", 1200.0), ("volume", 50.0)].into_iter().collect(),
            put: [("oi", 1500.0), ("volume", 70.0)].into_iter().collect(),
        },
        difference: MetricsGroup::default(),
        difference_percent: MetricsGroup::default(),
        bid_ask_imbalance: BidAskImbalance {
            call: 0.12346,
            put: -0.5,
        },
        bid_ask_spread: BidAskSpread {
            call: SideSpread {
                bid_avg: 101.5,
                ask_avg: 102.0,
            },
            put: SideSpread {
                bid_avg: 99.25,
                ask_avg: 99.75,
            },
        },
    }
}

/// Backend that replays queued results and counts calls.
///
/// An empty refresh queue answers `Ok(())`; an empty read or metrics queue
/// answers `NoData`.
#[derive(Default)]
pub struct ScriptedSource {
    refreshes: Mutex<VecDeque<Result<(), Error>>>,
    reads: Mutex<VecDeque<Result<ChainSnapshot, Error>>>,
    metrics: Mutex<VecDeque<Result<MetricsSnapshot, Error>>>,
    read_delay: Mutex<Option<Duration>>,
    selectors: Mutex<Vec<Selector>>,
    refresh_calls: AtomicUsize,
    read_calls: AtomicUsize,
    metrics_calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_refresh(&self, result: Result<(), Error>) {
        self.refreshes.lock().push_back(result);
    }

    pub fn push_read(&self, result: Result<ChainSnapshot, Error>) {
        self.reads.lock().push_back(result);
    }

    pub fn push_metrics(&self, result: Result<MetricsSnapshot, Error>) {
        self.metrics.lock().push_back(result);
    }

    /// Makes every read take `delay` before answering.
    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock() = Some(delay);
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn read_count(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn metrics_count(&self) -> usize {
        self.metrics_calls.load(Ordering::SeqCst)
    }

    /// Selectors seen by every call, in call order.
    pub fn selectors(&self) -> Vec<Selector> {
        self.selectors.lock().clone()
    }
}

#[async_trait]
impl ChainSource for ScriptedSource {
    async fn refresh_chain(&self, selector: &Selector) -> Result<(), Error> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.selectors.lock().push(selector.clone());
        self.refreshes.lock().pop_front().unwrap_or(Ok(()))
    }

    async fn read_chain(&self, selector: &Selector) -> Result<ChainSnapshot, Error> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.selectors.lock().push(selector.clone());
        let delay = *self.read_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.reads
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Error::NoData("script exhausted".to_string())))
    }
}

#[async_trait]
impl MetricsSource for ScriptedSource {
    async fn calculate_metrics(&self, selector: &Selector) -> Result<MetricsSnapshot, Error> {
        self.metrics_calls.fetch_add(1, Ordering::SeqCst);
        self.selectors.lock().push(selector.clone());
        self.metrics
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Error::NoData("script exhausted".to_string())))
    }
}
