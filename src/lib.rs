//! # Option Chain Viewer - Live Chain Polling Engine
//!
//! A client-side engine that keeps an option chain snapshot fresh by polling a
//! chain backend on a fixed period, lays every strike out as a symmetric
//! call/put row, and builds per-metric call/put tables from the backend's
//! aggregate metrics.
//!
//! ## Key Features
//!
//! - **Two-Phase Fetch**: Every cycle asks the backend to refresh the chain,
//!   then reads the materialized result. A failed refresh does not skip the read.
//!
//! - **Last-Good Snapshot**: A failed, empty, or malformed read never replaces
//!   the snapshot on display.
//!
//! - **Persistent View State**: Selector, snapshot and run flag survive a
//!   restart; polling resumes if it was running.
//!
//! - **Symmetric Rows**: Put fields mirror call fields around the strike.
//!
//! - **Metric Tables**: Call and put metric maps with different key sets join
//!   into one table, with a placeholder for the missing side.
//!
//! ## Architecture
//!
//! ```text
//! PollingController ──tick──▶ ChainFetcher ──▶ ChainSource (HTTP backend)
//!        │                          │
//!        │                          ▼
//!        └──────────────────▶ SnapshotStore ──▶ KeyValueStore (JSON file)
//!                                   │
//!                                   ▼
//!                              rows::join ──▶ render
//!
//! MetricsPanel ──selector change──▶ MetricsFetcher ──▶ MetricTable
//! ```
//!
//! ## Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | TOML configuration |
//! | [`error`] | Engine error types |
//! | [`fetcher`] | Chain and metrics fetchers over pluggable sources |
//! | [`metrics`] | Metric tables and the metrics panel |
//! | [`polling`] | Run/stopped state machine and fetch cycle |
//! | [`render`] | Plain-text tables |
//! | [`rows`] | Call/strike/put display rows |
//! | [`snapshot`] | Latest snapshot and persisted view state |
//! | [`state`] | Wiring from configuration |
//! | [`storage`] | Key/value persistence |
//!
//! ## Backend Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/api/option_chain/fetch2` | Refresh the chain for a selector |
//! | GET | `/api/option_chain` | Read the materialized chain |
//! | POST | `/api/metrics/calculate_metrics` | Aggregate metrics |
//! | GET | `/api/auth/login_url` | Broker login URL |
//! | POST | `/api/auth/token` | Exchange an auth code for a role |
//!
//! ## Example Usage
//!
//! ```bash
//! # Poll the configured selector, printing the chain on every update
//! option-chain-viewer --config viewer.toml watch --expiry 2024-06-27
//!
//! # Stop a persisted run
//! option-chain-viewer stop
//!
//! # One-shot metrics
//! option-chain-viewer metrics --expiry 2024-06-27
//! ```
//!
//! Logging is controlled with `RUST_LOG` (default `info`).

pub mod config;
pub mod error;
pub mod fetcher;
pub mod metrics;
pub mod polling;
pub mod render;
pub mod rows;
pub mod snapshot;
pub mod state;
pub mod storage;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::EngineError;
pub use polling::{PollEvent, PollingController};
pub use state::ViewerState;
