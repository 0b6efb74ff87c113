//! HTTP client library for the option chain snapshot backend.
//!
//! This crate provides a typed HTTP client for the backend that materializes
//! option chain snapshots and aggregate metrics. Response bodies are decoded
//! into validated types at the boundary: a body that does not match the
//! expected shape surfaces as an [`Error`], never as a half-filled value.
//!
//! # Example
//!
//! ```no_run
//! use chain_client::{ChainClient, ClientConfig, Role, Selector};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), chain_client::Error> {
//!     let client = ChainClient::new(ClientConfig {
//!         base_url: "http://localhost:5000".into(),
//!         timeout: Duration::from_secs(8),
//!     })?;
//!
//!     let selector = Selector::new("NSE_INDEX|Nifty 50", "2024-06-27");
//!     client.refresh_chain(Role::Emperor, &selector).await?;
//!     let snapshot = client.read_chain(&selector).await?;
//!     println!("strikes: {}", snapshot.len());
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::{ChainClient, ClientConfig};
pub use error::Error;
pub use types::*;
