//! Integration tests for the option chain viewer.
//!
//! [`FakeBackend`] serves the chain backend's endpoints from memory on an
//! ephemeral local port and counts every request, so the tests need no
//! running server.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chain_client::{ChainClient, ClientConfig};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct Shared {
    refresh_calls: AtomicUsize,
    read_calls: AtomicUsize,
    metrics_calls: AtomicUsize,
    refresh_failure: Mutex<Option<(u16, String)>>,
    chain: Mutex<Value>,
    metrics: Mutex<Value>,
    refresh_bodies: Mutex<Vec<Value>>,
    read_queries: Mutex<Vec<HashMap<String, String>>>,
}

/// In-process chain backend.
#[derive(Clone)]
pub struct FakeBackend {
    shared: Arc<Shared>,
    addr: SocketAddr,
}

impl FakeBackend {
    /// Starts the backend on `127.0.0.1` with an empty chain and no metrics.
    pub async fn spawn() -> Self {
        let shared = Arc::new(Shared {
            chain: Mutex::new(Value::Null),
            metrics: Mutex::new(json!({})),
            ..Default::default()
        });

        let app = Router::new()
            .route("/api/option_chain/fetch2", post(refresh))
            .route("/api/option_chain", get(read))
            .route("/api/metrics/calculate_metrics", post(calculate_metrics))
            .route("/api/auth/login_url", get(login_url))
            .route("/api/auth/token", post(token))
            .with_state(Arc::clone(&shared));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Failed to read local address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { shared, addr }
    }

    /// Base URL of the backend.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client pointed at the backend.
    #[must_use]
    pub fn client(&self) -> ChainClient {
        ChainClient::new(ClientConfig {
            base_url: self.url(),
            timeout: Duration::from_secs(2),
        })
        .expect("Failed to create client")
    }

    /// Sets the body served by the read endpoint.
    pub fn set_chain(&self, body: Value) {
        *self.shared.chain.lock() = body;
    }

    /// Sets the body served by the metrics endpoint.
    pub fn set_metrics(&self, body: Value) {
        *self.shared.metrics.lock() = body;
    }

    /// Makes the refresh endpoint fail with `status` and a `detail` message.
    pub fn fail_refresh(&self, status: u16, detail: &str) {
        *self.shared.refresh_failure.lock() = Some((status, detail.to_string()));
    }

    /// Number of refresh requests served.
    #[must_use]
    pub fn refresh_count(&self) -> usize {
        self.shared.refresh_calls.load(Ordering::SeqCst)
    }

    /// Number of read requests served.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.shared.read_calls.load(Ordering::SeqCst)
    }

    /// Number of metrics requests served.
    #[must_use]
    pub fn metrics_count(&self) -> usize {
        self.shared.metrics_calls.load(Ordering::SeqCst)
    }

    /// JSON bodies of every refresh request.
    #[must_use]
    pub fn refresh_bodies(&self) -> Vec<Value> {
        self.shared.refresh_bodies.lock().clone()
    }

    /// Query parameters of every read request.
    #[must_use]
    pub fn read_queries(&self) -> Vec<HashMap<String, String>> {
        self.shared.read_queries.lock().clone()
    }
}

async fn refresh(State(shared): State<Arc<Shared>>, Json(body): Json<Value>) -> Response {
    shared.refresh_calls.fetch_add(1, Ordering::SeqCst);
    shared.refresh_bodies.lock().push(body);

    let failure = shared.refresh_failure.lock().clone();
    match failure {
        Some((status, detail)) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(json!({ "detail": detail })),
        )
            .into_response(),
        None => Json(json!({ "message": "Option chain data fetched and stored" })).into_response(),
    }
}

async fn read(
    State(shared): State<Arc<Shared>>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    shared.read_calls.fetch_add(1, Ordering::SeqCst);
    shared.read_queries.lock().push(query);
    Json(shared.chain.lock().clone())
}

async fn calculate_metrics(State(shared): State<Arc<Shared>>) -> Json<Value> {
    shared.metrics_calls.fetch_add(1, Ordering::SeqCst);
    Json(shared.metrics.lock().clone())
}

async fn login_url() -> Json<Value> {
    Json(json!({ "auth_url": "https://broker.example/login?client_id=viewer" }))
}

async fn token(Json(body): Json<Value>) -> Response {
    if body["code"] == "bad" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Invalid authorization code" })),
        )
            .into_response();
    }
    let role = body["role"].as_str().unwrap_or_default().to_string();
    Json(json!({ "message": format!("Token stored for {role}"), "status": "success" })).into_response()
}

/// Leg with every field set from `seed`.
#[must_use]
pub fn leg_body(seed: f64) -> Value {
    json!({
        "market_data": {
            "oi": seed + 1.0,
            "volume": seed + 2.0,
            "ltp": seed + 4.0,
            "bid_price": seed + 5.0,
            "bid_qty": seed + 6.0,
            "ask_price": seed + 7.0,
            "ask_qty": seed + 8.0
        },
        "option_greeks": {
            "iv": seed + 3.0,
            "delta": 0.5,
            "gamma": 0.0012,
            "theta": -0.1 - 0.2,
            "vega": 12.5,
            "pop": 48.25
        }
    })
}

/// Read body holding one record per strike, in the given order.
#[must_use]
pub fn chain_body(strikes: &[f64]) -> Value {
    let data: Vec<Value> = strikes
        .iter()
        .map(|&strike| {
            json!({
                "strike_price": strike,
                "call_options": leg_body(100.0),
                "put_options": leg_body(200.0)
            })
        })
        .collect();

    json!({
        "_id": "665f1c2e9b1e8a0012345678",
        "instrument_key": "NSE_INDEX|Nifty 50",
        "expiry_date": "2024-06-27",
        "underlying_spot_price": 17042.15,
        "fetched_at": "2024-06-20T09:15:00Z",
        "data": data
    })
}

/// Metrics body with asymmetric totals.
#[must_use]
pub fn metrics_body(current_price: f64) -> Value {
    json!({
        "current_price": current_price,
        "totals": {
            "call": { "oi": 1200.0, "volume": 50.0 },
            "put": { "volume": 70.0, "iv": 14.5 }
        },
        "difference": { "call": { "oi": 12.0 }, "put": { "oi": -3.0 } },
        "difference_percent": { "call": { "oi": 1.0 }, "put": { "oi": -0.2 } },
        "bid_ask_imbalance": { "call": 0.25, "put": -0.125 },
        "bid_ask_spread": {
            "call": { "bid_avg": 101.5, "ask_avg": 102.0 },
            "put": { "bid_avg": 99.25, "ask_avg": 99.75 }
        }
    })
}

/// Polls `condition` every 10 ms until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
