//! Chain client against the in-process backend.

use chain_client::{Error, Role, Selector};
use viewer_tests::{FakeBackend, chain_body};

fn nifty() -> Selector {
    Selector::new("NSE_INDEX|Nifty 50", "2024-06-27")
}

#[tokio::test]
async fn test_login_url() {
    let backend = FakeBackend::spawn().await;

    let response = backend.client().login_url().await.expect("login_url failed");

    assert!(response.auth_url.starts_with("https://broker.example/login"));
}

#[tokio::test]
async fn test_exchange_code() {
    let backend = FakeBackend::spawn().await;
    let client = backend.client();

    let response = client
        .exchange_code("abc123", Role::King)
        .await
        .expect("exchange failed");
    assert_eq!(response.message, "Token stored for King");

    let err = client
        .exchange_code("bad", Role::King)
        .await
        .expect_err("bad code accepted");
    match err {
        Error::Http { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid authorization code");
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_read_chain_keeps_exact_floats() {
    let backend = FakeBackend::spawn().await;
    backend.set_chain(chain_body(&[17100.0, 17000.0]));

    let snapshot = backend.client().read_chain(&nifty()).await.expect("read failed");

    assert_eq!(snapshot.strikes[0].strike_price, 17100.0);
    assert_eq!(
        snapshot.strikes[0].call.greeks.theta.to_bits(),
        (-0.1f64 - 0.2).to_bits()
    );
    assert_eq!(snapshot.fetched_at.as_deref(), Some("2024-06-20T09:15:00Z"));
}

#[tokio::test]
async fn test_read_chain_null_is_no_data() {
    let backend = FakeBackend::spawn().await;

    let err = backend
        .client()
        .read_chain(&nifty())
        .await
        .expect_err("null body accepted");

    assert!(matches!(err, Error::NoData(_)));
}

#[tokio::test]
async fn test_refresh_error_carries_detail() {
    let backend = FakeBackend::spawn().await;
    backend.fail_refresh(404, "Role 'Emperor' not found.");

    let err = backend
        .client()
        .refresh_chain(Role::Emperor, &nifty())
        .await
        .expect_err("failure not reported");

    assert_eq!(err.to_string(), "HTTP error (404): Role 'Emperor' not found.");
    assert_eq!(backend.refresh_count(), 1);
}
