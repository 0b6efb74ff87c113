//! HTTP client for the chain backend.

use crate::error::Error;
use crate::types::*;
use reqwest::Client;
use std::time::Duration;
use url::Url;


/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API (e.g., "http://localhost:5000").
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout: Duration::from_secs(8),
        }
    }
}

/// HTTP client for the chain backend.
#[derive(Debug, Clone)]
pub struct ChainClient {
    client: Client,
    base_url: String,
}

impl ChainClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        Url::parse(&config.base_url)?;
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Creates a new client with default timeout.
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot be built.
    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        Self::new(ClientConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
    }

    /// Base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ========================================================================
    // Auth
    // ========================================================================

    /// Gets the broker login URL.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn login_url(&self) -> Result<LoginUrlResponse, Error> {
        let url = format!("{}/api/auth/login_url", self.base_url);
        let resp = self.client.get(&url).send().await?;
        let body = self.success_body(resp).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Exchanges an authorization code for a stored token.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn exchange_code(&self, code: &str, role: Role) -> Result<TokenResponse, Error> {
        let url = format!("{}/api/auth/token", self.base_url);
        let request = TokenRequest {
            code: code.to_string(),
            role,
        };
        let resp = self.client.post(&url).json(&request).send().await?;
        let body = self.success_body(resp).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    // ========================================================================
    // Option Chain
    // ========================================================================

    /// Asks the backend to pull and store the latest chain for a selector.
    ///
    /// The response body carries nothing the viewer needs and is discarded.
    ///
    /// # Errors
    /// Returns error if the request fails or the status is not a success.
    pub async fn refresh_chain(&self, role: Role, selector: &Selector) -> Result<(), Error> {
        let url = format!("{}/api/option_chain/fetch2", self.base_url);
        let request = RefreshChainRequest::new(role, selector);
        let resp = self.client.post(&url).json(&request).send().await?;
        self.success_body(resp).await.map(|_| ())
    }

    /// Reads the latest stored chain for a selector.
    ///
    /// # Errors
    /// Returns error if the request fails, the body cannot be decoded, the
    /// backend has nothing stored, or a strike is missing a leg.
    pub async fn read_chain(&self, selector: &Selector) -> Result<ChainSnapshot, Error> {
        let url = self.chain_url(selector)?;
        let resp = self.client.get(url).send().await?;
        let body = self.success_body(resp).await?;
        decode_chain(&body)
    }

    /// Builds the chain read URL with an encoded query string.
    ///
    /// # Errors
    /// Returns error if the URL cannot be built.
    pub fn chain_url(&self, selector: &Selector) -> Result<Url, Error> {
        let mut url = Url::parse(&format!("{}/api/option_chain", self.base_url))?;
        let query = serde_urlencoded::to_string(ChainQuery::from(selector))
            .map_err(|e| Error::Validation(e.to_string()))?;
        url.set_query(Some(&query));
        Ok(url)
    }

    // ========================================================================
    // Metrics
    // ========================================================================

    /// Requests aggregate metrics for a selector.
    ///
    /// # Errors
    /// Returns error if the request fails or the body holds no metrics.
    pub async fn calculate_metrics(&self, selector: &Selector) -> Result<MetricsSnapshot, Error> {
        let url = format!("{}/api/metrics/calculate_metrics", self.base_url);
        let request = MetricsRequest::from(selector);
        let resp = self.client.post(&url).json(&request).send().await?;
        let body = self.success_body(resp).await?;
        decode_metrics(&body)
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    async fn success_body(&self, resp: reqwest::Response) -> Result<Vec<u8>, Error> {
        let status = resp.status();

        if status.is_success() {
            Ok(resp.bytes().await?.to_vec())
        } else {
            let text = resp.text().await.unwrap_or_default();
            Err(Error::Http {
                status: status.as_u16(),
                message: error_message(&text, status.canonical_reason()),
            })
        }
    }
}

/// Picks the most useful message out of an error response body.
pub(crate) fn error_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.detail;
    }
    if body.trim().is_empty() {
        return reason.unwrap_or("unknown error").to_string();
    }
    body.to_string()
}
