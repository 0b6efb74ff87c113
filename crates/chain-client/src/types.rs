//! Request and response types for the chain backend API.

use crate::error::Error;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;


/// Default instrument the viewer follows.
pub const DEFAULT_INSTRUMENT_KEY: &str = "NSE_INDEX|Nifty 50";

/// Account role the backend acts for when pulling upstream data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Role {
    /// Primary account.
    #[default]
    Emperor,
    /// Secondary account.
    King,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Emperor => write!(f, "Emperor"),
            Self::King => write!(f, "King"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Emperor" | "emperor" => Ok(Self::Emperor),
            "King" | "king" => Ok(Self::King),
            other => Err(Error::Validation(format!("unknown role: {other}"))),
        }
    }
}

/// Identifies which chain and metrics snapshot to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    /// Instrument key (e.g., "NSE_INDEX|Nifty 50").
    pub instrument_key: String,
    /// Expiry date in ISO format, or empty when none is chosen yet.
    pub expiry_date: String,
}

impl Selector {
    /// Creates a selector for an instrument and expiry.
    pub fn new(instrument_key: impl Into<String>, expiry_date: impl Into<String>) -> Self {
        Self {
            instrument_key: instrument_key.into(),
            expiry_date: expiry_date.into(),
        }
    }

    /// Returns true when an expiry date has been chosen.
    #[must_use]
    pub fn has_expiry(&self) -> bool {
        !self.expiry_date.trim().is_empty()
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::new(DEFAULT_INSTRUMENT_KEY, "")
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.instrument_key, self.expiry_date)
    }
}

// ============================================================================
// Auth
// ============================================================================

/// Login URL response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginUrlResponse {
    /// Broker authorization dialog URL.
    pub auth_url: String,
}

/// Code exchange request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    /// Authorization code pasted by the user.
    pub code: String,
    /// Role the token is stored for.
    pub role: Role,
}

/// Code exchange response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Human readable outcome.
    pub message: String,
    /// Status marker, when the backend sends one.
    #[serde(default)]
    pub status: Option<String>,
}

/// Error body the backend sends with non-success statuses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: String,
}

// ============================================================================
// Option Chain
// ============================================================================

/// Request that asks the backend to pull and store a fresh chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshChainRequest {
    /// Role whose upstream token is used.
    pub role: Role,
    /// Instrument key.
    pub instrument_key: String,
    /// Expiry date.
    pub expiry_date: String,
}

impl RefreshChainRequest {
    /// Builds the request for a selector.
    #[must_use]
    pub fn new(role: Role, selector: &Selector) -> Self {
        Self {
            role,
            instrument_key: selector.instrument_key.clone(),
            expiry_date: selector.expiry_date.clone(),
        }
    }
}

/// Query string of the chain read endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChainQuery<'a> {
    /// Instrument key.
    pub instrument_key: &'a str,
    /// Expiry date.
    pub expiry_date: &'a str,
}

impl<'a> From<&'a Selector> for ChainQuery<'a> {
    fn from(selector: &'a Selector) -> Self {
        Self {
            instrument_key: &selector.instrument_key,
            expiry_date: &selector.expiry_date,
        }
    }
}

/// Market data of one option leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    /// Open interest.
    pub oi: f64,
    /// Traded volume.
    pub volume: f64,
    /// Last traded price.
    pub ltp: f64,
    /// Best bid price.
    pub bid_price: f64,
    /// Quantity at best bid.
    pub bid_qty: f64,
    /// Best ask price.
    pub ask_price: f64,
    /// Quantity at best ask.
    pub ask_qty: f64,
}

/// Greeks of one option leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionGreeks {
    /// Implied volatility.
    pub iv: f64,
    /// Delta.
    pub delta: f64,
    /// Gamma.
    pub gamma: f64,
    /// Theta.
    pub theta: f64,
    /// Vega.
    pub vega: f64,
    /// Probability of profit.
    pub pop: f64,
}

/// Call or put side of one strike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionLeg {
    /// Market data.
    pub market_data: MarketData,
    /// Greeks.
    #[serde(rename = "option_greeks")]
    pub greeks: OptionGreeks,
}

/// One strike with both legs present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrikeRecord {
    /// Strike price.
    pub strike_price: f64,
    /// Call leg.
    #[serde(rename = "call_options")]
    pub call: OptionLeg,
    /// Put leg.
    #[serde(rename = "put_options")]
    pub put: OptionLeg,
}

/// Strike as delivered, before the both-legs check.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStrikeRecord {
    /// Strike price.
    pub strike_price: f64,
    /// Call leg, if any.
    #[serde(default)]
    pub call_options: Option<OptionLeg>,
    /// Put leg, if any.
    #[serde(default)]
    pub put_options: Option<OptionLeg>,
}

impl TryFrom<RawStrikeRecord> for StrikeRecord {
    type Error = Error;

    fn try_from(raw: RawStrikeRecord) -> Result<Self, Self::Error> {
        if !raw.strike_price.is_finite() || raw.strike_price <= 0.0 {
            return Err(Error::Validation(format!(
                "strike price must be positive, got {}",
                raw.strike_price
            )));
        }

        match (raw.call_options, raw.put_options) {
            (Some(call), Some(put)) => Ok(Self {
                strike_price: raw.strike_price,
                call,
                put,
            }),
            (None, Some(_)) => Err(Error::Validation(format!(
                "strike {} has no call leg",
                raw.strike_price
            ))),
            (Some(_), None) => Err(Error::Validation(format!(
                "strike {} has no put leg",
                raw.strike_price
            ))),
            (None, None) => Err(Error::Validation(format!(
                "strike {} has neither leg",
                raw.strike_price
            ))),
        }
    }
}

/// Stored chain document returned by the read endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainDocument {
    /// Strikes in server order.
    #[serde(default)]
    pub data: Option<Vec<RawStrikeRecord>>,
    /// Spot price of the underlying at fetch time.
    #[serde(default)]
    pub underlying_spot_price: Option<f64>,
    /// Backend fetch timestamp.
    #[serde(default)]
    pub fetched_at: Option<String>,
}

impl ChainDocument {
    /// Validates every strike and produces a snapshot in delivery order.
    ///
    /// # Errors
    /// Returns [`Error::NoData`] when the document carries no strikes and
    /// [`Error::Validation`] when any strike is missing a leg.
    pub fn into_snapshot(self) -> Result<ChainSnapshot, Error> {
        let raw = match self.data {
            Some(data) if !data.is_empty() => data,
            _ => return Err(Error::NoData("chain document has no strikes".to_string())),
        };

        let strikes = raw
            .into_iter()
            .map(StrikeRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ChainSnapshot {
            strikes,
            underlying_spot_price: self.underlying_spot_price,
            fetched_at: self.fetched_at,
        })
    }
}

/// Decodes the body of the chain read endpoint.
///
/// A literal `null` body means nothing has been stored for the selector yet.
///
/// # Errors
/// Returns [`Error::Decode`], [`Error::NoData`] or [`Error::Validation`].
pub fn decode_chain(body: &[u8]) -> Result<ChainSnapshot, Error> {
    let document: Option<ChainDocument> = serde_json::from_slice(body)?;
    match document {
        Some(document) => document.into_snapshot(),
        None => Err(Error::NoData("backend has no stored chain".to_string())),
    }
}

/// Ordered sequence of strikes as delivered by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    /// Strikes, never re-sorted.
    pub strikes: Vec<StrikeRecord>,
    /// Spot price of the underlying at fetch time.
    #[serde(default)]
    pub underlying_spot_price: Option<f64>,
    /// Backend fetch timestamp.
    #[serde(default)]
    pub fetched_at: Option<String>,
}

impl ChainSnapshot {
    /// Creates a snapshot from strikes only.
    #[must_use]
    pub fn new(strikes: Vec<StrikeRecord>) -> Self {
        Self {
            strikes,
            underlying_spot_price: None,
            fetched_at: None,
        }
    }

    /// Number of strikes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strikes.len()
    }

    /// Returns true when there are no strikes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strikes.is_empty()
    }

    /// Iterates strikes in delivery order.
    pub fn iter(&self) -> std::slice::Iter<'_, StrikeRecord> {
        self.strikes.iter()
    }

    /// Strike closest to the underlying spot price, if the spot is known.
    #[must_use]
    pub fn at_the_money_strike(&self) -> Option<f64> {
        let spot = self.underlying_spot_price?;
        self.strikes
            .iter()
            .map(|s| s.strike_price)
            .min_by(|a, b| (a - spot).abs().total_cmp(&(b - spot).abs()))
    }
}

// ============================================================================
// Metrics
// ============================================================================

/// Metrics request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsRequest {
    /// Instrument key.
    pub instrument_key: String,
    /// Expiry date.
    pub expiry_date: String,
}

impl From<&Selector> for MetricsRequest {
    fn from(selector: &Selector) -> Self {
        Self {
            instrument_key: selector.instrument_key.clone(),
            expiry_date: selector.expiry_date.clone(),
        }
    }
}

/// Metric name to value mapping that keeps the order the backend sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricMap(Vec<(String, f64)>);

impl MetricMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Inserts or overwrites a metric, keeping its first position.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Value of a metric.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    /// Returns true when the metric is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    /// Metric names in delivery order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    /// Entries in delivery order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of metrics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for MetricMap {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for MetricMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MetricMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MetricMapVisitor;

        impl<'de> Visitor<'de> for MetricMapVisitor {
            type Value = MetricMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of metric names to numbers")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<MetricMap, A::Error> {
                let mut map = MetricMap::new();
                while let Some((key, value)) = access.next_entry::<String, f64>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(MetricMapVisitor)
    }
}

/// Call and put metric maps. Key sets may differ between sides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsGroup {
    /// Call-side metrics.
    #[serde(default)]
    pub call: MetricMap,
    /// Put-side metrics.
    #[serde(default)]
    pub put: MetricMap,
}

/// Bid/ask quantity imbalance per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BidAskImbalance {
    /// Call side.
    pub call: f64,
    /// Put side.
    pub put: f64,
}

/// Average bid and ask prices of one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SideSpread {
    /// Average bid.
    pub bid_avg: f64,
    /// Average ask.
    pub ask_avg: f64,
}

/// Average bid and ask prices per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BidAskSpread {
    /// Call side.
    pub call: SideSpread,
    /// Put side.
    pub put: SideSpread,
}

/// Aggregate metrics for a selector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Underlying price.
    pub current_price: f64,
    /// Totals per side.
    pub totals: MetricsGroup,
    /// Change against the baseline.
    pub difference: MetricsGroup,
    /// Change against the baseline in percent.
    pub difference_percent: MetricsGroup,
    /// Bid/ask imbalance.
    pub bid_ask_imbalance: BidAskImbalance,
    /// Bid/ask spread.
    pub bid_ask_spread: BidAskSpread,
}

/// Decodes the body of the metrics endpoint.
///
/// An empty object, a non-object, or an object without `current_price` is
/// "no data" rather than partial data. A `null` price counts as missing even
/// when the tables are present, since there is no spot to show beside them.
///
/// # Errors
/// Returns [`Error::Decode`] or [`Error::NoData`].
pub fn decode_metrics(body: &[u8]) -> Result<MetricsSnapshot, Error> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    let has_price = value
        .get("current_price")
        .is_some_and(|price| !price.is_null());

    if !has_price {
        return Err(Error::NoData(
            "metrics body has no current_price".to_string(),
        ));
    }

    Ok(serde_json::from_value(value)?)
}
