//! Symmetric call/put display rows.
//!
//! A row reads left to right as the call leg's fields, the strike, and the put
//! leg's fields in mirrored order, so that the same metric sits at the same
//! distance from the strike on both sides:
//!
//! ```text
//! OI Volume IV ... POP | Strike | POP ... IV Volume OI
//! ```

use chain_client::{ChainSnapshot, OptionLeg, StrikeRecord};
use std::fmt;

/// Number of fields shown per leg.
pub const LEG_FIELD_COUNT: usize = 13;

/// Number of columns in a display row.
pub const ROW_WIDTH: usize = 2 * LEG_FIELD_COUNT + 1;

/// One field of an option leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegField {
    /// Open interest.
    Oi,
    /// Traded volume.
    Volume,
    /// Implied volatility.
    Iv,
    /// Last traded price.
    Ltp,
    /// Best bid price.
    BidPrice,
    /// Quantity at best bid.
    BidQty,
    /// Best ask price.
    AskPrice,
    /// Quantity at best ask.
    AskQty,
    /// Delta.
    Delta,
    /// Gamma.
    Gamma,
    /// Theta.
    Theta,
    /// Vega.
    Vega,
    /// Probability of profit.
    Pop,
}

/// Call-side field order, outermost column first.
pub const LEG_FIELDS: [LegField; LEG_FIELD_COUNT] = [
    LegField::Oi,
    LegField::Volume,
    LegField::Iv,
    LegField::Ltp,
    LegField::BidPrice,
    LegField::BidQty,
    LegField::AskPrice,
    LegField::AskQty,
    LegField::Delta,
    LegField::Gamma,
    LegField::Theta,
    LegField::Vega,
    LegField::Pop,
];

impl LegField {
    /// Column header.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Oi => "OI",
            Self::Volume => "Volume",
            Self::Iv => "IV",
            Self::Ltp => "LTP",
            Self::BidPrice => "Bid Price",
            Self::BidQty => "Bid Qty",
            Self::AskPrice => "Ask Price",
            Self::AskQty => "Ask Qty",
            Self::Delta => "Delta",
            Self::Gamma => "Gamma",
            Self::Theta => "Theta",
            Self::Vega => "Vega",
            Self::Pop => "POP",
        }
    }

    /// Reads this field from a leg.
    #[must_use]
    pub fn value(self, leg: &OptionLeg) -> f64 {
        let m = &leg.market_data;
        let g = &leg.greeks;
        match self {
            Self::Oi => m.oi,
            Self::Volume => m.volume,
            Self::Iv => g.iv,
            Self::Ltp => m.ltp,
            Self::BidPrice => m.bid_price,
            Self::BidQty => m.bid_qty,
            Self::AskPrice => m.ask_price,
            Self::AskQty => m.ask_qty,
            Self::Delta => g.delta,
            Self::Gamma => g.gamma,
            Self::Theta => g.theta,
            Self::Vega => g.vega,
            Self::Pop => g.pop,
        }
    }
}

/// What a table column shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// A call-leg field.
    Call(LegField),
    /// The strike price.
    Strike,
    /// A put-leg field.
    Put(LegField),
}

impl Column {
    /// Column header.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Call(field) | Self::Put(field) => field.label(),
            Self::Strike => "Strike Price",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Column layout of the chain table, built from [`LEG_FIELDS`] alone.
#[must_use]
pub fn column_layout() -> Vec<Column> {
    let mut columns = Vec::with_capacity(ROW_WIDTH);
    columns.extend(LEG_FIELDS.iter().map(|&f| Column::Call(f)));
    columns.push(Column::Strike);
    columns.extend(LEG_FIELDS.iter().rev().map(|&f| Column::Put(f)));
    columns
}

/// One strike laid out for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRow {
    /// Call values in [`LEG_FIELDS`] order.
    pub call: [f64; LEG_FIELD_COUNT],
    /// Strike price.
    pub strike: f64,
    /// Put values in reverse [`LEG_FIELDS`] order.
    pub put: [f64; LEG_FIELD_COUNT],
}

impl DisplayRow {
    /// Lays out one strike.
    #[must_use]
    pub fn from_record(record: &StrikeRecord) -> Self {
        let call = LEG_FIELDS.map(|f| f.value(&record.call));
        let mut put = LEG_FIELDS.map(|f| f.value(&record.put));
        put.reverse();

        Self {
            call,
            strike: record.strike_price,
            put,
        }
    }

    /// All cells left to right.
    #[must_use]
    pub fn cells(&self) -> Vec<f64> {
        let mut cells = Vec::with_capacity(ROW_WIDTH);
        cells.extend_from_slice(&self.call);
        cells.push(self.strike);
        cells.extend_from_slice(&self.put);
        cells
    }
}

/// Projects every strike into a display row, in snapshot order.
#[must_use]
pub fn join(snapshot: &ChainSnapshot) -> Vec<DisplayRow> {
    snapshot.iter().map(DisplayRow::from_record).collect()
}
