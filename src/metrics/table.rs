//! Metric tables built from a metrics snapshot.

use chain_client::{BidAskImbalance, BidAskSpread, MetricsGroup, MetricsSnapshot};
use std::collections::HashSet;

/// Placeholder shown for a metric one side does not report.
pub const ABSENT: &str = "-";

/// One metric with its call and put values.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    /// Metric name.
    pub metric: String,
    /// Call-side value, absent when the call map lacks the key.
    pub call: Option<f64>,
    /// Put-side value, absent when the put map lacks the key.
    pub put: Option<f64>,
}

impl MetricRow {
    /// Call value as shown.
    #[must_use]
    pub fn call_display(&self) -> String {
        display(self.call)
    }

    /// Put value as shown.
    #[must_use]
    pub fn put_display(&self) -> String {
        display(self.put)
    }
}

fn display(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => ABSENT.to_string(),
    }
}

/// Builds one row per key in the union of both sides.
///
/// Call keys come first in their delivered order, followed by put-only keys in
/// theirs.
#[must_use]
pub fn build_rows(group: &MetricsGroup) -> Vec<MetricRow> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(group.call.len() + group.put.len());
    let mut rows = Vec::with_capacity(group.call.len() + group.put.len());

    for (key, value) in group.call.iter() {
        if seen.insert(key) {
            rows.push(MetricRow {
                metric: key.to_string(),
                call: Some(value),
                put: group.put.get(key),
            });
        }
    }

    for (key, value) in group.put.iter() {
        if seen.insert(key) {
            rows.push(MetricRow {
                metric: key.to_string(),
                call: None,
                put: Some(value),
            });
        }
    }

    rows
}

/// Titled metric table.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricTable {
    /// Table title.
    pub title: &'static str,
    /// Rows in union order.
    pub rows: Vec<MetricRow>,
}

impl MetricTable {
    /// Builds a titled table from a group.
    #[must_use]
    pub fn new(title: &'static str, group: &MetricsGroup) -> Self {
        Self {
            title,
            rows: build_rows(group),
        }
    }
}

/// Per-side row of a fixed-shape table (imbalance, spread).
#[derive(Debug, Clone, PartialEq)]
pub struct SideRow {
    /// "Call" or "Put".
    pub side: &'static str,
    /// Values in column order.
    pub values: Vec<f64>,
}

impl SideRow {
    /// Values formatted with four decimals.
    #[must_use]
    pub fn formatted(&self) -> Vec<String> {
        self.values.iter().map(|v| format!("{v:.4}")).collect()
    }
}

/// Rows of the bid/ask imbalance table.
#[must_use]
pub fn imbalance_rows(imbalance: &BidAskImbalance) -> Vec<SideRow> {
    vec![
        SideRow {
            side: "Call",
            values: vec![imbalance.call],
        },
        SideRow {
            side: "Put",
            values: vec![imbalance.put],
        },
    ]
}

/// Rows of the bid/ask spread table (bid avg, ask avg).
#[must_use]
pub fn spread_rows(spread: &BidAskSpread) -> Vec<SideRow> {
    vec![
        SideRow {
            side: "Call",
            values: vec![spread.call.bid_avg, spread.call.ask_avg],
        },
        SideRow {
            side: "Put",
            values: vec![spread.put.bid_avg, spread.put.ask_avg],
        },
    ]
}

/// Everything the metrics screen shows.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsView {
    /// Underlying price.
    pub current_price: f64,
    /// Totals, difference and difference percent tables.
    pub tables: [MetricTable; 3],
    /// Bid/ask imbalance rows.
    pub imbalance: Vec<SideRow>,
    /// Bid/ask spread rows.
    pub spread: Vec<SideRow>,
}

impl MetricsView {
    /// Builds the view; without metrics every table is empty and numbers are zero.
    #[must_use]
    pub fn new(metrics: Option<&MetricsSnapshot>) -> Self {
        let empty = MetricsSnapshot::default();
        let m = metrics.unwrap_or(&empty);

        Self {
            current_price: m.current_price,
            tables: [
                MetricTable::new("Totals", &m.totals),
                MetricTable::new("Difference", &m.difference),
                MetricTable::new("Difference %", &m.difference_percent),
            ],
            imbalance: imbalance_rows(&m.bid_ask_imbalance),
            spread: spread_rows(&m.bid_ask_spread),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::metrics;
    use chain_client::MetricMap;

    fn group(call: &[(&str, f64)], put: &[(&str, f64)]) -> MetricsGroup {
        MetricsGroup {
            call: call.iter().copied().collect::<MetricMap>(),
            put: put.iter().copied().collect::<MetricMap>(),
        }
    }

    #[test]
    fn test_union_of_asymmetric_keys() {
        let rows = build_rows(&group(&[("a", 1.0), ("b", 2.0)], &[("b", 3.0), ("c", 4.0)]));

        assert_eq!(
            rows,
            vec![
                MetricRow {
                    metric: "a".to_string(),
                    call: Some(1.0),
                    put: None,
                },
                MetricRow {
                    metric: "b".to_string(),
                    call: Some(2.0),
                    put: Some(3.0),
                },
                MetricRow {
                    metric: "c".to_string(),
                    call: None,
                    put: Some(4.0),
                },
            ]
        );
    }

    #[test]
    fn test_order_is_call_keys_then_put_only_keys() {
        let rows = build_rows(&group(
            &[("volume", 1.0), ("oi", 2.0)],
            &[("ask_qty", 3.0), ("oi", 4.0), ("bid_qty", 5.0)],
        ));

        let names: Vec<&str> = rows.iter().map(|r| r.metric.as_str()).collect();
        assert_eq!(names, vec!["volume", "oi", "ask_qty", "bid_qty"]);
    }

    #[test]
    fn test_put_only_group() {
        let rows = build_rows(&group(&[], &[("iv", 14.1)]));

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].call, None);
        assert_eq!(rows[0].put, Some(14.1));
    }

    #[test]
    fn test_absent_renders_placeholder_not_zero() {
        let rows = build_rows(&group(&[("oi", 0.0)], &[("iv", 2.5)]));

        assert_eq!(rows[0].call_display(), "0");
        assert_eq!(rows[0].put_display(), ABSENT);
        assert_eq!(rows[1].call_display(), ABSENT);
        assert_eq!(rows[1].put_display(), "2.5");
    }

    #[test]
    fn test_empty_group_has_no_rows() {
        assert!(build_rows(&MetricsGroup::default()).is_empty());
    }

    #[test]
    fn test_side_rows_four_decimals() {
        let m = metrics(23501.25);

        let imbalance = imbalance_rows(&m.bid_ask_imbalance);
        assert_eq!(imbalance[0].side, "Call");
        assert_eq!(imbalance[0].formatted(), vec!["0.1235"]);
        assert_eq!(imbalance[1].formatted(), vec!["-0.5000"]);

        let spread = spread_rows(&m.bid_ask_spread);
        assert_eq!(spread[1].side, "Put");
        assert_eq!(spread[1].formatted(), vec!["99.2500", "99.7500"]);
    }

    #[test]
    fn test_view_from_snapshot() {
        let m = metrics(23501.25);

        let view = MetricsView::new(Some(&m));

        assert_eq!(view.current_price, 23501.25);
        assert_eq!(view.tables[0].title, "Totals");
        assert_eq!(view.tables[0].rows.len(), 2);
        assert!(view.tables[1].rows.is_empty());
        assert_eq!(view.tables[2].title, "Difference %");
    }

    #[test]
    fn test_view_without_metrics_is_empty() {
        let view = MetricsView::new(None);

        assert_eq!(view.current_price, 0.0);
        assert!(view.tables.iter().all(|t| t.rows.is_empty()));
        assert_eq!(view.imbalance[0].formatted(), vec!["0.0000"]);
        assert_eq!(view.spread[0].values, vec![0.0, 0.0]);
    }
}
