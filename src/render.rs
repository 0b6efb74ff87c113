//! Plain-text rendering of the chain and metrics tables.

use crate::metrics::{ABSENT, MetricTable, MetricsView, SideRow};
use crate::rows::{ROW_WIDTH, column_layout, join};
use crate::snapshot::StoredSnapshot;
use chain_client::Selector;

/// Marker prefixed to the at-the-money row.
pub const ATM_MARKER: &str = ">";

/// Formats one chain cell.
///
/// Whole numbers print without decimals, magnitudes below one keep four
/// decimals (greeks, probabilities), everything else keeps two.
#[must_use]
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else if value.abs() < 1.0 {
        format!("{value:.4}")
    } else {
        format!("{value:.2}")
    }
}

fn write_grid(out: &mut String, header: &[String], body: &[Vec<String>], marked: Option<usize>) {
    let mut widths: Vec<usize> = header.iter().map(String::len).collect();
    for row in body {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let line = |cells: &[String], marker: &str| -> String {
        let mut s = format!("{marker:1} ");
        for (i, (cell, width)) in cells.iter().zip(&widths).enumerate() {
            if i > 0 {
                s.push_str(" | ");
            }
            s.push_str(&format!("{cell:>width$}"));
        }
        s.push('\n');
        s
    };

    out.push_str(&line(header, ""));
    let rule: usize = widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1) + 2;
    out.push_str(&"-".repeat(rule));
    out.push('\n');
    for (i, row) in body.iter().enumerate() {
        let marker = if marked == Some(i) { ATM_MARKER } else { "" };
        out.push_str(&line(row, marker));
    }
}

/// Renders the option chain table for `selector`.
#[must_use]
pub fn render_chain(selector: &Selector, stored: Option<&StoredSnapshot>) -> String {
    let mut out = format!("Option chain {selector}\n");

    let Some(stored) = stored else {
        out.push_str("No data. Select an expiry date and start fetching.\n");
        return out;
    };
    let snapshot = &stored.snapshot;

    if let Some(spot) = snapshot.underlying_spot_price {
        out.push_str(&format!("Spot: {}\n", format_value(spot)));
    }
    if let Some(fetched_at) = &snapshot.fetched_at {
        out.push_str(&format!("Fetched at: {fetched_at}\n"));
    }
    if let Some(updated_at) = stored.updated_at {
        out.push_str(&format!("Updated: {}\n", updated_at.format("%H:%M:%S")));
    }

    let header: Vec<String> = column_layout().iter().map(|c| c.label().to_string()).collect();
    let body: Vec<Vec<String>> = join(snapshot)
        .iter()
        .map(|row| row.cells().into_iter().map(format_value).collect())
        .collect();
    debug_assert!(body.iter().all(|r| r.len() == ROW_WIDTH));

    let atm = snapshot
        .at_the_money_strike()
        .and_then(|strike| snapshot.iter().position(|s| s.strike_price == strike));

    out.push_str("CALLS / PUTS\n");
    write_grid(&mut out, &header, &body, atm);
    out
}

fn write_metric_table(out: &mut String, table: &MetricTable) {
    out.push_str(&format!("\n{}\n", table.title));
    if table.rows.is_empty() {
        out.push_str(&format!("  {ABSENT}\n"));
        return;
    }
    let header = vec!["Metric".to_string(), "Call".to_string(), "Put".to_string()];
    let body: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|r| vec![r.metric.clone(), r.call_display(), r.put_display()])
        .collect();
    write_grid(out, &header, &body, None);
}

fn write_side_table(out: &mut String, title: &str, columns: &[&str], rows: &[SideRow]) {
    out.push_str(&format!("\n{title}\n"));
    let header: Vec<String> = std::iter::once("Side")
        .chain(columns.iter().copied())
        .map(str::to_string)
        .collect();
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            std::iter::once(r.side.to_string())
                .chain(r.formatted())
                .collect()
        })
        .collect();
    write_grid(out, &header, &body, None);
}

/// Renders the metrics screen, with the last error when there is one.
#[must_use]
pub fn render_metrics(view: &MetricsView, error: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(error) = error {
        out.push_str(&format!("Error: {error}\n"));
    }
    out.push_str(&format!("Current price: {}\n", view.current_price));

    for table in &view.tables {
        write_metric_table(&mut out, table);
    }
    write_side_table(&mut out, "Bid/Ask Imbalance", &["Imbalance"], &view.imbalance);
    write_side_table(&mut out, "Bid/Ask Spread", &["Bid Avg", "Ask Avg"], &view.spread);
    out
}
