//! Metrics side of the viewer: fetched on selector change, shown as tables.

pub mod panel;
pub mod table;

pub use panel::{MetricsPanel, PanelState};
pub use table::{ABSENT, MetricRow, MetricTable, MetricsView, SideRow, build_rows};
