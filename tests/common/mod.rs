//! Common test utilities and fixtures.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use topograph_lib::core::{EntityType, TimeRange};
use topograph_lib::topology::{TopologyDataSource, TopologyResponse, TopologyWidgetConfig};

/// Widget with a single error rate edge metric that turns critical at 50%.
pub const ERROR_RATE_WIDGET: &str = r##"
entity: SERVICE
edge-metrics:
  primary:
    specification:
      metric: errorRate
      aggregation: avg
    display: percent
    categories:
      - rule: { at_least: 0.5 }
        category:
          id: critical
          color: "#dc3d43"
          category_class: critical
          severity: critical
"##;

/// Color of the critical category in [`ERROR_RATE_WIDGET`].
pub const CRITICAL_COLOR: &str = "#dc3d43";

/// One hour window ending `end_secs` after the epoch.
pub fn time_range(end_secs: i64) -> TimeRange {
    TimeRange::new(
        Utc.timestamp_opt(end_secs - 3600, 0).unwrap(),
        Utc.timestamp_opt(end_secs, 0).unwrap(),
    )
    .unwrap()
}

pub fn error_rate_widget() -> TopologyWidgetConfig {
    TopologyWidgetConfig::from_yaml(ERROR_RATE_WIDGET).unwrap()
}

/// [`ERROR_RATE_WIDGET`] with another critical threshold and color.
pub fn error_rate_widget_with(threshold: f64, color: &str) -> TopologyWidgetConfig {
    let yaml = ERROR_RATE_WIDGET
        .replace("at_least: 0.5", &format!("at_least: {}", threshold))
        .replace(CRITICAL_COLOR, color);
    TopologyWidgetConfig::from_yaml(&yaml).unwrap()
}

pub fn error_rate_source(end_secs: i64) -> TopologyDataSource {
    TopologyDataSource::new(error_rate_widget())
        .unwrap()
        .with_time_range(time_range(end_secs))
}

pub fn service_source(end_secs: i64) -> TopologyDataSource {
    TopologyDataSource::new(TopologyWidgetConfig::new(EntityType::Service))
        .unwrap()
        .with_time_range(time_range(end_secs))
}

/// Builder for recorded responses where every root calls its callees.
#[derive(Default)]
pub struct ResponseBuilder {
    roots: Vec<serde_json::Value>,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `root` calling each `(callee, error_rate)` pair.
    pub fn root(mut self, root: &str, callees: &[(&str, Option<f64>)]) -> Self {
        let edges: Vec<_> = callees
            .iter()
            .map(|(callee, error_rate)| {
                serde_json::json!({
                    "neighbor": { "id": callee, "type": "SERVICE", "attributes": { "name": callee } },
                    "metrics": { "avg_errorRate": { "value": error_rate } }
                })
            })
            .collect();
        self.roots.push(serde_json::json!({
            "id": root,
            "type": "SERVICE",
            "attributes": { "name": root },
            "outgoing_edges": edges
        }));
        self
    }

    pub fn build(self) -> TopologyResponse {
        serde_json::from_value(serde_json::json!({ "nodes": self.roots })).unwrap()
    }
}
