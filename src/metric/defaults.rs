//! Category tables used when a widget does not configure its own.

use super::category::{CategoryThreshold, MetricCategory, Severity, ThresholdRule};

/// Colors of the default palette
pub mod color {
    #![allow(missing_docs)]
    pub const WHITE: &str = "#ffffff";
    pub const GRAY_3: &str = "#b7bfc2";
    pub const GRAY_5: &str = "#6f797d";
    pub const BLUE_3: &str = "#4e8fe0";
    pub const BLUE_5: &str = "#2563eb";
    pub const YELLOW_5: &str = "#ffc107";
    pub const ORANGE_5: &str = "#f7803e";
    pub const RED_5: &str = "#dc3d43";
}

/// Latency buckets in milliseconds for the primary edge channel
pub fn primary_edge_categories() -> Vec<CategoryThreshold> {
    latency_buckets()
}

/// Error percentage buckets for the secondary edge channel. The upper bucket
/// is critical and overrides whatever the primary channel says.
pub fn secondary_edge_categories() -> Vec<CategoryThreshold> {
    error_percentage_buckets()
}

/// Latency buckets for the primary node channel
pub fn primary_node_categories() -> Vec<CategoryThreshold> {
    latency_buckets()
}

/// Error percentage buckets for the secondary node channel
pub fn secondary_node_categories() -> Vec<CategoryThreshold> {
    error_percentage_buckets()
}

fn latency_buckets() -> Vec<CategoryThreshold> {
    vec![
        CategoryThreshold::new(
            ThresholdRule::Below(20.0),
            MetricCategory::new("less-than-20", color::GRAY_5, Severity::Normal),
        ),
        CategoryThreshold::new(
            ThresholdRule::Between { min: 20.0, max: 100.0 },
            MetricCategory::new("from-20-to-100", color::BLUE_3, Severity::Normal),
        ),
        CategoryThreshold::new(
            ThresholdRule::Between { min: 100.0, max: 500.0 },
            MetricCategory::new("from-100-to-500", color::BLUE_5, Severity::Normal),
        ),
        CategoryThreshold::new(
            ThresholdRule::Between { min: 500.0, max: 1000.0 },
            MetricCategory::new("from-500-to-1000", color::YELLOW_5, Severity::Warning),
        ),
        CategoryThreshold::new(
            ThresholdRule::AtLeast(1000.0),
            MetricCategory::new("greater-than-or-equal-to-1000", color::ORANGE_5, Severity::Warning),
        ),
    ]
}

fn error_percentage_buckets() -> Vec<CategoryThreshold> {
    vec![
        CategoryThreshold::new(
            ThresholdRule::Below(5.0),
            MetricCategory::new("less-than-5", color::GRAY_3, Severity::Normal),
        ),
        CategoryThreshold::new(
            ThresholdRule::AtLeast(5.0),
            MetricCategory::new("greater-than-or-equal-to-5", color::RED_5, Severity::Critical),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::category::{categorize, resolve_display_category};

    #[test]
    fn test_latency_buckets_cover_the_line() {
        let table = primary_edge_categories();
        for value in [0.0, 19.9, 20.0, 250.0, 999.0, 5000.0] {
            assert!(categorize(Some(value), &table).is_some(), "no bucket for {}", value);
        }
    }

    #[test]
    fn test_high_error_rate_overrides_slow_latency() {
        let primary = primary_edge_categories();
        let secondary = secondary_edge_categories();
        let latency = categorize(Some(1200.0), &primary);
        let errors = categorize(Some(12.0), &secondary);
        let shown = resolve_display_category(latency, errors).unwrap();
        assert_eq!(shown.id, "greater-than-or-equal-to-5");

        let calm_errors = categorize(Some(1.0), &secondary);
        let shown = resolve_display_category(latency, calm_errors).unwrap();
        assert_eq!(shown.id, "greater-than-or-equal-to-1000");
    }
}
