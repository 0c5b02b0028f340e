//! Metric selections and their visual categorization.
//!
//! Every node and edge carries a primary metric, an optional secondary one
//! and optional extra metrics. The primary and secondary channels are
//! categorized independently and then combined by
//! [`category::resolve_display_category`].

pub mod category;
pub mod defaults;
pub mod format;

use crate::specification::MetricAggregationSpecification;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use category::{
    all_categories, categorize, resolve_display_category, CategoryThreshold, MetricCategory,
    Severity, ThresholdRule,
};
pub use format::{display_string, MetricDisplay, NumericFormatter, PLACEHOLDER};

/// A resolved metric value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricAggregation {
    /// Numeric value
    pub value: f64,
    /// Units reported by the backend, e.g. `ms`
    #[serde(default)]
    pub units: Option<String>,
}

impl MetricAggregation {
    /// Creates a metric value without units
    pub fn new(value: f64) -> Self {
        Self { value, units: None }
    }

    /// Creates a metric value with units
    pub fn with_units(value: f64, units: impl Into<String>) -> Self {
        Self {
            value,
            units: Some(units.into()),
        }
    }
}

/// Resolved metrics of one element, keyed by the specification that
/// requested them
pub type MetricMap = BTreeMap<MetricAggregationSpecification, MetricAggregation>;

/// A metric selected for display together with its category table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyMetric {
    /// What to request
    pub specification: MetricAggregationSpecification,
    /// Thresholds, checked in order
    #[serde(default)]
    pub categories: Vec<CategoryThreshold>,
    /// How the value is rendered as text
    #[serde(default)]
    pub display: MetricDisplay,
}

impl TopologyMetric {
    /// Metric without categories
    pub fn new(specification: MetricAggregationSpecification) -> Self {
        Self {
            specification,
            categories: Vec::new(),
            display: MetricDisplay::Raw,
        }
    }

    /// Attach a category table
    pub fn with_categories(mut self, categories: Vec<CategoryThreshold>) -> Self {
        self.categories = categories;
        self
    }

    /// Set the display mode
    pub fn with_display(mut self, display: MetricDisplay) -> Self {
        self.display = display;
        self
    }
}

/// Metrics selected for nodes or for edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSelection {
    /// Main channel
    pub primary: TopologyMetric,
    /// Second channel, whose critical category overrides the primary one
    #[serde(default)]
    pub secondary: Option<TopologyMetric>,
    /// Requested but not categorized
    #[serde(default)]
    pub others: Option<Vec<TopologyMetric>>,
}

impl MetricSelection {
    /// Selection with only a primary metric
    pub fn primary(primary: TopologyMetric) -> Self {
        Self {
            primary,
            secondary: None,
            others: None,
        }
    }

    /// Add a secondary metric
    pub fn with_secondary(mut self, secondary: TopologyMetric) -> Self {
        self.secondary = Some(secondary);
        self
    }

    /// Every specification to request: primary, secondary, then others
    pub fn all_specifications(&self) -> Vec<MetricAggregationSpecification> {
        std::iter::once(&self.primary)
            .chain(self.secondary.as_ref())
            .chain(self.others.iter().flatten())
            .map(|metric| metric.specification.clone())
            .collect()
    }
}

/// One channel of an element after lookup and categorization
#[derive(Debug, Clone, Copy)]
pub struct ChannelReading<'a> {
    /// Value found in the element's metrics, if any
    pub aggregation: Option<&'a MetricAggregation>,
    /// Category of that value, if any
    pub category: Option<&'a MetricCategory>,
    /// Display mode of the channel
    pub display: MetricDisplay,
}

impl<'a> ChannelReading<'a> {
    /// Looks up and categorizes `metric` in `metrics`. An unconfigured channel
    /// or a value missing from the response reads as empty.
    pub fn read(metric: Option<&'a TopologyMetric>, metrics: &'a MetricMap) -> Self {
        match metric {
            Some(metric) => {
                let aggregation = metrics.get(&metric.specification);
                Self {
                    aggregation,
                    category: categorize(aggregation.map(|a| a.value), &metric.categories),
                    display: metric.display,
                }
            },
            None => Self::empty(),
        }
    }

    /// A channel with nothing in it
    pub fn empty() -> Self {
        Self {
            aggregation: None,
            category: None,
            display: MetricDisplay::Raw,
        }
    }

    fn text(&self, formatter: &NumericFormatter) -> Option<String> {
        self.aggregation.map(|aggregation| {
            formatter.format_metric(aggregation.value, aggregation.units.as_deref(), self.display)
        })
    }
}

/// Label text for an element.
///
/// Follows the display-category precedence: the secondary value is shown
/// when its category is critical or when only the secondary channel is
/// categorized, otherwise a categorized primary value. Without any category
/// the raw primary value is shown, then the raw secondary value, and with no
/// value at all the placeholder.
pub fn metric_value_text(
    primary: &ChannelReading<'_>,
    secondary: &ChannelReading<'_>,
    formatter: &NumericFormatter,
) -> String {
    let secondary_wins = secondary.category.is_some_and(|category| {
        category.severity == Severity::Critical || primary.category.is_none()
    });

    let text = if secondary_wins {
        secondary.text(formatter)
    } else if primary.category.is_some() {
        primary.text(formatter)
    } else {
        primary.text(formatter).or_else(|| secondary.text(formatter))
    };

    text.unwrap_or_else(|| PLACEHOLDER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specification::{MetricAggregationType, SpecificationBuilder};

    fn spec(metric: &str) -> MetricAggregationSpecification {
        SpecificationBuilder::new().metric_aggregation_specification(metric, MetricAggregationType::Avg)
    }

    fn selection() -> MetricSelection {
        MetricSelection::primary(
            TopologyMetric::new(spec("duration")).with_categories(defaults::primary_edge_categories()),
        )
        .with_secondary(
            TopologyMetric::new(spec("errorPercentage"))
                .with_categories(defaults::secondary_edge_categories()),
        )
    }

    #[test]
    fn test_all_specifications_order() {
        let mut selection = selection();
        selection.others = Some(vec![TopologyMetric::new(spec("calls"))]);
        let specs = selection.all_specifications();
        let names: Vec<_> = specs.iter().map(|s| s.metric.as_str()).collect();
        assert_eq!(names, vec!["duration", "errorPercentage", "calls"]);
    }

    #[test]
    fn test_critical_secondary_value_is_shown() {
        let selection = selection();
        let mut metrics = MetricMap::new();
        metrics.insert(spec("duration"), MetricAggregation::with_units(250.0, "ms"));
        metrics.insert(spec("errorPercentage"), MetricAggregation::with_units(8.0, "%"));

        let primary = ChannelReading::read(Some(&selection.primary), &metrics);
        let secondary = ChannelReading::read(selection.secondary.as_ref(), &metrics);
        let text = metric_value_text(&primary, &secondary, &NumericFormatter::default());
        assert_eq!(text, "8%");
    }

    #[test]
    fn test_categorized_primary_value_is_shown() {
        let selection = selection();
        let mut metrics = MetricMap::new();
        metrics.insert(spec("duration"), MetricAggregation::with_units(250.0, "ms"));
        metrics.insert(spec("errorPercentage"), MetricAggregation::with_units(1.0, "%"));

        let primary = ChannelReading::read(Some(&selection.primary), &metrics);
        let secondary = ChannelReading::read(selection.secondary.as_ref(), &metrics);
        let text = metric_value_text(&primary, &secondary, &NumericFormatter::default());
        assert_eq!(text, "250ms");
    }

    #[test]
    fn test_missing_metrics_render_placeholder() {
        let selection = selection();
        let metrics = MetricMap::new();
        let primary = ChannelReading::read(Some(&selection.primary), &metrics);
        let secondary = ChannelReading::read(selection.secondary.as_ref(), &metrics);
        assert!(primary.category.is_none());
        assert_eq!(metric_value_text(&primary, &secondary, &NumericFormatter::default()), "-");
    }

    #[test]
    fn test_uncategorized_value_is_still_shown() {
        let metric = TopologyMetric::new(spec("errorRate"))
            .with_categories(vec![CategoryThreshold::new(
                ThresholdRule::AtLeast(0.5),
                MetricCategory::new("critical", defaults::color::RED_5, Severity::Critical),
            )])
            .with_display(MetricDisplay::Percent);
        let mut metrics = MetricMap::new();
        metrics.insert(spec("errorRate"), MetricAggregation::new(0.1));

        let primary = ChannelReading::read(Some(&metric), &metrics);
        assert!(primary.category.is_none());
        let text = metric_value_text(&primary, &ChannelReading::empty(), &NumericFormatter::default());
        assert_eq!(text, "10%");
    }
}
