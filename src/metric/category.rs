//! Threshold based metric categorization.

use serde::{Deserialize, Serialize};

/// How alarming a category is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// No attention needed
    #[default]
    Normal,
    /// Worth a look
    Warning,
    /// Overrides the primary channel when found on the secondary one
    Critical,
}

/// Discrete visual classification of a metric value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricCategory {
    /// Category id, e.g. `greater-than-or-equal-to-5`
    pub id: String,
    /// Fill/stroke color used when the element is emphasized
    pub color: String,
    /// Class name applied to markers drawn in this category
    pub category_class: String,
    /// Severity of the category
    #[serde(default)]
    pub severity: Severity,
}

impl MetricCategory {
    /// Creates a category whose class is derived from its id
    pub fn new(id: impl Into<String>, color: impl Into<String>, severity: Severity) -> Self {
        let id = id.into();
        Self {
            category_class: id.clone(),
            id,
            color: color.into(),
            severity,
        }
    }
}

/// Comparison a value must satisfy for a threshold to apply
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdRule {
    /// value >= bound
    AtLeast(f64),
    /// value > bound
    Above(f64),
    /// value < bound
    Below(f64),
    /// value <= bound
    AtMost(f64),
    /// min <= value < max
    Between {
        /// Inclusive lower bound
        min: f64,
        /// Exclusive upper bound
        max: f64,
    },
}

impl ThresholdRule {
    /// Whether `value` satisfies this rule
    pub fn matches(&self, value: f64) -> bool {
        match *self {
            ThresholdRule::AtLeast(bound) => value >= bound,
            ThresholdRule::Above(bound) => value > bound,
            ThresholdRule::Below(bound) => value < bound,
            ThresholdRule::AtMost(bound) => value <= bound,
            ThresholdRule::Between { min, max } => value >= min && value < max,
        }
    }
}

/// A rule and the category it yields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryThreshold {
    /// Condition, written as a single-key map such as `{ at_least: 0.5 }`
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub rule: ThresholdRule,
    /// Resulting category
    pub category: MetricCategory,
}

impl CategoryThreshold {
    /// Creates a threshold
    pub fn new(rule: ThresholdRule, category: MetricCategory) -> Self {
        Self { rule, category }
    }
}

/// Classifies `value` against `thresholds`, checked in list order. The first
/// matching threshold wins, so tables list the most severe bucket first when
/// buckets overlap.
///
/// Returns `None` for an absent or non-finite value and when nothing
/// matches. `None` means "no emphasis", not an error.
pub fn categorize(value: Option<f64>, thresholds: &[CategoryThreshold]) -> Option<&MetricCategory> {
    let value = value.filter(|v| v.is_finite())?;
    thresholds
        .iter()
        .find(|threshold| threshold.rule.matches(value))
        .map(|threshold| &threshold.category)
}

/// Picks the category an element is displayed with.
///
/// A critical secondary category always wins, whatever the primary says.
/// Otherwise the primary category is used, and without one nothing is shown.
/// The rule is fixed and only defined for the two channels.
pub fn resolve_display_category<'a>(
    primary: Option<&'a MetricCategory>,
    secondary: Option<&'a MetricCategory>,
) -> Option<&'a MetricCategory> {
    if let Some(secondary) = secondary.filter(|c| c.severity == Severity::Critical) {
        return Some(secondary);
    }
    primary
}

/// Every category of both channels, once per category class, primary first
pub fn all_categories(
    primary: Option<&[CategoryThreshold]>,
    secondary: Option<&[CategoryThreshold]>,
) -> Vec<MetricCategory> {
    let mut seen = std::collections::HashSet::new();
    primary
        .into_iter()
        .chain(secondary)
        .flatten()
        .filter(|threshold| seen.insert(threshold.category.category_class.clone()))
        .map(|threshold| threshold.category.clone())
        .collect()
}
