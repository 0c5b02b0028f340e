//! Value-equal query specifications.
//!
//! A specification describes one requested value: an entity attribute or an
//! aggregated metric. Two specifications built from the same arguments are
//! interchangeable, so they serve both as request fragments and as keys for
//! caching, deduplication and resolving values out of a response.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Aggregations the query backend can apply to a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricAggregationType {
    /// Number of samples
    Count,
    /// Sum of all samples
    Sum,
    /// Mean value
    Avg,
    /// Smallest sample
    Min,
    /// Largest sample
    Max,
    /// Mean per-second rate
    AvgRate,
    /// Median
    P50,
    /// 90th percentile
    P90,
    /// 95th percentile
    P95,
    /// 99th percentile
    P99,
}

impl MetricAggregationType {
    /// Short name used in result aliases
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricAggregationType::Count => "count",
            MetricAggregationType::Sum => "sum",
            MetricAggregationType::Avg => "avg",
            MetricAggregationType::Min => "min",
            MetricAggregationType::Max => "max",
            MetricAggregationType::AvgRate => "avgrate",
            MetricAggregationType::P50 => "p50",
            MetricAggregationType::P90 => "p90",
            MetricAggregationType::P95 => "p95",
            MetricAggregationType::P99 => "p99",
        }
    }
}

impl fmt::Display for MetricAggregationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request for a plain entity attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeSpecification {
    /// Attribute key
    pub name: String,
}

impl AttributeSpecification {
    /// Key the response uses for this value
    pub fn result_alias(&self) -> String {
        self.name.clone()
    }
}

/// Request for an aggregated metric
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetricAggregationSpecification {
    /// Metric key
    pub metric: String,
    /// Aggregation applied server side
    pub aggregation: MetricAggregationType,
}

impl MetricAggregationSpecification {
    /// Key the response uses for this value, e.g. `avg_duration`
    pub fn result_alias(&self) -> String {
        format!("{}_{}", self.aggregation, self.metric)
    }
}

impl fmt::Display for MetricAggregationSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.aggregation, self.metric)
    }
}

/// Any requested value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Specification {
    /// A plain entity attribute
    Attribute(AttributeSpecification),
    /// An aggregated metric
    MetricAggregation(MetricAggregationSpecification),
}

impl Specification {
    /// Key the response uses for this value
    pub fn result_alias(&self) -> String {
        match self {
            Specification::Attribute(spec) => spec.result_alias(),
            Specification::MetricAggregation(spec) => spec.result_alias(),
        }
    }

    /// Deterministic key, stable across processes
    pub fn cache_key(&self) -> u64 {
        stable_hash(self)
    }
}

impl From<AttributeSpecification> for Specification {
    fn from(spec: AttributeSpecification) -> Self {
        Specification::Attribute(spec)
    }
}

impl From<MetricAggregationSpecification> for Specification {
    fn from(spec: MetricAggregationSpecification) -> Self {
        Specification::MetricAggregation(spec)
    }
}

/// Hashes a value with FxHash. Unlike the std `RandomState`, the result does
/// not change between runs.
pub fn stable_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = rustc_hash::FxHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Builds specifications. Stateless; exists so call sites read the same way
/// wherever specifications are assembled.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecificationBuilder;

impl SpecificationBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self
    }

    /// Specification for an entity attribute
    pub fn attribute_specification_for_key(&self, name: impl Into<String>) -> AttributeSpecification {
        AttributeSpecification { name: name.into() }
    }

    /// Specification for an aggregated metric
    pub fn metric_aggregation_specification(
        &self,
        metric: impl Into<String>,
        aggregation: MetricAggregationType,
    ) -> MetricAggregationSpecification {
        MetricAggregationSpecification {
            metric: metric.into(),
            aggregation,
        }
    }
}
