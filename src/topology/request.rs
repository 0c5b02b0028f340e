//! Topology fetch request as handed to the transport.

use crate::core::{EntityType, TimeRange};
use crate::filter::Filter;
use crate::specification::{stable_hash, AttributeSpecification, MetricAggregationSpecification};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Hard upper bound on root nodes per request
pub const MAX_ROOT_NODE_LIMIT: usize = 100;

/// Request kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestType {
    /// Entity topology query
    EntityTopology,
}

/// What to fetch for every node of a given type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopologyNodeSpecification {
    /// Attribute used as the node title
    pub title_specification: AttributeSpecification,
    /// Metrics to aggregate per node
    pub metric_specifications: Vec<MetricAggregationSpecification>,
}

/// What to fetch for every edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TopologyEdgeSpecification {
    /// Metrics to aggregate per edge
    pub metric_specifications: Vec<MetricAggregationSpecification>,
}

/// One topology fetch. Value-equal requests are interchangeable, which is
/// what deduplication and caching rely on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopologyRequest {
    /// Request kind
    pub request_type: RequestType,
    /// Type of the root nodes
    pub root_node_type: EntityType,
    /// Maximum number of root nodes
    pub root_node_limit: usize,
    /// Root node specification
    pub root_node_specification: TopologyNodeSpecification,
    /// Filters applied to root nodes
    pub root_node_filters: Vec<Filter>,
    /// Edge specification
    pub edge_specification: TopologyEdgeSpecification,
    /// Specification per upstream neighbor type
    pub upstream_node_specifications: BTreeMap<EntityType, TopologyNodeSpecification>,
    /// Specification per downstream neighbor type
    pub downstream_node_specifications: BTreeMap<EntityType, TopologyNodeSpecification>,
    /// Query window
    pub time_range: TimeRange,
}

impl TopologyRequest {
    /// Deterministic key derived from the request's value
    pub fn cache_key(&self) -> RequestKey {
        RequestKey(stable_hash(self))
    }
}

/// Cache and dedup key of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(pub u64);

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Whether a response may be served from and stored in the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cacheability {
    /// Responses may be cached
    Cacheable,
    /// Always go to the backend
    NoStore,
}

/// Per-request transport options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Cache behavior
    pub cacheability: Cacheability,
    /// When set, identical requests from other consumers are not coalesced
    /// with this one
    pub isolated: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            cacheability: Cacheability::Cacheable,
            isolated: false,
        }
    }
}
