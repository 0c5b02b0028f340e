//! Topology graph model and its data source.
//!
//! A [`TopologyDataSource`] turns a widget configuration into a single
//! [`TopologyRequest`] and maps the raw response into a [`TopologyGraph`].
//! The graph is rebuilt wholesale for every response; nothing in it is
//! mutated afterwards.

pub mod config;
pub mod data_source;
pub mod request;
pub mod response;

use crate::core::{EdgeKey, EntityType, NodeId};
use crate::metric::{MetricMap, MetricSelection};

pub use config::TopologyWidgetConfig;
pub use data_source::TopologyDataSource;
pub use request::{
    Cacheability, RequestKey, RequestOptions, RequestType, TopologyEdgeSpecification,
    TopologyNodeSpecification, TopologyRequest, MAX_ROOT_NODE_LIMIT,
};
pub use response::{RawEdge, RawMetric, RawNode, TopologyResponse};

/// Entity node in the topology graph.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyNode {
    /// Stable identity
    pub id: NodeId,
    /// Entity type
    pub entity_type: EntityType,
    /// Title attribute, if reported
    pub title: Option<String>,
    /// Resolved metrics; `None` when no node metrics were requested
    pub metrics: Option<MetricMap>,
}

/// Directed edge between two entity nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyEdge {
    /// Stable identity: the ordered (source, target) pair
    pub key: EdgeKey,
    /// Resolved metrics; `None` when no edge metrics were requested
    pub metrics: Option<MetricMap>,
}

impl TopologyEdge {
    /// Calling side
    pub fn source(&self) -> &NodeId {
        &self.key.source
    }

    /// Called side
    pub fn target(&self) -> &NodeId {
        &self.key.target
    }
}

/// Metric selections the graph was fetched with, so renderers can resolve
/// values by specification without re-reading the configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopologyModelProperties {
    /// Node metrics
    pub node_metrics: Option<MetricSelection>,
    /// Edge metrics
    pub edge_metrics: Option<MetricSelection>,
}

/// Normalized topology.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyGraph {
    /// Nodes in response order, roots first
    pub nodes: Vec<TopologyNode>,
    /// Edges in response order
    pub edges: Vec<TopologyEdge>,
    /// Entity types the request covered
    pub node_types: Vec<EntityType>,
    /// Root node specification used for the request
    pub node_specification: TopologyNodeSpecification,
    /// Edge specification used for the request
    pub edge_specification: TopologyEdgeSpecification,
    /// Metric selections used for the request
    pub model_properties: TopologyModelProperties,
}

impl TopologyGraph {
    /// Look up a node by id
    pub fn node(&self, id: &NodeId) -> Option<&TopologyNode> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    /// Look up an edge by key
    pub fn edge(&self, key: &EdgeKey) -> Option<&TopologyEdge> {
        self.edges.iter().find(|edge| &edge.key == key)
    }

    /// Edges touching `id`
    pub fn edges_of<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a TopologyEdge> + 'a {
        self.edges
            .iter()
            .filter(move |edge| edge.source() == id || edge.target() == id)
    }

    /// Graph with no elements
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            node_types: Vec::new(),
            node_specification: TopologyNodeSpecification {
                title_specification: crate::specification::SpecificationBuilder::new()
                    .attribute_specification_for_key(data_source::TITLE_ATTRIBUTE),
                metric_specifications: Vec::new(),
            },
            edge_specification: TopologyEdgeSpecification::default(),
            model_properties: TopologyModelProperties::default(),
        }
    }
}
