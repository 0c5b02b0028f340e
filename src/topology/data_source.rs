//! Builds topology requests from a widget configuration and maps responses
//! back into a graph.

use super::config::TopologyWidgetConfig;
use super::request::{
    Cacheability, RequestOptions, RequestType, TopologyEdgeSpecification,
    TopologyNodeSpecification, TopologyRequest, MAX_ROOT_NODE_LIMIT,
};
use super::response::{RawMetric, RawNode, TopologyResponse};
use super::{TopologyEdge, TopologyGraph, TopologyModelProperties, TopologyNode};
use crate::core::{EdgeKey, EntityType, NodeId, Result, TimeRange, TopographError};
use crate::filter::Filter;
use crate::metric::{MetricAggregation, MetricMap};
use crate::specification::{MetricAggregationSpecification, SpecificationBuilder};
use std::collections::{BTreeMap, HashMap};

/// Attribute requested as every node's title
pub const TITLE_ATTRIBUTE: &str = "name";

/// Data source of one topology widget.
#[derive(Debug, Clone)]
pub struct TopologyDataSource {
    config: TopologyWidgetConfig,
    time_range: Option<TimeRange>,
    filters: Vec<Filter>,
    root_node_limit: usize,
    spec_builder: SpecificationBuilder,
}

impl TopologyDataSource {
    /// Create a data source for a validated configuration
    pub fn new(config: TopologyWidgetConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            time_range: None,
            filters: Vec::new(),
            root_node_limit: MAX_ROOT_NODE_LIMIT,
            spec_builder: SpecificationBuilder::new(),
        })
    }

    /// Set the query window
    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = Some(time_range);
        self
    }

    /// Set the root node filters
    pub fn with_filters(mut self, filters: Vec<Filter>) -> Self {
        self.filters = filters;
        self
    }

    /// Set the root node limit, capped at [`MAX_ROOT_NODE_LIMIT`]
    pub fn with_root_node_limit(mut self, limit: usize) -> Self {
        self.root_node_limit = limit.min(MAX_ROOT_NODE_LIMIT);
        self
    }

    /// The configuration this source was built from
    pub fn config(&self) -> &TopologyWidgetConfig {
        &self.config
    }

    /// Options every topology request is issued with
    pub fn request_options(&self) -> RequestOptions {
        RequestOptions {
            cacheability: Cacheability::Cacheable,
            isolated: true,
        }
    }

    /// Build the topology request.
    ///
    /// Fails with [`TopographError::MissingTimeRange`] when no time range was
    /// set; the window is never defaulted.
    pub fn build_request(&self) -> Result<TopologyRequest> {
        let time_range = self.time_range.ok_or(TopographError::MissingTimeRange)?;

        Ok(TopologyRequest {
            request_type: RequestType::EntityTopology,
            root_node_type: self.config.entity_type,
            root_node_limit: self.root_node_limit,
            root_node_specification: self.build_node_specification(),
            root_node_filters: self.filters.clone(),
            edge_specification: self.build_edge_specification(),
            upstream_node_specifications: self.build_neighbor_specifications(self.config.upstream_types()),
            downstream_node_specifications: self
                .build_neighbor_specifications(self.config.downstream_types()),
            time_range,
        })
    }

    /// Normalize a raw response into a graph.
    ///
    /// Nodes are deduplicated by id and edges by their ordered endpoint pair.
    /// Metrics missing from the response are left out of the element's map
    /// rather than failing the whole response.
    pub fn map_response(&self, response: TopologyResponse) -> Result<TopologyGraph> {
        let node_specification = self.build_node_specification();
        let edge_specification = self.build_edge_specification();
        let node_metric_specs = self
            .config
            .node_metrics
            .as_ref()
            .map(|_| node_specification.metric_specifications.as_slice());
        let edge_metric_specs = self
            .config
            .edge_metrics
            .as_ref()
            .map(|_| edge_specification.metric_specifications.as_slice());

        let mut builder = GraphBuilder::new(node_specification.title_specification.result_alias());

        for root in &response.nodes {
            builder.add_node(root, node_metric_specs)?;
        }

        for root in &response.nodes {
            let root_id = NodeId::new(root.id.as_str())?;
            for edge in &root.outgoing_edges {
                let neighbor = builder.add_node(&edge.neighbor, node_metric_specs)?;
                let key = EdgeKey::new(root_id.clone(), neighbor);
                builder.add_edge(key, resolve_metrics(&edge.metrics, edge_metric_specs));
            }
            for edge in &root.incoming_edges {
                let neighbor = builder.add_node(&edge.neighbor, node_metric_specs)?;
                let key = EdgeKey::new(neighbor, root_id.clone());
                builder.add_edge(key, resolve_metrics(&edge.metrics, edge_metric_specs));
            }
        }

        let (nodes, edges) = builder.finish();
        tracing::debug!(nodes = nodes.len(), edges = edges.len(), "mapped topology response");

        Ok(TopologyGraph {
            nodes,
            edges,
            node_types: self.config.node_types(),
            node_specification,
            edge_specification,
            model_properties: self.model_properties(),
        })
    }

    /// Metric selections handed to renderers. Categories and display modes
    /// live here and never reach the request.
    pub fn model_properties(&self) -> TopologyModelProperties {
        TopologyModelProperties {
            node_metrics: self.config.node_metrics.clone(),
            edge_metrics: self.config.edge_metrics.clone(),
        }
    }

    fn build_node_specification(&self) -> TopologyNodeSpecification {
        TopologyNodeSpecification {
            title_specification: self.spec_builder.attribute_specification_for_key(TITLE_ATTRIBUTE),
            metric_specifications: self
                .config
                .node_metrics
                .as_ref()
                .map(|metrics| metrics.all_specifications())
                .unwrap_or_default(),
        }
    }

    fn build_edge_specification(&self) -> TopologyEdgeSpecification {
        TopologyEdgeSpecification {
            metric_specifications: self
                .config
                .edge_metrics
                .as_ref()
                .map(|metrics| metrics.all_specifications())
                .unwrap_or_default(),
        }
    }

    fn build_neighbor_specifications(
        &self,
        types: Vec<EntityType>,
    ) -> BTreeMap<EntityType, TopologyNodeSpecification> {
        // Every neighbor type currently shares the root node specification
        types
            .into_iter()
            .map(|entity_type| (entity_type, self.build_node_specification()))
            .collect()
    }
}

fn resolve_metrics(
    raw: &HashMap<String, RawMetric>,
    specs: Option<&[MetricAggregationSpecification]>,
) -> Option<MetricMap> {
    let specs = specs?;
    let mut metrics = MetricMap::new();
    for spec in specs {
        let alias = spec.result_alias();
        match raw.get(&alias) {
            Some(RawMetric {
                value: Some(value),
                units,
            }) => {
                metrics.insert(
                    spec.clone(),
                    MetricAggregation {
                        value: *value,
                        units: units.clone(),
                    },
                );
            },
            _ => tracing::trace!(alias = %alias, "metric absent from response"),
        }
    }
    Some(metrics)
}

/// Accumulates deduplicated nodes and edges in first-seen order.
struct GraphBuilder {
    title_alias: String,
    nodes: Vec<TopologyNode>,
    node_index: HashMap<NodeId, usize>,
    edges: Vec<TopologyEdge>,
    edge_index: HashMap<EdgeKey, usize>,
}

impl GraphBuilder {
    fn new(title_alias: String) -> Self {
        Self {
            title_alias,
            nodes: Vec::new(),
            node_index: HashMap::new(),
            edges: Vec::new(),
            edge_index: HashMap::new(),
        }
    }

    fn add_node(
        &mut self,
        raw: &RawNode,
        metric_specs: Option<&[MetricAggregationSpecification]>,
    ) -> Result<NodeId> {
        let id = NodeId::new(raw.id.as_str())?;
        if self.node_index.contains_key(&id) {
            return Ok(id);
        }

        let title = raw.attributes.get(&self.title_alias).and_then(|value| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        });

        self.node_index.insert(id.clone(), self.nodes.len());
        self.nodes.push(TopologyNode {
            id: id.clone(),
            entity_type: raw.entity_type,
            title,
            metrics: resolve_metrics(&raw.metrics, metric_specs),
        });
        Ok(id)
    }

    fn add_edge(&mut self, key: EdgeKey, metrics: Option<MetricMap>) {
        if self.edge_index.contains_key(&key) {
            // Reported from both ends; the first report is kept
            return;
        }
        self.edge_index.insert(key.clone(), self.edges.len());
        self.edges.push(TopologyEdge { key, metrics });
    }

    fn finish(self) -> (Vec<TopologyNode>, Vec<TopologyEdge>) {
        (self.nodes, self.edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{MetricSelection, TopologyMetric};
    use crate::specification::MetricAggregationType;
    use chrono::{TimeZone, Utc};

    fn time_range() -> TimeRange {
        TimeRange::new(
            Utc.timestamp_millis_opt(1568907645141).unwrap(),
            Utc.timestamp_millis_opt(1568911245141).unwrap(),
        )
        .unwrap()
    }

    fn spec(metric: &str, aggregation: MetricAggregationType) -> MetricAggregationSpecification {
        SpecificationBuilder::new().metric_aggregation_specification(metric, aggregation)
    }

    fn config() -> TopologyWidgetConfig {
        TopologyWidgetConfig::new(EntityType::Service)
            .with_node_metrics(MetricSelection::primary(TopologyMetric::new(spec(
                "duration",
                MetricAggregationType::Avg,
            ))))
            .with_edge_metrics(
                MetricSelection::primary(TopologyMetric::new(spec("duration", MetricAggregationType::P99)))
                    .with_secondary(TopologyMetric::new(spec("errorCount", MetricAggregationType::Sum))),
            )
    }

    #[test]
    fn test_missing_time_range_fails_fast() {
        let source = TopologyDataSource::new(config()).unwrap();
        assert!(matches!(source.build_request(), Err(TopographError::MissingTimeRange)));
    }

    #[test]
    fn test_request_shape() {
        let source = TopologyDataSource::new(config().with_downstream(vec![EntityType::Backend]))
            .unwrap()
            .with_time_range(time_range())
            .with_root_node_limit(500);
        let request = source.build_request().unwrap();

        assert_eq!(request.request_type, RequestType::EntityTopology);
        assert_eq!(request.root_node_type, EntityType::Service);
        assert_eq!(request.root_node_limit, MAX_ROOT_NODE_LIMIT);
        assert_eq!(request.root_node_specification.title_specification.name, "name");
        assert_eq!(request.root_node_specification.metric_specifications.len(), 1);
        assert_eq!(request.edge_specification.metric_specifications.len(), 2);
        assert_eq!(
            request.upstream_node_specifications.keys().copied().collect::<Vec<_>>(),
            vec![EntityType::Service]
        );
        assert_eq!(
            request.downstream_node_specifications.get(&EntityType::Backend),
            Some(&request.root_node_specification)
        );
        assert!(source.request_options().isolated);
    }

    #[test]
    fn test_identical_configuration_gives_equal_requests() {
        let a = TopologyDataSource::new(config()).unwrap().with_time_range(time_range());
        let b = TopologyDataSource::new(config()).unwrap().with_time_range(time_range());
        let request_a = a.build_request().unwrap();
        let request_b = b.build_request().unwrap();
        assert_eq!(request_a, request_b);
        assert_eq!(request_a.cache_key(), request_b.cache_key());
    }

    #[test]
    fn test_map_response_deduplicates_and_tolerates_missing_metrics() {
        let json = r#"{
          "nodes": [
            {
              "id": "frontend", "type": "SERVICE",
              "attributes": { "name": "frontend" },
              "metrics": { "avg_duration": { "value": 12.5, "units": "ms" } },
              "outgoing_edges": [
                {
                  "neighbor": { "id": "checkout", "type": "SERVICE", "attributes": { "name": "checkout" } },
                  "metrics": { "p99_duration": { "value": 230, "units": "ms" }, "sum_errorCount": { "value": null } }
                }
              ]
            },
            {
              "id": "checkout", "type": "SERVICE",
              "attributes": { "name": "checkout" },
              "metrics": { "avg_duration": { "value": 40 } },
              "incoming_edges": [
                { "neighbor": { "id": "frontend", "type": "SERVICE" }, "metrics": {} }
              ]
            }
          ]
        }"#;

        let source = TopologyDataSource::new(config()).unwrap().with_time_range(time_range());
        let graph = source.map_response(TopologyResponse::from_json(json).unwrap()).unwrap();

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);

        let checkout = graph.node(&NodeId::new("checkout").unwrap()).unwrap();
        let checkout_duration = checkout
            .metrics
            .as_ref()
            .unwrap()
            .get(&spec("duration", MetricAggregationType::Avg))
            .unwrap();
        assert_eq!(checkout_duration.value, 40.0, "root entry wins over neighbor entry");

        let edge = &graph.edges[0];
        assert_eq!(edge.source().as_str(), "frontend");
        assert_eq!(edge.target().as_str(), "checkout");
        let edge_metrics = edge.metrics.as_ref().unwrap();
        assert_eq!(edge_metrics.get(&spec("duration", MetricAggregationType::P99)).unwrap().value, 230.0);
        assert!(edge_metrics.get(&spec("errorCount", MetricAggregationType::Sum)).is_none());
        assert_eq!(graph.node_types, vec![EntityType::Service]);
    }

    #[test]
    fn test_no_edge_metrics_means_no_edge_data() {
        let config = TopologyWidgetConfig::new(EntityType::Service);
        let json = r#"{"nodes":[{"id":"a","type":"SERVICE","outgoing_edges":[{"neighbor":{"id":"b","type":"BACKEND"}}]}]}"#;
        let source = TopologyDataSource::new(config).unwrap();
        let graph = source.map_response(TopologyResponse::from_json(json).unwrap()).unwrap();
        assert!(graph.edges[0].metrics.is_none());
        assert!(graph.nodes[0].metrics.is_none());
        assert!(graph.nodes[0].title.is_none());
    }
}
