//! Declarative topology widget configuration.

use crate::core::{EntityType, Result, Scope, TopographError};
use crate::metric::MetricSelection;
use serde::{Deserialize, Deserializer, Serialize};

/// Configuration a host dashboard supplies for one topology widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TopologyWidgetConfig {
    /// Root entity type. Span scoped widgets are rejected while parsing.
    #[serde(rename = "entity", deserialize_with = "topology_entity")]
    pub entity_type: EntityType,
    /// Upstream neighbor types, defaults to the root type when omitted
    #[serde(rename = "upstream-entities", default)]
    pub upstream_entity_types: Option<Vec<EntityType>>,
    /// Downstream neighbor types, defaults to the root type when omitted
    #[serde(rename = "downstream-entities", default)]
    pub downstream_entity_types: Option<Vec<EntityType>>,
    /// Metrics shown on nodes
    #[serde(default)]
    pub node_metrics: Option<MetricSelection>,
    /// Metrics shown on edges
    #[serde(default)]
    pub edge_metrics: Option<MetricSelection>,
}

fn topology_entity<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<EntityType, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse::<Scope>()
        .and_then(|scope| scope.topology_entity())
        .map_err(serde::de::Error::custom)
}

impl TopologyWidgetConfig {
    /// Configuration for a root type with no metrics
    pub fn new(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            upstream_entity_types: None,
            downstream_entity_types: None,
            node_metrics: None,
            edge_metrics: None,
        }
    }

    /// Set node metrics
    pub fn with_node_metrics(mut self, metrics: MetricSelection) -> Self {
        self.node_metrics = Some(metrics);
        self
    }

    /// Set edge metrics
    pub fn with_edge_metrics(mut self, metrics: MetricSelection) -> Self {
        self.edge_metrics = Some(metrics);
        self
    }

    /// Set upstream types
    pub fn with_upstream(mut self, types: Vec<EntityType>) -> Self {
        self.upstream_entity_types = Some(types);
        self
    }

    /// Set downstream types
    pub fn with_downstream(mut self, types: Vec<EntityType>) -> Self {
        self.downstream_entity_types = Some(types);
        self
    }

    /// Parse a widget definition from YAML (JSON is valid YAML)
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| TopographError::config(format!("Failed to parse widget definition: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for entity_type in self.upstream_entity_types.iter().flatten() {
            if !entity_type.can_be_upstream() {
                return Err(TopographError::InvalidEntityType {
                    entity_type: entity_type.to_string(),
                    role: "upstream entity",
                });
            }
        }
        Ok(())
    }

    /// Upstream types with the default applied
    pub fn upstream_types(&self) -> Vec<EntityType> {
        self.defaulted(self.upstream_entity_types.as_deref())
    }

    /// Downstream types with the default applied
    pub fn downstream_types(&self) -> Vec<EntityType> {
        self.defaulted(self.downstream_entity_types.as_deref())
    }

    /// Root, upstream and downstream types, each once, in that order
    pub fn node_types(&self) -> Vec<EntityType> {
        let mut types = vec![self.entity_type];
        for entity_type in self.upstream_types().into_iter().chain(self.downstream_types()) {
            if !types.contains(&entity_type) {
                types.push(entity_type);
            }
        }
        types
    }

    fn defaulted(&self, types: Option<&[EntityType]>) -> Vec<EntityType> {
        types.map_or_else(|| vec![self.entity_type], <[EntityType]>::to_vec)
    }
}
