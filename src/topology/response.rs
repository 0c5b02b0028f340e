//! Raw topology response as returned by the transport.

use crate::core::EntityType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Server response to a topology request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyResponse {
    /// Root nodes, each with its edges and neighbors
    #[serde(default)]
    pub nodes: Vec<RawNode>,
}

/// A node as reported by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    /// Entity id
    pub id: String,
    /// Entity type
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// Attribute values keyed by result alias
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    /// Metric values keyed by result alias
    #[serde(default)]
    pub metrics: HashMap<String, RawMetric>,
    /// Calls made by this node
    #[serde(default)]
    pub outgoing_edges: Vec<RawEdge>,
    /// Calls received by this node
    #[serde(default)]
    pub incoming_edges: Vec<RawEdge>,
}

/// An edge between a node and one neighbor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEdge {
    /// The node on the other end
    pub neighbor: RawNode,
    /// Metric values keyed by result alias
    #[serde(default)]
    pub metrics: HashMap<String, RawMetric>,
}

/// A metric value; `null` values are treated as absent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMetric {
    /// Value, if the backend had one
    #[serde(default)]
    pub value: Option<f64>,
    /// Units
    #[serde(default)]
    pub units: Option<String>,
}

impl TopologyResponse {
    /// Parse a response from JSON
    pub fn from_json(json: &str) -> crate::core::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
