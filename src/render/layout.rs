//! Node positions supplied to the renderer.
//!
//! The render core never computes layout on its own. It asks a
//! [`LayoutProvider`] for node coordinates and derives edge endpoints from
//! them.

use crate::core::config::RenderConfig;
use crate::core::{EdgeKey, EdgePosition, NodeId, Position, Result};
use crate::topology::TopologyGraph;
use serde::Deserialize;
use std::collections::HashMap;

/// Source of element coordinates
pub trait LayoutProvider {
    /// Center of a node, `None` when the layout does not know it
    fn node_position(&self, id: &NodeId) -> Option<Position>;

    /// Endpoints of an edge, by default the centers of both nodes
    fn edge_position(&self, key: &EdgeKey) -> Option<EdgePosition> {
        Some(EdgePosition {
            source: self.node_position(&key.source)?,
            target: self.node_position(&key.target)?,
        })
    }
}

/// Positions read from a file or supplied by the host
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FixedLayout {
    nodes: HashMap<String, Position>,
}

impl FixedLayout {
    /// Empty layout
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `{"nodes": {"<id>": {"x": .., "y": ..}}}`
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Add or move a node
    pub fn with_position(mut self, id: impl Into<String>, position: Position) -> Self {
        self.nodes.insert(id.into(), position);
        self
    }
}

impl LayoutProvider for FixedLayout {
    fn node_position(&self, id: &NodeId) -> Option<Position> {
        self.nodes.get(id.as_str()).copied()
    }
}

/// Left-to-right layering by call depth.
///
/// Callers sit in columns left of the services they call. Each node's column
/// is the length of the longest call chain leading to it, bounded by the node
/// count so cycles terminate. Nodes share a column in graph order and are
/// spread evenly over the canvas height. Edges attach to the facing sides of
/// the node boxes.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    positions: HashMap<NodeId, Position>,
    half_width: f64,
}

impl ColumnLayout {
    /// Lay out `graph` on the configured canvas
    pub fn compute(graph: &TopologyGraph, config: &RenderConfig) -> Self {
        let count = graph.nodes.len();
        let index: HashMap<&NodeId, usize> =
            graph.nodes.iter().enumerate().map(|(i, node)| (&node.id, i)).collect();

        let mut column = vec![0usize; count];
        for _ in 0..count {
            let mut changed = false;
            for edge in &graph.edges {
                let (Some(&source), Some(&target)) = (index.get(edge.source()), index.get(edge.target()))
                else {
                    continue;
                };
                let depth = column[source] + 1;
                if source != target && depth < count && column[target] < depth {
                    column[target] = depth;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let columns = column.iter().max().map_or(0, |max| max + 1);
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); columns];
        for (i, c) in column.iter().enumerate() {
            members[*c].push(i);
        }

        let half_width = config.node_width / 2.0;
        let usable_width = (config.width - config.node_width).max(0.0);
        let column_step = if columns > 1 {
            usable_width / (columns - 1) as f64
        } else {
            0.0
        };

        let mut positions = HashMap::with_capacity(count);
        for (c, nodes) in members.iter().enumerate() {
            let x = if columns > 1 {
                half_width + c as f64 * column_step
            } else {
                config.width / 2.0
            };
            let row_step = config.height / (nodes.len() + 1) as f64;
            for (row, i) in nodes.iter().enumerate() {
                let y = row_step * (row + 1) as f64;
                positions.insert(graph.nodes[*i].id.clone(), Position::new(x, y));
            }
        }

        Self {
            positions,
            half_width,
        }
    }
}

impl LayoutProvider for ColumnLayout {
    fn node_position(&self, id: &NodeId) -> Option<Position> {
        self.positions.get(id).copied()
    }

    fn edge_position(&self, key: &EdgeKey) -> Option<EdgePosition> {
        let source = self.node_position(&key.source)?;
        let target = self.node_position(&key.target)?;
        let direction = if target.x >= source.x { 1.0 } else { -1.0 };
        Some(EdgePosition {
            source: Position::new(source.x + direction * self.half_width, source.y),
            target: Position::new(target.x - direction * self.half_width, target.y),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EntityType;
    use crate::topology::{TopologyEdge, TopologyNode};

    fn id(name: &str) -> NodeId {
        NodeId::new(name).unwrap()
    }

    fn chain(names: &[&str], edges: &[(&str, &str)]) -> TopologyGraph {
        let mut graph = TopologyGraph::empty();
        graph.nodes = names
            .iter()
            .map(|name| TopologyNode {
                id: id(name),
                entity_type: EntityType::Service,
                title: None,
                metrics: None,
            })
            .collect();
        graph.edges = edges
            .iter()
            .map(|(s, t)| TopologyEdge {
                key: EdgeKey::new(id(s), id(t)),
                metrics: None,
            })
            .collect();
        graph
    }

    #[test]
    fn test_fixed_layout_from_json() {
        let layout = FixedLayout::from_json(r#"{"nodes": {"frontend": {"x": 10, "y": 20}}}"#).unwrap();
        assert_eq!(layout.node_position(&id("frontend")), Some(Position::new(10.0, 20.0)));
        assert_eq!(layout.node_position(&id("cart")), None);
        assert_eq!(layout.edge_position(&EdgeKey::new(id("frontend"), id("cart"))), None);
    }

    #[test]
    fn test_columns_follow_call_depth() {
        let graph = chain(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let config = RenderConfig::default();
        let layout = ColumnLayout::compute(&graph, &config);

        let a = layout.node_position(&id("a")).unwrap();
        let b = layout.node_position(&id("b")).unwrap();
        let c = layout.node_position(&id("c")).unwrap();
        assert!(a.x < b.x && b.x < c.x);
        assert_eq!(a.x, config.node_width / 2.0);
        assert_eq!(c.x, config.width - config.node_width / 2.0);
        assert_eq!(a.y, config.height / 2.0);
    }

    #[test]
    fn test_cycles_terminate() {
        let graph = chain(&["a", "b"], &[("a", "b"), ("b", "a")]);
        let layout = ColumnLayout::compute(&graph, &RenderConfig::default());
        assert!(layout.node_position(&id("a")).is_some());
        assert!(layout.node_position(&id("b")).is_some());
    }

    #[test]
    fn test_edges_attach_to_box_sides() {
        let graph = chain(&["a", "b"], &[("a", "b")]);
        let config = RenderConfig::default();
        let layout = ColumnLayout::compute(&graph, &config);
        let edge = layout.edge_position(&EdgeKey::new(id("a"), id("b"))).unwrap();

        assert_eq!(edge.source.x, config.node_width);
        assert_eq!(edge.target.x, config.width - config.node_width);
    }
}
