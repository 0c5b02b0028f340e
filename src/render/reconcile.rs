//! Enter/update/exit computation between two graphs.

use crate::core::{EdgeKey, NodeId};
use crate::topology::TopologyGraph;
use std::collections::HashSet;
use std::hash::Hash;

/// Partition of element keys across two graphs.
///
/// The three lists are disjoint. `entering` and `updating` follow the new
/// graph's order, `exiting` follows the old graph's order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDiff<K> {
    /// Only in the new graph
    pub entering: Vec<K>,
    /// In both graphs
    pub updating: Vec<K>,
    /// Only in the old graph
    pub exiting: Vec<K>,
}

impl<K> Default for ElementDiff<K> {
    fn default() -> Self {
        Self {
            entering: Vec::new(),
            updating: Vec::new(),
            exiting: Vec::new(),
        }
    }
}

impl<K: Clone + Eq + Hash> ElementDiff<K> {
    fn between<'a>(old: impl Iterator<Item = &'a K>, new: impl Iterator<Item = &'a K>) -> Self
    where
        K: 'a,
    {
        let old: Vec<&K> = dedup(old);
        let new: Vec<&K> = dedup(new);
        let old_set: HashSet<&K> = old.iter().copied().collect();
        let new_set: HashSet<&K> = new.iter().copied().collect();

        let mut diff = Self::default();
        for key in new {
            if old_set.contains(key) {
                diff.updating.push(key.clone());
            } else {
                diff.entering.push(key.clone());
            }
        }
        diff.exiting = old
            .into_iter()
            .filter(|key| !new_set.contains(key))
            .cloned()
            .collect();
        diff
    }

    /// Whether nothing enters or exits
    pub fn is_stable(&self) -> bool {
        self.entering.is_empty() && self.exiting.is_empty()
    }
}

fn dedup<'a, K: Eq + Hash>(keys: impl Iterator<Item = &'a K>) -> Vec<&'a K> {
    let mut seen = HashSet::new();
    keys.filter(|key| seen.insert(*key)).collect()
}

/// Node and edge partitions for one refresh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Nodes
    pub nodes: ElementDiff<NodeId>,
    /// Edges
    pub edges: ElementDiff<EdgeKey>,
}

impl Reconciliation {
    /// Whether the element sets of both graphs are identical
    pub fn is_stable(&self) -> bool {
        self.nodes.is_stable() && self.edges.is_stable()
    }
}

/// Compares the element keys of `old` and `new`.
///
/// Pure: no scene access, and reconciling a graph against itself yields no
/// entering or exiting element. `None` stands for "nothing drawn yet".
pub fn reconcile(old: Option<&TopologyGraph>, new: &TopologyGraph) -> Reconciliation {
    let old_nodes = old.into_iter().flat_map(|graph| graph.nodes.iter().map(|node| &node.id));
    let old_edges = old.into_iter().flat_map(|graph| graph.edges.iter().map(|edge| &edge.key));

    Reconciliation {
        nodes: ElementDiff::between(old_nodes, new.nodes.iter().map(|node| &node.id)),
        edges: ElementDiff::between(old_edges, new.edges.iter().map(|edge| &edge.key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EntityType;
    use crate::topology::{TopologyEdge, TopologyNode};
    use pretty_assertions::assert_eq;

    fn id(name: &str) -> NodeId {
        NodeId::new(name).unwrap()
    }

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> TopologyGraph {
        let mut graph = TopologyGraph::empty();
        graph.nodes = nodes
            .iter()
            .map(|name| TopologyNode {
                id: id(name),
                entity_type: EntityType::Service,
                title: Some(name.to_string()),
                metrics: None,
            })
            .collect();
        graph.edges = edges
            .iter()
            .map(|(source, target)| TopologyEdge {
                key: EdgeKey::new(id(source), id(target)),
                metrics: None,
            })
            .collect();
        graph
    }

    #[test]
    fn test_identical_graphs_only_update() {
        let a = graph(&["frontend", "cart"], &[("frontend", "cart")]);
        let diff = reconcile(Some(&a), &a);

        assert!(diff.is_stable());
        assert_eq!(diff.nodes.updating, vec![id("frontend"), id("cart")]);
        assert_eq!(diff.edges.updating.len(), 1);
    }

    #[test]
    fn test_initial_render_enters_everything() {
        let a = graph(&["frontend", "cart"], &[("frontend", "cart")]);
        let diff = reconcile(None, &a);

        assert_eq!(diff.nodes.entering, vec![id("frontend"), id("cart")]);
        assert!(diff.nodes.updating.is_empty());
        assert!(diff.nodes.exiting.is_empty());
        assert_eq!(diff.edges.entering.len(), 1);
    }

    #[test]
    fn test_removed_and_added_elements_are_disjoint() {
        let a = graph(&["frontend", "cart", "x"], &[("frontend", "x")]);
        let b = graph(&["frontend", "cart", "y"], &[("frontend", "y")]);
        let diff = reconcile(Some(&a), &b);

        assert_eq!(diff.nodes.entering, vec![id("y")]);
        assert_eq!(diff.nodes.updating, vec![id("frontend"), id("cart")]);
        assert_eq!(diff.nodes.exiting, vec![id("x")]);
        assert_eq!(
            diff.edges.exiting,
            vec![EdgeKey::new(id("frontend"), id("x"))]
        );
        assert_eq!(
            diff.edges.entering,
            vec![EdgeKey::new(id("frontend"), id("y"))]
        );
    }

    #[test]
    fn test_reversed_edge_is_a_different_element() {
        let a = graph(&["a", "b"], &[("a", "b")]);
        let b = graph(&["a", "b"], &[("b", "a")]);
        let diff = reconcile(Some(&a), &b);

        assert_eq!(diff.edges.entering.len(), 1);
        assert_eq!(diff.edges.exiting.len(), 1);
        assert!(diff.nodes.is_stable());
    }

    #[test]
    fn test_duplicate_keys_are_listed_once() {
        let a = graph(&["a", "a"], &[]);
        let diff = reconcile(None, &a);
        assert_eq!(diff.nodes.entering, vec![id("a")]);
    }
}
