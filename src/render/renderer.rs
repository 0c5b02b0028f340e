//! Applies reconciliations to the scene.

use super::edge::{EdgeDelegate, EdgeRenderDelegate};
use super::layout::LayoutProvider;
use super::measure::{MonospaceMeasurer, TextMeasurer};
use super::node::{NodeDelegate, NodeRenderDelegate};
use super::reconcile::Reconciliation;
use super::scene::{DrawSurface, ElementId, Scene};
use super::state::{EnterOutcome, LifecycleTracker, VisualStateStore};
use super::DrawContext;
use crate::core::config::RenderConfig;
use crate::core::{EdgeKey, ElementKey, NodeId, Result, TopographError};
use crate::metric::NumericFormatter;
use crate::topology::TopologyGraph;
use std::collections::HashMap;

/// Class carried by elements waiting for [`TopologyRenderer::complete_exits`]
pub const EXITING_CLASS: &str = "exiting";

#[derive(Debug, Clone, Copy)]
struct Drawn<D> {
    element: ElementId,
    delegate: D,
}

/// Counts of one render pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSummary {
    /// Elements drawn for the first time
    pub entered: usize,
    /// Elements patched in place
    pub updated: usize,
    /// Exiting elements that came back and were patched in place
    pub revived: usize,
    /// Elements marked as exiting
    pub exiting: usize,
}

/// Owns the scene and patches it from reconciliations.
///
/// Each element is drawn by the first delegate of the registry that accepts
/// it. If a later graph makes a different delegate match (for example
/// because metrics were removed from the widget), the element is redrawn by
/// the new delegate. Exiting elements stay in the scene, marked with
/// [`EXITING_CLASS`], until [`TopologyRenderer::complete_exits`] is called.
pub struct TopologyRenderer {
    scene: Scene,
    config: RenderConfig,
    measurer: Box<dyn TextMeasurer + Send + Sync>,
    formatter: NumericFormatter,
    edge_delegates: Vec<EdgeDelegate>,
    node_delegates: Vec<NodeDelegate>,
    nodes: HashMap<NodeId, Drawn<NodeDelegate>>,
    edges: HashMap<EdgeKey, Drawn<EdgeDelegate>>,
    lifecycle: LifecycleTracker,
}

impl TopologyRenderer {
    /// Renderer with the default delegates and a monospace measurer
    pub fn new(config: RenderConfig) -> Self {
        Self {
            scene: Scene::new(config.width, config.height),
            measurer: Box::new(MonospaceMeasurer::from_config(&config)),
            config,
            formatter: NumericFormatter::default(),
            edge_delegates: EdgeDelegate::registry().to_vec(),
            node_delegates: NodeDelegate::registry().to_vec(),
            nodes: HashMap::new(),
            edges: HashMap::new(),
            lifecycle: LifecycleTracker::new(),
        }
    }

    /// Replace the text measurer
    pub fn with_measurer(mut self, measurer: impl TextMeasurer + Send + Sync + 'static) -> Self {
        self.measurer = Box::new(measurer);
        self
    }

    /// Replace the edge delegate registry
    pub fn with_edge_delegates(mut self, delegates: Vec<EdgeDelegate>) -> Self {
        self.edge_delegates = delegates;
        self
    }

    /// Replace the node delegate registry
    pub fn with_node_delegates(mut self, delegates: Vec<NodeDelegate>) -> Self {
        self.node_delegates = delegates;
        self
    }

    /// The retained scene
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Lifecycle of every element in the scene
    pub fn lifecycle(&self) -> &LifecycleTracker {
        &self.lifecycle
    }

    /// Scene element drawn for `key`
    pub fn element_for(&self, key: &ElementKey) -> Option<ElementId> {
        match key {
            ElementKey::Node(id) => self.nodes.get(id).map(|drawn| drawn.element),
            ElementKey::Edge(key) => self.edges.get(key).map(|drawn| drawn.element),
        }
    }

    /// Patch the scene so it shows `graph`.
    ///
    /// `reconciliation` must have been computed against the graph of the
    /// previous pass. Entering and updating elements are positioned from
    /// `layout` and styled from `states`; exiting ones are only marked.
    pub fn render(
        &mut self,
        reconciliation: &Reconciliation,
        graph: &TopologyGraph,
        layout: &dyn LayoutProvider,
        states: &VisualStateStore,
    ) -> Result<RenderSummary> {
        let Self {
            scene,
            config,
            measurer,
            formatter,
            edge_delegates,
            node_delegates,
            nodes,
            edges,
            lifecycle,
        } = self;
        let ctx = DrawContext {
            graph,
            config,
            measurer: measurer.as_ref(),
            formatter,
            defs: scene.defs(),
        };
        let mut summary = RenderSummary::default();

        // Everything that can fail on bad input is resolved before the scene
        // or the lifecycle is touched, so a failed pass leaves both as they were
        let mut node_plan = Vec::new();
        for id in reconciliation.nodes.entering.iter().chain(&reconciliation.nodes.updating) {
            let node = graph
                .node(id)
                .ok_or_else(|| TopographError::render(format!("node {} is not in the graph", id)))?;
            let delegate = *NodeDelegate::select(node_delegates, node, &ctx)
                .ok_or_else(|| TopographError::render(format!("no delegate accepts node {}", id)))?;
            let position = layout
                .node_position(id)
                .ok_or_else(|| TopographError::render(format!("no layout position for node {}", id)))?;
            node_plan.push((node, delegate, position));
        }

        let mut edge_plan = Vec::new();
        for edge_key in reconciliation.edges.entering.iter().chain(&reconciliation.edges.updating) {
            let edge = graph
                .edge(edge_key)
                .ok_or_else(|| TopographError::render(format!("edge {} is not in the graph", edge_key)))?;
            let delegate = *EdgeDelegate::select(edge_delegates, edge, &ctx)
                .ok_or_else(|| TopographError::render(format!("no delegate accepts edge {}", edge_key)))?;
            let position = layout.edge_position(edge_key).ok_or_else(|| {
                TopographError::render(format!("no layout position for edge {}", edge_key))
            })?;
            edge_plan.push((edge, delegate, position));
        }

        for (node, delegate, position) in node_plan {
            let id = &node.id;
            let element = match nodes.get(id).copied() {
                Some(drawn) if drawn.delegate == delegate => drawn.element,
                existing => {
                    if let Some(stale) = existing {
                        tracing::debug!(node = %id, delegate = delegate.name(), "redrawing node");
                        scene.remove_subtree(stale.element)?;
                    }
                    let layer = scene.node_layer();
                    let element = delegate.draw(scene, layer, node, &ctx)?;
                    nodes.insert(id.clone(), Drawn { element, delegate });
                    element
                },
            };
            scene.toggle_class(element, EXITING_CLASS, false)?;
            delegate.update_position(scene, element, node, position, &ctx)?;
            delegate.update_state(scene, element, node, states.node(id), &ctx)?;

            let key = ElementKey::Node(id.clone());
            count(&mut summary, lifecycle.enter(key.clone()));
            lifecycle.settle(&key);
        }

        for (edge, delegate, position) in edge_plan {
            let edge_key = &edge.key;
            let element = match edges.get(edge_key).copied() {
                Some(drawn) if drawn.delegate == delegate => drawn.element,
                existing => {
                    if let Some(stale) = existing {
                        tracing::debug!(edge = %edge_key, delegate = delegate.name(), "redrawing edge");
                        scene.remove_subtree(stale.element)?;
                    }
                    let layer = scene.edge_layer();
                    let element = delegate.draw(scene, layer, edge, &ctx)?;
                    edges.insert(edge_key.clone(), Drawn { element, delegate });
                    element
                },
            };
            scene.toggle_class(element, EXITING_CLASS, false)?;
            delegate.update_position(scene, element, edge, &position, &ctx)?;
            delegate.update_state(scene, element, edge, states.edge(edge_key), &ctx)?;

            let key = ElementKey::Edge(edge_key.clone());
            count(&mut summary, lifecycle.enter(key.clone()));
            lifecycle.settle(&key);
        }

        for id in &reconciliation.nodes.exiting {
            if lifecycle.exit(&ElementKey::Node(id.clone())) {
                if let Some(drawn) = nodes.get(id) {
                    scene.toggle_class(drawn.element, EXITING_CLASS, true)?;
                }
                summary.exiting += 1;
            }
        }
        for edge_key in &reconciliation.edges.exiting {
            if lifecycle.exit(&ElementKey::Edge(edge_key.clone())) {
                if let Some(drawn) = edges.get(edge_key) {
                    scene.toggle_class(drawn.element, EXITING_CLASS, true)?;
                }
                summary.exiting += 1;
            }
        }

        tracing::debug!(
            entered = summary.entered,
            updated = summary.updated,
            revived = summary.revived,
            exiting = summary.exiting,
            "scene patched"
        );
        Ok(summary)
    }

    /// Re-apply visibility and metric state of every drawn element of
    /// `graph` without touching geometry
    pub fn update_states(&mut self, graph: &TopologyGraph, states: &VisualStateStore) -> Result<()> {
        let ctx = DrawContext {
            graph,
            config: &self.config,
            measurer: self.measurer.as_ref(),
            formatter: &self.formatter,
            defs: self.scene.defs(),
        };

        for node in &graph.nodes {
            if let Some(drawn) = self.nodes.get(&node.id) {
                drawn
                    .delegate
                    .update_state(&mut self.scene, drawn.element, node, states.node(&node.id), &ctx)?;
            }
        }
        for edge in &graph.edges {
            if let Some(drawn) = self.edges.get(&edge.key) {
                drawn
                    .delegate
                    .update_state(&mut self.scene, drawn.element, edge, states.edge(&edge.key), &ctx)?;
            }
        }
        Ok(())
    }

    /// Remove every exiting element from the scene. Returns how many were
    /// removed.
    pub fn complete_exits(&mut self) -> Result<usize> {
        let exited = self.lifecycle.complete_exits();
        for key in &exited {
            let drawn = match key {
                ElementKey::Node(id) => self.nodes.remove(id).map(|drawn| drawn.element),
                ElementKey::Edge(key) => self.edges.remove(key).map(|drawn| drawn.element),
            };
            if let Some(element) = drawn {
                self.scene.remove_subtree(element)?;
            }
        }
        if !exited.is_empty() {
            tracing::debug!(removed = exited.len(), "exits completed");
        }
        Ok(exited.len())
    }
}

fn count(summary: &mut RenderSummary, outcome: EnterOutcome) {
    match outcome {
        EnterOutcome::Created => summary.entered += 1,
        EnterOutcome::Revived => summary.revived += 1,
        EnterOutcome::AlreadyPresent => summary.updated += 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EntityType, Position};
    use crate::render::layout::FixedLayout;
    use crate::render::reconcile::reconcile;
    use crate::render::state::Lifecycle;
    use crate::topology::{TopologyEdge, TopologyNode};

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
            .map(|(s, t)| TopologyEdge {
                key: EdgeKey::new(id(s), id(t)),
                metrics: None,
            })
            .collect();
        graph
    }

    fn layout() -> FixedLayout {
        FixedLayout::new()
            .with_position("a", Position::new(10.0, 10.0))
            .with_position("b", Position::new(100.0, 10.0))
            .with_position("c", Position::new(100.0, 80.0))
    }

    #[test]
    fn test_enter_exit_and_revive() {
        let mut renderer = TopologyRenderer::new(RenderConfig::default());
        let states = VisualStateStore::new();
        let first = graph(&["a", "b"], &[("a", "b")]);
        let second = graph(&["a", "c"], &[("a", "c")]);

        let summary = renderer
            .render(&reconcile(None, &first), &first, &layout(), &states)
            .unwrap();
        assert_eq!(summary.entered, 3);

        let summary = renderer
            .render(&reconcile(Some(&first), &second), &second, &layout(), &states)
            .unwrap();
        assert_eq!(summary.entered, 2);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.exiting, 2);

        let b = ElementKey::Node(id("b"));
        let b_element = renderer.element_for(&b).unwrap();
        assert_eq!(renderer.lifecycle().state(&b), Lifecycle::Exiting);
        assert!(renderer.scene().has_class(b_element, EXITING_CLASS));

        // b comes back before its exit completed
        let summary = renderer
            .render(&reconcile(Some(&second), &first), &first, &layout(), &states)
            .unwrap();
        assert_eq!(summary.revived, 2);
        assert_eq!(renderer.element_for(&b), Some(b_element));
        assert!(!renderer.scene().has_class(b_element, EXITING_CLASS));
        assert_eq!(renderer.lifecycle().state(&b), Lifecycle::Present);

        // c and a->c leave for good
        assert_eq!(renderer.complete_exits().unwrap(), 2);
        assert!(renderer.element_for(&ElementKey::Node(id("c"))).is_none());
        assert_eq!(renderer.scene().find_all_by_class("plain-node").len(), 2);
    }

    #[test]
    fn test_missing_layout_position_is_an_error() {
        let mut renderer = TopologyRenderer::new(RenderConfig::default());
        let graph = graph(&["a", "unknown"], &[]);
        let result = renderer.render(
            &reconcile(None, &graph),
            &graph,
            &layout(),
            &VisualStateStore::new(),
        );
        assert_eq!(result.unwrap_err().category(), "render");
    }

    #[test]
    fn test_failed_pass_leaves_scene_untouched() {
        let mut renderer = TopologyRenderer::new(RenderConfig::default());
        let states = VisualStateStore::new();
        let first = graph(&["a", "b"], &[("a", "b")]);
        renderer
            .render(&reconcile(None, &first), &first, &layout(), &states)
            .unwrap();
        let before = renderer.scene().to_svg();

        // d has no position, while c and the new edge would be drawn before it
        let broken = graph(&["a", "b", "c", "d"], &[("a", "b"), ("a", "c")]);
        let err = renderer
            .render(&reconcile(Some(&first), &broken), &broken, &layout(), &states)
            .unwrap_err();
        assert_eq!(err.category(), "render");
        assert_eq!(renderer.scene().to_svg(), before);
        assert_eq!(renderer.lifecycle().state(&ElementKey::Node(id("c"))), Lifecycle::Absent);
        assert!(renderer.element_for(&ElementKey::Node(id("c"))).is_none());

        // The next pass diffs against the last good graph and succeeds
        let next = graph(&["a", "b", "c"], &[("a", "b"), ("a", "c")]);
        let summary = renderer
            .render(&reconcile(Some(&first), &next), &next, &layout(), &states)
            .unwrap();
        assert_eq!(summary.entered, 2);
        assert_eq!(summary.updated, 3);
    }

    #[test]
    fn test_edge_without_delegate_draws_no_nodes() {
        let mut renderer = TopologyRenderer::new(RenderConfig::default()).with_edge_delegates(Vec::new());
        let graph = graph(&["a", "b"], &[("a", "b")]);
        let err = renderer
            .render(&reconcile(None, &graph), &graph, &layout(), &VisualStateStore::new())
            .unwrap_err();

        assert!(err.to_string().contains("no delegate accepts edge"));
        assert!(renderer.scene().find_all_by_class("plain-node").is_empty());
        assert_eq!(renderer.lifecycle().in_phase(Lifecycle::Present).count(), 0);
    }

    #[test]
    fn test_custom_node_registry() {
        let mut renderer = TopologyRenderer::new(RenderConfig::default())
            .with_node_delegates(vec![NodeDelegate::Plain(crate::render::node::PlainNodeRenderer)]);
        let graph = graph(&["a", "b"], &[("a", "b")]);
        renderer
            .render(&reconcile(None, &graph), &graph, &layout(), &VisualStateStore::new())
            .unwrap();

        assert_eq!(renderer.scene().find_all_by_class("plain-node").len(), 2);
        assert_eq!(renderer.lifecycle().in_phase(Lifecycle::Present).count(), 3);
    }
}
