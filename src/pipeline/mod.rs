//! Configuration-to-scene pipeline of one topology widget.
//!
//! The [`TopologyController`] owns everything that lives across refreshes:
//! the last applied graph, the renderer with its scene and the visibility
//! store. A refresh is split into [`TopologyController::configure`], which
//! decides whether a fetch is needed at all, and
//! [`TopologyController::apply`], which turns the response into scene
//! patches. Every issued request carries a generation number and responses
//! of superseded generations are dropped, so a slow answer can never
//! overwrite a newer one.

use crate::core::config::RenderConfig;
use crate::core::{ElementKey, NodeId, Result, TopographError};
use crate::render::{
    reconcile, ColumnLayout, FixedLayout, LayoutProvider, Reconciliation, RenderSummary, Scene,
    TopologyRenderer, Visibility, VisualStateStore,
};
use crate::topology::{RequestKey, RequestOptions, TopologyDataSource, TopologyGraph, TopologyRequest, TopologyResponse};
use crate::transport::{ConsumerId, TopologyTransport};
use std::collections::HashSet;

/// A request the controller wants issued
#[derive(Debug, Clone, PartialEq)]
pub struct RequestTicket {
    /// Generation the response must match to be applied
    pub generation: u64,
    /// Cache key of the request
    pub key: RequestKey,
    /// The request
    pub request: TopologyRequest,
    /// Transport options
    pub options: RequestOptions,
}

/// Outcome of handing a response to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The scene was patched
    Rendered(RenderSummary),
    /// The response belonged to a superseded request and was dropped
    Discarded {
        /// Generation of the dropped response
        generation: u64,
        /// Generation currently expected
        current: u64,
    },
    /// The configuration produced the active request again, nothing was
    /// fetched
    Unchanged,
}

/// How node positions are obtained
#[derive(Debug, Clone, Default)]
pub enum LayoutMode {
    /// Recompute a [`ColumnLayout`] for every graph
    #[default]
    Columns,
    /// Use host supplied positions
    Fixed(FixedLayout),
}

#[derive(Debug, Clone)]
struct ActiveRequest {
    source: TopologyDataSource,
    request: TopologyRequest,
}

/// Drives one widget from configuration to scene
pub struct TopologyController {
    consumer: ConsumerId,
    generation: u64,
    active: Option<ActiveRequest>,
    graph: Option<TopologyGraph>,
    renderer: TopologyRenderer,
    states: VisualStateStore,
    layout: LayoutMode,
    render_config: RenderConfig,
}

impl TopologyController {
    /// Controller for `consumer` rendering with `config`
    pub fn new(consumer: ConsumerId, config: RenderConfig) -> Self {
        Self {
            consumer,
            generation: 0,
            active: None,
            graph: None,
            renderer: TopologyRenderer::new(config.clone()),
            states: VisualStateStore::new(),
            layout: LayoutMode::default(),
            render_config: config,
        }
    }

    /// Replace the renderer, e.g. to install another text measurer
    pub fn with_renderer(mut self, renderer: TopologyRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Set the layout mode
    pub fn with_layout(mut self, layout: LayoutMode) -> Self {
        self.layout = layout;
        self
    }

    /// Consumer id requests are issued under
    pub fn consumer(&self) -> ConsumerId {
        self.consumer
    }

    /// Generation of the newest issued request
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The last applied graph
    pub fn graph(&self) -> Option<&TopologyGraph> {
        self.graph.as_ref()
    }

    /// The retained scene
    pub fn scene(&self) -> &Scene {
        self.renderer.scene()
    }

    /// The renderer
    pub fn renderer(&self) -> &TopologyRenderer {
        &self.renderer
    }

    /// Current visibility of every element
    pub fn states(&self) -> &VisualStateStore {
        &self.states
    }

    /// Accept a new configuration.
    ///
    /// Returns `None` when the resulting request is value-equal to the active
    /// one, so no fetch is needed. The new configuration is still adopted:
    /// if only its categories or display modes changed, the current graph is
    /// redrawn with them. Otherwise the generation advances and the returned
    /// ticket must be fetched and handed to [`Self::apply`].
    pub fn configure(&mut self, source: TopologyDataSource) -> Result<Option<RequestTicket>> {
        let request = source.build_request()?;
        if let Some(active) = self.active.as_mut().filter(|active| active.request == request) {
            tracing::debug!(key = %request.cache_key(), "request unchanged, skipping fetch");
            let properties = source.model_properties();
            active.source = source;

            if let Some(graph) = self.graph.as_mut() {
                if graph.model_properties != properties {
                    tracing::debug!("metric presentation changed, restyling current graph");
                    graph.model_properties = properties;
                    let graph = &*graph;
                    let reconciliation = reconcile(Some(graph), graph);
                    draw(
                        &mut self.renderer,
                        &self.layout,
                        &self.render_config,
                        &reconciliation,
                        graph,
                        &self.states,
                    )?;
                }
            }
            return Ok(None);
        }

        let options = source.request_options();
        self.active = Some(ActiveRequest {
            source,
            request: request.clone(),
        });
        Ok(Some(self.issue(request, options)))
    }

    /// Issue the active request again under a new generation
    pub fn reissue(&mut self) -> Result<RequestTicket> {
        let active = self
            .active
            .as_ref()
            .ok_or_else(|| TopographError::config("no active topology request"))?;
        let (request, options) = (active.request.clone(), active.source.request_options());
        Ok(self.issue(request, options))
    }

    fn issue(&mut self, request: TopologyRequest, options: RequestOptions) -> RequestTicket {
        self.generation += 1;
        let key = request.cache_key();
        tracing::debug!(generation = self.generation, %key, consumer = %self.consumer, "issuing topology request");
        RequestTicket {
            generation: self.generation,
            key,
            request,
            options,
        }
    }

    /// Apply the transport result of `ticket`.
    ///
    /// Results of superseded tickets are discarded without touching the
    /// scene. Transport errors are returned as is; the previous scene stays.
    pub fn apply(&mut self, ticket: &RequestTicket, result: Result<TopologyResponse>) -> Result<Applied> {
        if ticket.generation != self.generation {
            tracing::debug!(
                generation = ticket.generation,
                current = self.generation,
                "discarding stale topology response"
            );
            return Ok(Applied::Discarded {
                generation: ticket.generation,
                current: self.generation,
            });
        }

        let response = result?;
        let active = self
            .active
            .as_ref()
            .ok_or_else(|| TopographError::config("no active topology request"))?;
        let graph = active.source.map_response(response)?;

        let reconciliation = reconcile(self.graph.as_ref(), &graph);
        let mut states = self.states.clone();
        if let Some(focused) = states.focused_node().cloned() {
            if graph.node(&focused).is_some() {
                derive_focus(&graph, &focused, &mut states, |key, states| {
                    states.is_derived(key)
                        || (entering(&reconciliation, key) && states.get(key) == Visibility::Default)
                });
            } else {
                tracing::debug!(node = %focused, "focused node left the graph, dropping focus");
                states.clear_focus();
            }
        }

        let summary = draw(
            &mut self.renderer,
            &self.layout,
            &self.render_config,
            &reconciliation,
            &graph,
            &states,
        )?;
        self.states = states;

        tracing::info!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            generation = ticket.generation,
            "topology rendered"
        );
        self.graph = Some(graph);
        Ok(Applied::Rendered(summary))
    }

    /// Configure, fetch through `transport` and apply in one go
    pub async fn refresh<T: TopologyTransport + ?Sized>(
        &mut self,
        transport: &T,
        source: TopologyDataSource,
    ) -> Result<Applied> {
        let Some(ticket) = self.configure(source)? else {
            return Ok(Applied::Unchanged);
        };
        let result = transport.query(self.consumer, &ticket.request, ticket.options).await;
        self.apply(&ticket, result)
    }

    /// Focus a node: it becomes focused, its edges and neighbors emphasized
    /// and everything else de-emphasized.
    ///
    /// The previous focus and everything derived from it is dropped first.
    /// Across refreshes only derived states and newly entered elements follow
    /// the focus; states set through [`Self::set_visibility`] are kept.
    pub fn focus_node(&mut self, id: &NodeId) -> Result<()> {
        let graph = self.graph.as_ref().ok_or_else(|| TopographError::render("nothing rendered yet"))?;
        if graph.node(id).is_none() {
            return Err(TopographError::render(format!("node {} is not in the graph", id)));
        }
        self.states.clear_focus();
        derive_focus(graph, id, &mut self.states, |_, _| true);
        self.renderer.update_states(graph, &self.states)
    }

    /// Return every element to the default visibility
    pub fn clear_focus(&mut self) -> Result<()> {
        self.states.clear();
        self.restyle()
    }

    /// Set the visibility of a single element
    pub fn set_visibility(&mut self, key: ElementKey, visibility: Visibility) -> Result<()> {
        self.states.set(key, visibility);
        self.restyle()
    }

    /// Remove exiting elements from the scene
    pub fn complete_exits(&mut self) -> Result<usize> {
        self.renderer.complete_exits()
    }

    fn restyle(&mut self) -> Result<()> {
        match &self.graph {
            Some(graph) => self.renderer.update_states(graph, &self.states),
            None => Ok(()),
        }
    }
}

fn draw(
    renderer: &mut TopologyRenderer,
    layout: &LayoutMode,
    config: &RenderConfig,
    reconciliation: &Reconciliation,
    graph: &TopologyGraph,
    states: &VisualStateStore,
) -> Result<RenderSummary> {
    match layout {
        LayoutMode::Columns => {
            let layout = ColumnLayout::compute(graph, config);
            renderer.render(reconciliation, graph, &layout, states)
        },
        LayoutMode::Fixed(layout) => {
            renderer.render(reconciliation, graph, layout as &dyn LayoutProvider, states)
        },
    }
}

fn entering(reconciliation: &Reconciliation, key: &ElementKey) -> bool {
    match key {
        ElementKey::Node(id) => reconciliation.nodes.entering.contains(id),
        ElementKey::Edge(key) => reconciliation.edges.entering.contains(key),
    }
}

/// Focus `focused` and derive the visibility of every element accepted by
/// `follows`: touching edges and their endpoints are emphasized, the rest
/// de-emphasized
fn derive_focus(
    graph: &TopologyGraph,
    focused: &NodeId,
    states: &mut VisualStateStore,
    follows: impl Fn(&ElementKey, &VisualStateStore) -> bool,
) {
    states.set(ElementKey::Node(focused.clone()), Visibility::Focused);
    let mut neighbors = HashSet::new();

    for edge in &graph.edges {
        let touches = edge.source() == focused || edge.target() == focused;
        if touches {
            neighbors.insert(edge.source().clone());
            neighbors.insert(edge.target().clone());
        }
        let key = ElementKey::Edge(edge.key.clone());
        if follows(&key, &*states) {
            let visibility = if touches {
                Visibility::Emphasized
            } else {
                Visibility::DeEmphasized
            };
            states.derive(key, visibility);
        }
    }

    for node in graph.nodes.iter().filter(|node| &node.id != focused) {
        let key = ElementKey::Node(node.id.clone());
        if follows(&key, &*states) {
            let visibility = if neighbors.contains(&node.id) {
                Visibility::Emphasized
            } else {
                Visibility::DeEmphasized
            };
            states.derive(key, visibility);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EntityType, TimeRange};
    use crate::topology::{RawEdge, RawNode, TopologyWidgetConfig};
    use crate::transport::StaticTransport;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    fn time_range(end_ms: i64) -> TimeRange {
        TimeRange::new(
            Utc.timestamp_millis_opt(0).unwrap(),
            Utc.timestamp_millis_opt(end_ms).unwrap(),
        )
        .unwrap()
    }

    fn source(end_ms: i64) -> TopologyDataSource {
        TopologyDataSource::new(TopologyWidgetConfig::new(EntityType::Service))
            .unwrap()
            .with_time_range(time_range(end_ms))
    }

    fn raw_node(id: &str) -> RawNode {
        RawNode {
            id: id.to_string(),
            entity_type: EntityType::Service,
            attributes: HashMap::from([("name".to_string(), serde_json::json!(id))]),
            metrics: HashMap::new(),
            outgoing_edges: Vec::new(),
            incoming_edges: Vec::new(),
        }
    }

    fn response(root: &str, callees: &[&str]) -> TopologyResponse {
        let mut node = raw_node(root);
        node.outgoing_edges = callees
            .iter()
            .map(|callee| RawEdge {
                neighbor: raw_node(callee),
                metrics: HashMap::new(),
            })
            .collect();
        TopologyResponse { nodes: vec![node] }
    }

    fn two_roots() -> TopologyResponse {
        let mut combined = response("a", &["b"]);
        combined.nodes.extend(response_nodes("c", &["d"]));
        combined
    }

    fn response_nodes(root: &str, callees: &[&str]) -> Vec<RawNode> {
        response(root, callees).nodes
    }

    fn key(id: &str) -> ElementKey {
        ElementKey::Node(NodeId::new(id).unwrap())
    }

    fn edge_key(source: &str, target: &str) -> ElementKey {
        ElementKey::Edge(crate::core::EdgeKey::new(
            NodeId::new(source).unwrap(),
            NodeId::new(target).unwrap(),
        ))
    }

    #[test]
    fn test_identical_configuration_is_deduplicated() {
        let mut controller = TopologyController::new(ConsumerId(1), RenderConfig::default());
        assert!(controller.configure(source(60_000)).unwrap().is_some());
        assert!(controller.configure(source(60_000)).unwrap().is_none());
        assert_eq!(controller.generation(), 1);

        assert!(controller.configure(source(120_000)).unwrap().is_some());
        assert_eq!(controller.generation(), 2);
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut controller = TopologyController::new(ConsumerId(1), RenderConfig::default());
        let first = controller.configure(source(60_000)).unwrap().unwrap();
        let second = controller.configure(source(120_000)).unwrap().unwrap();

        let applied = controller.apply(&first, Ok(response("frontend", &["cart"]))).unwrap();
        assert_eq!(
            applied,
            Applied::Discarded {
                generation: 1,
                current: 2
            }
        );
        assert!(controller.graph().is_none());

        let applied = controller.apply(&second, Ok(response("frontend", &["cart"]))).unwrap();
        assert!(matches!(applied, Applied::Rendered(summary) if summary.entered == 3));
    }

    #[test]
    fn test_transport_error_keeps_previous_scene() {
        let mut controller = TopologyController::new(ConsumerId(1), RenderConfig::default());
        let ticket = controller.configure(source(60_000)).unwrap().unwrap();
        controller.apply(&ticket, Ok(response("frontend", &["cart"]))).unwrap();
        let before = controller.scene().to_svg();

        let ticket = controller.reissue().unwrap();
        let err = controller
            .apply(&ticket, Err(TopographError::transport("unavailable")))
            .unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(controller.scene().to_svg(), before);
    }

    #[test]
    fn test_missing_time_range_is_fatal() {
        let mut controller = TopologyController::new(ConsumerId(1), RenderConfig::default());
        let source = TopologyDataSource::new(TopologyWidgetConfig::new(EntityType::Service)).unwrap();
        assert!(matches!(
            controller.configure(source),
            Err(TopographError::MissingTimeRange)
        ));
    }

    #[tokio::test]
    async fn test_focus_marks_neighbors() {
        let transport = StaticTransport::new(response("frontend", &["cart", "checkout"]));
        let mut controller = TopologyController::new(ConsumerId(1), RenderConfig::default());
        controller.refresh(&transport, source(60_000)).await.unwrap();

        let cart = NodeId::new("cart").unwrap();
        controller.focus_node(&cart).unwrap();

        let states = controller.states();
        assert_eq!(states.node(&cart), Visibility::Focused);
        assert_eq!(states.node(&NodeId::new("frontend").unwrap()), Visibility::Emphasized);
        assert_eq!(states.node(&NodeId::new("checkout").unwrap()), Visibility::DeEmphasized);

        let element = controller.renderer().element_for(&ElementKey::Node(cart)).unwrap();
        assert!(controller.scene().has_class(element, "focused"));

        controller.clear_focus().unwrap();
        assert!(!controller.scene().has_class(element, "focused"));
        assert!(controller.focus_node(&NodeId::new("ghost").unwrap()).is_err());
    }

    #[tokio::test]
    async fn test_explicit_visibility_survives_refresh() {
        let transport = StaticTransport::new(two_roots());
        let mut controller = TopologyController::new(ConsumerId(1), RenderConfig::default());
        controller.refresh(&transport, source(60_000)).await.unwrap();

        controller.set_visibility(edge_key("c", "d"), Visibility::Emphasized).unwrap();
        controller.set_visibility(key("a"), Visibility::Focused).unwrap();
        controller.refresh(&transport, source(120_000)).await.unwrap();

        let states = controller.states();
        assert_eq!(states.get(&edge_key("c", "d")), Visibility::Emphasized);
        assert_eq!(states.get(&key("c")), Visibility::Default);
        assert_eq!(states.get(&key("a")), Visibility::Focused);

        let element = controller.renderer().element_for(&edge_key("c", "d")).unwrap();
        assert!(controller.scene().has_class(element, "emphasized"));
    }

    #[tokio::test]
    async fn test_focus_follows_refresh_but_keeps_explicit_states() {
        let transport = StaticTransport::new(two_roots());
        let mut controller = TopologyController::new(ConsumerId(1), RenderConfig::default());
        controller.refresh(&transport, source(60_000)).await.unwrap();

        controller.focus_node(&NodeId::new("a").unwrap()).unwrap();
        controller.set_visibility(key("d"), Visibility::Emphasized).unwrap();
        assert_eq!(controller.states().get(&key("c")), Visibility::DeEmphasized);

        controller.refresh(&transport, source(120_000)).await.unwrap();
        let states = controller.states();
        assert_eq!(states.get(&key("a")), Visibility::Focused);
        assert_eq!(states.get(&key("b")), Visibility::Emphasized);
        assert_eq!(states.get(&key("c")), Visibility::DeEmphasized);
        assert_eq!(states.get(&key("d")), Visibility::Emphasized);
    }

    #[tokio::test]
    async fn test_focus_is_dropped_when_focused_node_leaves() {
        let transport = StaticTransport::from_sequence(vec![
            Ok(two_roots()),
            Ok(TopologyResponse {
                nodes: response_nodes("c", &["d"]),
            }),
        ]);
        let mut controller = TopologyController::new(ConsumerId(1), RenderConfig::default());
        controller.refresh(&transport, source(60_000)).await.unwrap();
        controller.focus_node(&NodeId::new("a").unwrap()).unwrap();
        controller.set_visibility(key("d"), Visibility::Emphasized).unwrap();

        controller.refresh(&transport, source(120_000)).await.unwrap();
        let states = controller.states();
        assert!(states.focused_node().is_none());
        assert_eq!(states.get(&key("c")), Visibility::Default);
        assert_eq!(states.get(&edge_key("c", "d")), Visibility::Default);
        assert_eq!(states.get(&key("d")), Visibility::Emphasized);

        let element = controller.renderer().element_for(&key("c")).unwrap();
        assert!(!controller.scene().has_class(element, "de-emphasized"));
    }
}
