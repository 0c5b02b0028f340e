//! Node draw delegates.

pub mod entity_box;
pub mod plain;

use super::scene::{DrawSurface, ElementId};
use super::visibility::Visibility;
use super::DrawContext;
use crate::core::{Position, Result};
use crate::topology::TopologyNode;

pub use entity_box::EntityNodeBoxRenderer;
pub use plain::PlainNodeRenderer;

/// Draws one kind of node into a scene
pub trait NodeRenderDelegate {
    /// Whether this delegate handles `node`
    fn matches(&self, node: &TopologyNode, ctx: &DrawContext<'_>) -> bool;

    /// Create the node element under `layer` and return its root
    fn draw<S: DrawSurface>(
        &self,
        surface: &mut S,
        layer: ElementId,
        node: &TopologyNode,
        ctx: &DrawContext<'_>,
    ) -> Result<ElementId>;

    /// Move the node so its center sits at `position`
    fn update_position<S: DrawSurface>(
        &self,
        surface: &mut S,
        element: ElementId,
        node: &TopologyNode,
        position: Position,
        ctx: &DrawContext<'_>,
    ) -> Result<()>;

    /// Apply title, metric values, categories and visibility
    fn update_state<S: DrawSurface>(
        &self,
        surface: &mut S,
        element: ElementId,
        node: &TopologyNode,
        visibility: Visibility,
        ctx: &DrawContext<'_>,
    ) -> Result<()>;
}

/// The closed set of node delegates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeDelegate {
    /// Entity box with title and metric
    EntityBox(EntityNodeBoxRenderer),
    /// Circle with a label
    Plain(PlainNodeRenderer),
}

impl NodeDelegate {
    /// Registry in selection order
    pub fn registry() -> [NodeDelegate; 2] {
        [
            NodeDelegate::EntityBox(EntityNodeBoxRenderer),
            NodeDelegate::Plain(PlainNodeRenderer),
        ]
    }

    /// First delegate in `registry` that matches `node`
    pub fn select<'r>(
        registry: &'r [NodeDelegate],
        node: &TopologyNode,
        ctx: &DrawContext<'_>,
    ) -> Option<&'r NodeDelegate> {
        registry.iter().find(|delegate| delegate.matches(node, ctx))
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            NodeDelegate::EntityBox(_) => "entity-box",
            NodeDelegate::Plain(_) => "plain",
        }
    }
}

impl NodeRenderDelegate for NodeDelegate {
    fn matches(&self, node: &TopologyNode, ctx: &DrawContext<'_>) -> bool {
        match self {
            NodeDelegate::EntityBox(delegate) => delegate.matches(node, ctx),
            NodeDelegate::Plain(delegate) => delegate.matches(node, ctx),
        }
    }

    fn draw<S: DrawSurface>(
        &self,
        surface: &mut S,
        layer: ElementId,
        node: &TopologyNode,
        ctx: &DrawContext<'_>,
    ) -> Result<ElementId> {
        match self {
            NodeDelegate::EntityBox(delegate) => delegate.draw(surface, layer, node, ctx),
            NodeDelegate::Plain(delegate) => delegate.draw(surface, layer, node, ctx),
        }
    }

    fn update_position<S: DrawSurface>(
        &self,
        surface: &mut S,
        element: ElementId,
        node: &TopologyNode,
        position: Position,
        ctx: &DrawContext<'_>,
    ) -> Result<()> {
        match self {
            NodeDelegate::EntityBox(delegate) => delegate.update_position(surface, element, node, position, ctx),
            NodeDelegate::Plain(delegate) => delegate.update_position(surface, element, node, position, ctx),
        }
    }

    fn update_state<S: DrawSurface>(
        &self,
        surface: &mut S,
        element: ElementId,
        node: &TopologyNode,
        visibility: Visibility,
        ctx: &DrawContext<'_>,
    ) -> Result<()> {
        match self {
            NodeDelegate::EntityBox(delegate) => delegate.update_state(surface, element, node, visibility, ctx),
            NodeDelegate::Plain(delegate) => delegate.update_state(surface, element, node, visibility, ctx),
        }
    }
}

/// `transform` value placing a node at `position`
pub(crate) fn translate(position: Position) -> String {
    format!(
        "translate({},{})",
        super::scene::fmt_number(position.x),
        super::scene::fmt_number(position.y)
    )
}
