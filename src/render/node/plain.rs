//! Circle with a label, for graphs fetched without node metrics.

use super::{translate, NodeRenderDelegate};
use crate::core::{Position, Result};
use crate::metric::defaults::color;
use crate::render::scene::{fmt_number, DrawSurface, ElementId};
use crate::render::visibility::{Visibility, VisibilityUpdater};
use crate::render::DrawContext;
use crate::topology::TopologyNode;

const NODE_CLASS: &str = "plain-node";
const NODE_CIRCLE_CLASS: &str = "plain-node-circle";
const NODE_LABEL_CLASS: &str = "plain-node-label";

/// Fallback node delegate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlainNodeRenderer;

impl NodeRenderDelegate for PlainNodeRenderer {
    fn matches(&self, _node: &TopologyNode, _ctx: &DrawContext<'_>) -> bool {
        true
    }

    fn draw<S: DrawSurface>(
        &self,
        surface: &mut S,
        layer: ElementId,
        _node: &TopologyNode,
        ctx: &DrawContext<'_>,
    ) -> Result<ElementId> {
        let radius = ctx.config.plain_node_radius;

        let group = surface.create_child(layer, "g")?;
        surface.toggle_class(group, NODE_CLASS, true)?;

        let circle = surface.create_child(group, "circle")?;
        surface.toggle_class(circle, NODE_CIRCLE_CLASS, true)?;
        surface.set_attribute(circle, "r", &fmt_number(radius))?;
        surface.set_attribute(circle, "fill", color::GRAY_5)?;

        let label = surface.create_child(group, "text")?;
        surface.toggle_class(label, NODE_LABEL_CLASS, true)?;
        surface.set_attribute(label, "x", &fmt_number(radius + 4.0))?;
        surface.set_attribute(label, "dominant-baseline", "middle")?;
        Ok(group)
    }

    fn update_position<S: DrawSurface>(
        &self,
        surface: &mut S,
        element: ElementId,
        _node: &TopologyNode,
        position: Position,
        _ctx: &DrawContext<'_>,
    ) -> Result<()> {
        surface.set_attribute(element, "transform", &translate(position))
    }

    fn update_state<S: DrawSurface>(
        &self,
        surface: &mut S,
        element: ElementId,
        node: &TopologyNode,
        visibility: Visibility,
        _ctx: &DrawContext<'_>,
    ) -> Result<()> {
        let label = surface.require_by_class(element, NODE_LABEL_CLASS)?;
        let text = node.title.as_deref().unwrap_or(node.id.as_str());
        surface.set_text(label, text)?;
        VisibilityUpdater::new().update_visibility(surface, element, visibility)
    }
}
