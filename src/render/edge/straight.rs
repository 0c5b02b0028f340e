//! Plain line for edges fetched without metrics.

use super::EdgeRenderDelegate;
use crate::core::{EdgePosition, Result};
use crate::render::scene::{fmt_number, DrawSurface, ElementId};
use crate::render::visibility::{Visibility, VisibilityUpdater};
use crate::render::DrawContext;
use crate::topology::TopologyEdge;

const EDGE_CLASS: &str = "entity-edge";
const STRAIGHT_EDGE_CLASS: &str = "straight-edge";
const EDGE_LINE_CLASS: &str = "edge-line";

/// Fallback edge delegate: a straight line, visibility only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StraightEdgeRenderer;

impl EdgeRenderDelegate for StraightEdgeRenderer {
    fn matches(&self, _edge: &TopologyEdge, _ctx: &DrawContext<'_>) -> bool {
        true
    }

    fn draw<S: DrawSurface>(
        &self,
        surface: &mut S,
        layer: ElementId,
        _edge: &TopologyEdge,
        ctx: &DrawContext<'_>,
    ) -> Result<ElementId> {
        let group = surface.create_child(layer, "g")?;
        surface.toggle_class(group, EDGE_CLASS, true)?;
        surface.toggle_class(group, STRAIGHT_EDGE_CLASS, true)?;

        let line = surface.create_child(group, "line")?;
        surface.toggle_class(line, EDGE_LINE_CLASS, true)?;
        surface.set_attribute(line, "stroke", &ctx.config.edge_color)?;
        Ok(group)
    }

    fn update_position<S: DrawSurface>(
        &self,
        surface: &mut S,
        element: ElementId,
        _edge: &TopologyEdge,
        position: &EdgePosition,
        _ctx: &DrawContext<'_>,
    ) -> Result<()> {
        let line = surface.require_by_class(element, EDGE_LINE_CLASS)?;
        surface.set_attribute(line, "x1", &fmt_number(position.source.x))?;
        surface.set_attribute(line, "y1", &fmt_number(position.source.y))?;
        surface.set_attribute(line, "x2", &fmt_number(position.target.x))?;
        surface.set_attribute(line, "y2", &fmt_number(position.target.y))?;
        Ok(())
    }

    fn update_state<S: DrawSurface>(
        &self,
        surface: &mut S,
        element: ElementId,
        _edge: &TopologyEdge,
        visibility: Visibility,
        _ctx: &DrawContext<'_>,
    ) -> Result<()> {
        VisibilityUpdater::new().update_visibility(surface, element, visibility)
    }
}
