//! Entity node drawn as a box with title and metric.
//!
//! ```text
//! g.entity-node                 transform
//!   rect.entity-node-box
//!   circle.entity-node-metric-circle   fill = display category color
//!   text.entity-node-title
//!   text.entity-node-metric-value
//! ```

use super::{translate, NodeRenderDelegate};
use crate::core::{Position, Result};
use crate::metric::defaults::color;
use crate::metric::{display_string, metric_value_text, resolve_display_category, ChannelReading};
use crate::render::scene::{fmt_number, DrawSurface, ElementId};
use crate::render::visibility::{Visibility, VisibilityUpdater};
use crate::render::{metrics_or_empty, DrawContext};
use crate::topology::TopologyNode;

const NODE_CLASS: &str = "entity-node";
const NODE_BOX_CLASS: &str = "entity-node-box";
const NODE_METRIC_CIRCLE_CLASS: &str = "entity-node-metric-circle";
const NODE_TITLE_CLASS: &str = "entity-node-title";
const NODE_METRIC_VALUE_CLASS: &str = "entity-node-metric-value";

const INNER_PADDING: f64 = 8.0;
const CIRCLE_RADIUS: f64 = 5.0;
const ELLIPSIS: char = '…';

/// Box node used whenever node metrics were requested
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityNodeBoxRenderer;

impl EntityNodeBoxRenderer {
    /// Cut `title` so it fits in `available` width, marking the cut
    fn fit_title(title: &str, available: f64, ctx: &DrawContext<'_>) -> String {
        if ctx.measurer.measure(title).width <= available {
            return title.to_string();
        }
        let mut fitted: String = title.chars().collect();
        while !fitted.is_empty() {
            fitted.pop();
            let candidate = format!("{}{}", fitted, ELLIPSIS);
            if ctx.measurer.measure(&candidate).width <= available {
                return candidate;
            }
        }
        ELLIPSIS.to_string()
    }
}

impl NodeRenderDelegate for EntityNodeBoxRenderer {
    fn matches(&self, _node: &TopologyNode, ctx: &DrawContext<'_>) -> bool {
        ctx.node_metrics().is_some()
    }

    fn draw<S: DrawSurface>(
        &self,
        surface: &mut S,
        layer: ElementId,
        _node: &TopologyNode,
        ctx: &DrawContext<'_>,
    ) -> Result<ElementId> {
        let (width, height) = (ctx.config.node_width, ctx.config.node_height);

        let group = surface.create_child(layer, "g")?;
        surface.toggle_class(group, NODE_CLASS, true)?;
        surface.set_attribute(group, "data-sensitive-pii", "true")?;

        let frame = surface.create_child(group, "rect")?;
        surface.toggle_class(frame, NODE_BOX_CLASS, true)?;
        surface.set_attribute(frame, "x", &fmt_number(-width / 2.0))?;
        surface.set_attribute(frame, "y", &fmt_number(-height / 2.0))?;
        surface.set_attribute(frame, "width", &fmt_number(width))?;
        surface.set_attribute(frame, "height", &fmt_number(height))?;
        surface.set_attribute(frame, "rx", "4")?;
        surface.set_attribute(frame, "fill", color::WHITE)?;
        surface.set_attribute(frame, "stroke", color::GRAY_3)?;

        let circle = surface.create_child(group, "circle")?;
        surface.toggle_class(circle, NODE_METRIC_CIRCLE_CLASS, true)?;
        surface.set_attribute(circle, "cx", &fmt_number(-width / 2.0 + INNER_PADDING + CIRCLE_RADIUS))?;
        surface.set_attribute(circle, "cy", "0")?;
        surface.set_attribute(circle, "r", &fmt_number(CIRCLE_RADIUS))?;

        let title = surface.create_child(group, "text")?;
        surface.toggle_class(title, NODE_TITLE_CLASS, true)?;
        surface.set_attribute(
            title,
            "x",
            &fmt_number(-width / 2.0 + 2.0 * INNER_PADDING + 2.0 * CIRCLE_RADIUS),
        )?;
        surface.set_attribute(title, "y", "0")?;
        surface.set_attribute(title, "dominant-baseline", "middle")?;

        let value = surface.create_child(group, "text")?;
        surface.toggle_class(value, NODE_METRIC_VALUE_CLASS, true)?;
        surface.set_attribute(value, "x", &fmt_number(width / 2.0 - INNER_PADDING))?;
        surface.set_attribute(value, "y", "0")?;
        surface.set_attribute(value, "dominant-baseline", "middle")?;
        surface.set_attribute(value, "text-anchor", "end")?;

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
        ctx: &DrawContext<'_>,
    ) -> Result<()> {
        let selection = ctx.node_metrics();
        let metrics = metrics_or_empty(node.metrics.as_ref());
        let primary = ChannelReading::read(selection.map(|s| &s.primary), &metrics);
        let secondary = ChannelReading::read(selection.and_then(|s| s.secondary.as_ref()), &metrics);
        let category = resolve_display_category(primary.category, secondary.category);

        let circle = surface.require_by_class(element, NODE_METRIC_CIRCLE_CLASS)?;
        surface.set_attribute(circle, "fill", category.map_or(color::GRAY_5, |c| c.color.as_str()))?;

        let value_text = metric_value_text(&primary, &secondary, ctx.formatter);
        let value = surface.require_by_class(element, NODE_METRIC_VALUE_CLASS)?;
        surface.set_text(value, &value_text)?;

        let available = ctx.config.node_width
            - 4.0 * INNER_PADDING
            - 2.0 * CIRCLE_RADIUS
            - ctx.measurer.measure(&value_text).width;
        let title_text = display_string(node.title.as_deref());
        let title = surface.require_by_class(element, NODE_TITLE_CLASS)?;
        surface.set_text(title, &Self::fit_title(&title_text, available, ctx))?;

        VisibilityUpdater::new().update_visibility(surface, element, visibility)
    }
}
