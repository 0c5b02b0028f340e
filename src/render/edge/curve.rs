//! Curved entity edge with a metric bubble.
//!
//! Structure of one edge:
//!
//! ```text
//! g.entity-edge
//!   g.entity-edge-line          marker-end
//!     path.edge-path            d, stroke
//!   rect.entity-edge-metric-bubble
//!   text.entity-edge-metric-value
//! ```
//!
//! Arrow markers live in the shared `defs`, one per category class.

use super::EdgeRenderDelegate;
use crate::core::{EdgePosition, Position, Result};
use crate::metric::{
    all_categories, metric_value_text, resolve_display_category, ChannelReading, MetricCategory,
};
use crate::render::scene::{fmt_number, DrawSurface, ElementId};
use crate::render::visibility::{Visibility, VisibilityUpdater};
use crate::render::{metrics_or_empty, DrawContext};
use crate::topology::TopologyEdge;

const EDGE_CLASS: &str = "entity-edge";
const EDGE_LINE_CLASS: &str = "entity-edge-line";
const EDGE_PATH_CLASS: &str = "edge-path";
const EDGE_ARROW_CLASS: &str = "entity-edge-arrow";
const EDGE_METRIC_BUBBLE_CLASS: &str = "entity-edge-metric-bubble";
const EDGE_METRIC_VALUE_CLASS: &str = "entity-edge-metric-value";

/// Curved edge between two entities, labelled with its metric value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityEdgeCurveRenderer;

impl EntityEdgeCurveRenderer {
    /// Id of the arrow marker for a category class
    pub fn marker_id(category_class: &str) -> String {
        format!("{}-{}", EDGE_ARROW_CLASS, category_class)
    }

    /// Make sure every category has a marker carrying its current color
    fn sync_arrow_markers<S: DrawSurface>(
        &self,
        surface: &mut S,
        ctx: &DrawContext<'_>,
    ) -> Result<()> {
        let Some(metrics) = ctx.edge_metrics() else {
            return Ok(());
        };
        let categories = all_categories(
            Some(metrics.primary.categories.as_slice()),
            metrics.secondary.as_ref().map(|m| m.categories.as_slice()),
        );

        for category in &categories {
            let id = Self::marker_id(&category.category_class);
            if let Some(marker) = surface.find_by_id(ctx.defs, &id) {
                if surface.attribute(marker, "fill") != Some(category.color.as_str()) {
                    surface.set_attribute(marker, "fill", &category.color)?;
                }
                continue;
            }
            let marker = surface.create_child(ctx.defs, "marker")?;
            surface.set_attribute(marker, "id", &id)?;
            surface.set_attribute(marker, "viewBox", "0 0 10 10")?;
            surface.set_attribute(marker, "refX", "5")?;
            surface.set_attribute(marker, "refY", "5")?;
            surface.set_attribute(marker, "markerWidth", "12")?;
            surface.set_attribute(marker, "markerHeight", "12")?;
            surface.set_attribute(marker, "orient", "auto-start-reverse")?;
            surface.set_attribute(marker, "fill", &category.color)?;

            let path = surface.create_child(marker, "path")?;
            surface.toggle_class(path, EDGE_ARROW_CLASS, true)?;
            surface.toggle_class(path, &category.category_class, true)?;
            surface.set_attribute(path, "d", "M2,2 L5,5 L2,8")?;
        }
        Ok(())
    }

    fn update_label_bubble_position<S: DrawSurface>(
        &self,
        surface: &mut S,
        element: ElementId,
        ctx: &DrawContext<'_>,
    ) -> Result<()> {
        let text = surface.require_by_class(element, EDGE_METRIC_VALUE_CLASS)?;
        let bubble = surface.require_by_class(element, EDGE_METRIC_BUBBLE_CLASS)?;

        let anchor = Position::new(
            read_number(surface, text, "x"),
            read_number(surface, text, "y"),
        );
        let size = ctx.measurer.measure(surface.text(text).unwrap_or_default());

        // Text is centered on its anchor in both directions
        let horizontal = ctx.config.bubble_horizontal_padding;
        let vertical = ctx.config.bubble_vertical_padding;
        let height = (size.height + 2.0 * vertical).max(ctx.config.bubble_height);
        surface.set_attribute(bubble, "x", &fmt_number(anchor.x - size.width / 2.0 - horizontal))?;
        surface.set_attribute(bubble, "y", &fmt_number(anchor.y - height / 2.0))?;
        surface.set_attribute(bubble, "width", &fmt_number(size.width + 2.0 * horizontal))?;
        surface.set_attribute(bubble, "height", &fmt_number(height))?;
        Ok(())
    }

    fn edge_focused_category<'a>(
        visibility: Visibility,
        primary: &ChannelReading<'a>,
        secondary: &ChannelReading<'a>,
    ) -> Option<&'a MetricCategory> {
        if visibility.is_highlighted() {
            resolve_display_category(primary.category, secondary.category)
        } else {
            None
        }
    }
}

impl EdgeRenderDelegate for EntityEdgeCurveRenderer {
    fn matches(&self, edge: &TopologyEdge, ctx: &DrawContext<'_>) -> bool {
        edge.metrics.is_some() && ctx.edge_metrics().is_some()
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
        surface.set_attribute(group, "data-sensitive-pii", "true")?;

        let line = surface.create_child(group, "g")?;
        surface.toggle_class(line, EDGE_LINE_CLASS, true)?;
        let path = surface.create_child(line, "path")?;
        surface.toggle_class(path, EDGE_PATH_CLASS, true)?;
        surface.set_attribute(path, "fill", "none")?;

        let bubble = surface.create_child(group, "rect")?;
        surface.toggle_class(bubble, EDGE_METRIC_BUBBLE_CLASS, true)?;
        surface.set_attribute(bubble, "rx", &fmt_number(ctx.config.bubble_radius))?;
        surface.set_attribute(bubble, "height", &fmt_number(ctx.config.bubble_height))?;

        let text = surface.create_child(group, "text")?;
        surface.toggle_class(text, EDGE_METRIC_VALUE_CLASS, true)?;
        surface.set_attribute(text, "dominant-baseline", "middle")?;
        surface.set_attribute(text, "text-anchor", "middle")?;

        Ok(group)
    }

    fn update_position<S: DrawSurface>(
        &self,
        surface: &mut S,
        element: ElementId,
        _edge: &TopologyEdge,
        position: &EdgePosition,
        ctx: &DrawContext<'_>,
    ) -> Result<()> {
        let path = surface.require_by_class(element, EDGE_PATH_CLASS)?;
        surface.set_attribute(path, "d", &link_horizontal(position))?;

        let center = position.source.midpoint(&position.target);
        let text = surface.require_by_class(element, EDGE_METRIC_VALUE_CLASS)?;
        surface.set_attribute(text, "x", &fmt_number(center.x))?;
        surface.set_attribute(text, "y", &fmt_number(center.y))?;

        self.update_label_bubble_position(surface, element, ctx)
    }

    fn update_state<S: DrawSurface>(
        &self,
        surface: &mut S,
        element: ElementId,
        edge: &TopologyEdge,
        visibility: Visibility,
        ctx: &DrawContext<'_>,
    ) -> Result<()> {
        let selection = ctx.edge_metrics();
        let metrics = metrics_or_empty(edge.metrics.as_ref());
        let primary = ChannelReading::read(selection.map(|s| &s.primary), &metrics);
        let secondary = ChannelReading::read(selection.and_then(|s| s.secondary.as_ref()), &metrics);
        let focused_category = Self::edge_focused_category(visibility, &primary, &secondary);
        self.sync_arrow_markers(surface, ctx)?;

        let path = surface.require_by_class(element, EDGE_PATH_CLASS)?;
        let stroke = focused_category.map_or(ctx.config.edge_color.as_str(), |c| c.color.as_str());
        surface.set_attribute(path, "stroke", stroke)?;

        let bubble = surface.require_by_class(element, EDGE_METRIC_BUBBLE_CLASS)?;
        match focused_category {
            Some(category) => {
                surface.set_attribute(bubble, "fill", &category.color)?;
                surface.set_attribute(bubble, "stroke", &category.color)?;
            },
            None => {
                surface.set_attribute(bubble, "fill", &ctx.config.bubble_fill)?;
                surface.set_attribute(bubble, "stroke", "none")?;
            },
        }

        let text = surface.require_by_class(element, EDGE_METRIC_VALUE_CLASS)?;
        surface.set_text(text, &metric_value_text(&primary, &secondary, ctx.formatter))?;

        let line = surface.require_by_class(element, EDGE_LINE_CLASS)?;
        let marker_end = if visibility.is_highlighted() {
            let class = focused_category.map_or("", |c| c.category_class.as_str());
            format!("url(#{})", Self::marker_id(class))
        } else {
            "none".to_string()
        };
        surface.set_attribute(line, "marker-end", &marker_end)?;

        VisibilityUpdater::new().update_visibility(surface, element, visibility)?;

        // State can change the label text, which moves the bubble
        self.update_label_bubble_position(surface, element, ctx)
    }
}

/// Horizontal cubic link: control points share the x midpoint
fn link_horizontal(position: &EdgePosition) -> String {
    let (source, target) = (position.source, position.target);
    let mid_x = (source.x + target.x) / 2.0;
    format!(
        "M{},{}C{},{},{},{},{},{}",
        fmt_number(source.x),
        fmt_number(source.y),
        fmt_number(mid_x),
        fmt_number(source.y),
        fmt_number(mid_x),
        fmt_number(target.y),
        fmt_number(target.x),
        fmt_number(target.y)
    )
}

fn read_number<S: DrawSurface>(surface: &S, element: ElementId, name: &str) -> f64 {
    surface
        .attribute(element, name)
        .and_then(|value| value.parse().ok())
        .unwrap_or(0.0)
}
