//! Edge draw delegates.

pub mod curve;
pub mod straight;

use super::scene::{DrawSurface, ElementId};
use super::visibility::Visibility;
use super::DrawContext;
use crate::core::{EdgePosition, Result};
use crate::topology::TopologyEdge;

pub use curve::EntityEdgeCurveRenderer;
pub use straight::StraightEdgeRenderer;

/// Draws one kind of edge into a scene.
///
/// `draw` only builds the element structure. Geometry is applied by
/// `update_position` and everything that depends on metrics or interaction
/// by `update_state`, so either can be re-run on its own.
pub trait EdgeRenderDelegate {
    /// Whether this delegate handles `edge`
    fn matches(&self, edge: &TopologyEdge, ctx: &DrawContext<'_>) -> bool;

    /// Create the edge element under `layer` and return its root
    fn draw<S: DrawSurface>(
        &self,
        surface: &mut S,
        layer: ElementId,
        edge: &TopologyEdge,
        ctx: &DrawContext<'_>,
    ) -> Result<ElementId>;

    /// Apply endpoint coordinates
    fn update_position<S: DrawSurface>(
        &self,
        surface: &mut S,
        element: ElementId,
        edge: &TopologyEdge,
        position: &EdgePosition,
        ctx: &DrawContext<'_>,
    ) -> Result<()>;

    /// Apply metric values, categories and visibility
    fn update_state<S: DrawSurface>(
        &self,
        surface: &mut S,
        element: ElementId,
        edge: &TopologyEdge,
        visibility: Visibility,
        ctx: &DrawContext<'_>,
    ) -> Result<()>;
}

/// The closed set of edge delegates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDelegate {
    /// Curved edge with a metric bubble
    Curve(EntityEdgeCurveRenderer),
    /// Straight line without metrics
    Straight(StraightEdgeRenderer),
}

impl EdgeDelegate {
    /// Registry in selection order
    pub fn registry() -> [EdgeDelegate; 2] {
        [
            EdgeDelegate::Curve(EntityEdgeCurveRenderer),
            EdgeDelegate::Straight(StraightEdgeRenderer),
        ]
    }

    /// First delegate in `registry` that matches `edge`
    pub fn select<'r>(
        registry: &'r [EdgeDelegate],
        edge: &TopologyEdge,
        ctx: &DrawContext<'_>,
    ) -> Option<&'r EdgeDelegate> {
        registry.iter().find(|delegate| delegate.matches(edge, ctx))
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            EdgeDelegate::Curve(_) => "curve",
            EdgeDelegate::Straight(_) => "straight",
        }
    }
}

impl EdgeRenderDelegate for EdgeDelegate {
    fn matches(&self, edge: &TopologyEdge, ctx: &DrawContext<'_>) -> bool {
        match self {
            EdgeDelegate::Curve(delegate) => delegate.matches(edge, ctx),
            EdgeDelegate::Straight(delegate) => delegate.matches(edge, ctx),
        }
    }

    fn draw<S: DrawSurface>(
        &self,
        surface: &mut S,
        layer: ElementId,
        edge: &TopologyEdge,
        ctx: &DrawContext<'_>,
    ) -> Result<ElementId> {
        match self {
            EdgeDelegate::Curve(delegate) => delegate.draw(surface, layer, edge, ctx),
            EdgeDelegate::Straight(delegate) => delegate.draw(surface, layer, edge, ctx),
        }
    }

    fn update_position<S: DrawSurface>(
        &self,
        surface: &mut S,
        element: ElementId,
        edge: &TopologyEdge,
        position: &EdgePosition,
        ctx: &DrawContext<'_>,
    ) -> Result<()> {
        match self {
            EdgeDelegate::Curve(delegate) => delegate.update_position(surface, element, edge, position, ctx),
            EdgeDelegate::Straight(delegate) => {
                delegate.update_position(surface, element, edge, position, ctx)
            },
        }
    }

    fn update_state<S: DrawSurface>(
        &self,
        surface: &mut S,
        element: ElementId,
        edge: &TopologyEdge,
        visibility: Visibility,
        ctx: &DrawContext<'_>,
    ) -> Result<()> {
        match self {
            EdgeDelegate::Curve(delegate) => delegate.update_state(surface, element, edge, visibility, ctx),
            EdgeDelegate::Straight(delegate) => {
                delegate.update_state(surface, element, edge, visibility, ctx)
            },
        }
    }
}
