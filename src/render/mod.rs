//! Topology render engine.
//!
//! Rendering is split in two phases. [`reconcile`] compares the previous and
//! the new graph and partitions element keys into entering, updating and
//! exiting sets without touching the scene. The [`TopologyRenderer`] then
//! walks those sets and lets the first matching draw delegate of each
//! element create or patch its part of the [`Scene`].
//!
//! Delegate sets are closed enums ([`EdgeDelegate`], [`NodeDelegate`]), so
//! selection is a first-match scan over a fixed registry.

pub mod edge;
pub mod layout;
pub mod measure;
pub mod node;
pub mod reconcile;
pub mod renderer;
pub mod scene;
pub mod state;
pub mod visibility;

use crate::core::config::RenderConfig;
use crate::metric::{MetricMap, MetricSelection, NumericFormatter};
use crate::topology::TopologyGraph;

pub use edge::{EdgeDelegate, EdgeRenderDelegate};
pub use layout::{ColumnLayout, FixedLayout, LayoutProvider};
pub use measure::{MonospaceMeasurer, TextMeasurer, TextSize};
pub use node::{NodeDelegate, NodeRenderDelegate};
pub use reconcile::{reconcile, ElementDiff, Reconciliation};
pub use renderer::{RenderSummary, TopologyRenderer};
pub use scene::{DrawSurface, ElementId, Scene, SceneElement};
pub use state::{EnterOutcome, Lifecycle, LifecycleTracker, VisualStateStore};
pub use visibility::{Visibility, VisibilityUpdater};

/// Everything a delegate may read while drawing one element
#[derive(Clone, Copy)]
pub struct DrawContext<'a> {
    /// Graph the element belongs to
    pub graph: &'a TopologyGraph,
    /// Render settings
    pub config: &'a RenderConfig,
    /// Label measurement
    pub measurer: &'a dyn TextMeasurer,
    /// Metric value formatting
    pub formatter: &'a NumericFormatter,
    /// Shared definitions element of the scene
    pub defs: ElementId,
}

impl<'a> DrawContext<'a> {
    /// Edge metric selection the graph was fetched with
    pub fn edge_metrics(&self) -> Option<&'a MetricSelection> {
        self.graph.model_properties.edge_metrics.as_ref()
    }

    /// Node metric selection the graph was fetched with
    pub fn node_metrics(&self) -> Option<&'a MetricSelection> {
        self.graph.model_properties.node_metrics.as_ref()
    }
}

/// Metrics of an element, empty when none were requested
pub(crate) fn metrics_or_empty(metrics: Option<&MetricMap>) -> std::borrow::Cow<'_, MetricMap> {
    match metrics {
        Some(metrics) => std::borrow::Cow::Borrowed(metrics),
        None => std::borrow::Cow::Owned(MetricMap::new()),
    }
}
