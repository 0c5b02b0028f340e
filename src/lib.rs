//! Topograph - topology graphs for distributed tracing dashboards.
//!
//! Topograph turns a topology widget definition into a backend request,
//! normalizes the response into a graph of entities and the calls between
//! them, and keeps a retained scene in sync with that graph across
//! refreshes. Only the elements that changed are touched, and interaction
//! state such as a focused node survives a refresh.
//!
//! # Features
//!
//! - **Request building**: widget definitions map to deduplicated, cacheable
//!   topology requests
//! - **Response caching**: LRU + TTL cache with in-flight request coalescing
//! - **Metric categories**: threshold categories with severity aware
//!   two-channel precedence
//! - **Reconciling renderer**: enter, update and exit diffs applied through
//!   pluggable node and edge delegates
//! - **SVG output**: the retained scene serializes to SVG
//!
//! # Architecture
//!
//! - `topology`: widget definitions, requests, responses and the graph model
//! - `transport`: the backend seam and the caching layer in front of it
//! - `metric`: metric selections, categories and value formatting
//! - `render`: scene, reconciliation, layout and draw delegates
//! - `pipeline`: the controller tying a widget to its scene
//! - `cli`: command-line interface
//!
//! # Example
//!
//! ```no_run
//! use topograph_lib::core::{EntityType, RenderConfig, TimeRange};
//! use topograph_lib::pipeline::TopologyController;
//! use topograph_lib::topology::{TopologyDataSource, TopologyResponse, TopologyWidgetConfig};
//! use topograph_lib::transport::{ConsumerId, StaticTransport};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let widget = TopologyWidgetConfig::new(EntityType::Service);
//!     let source = TopologyDataSource::new(widget)?
//!         .with_time_range(TimeRange::ending_at(chrono::Utc::now(), std::time::Duration::from_secs(3600))?);
//!
//!     let transport = StaticTransport::new(TopologyResponse::default());
//!     let mut controller = TopologyController::new(ConsumerId(1), RenderConfig::default());
//!     controller.refresh(&transport, source).await?;
//!     println!("{}", controller.scene().to_svg());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod cli;
pub mod core;
pub mod filter;
pub mod metric;
pub mod pipeline;
pub mod render;
pub mod specification;
pub mod topology;
pub mod transport;

// Re-export core types for convenience
pub use crate::core::{Config, Result};
