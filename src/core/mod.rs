//! Core domain types, errors and configuration for topograph.
//!
//! This module contains the identities, time ranges and positions shared
//! by the query model and the render engine.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{CacheConfig, Config, ConfigBuilder, LogLevel, RenderConfig, WidgetWatcher};
pub use error::{Result, TopographError};
pub use types::{EdgeKey, EdgePosition, ElementKey, EntityType, NodeId, Position, Scope, TimeRange};
