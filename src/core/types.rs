//! Identity and value types shared across the crate.

use crate::core::error::{Result, TopographError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity categories that can appear as topology nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    /// A service
    Service,
    /// An API endpoint exposed by a service
    Api,
    /// A backend (database, cache, external host)
    Backend,
}

impl EntityType {
    /// Wire name of the entity type
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Service => "SERVICE",
            EntityType::Api => "API",
            EntityType::Backend => "BACKEND",
        }
    }

    /// Whether this type may be requested as an upstream neighbor.
    ///
    /// Backends never call anything, so they only show up downstream.
    pub fn can_be_upstream(&self) -> bool {
        matches!(self, EntityType::Service | EntityType::Api)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = TopographError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SERVICE" => Ok(EntityType::Service),
            "API" => Ok(EntityType::Api),
            "BACKEND" => Ok(EntityType::Backend),
            _ => Err(TopographError::InvalidEntityType {
                entity_type: s.to_string(),
                role: "entity",
            }),
        }
    }
}

/// Domain scope a dashboard widget is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// An entity scope
    Entity(EntityType),
    /// Raw spans, which have no topology
    Span,
}

impl Scope {
    /// Returns the entity type for topology-capable scopes
    pub fn topology_entity(&self) -> Result<EntityType> {
        match self {
            Scope::Entity(entity_type) => Ok(*entity_type),
            Scope::Span => Err(TopographError::config("span scope has no topology")),
        }
    }
}

impl FromStr for Scope {
    type Err = TopographError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("SPAN") {
            return Ok(Scope::Span);
        }
        s.parse::<EntityType>().map(Scope::Entity)
    }
}

/// Stable identity of a topology node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a new NodeId after validation
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(TopographError::parse("NodeId cannot be empty"));
        }
        Ok(NodeId(id))
    }

    /// Returns the string representation of the node ID
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identity of a topology edge: the ordered (source, target) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    /// Calling side
    pub source: NodeId,
    /// Called side
    pub target: NodeId,
}

impl EdgeKey {
    /// Creates a new edge key
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self { source, target }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source, self.target)
    }
}

/// Identity of any visual element
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKey {
    /// A node
    Node(NodeId),
    /// An edge
    Edge(EdgeKey),
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKey::Node(id) => write!(f, "node:{}", id),
            ElementKey::Edge(key) => write!(f, "edge:{}", key),
        }
    }
}

/// Absolute time window of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive start
    pub start_time: DateTime<Utc>,
    /// Exclusive end
    pub end_time: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a validated time range
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Result<Self> {
        if end_time <= start_time {
            return Err(TopographError::config(format!(
                "time range end {} must be after start {}",
                end_time, start_time
            )));
        }
        Ok(Self {
            start_time,
            end_time,
        })
    }

    /// Time range ending at `end_time` spanning `duration`
    pub fn ending_at(end_time: DateTime<Utc>, duration: std::time::Duration) -> Result<Self> {
        let duration = chrono::Duration::from_std(duration)
            .map_err(|e| TopographError::config(format!("invalid time range duration: {}", e)))?;
        Self::new(end_time - duration, end_time)
    }
}

/// 2D coordinates supplied by the layout provider
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

impl Position {
    /// Creates a position
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Midpoint between two positions
    pub fn midpoint(&self, other: &Position) -> Position {
        Position::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Edge endpoints supplied by the layout provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgePosition {
    /// Source endpoint
    pub source: Position,
    /// Target endpoint
    pub target: Position,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_entity_type_parsing() {
        assert_eq!("service".parse::<EntityType>().unwrap(), EntityType::Service);
        assert_eq!("API".parse::<EntityType>().unwrap(), EntityType::Api);
        assert!("SPAN".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_upstream_restriction() {
        assert!(EntityType::Service.can_be_upstream());
        assert!(EntityType::Api.can_be_upstream());
        assert!(!EntityType::Backend.can_be_upstream());
    }

    #[test]
    fn test_span_scope_has_no_topology() {
        assert!(Scope::Span.topology_entity().is_err());
        assert_eq!(
            Scope::Entity(EntityType::Backend).topology_entity().unwrap(),
            EntityType::Backend
        );
        assert_eq!("span".parse::<Scope>().unwrap(), Scope::Span);
        assert_eq!("Api".parse::<Scope>().unwrap(), Scope::Entity(EntityType::Api));
        assert!("trace".parse::<Scope>().is_err());
    }

    #[test]
    fn test_time_range_validation() {
        let start = Utc.timestamp_millis_opt(1568907645141).unwrap();
        let end = Utc.timestamp_millis_opt(1568911245141).unwrap();
        assert!(TimeRange::new(start, end).is_ok());
        assert!(TimeRange::new(end, start).is_err());
        assert!(TimeRange::new(start, start).is_err());
    }

    #[test]
    fn test_node_id_validation() {
        assert!(NodeId::new("").is_err());
        assert_eq!(NodeId::new("frontend").unwrap().as_str(), "frontend");
    }
}
