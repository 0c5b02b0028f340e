//! Error type shared by every module.

use std::sync::Arc;
use thiserror::Error;

/// Errors raised anywhere between a widget definition and the scene
#[derive(Error, Debug)]
pub enum TopographError {
    /// Invalid configuration or widget definition
    #[error("Configuration error: {0}")]
    Config(String),

    /// A request was built before a time range was set
    #[error("Time range is required to build a topology request")]
    MissingTimeRange,

    /// An entity type used where it is not allowed
    #[error("Entity type {entity_type} is not allowed as {role}")]
    InvalidEntityType {
        /// The rejected type
        entity_type: String,
        /// Where it was used
        role: &'static str,
    },

    /// The query backend failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed input text
    #[error("Parse error: {message}")]
    Parse {
        /// What went wrong
        message: String,
    },

    /// The scene could not be patched
    #[error("Render error: {0}")]
    Render(String),

    /// A scene element id that does not exist
    #[error("Unknown scene element: {0}")]
    UnknownElement(usize),

    /// A query took longer than allowed
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout {
        /// The limit that was exceeded
        timeout_ms: u64,
    },

    /// File system failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML (de)serialization failure
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for topology operations
pub type Result<T> = std::result::Result<T, TopographError>;

impl TopographError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::Transport(msg.into())
    }

    /// Creates a new parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Creates a new render error
    pub fn render<S: Into<String>>(msg: S) -> Self {
        Self::Render(msg.into())
    }

    /// Recover an owned error from one shared between coalesced callers.
    ///
    /// The variant survives, so a timeout stays a timeout. Wrapped library
    /// errors that cannot be cloned keep their category and message.
    pub fn from_shared(error: Arc<Self>) -> Self {
        Arc::try_unwrap(error).unwrap_or_else(|shared| match shared.as_ref() {
            Self::Config(message) => Self::Config(message.clone()),
            Self::MissingTimeRange => Self::MissingTimeRange,
            Self::InvalidEntityType { entity_type, role } => Self::InvalidEntityType {
                entity_type: entity_type.clone(),
                role: *role,
            },
            Self::Transport(message) => Self::Transport(message.clone()),
            Self::Parse { message } => Self::Parse {
                message: message.clone(),
            },
            Self::Render(message) => Self::Render(message.clone()),
            Self::UnknownElement(index) => Self::UnknownElement(*index),
            Self::Timeout { timeout_ms } => Self::Timeout {
                timeout_ms: *timeout_ms,
            },
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), e.to_string())),
            Self::Serialization(_) | Self::Yaml(_) => Self::parse(shared.to_string()),
        })
    }

    /// Returns true if retrying the same operation could succeed.
    ///
    /// Configuration defects never are. Retry policy itself lives in the
    /// transport, the topology core only reports.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout { .. })
    }

    /// Returns the error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::MissingTimeRange | Self::InvalidEntityType { .. } => "config",
            Self::Transport(_) => "transport",
            Self::Timeout { .. } => "timeout",
            Self::Parse { .. } | Self::Serialization(_) | Self::Yaml(_) => "serialization",
            Self::Render(_) | Self::UnknownElement(_) => "render",
            Self::Io(_) => "io",
        }
    }
}
