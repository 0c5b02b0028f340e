//! Configuration management for topograph.
//!
//! This module provides configuration handling with:
//! - YAML file support
//! - Validation and defaults
//! - Hot reload of widget definition files

use crate::core::{Result, TopographError};
use crate::metric::defaults::color;
use crate::topology::{TopologyWidgetConfig, MAX_ROOT_NODE_LIMIT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete configuration for topograph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Query configuration
    pub topology: TopologyConfig,
    /// Scene rendering configuration
    pub render: RenderConfig,
    /// Response cache configuration
    pub cache: CacheConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Debug mode
    #[serde(skip)]
    pub debug: bool,
}

/// Query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Maximum number of root nodes requested
    pub root_node_limit: usize,
    /// Length of the queried window, ending now
    #[serde(with = "humantime_serde")]
    pub time_window: Duration,
    /// How long a single topology request may take
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

/// Scene rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Canvas width used by the column layout and the SVG viewport
    pub width: f64,
    /// Canvas height used by the column layout and the SVG viewport
    pub height: f64,
    /// Width of an entity node box
    pub node_width: f64,
    /// Height of an entity node box
    pub node_height: f64,
    /// Radius of the plain node circle
    pub plain_node_radius: f64,
    /// Horizontal padding inside an edge metric bubble
    pub bubble_horizontal_padding: f64,
    /// Vertical padding inside an edge metric bubble
    pub bubble_vertical_padding: f64,
    /// Corner radius of an edge metric bubble
    pub bubble_radius: f64,
    /// Minimum height of an edge metric bubble
    pub bubble_height: f64,
    /// Advance width of one character for text measurement
    pub char_width: f64,
    /// Line height for text measurement
    pub line_height: f64,
    /// Stroke color of edges that are neither emphasized nor focused
    pub edge_color: String,
    /// Fill of an edge metric bubble without a display category
    pub bubble_fill: String,
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached responses
    pub max_entries: usize,
    /// How long a cached response stays fresh
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
    /// Structured logging format
    pub structured: bool,
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace
    Trace,
    /// Debug
    Debug,
    /// Info
    Info,
    /// Warn
    Warn,
    /// Error
    Error,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        TopologyConfig {
            root_node_limit: MAX_ROOT_NODE_LIMIT,
            time_window: Duration::from_secs(3600), // 1 hour
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            width: 960.0,
            height: 540.0,
            node_width: 160.0,
            node_height: 36.0,
            plain_node_radius: 6.0,
            bubble_horizontal_padding: 8.0,
            bubble_vertical_padding: 2.0,
            bubble_radius: 8.0,
            bubble_height: 16.0,
            char_width: 7.0,
            line_height: 14.0,
            edge_color: color::GRAY_3.to_string(),
            bubble_fill: color::WHITE.to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            max_entries: 256,
            ttl: Duration::from_secs(60),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            structured: false,
        }
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Result<Self> {
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.topology.root_node_limit == 0 {
            return Err(TopographError::config("root_node_limit must be greater than 0"));
        }

        if self.topology.root_node_limit > MAX_ROOT_NODE_LIMIT {
            return Err(TopographError::config(format!(
                "root_node_limit must be at most {}, got {}",
                MAX_ROOT_NODE_LIMIT, self.topology.root_node_limit
            )));
        }

        if self.topology.time_window.is_zero() {
            return Err(TopographError::config("time_window must be greater than 0"));
        }

        if self.topology.request_timeout.is_zero() {
            return Err(TopographError::config("request_timeout must be greater than 0"));
        }

        if self.cache.max_entries == 0 {
            return Err(TopographError::config("cache max_entries must be greater than 0"));
        }

        let render = &self.render;
        for (name, value) in [
            ("width", render.width),
            ("height", render.height),
            ("node_width", render.node_width),
            ("node_height", render.node_height),
            ("char_width", render.char_width),
            ("line_height", render.line_height),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(TopographError::config(format!(
                    "render {} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        if render.bubble_horizontal_padding < 0.0 || render.bubble_vertical_padding < 0.0 {
            return Err(TopographError::config("bubble padding must not be negative"));
        }

        Ok(())
    }

    /// Load and validate a configuration file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        ConfigBuilder::new().from_yaml(&content)?.build()
    }
}

impl LogLevel {
    /// Convert to tracing filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration builder for programmatic construction
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| TopographError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Set root node limit
    pub fn root_node_limit(mut self, limit: usize) -> Self {
        self.config.topology.root_node_limit = limit;
        self
    }

    /// Set queried time window
    pub fn time_window(mut self, window: Duration) -> Self {
        self.config.topology.time_window = window;
        self
    }

    /// Set the per-request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.topology.request_timeout = timeout;
        self
    }

    /// Set canvas size
    pub fn canvas(mut self, width: f64, height: f64) -> Self {
        self.config.render.width = width;
        self.config.render.height = height;
        self
    }

    /// Set cache capacity
    pub fn cache_entries(mut self, max_entries: usize) -> Self {
        self.config.cache.max_entries = max_entries;
        self
    }

    /// Set cache time to live
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache.ttl = ttl;
        self
    }

    /// Set log level
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Set debug mode
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Watch a widget definition file and publish validated reloads
pub struct WidgetWatcher {
    path: PathBuf,
    tx: tokio::sync::watch::Sender<TopologyWidgetConfig>,
    rx: tokio::sync::watch::Receiver<TopologyWidgetConfig>,
}

impl WidgetWatcher {
    /// Create a new widget watcher
    pub fn new(path: PathBuf, initial: TopologyWidgetConfig) -> Self {
        let (tx, rx) = tokio::sync::watch::channel(initial);
        WidgetWatcher { path, tx, rx }
    }

    /// Get a receiver for widget updates
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<TopologyWidgetConfig> {
        self.rx.clone()
    }

    /// Re-read the widget file and publish it if it parses and validates.
    ///
    /// Returns whether a new definition was published. Unchanged definitions
    /// are not re-published.
    pub async fn reload(&self) -> Result<bool> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let widget = TopologyWidgetConfig::from_yaml(&content)?;
        widget.validate()?;

        let changed = self.tx.send_if_modified(|current| {
            if *current == widget {
                false
            } else {
                *current = widget;
                true
            }
        });
        if changed {
            tracing::info!("Widget definition reloaded: {:?}", self.path);
        }
        Ok(changed)
    }

    /// Whether `event` touches the widget file in a way worth a reload.
    ///
    /// Editors that save by writing a temporary file and renaming it over the
    /// definition show up as creations or renames of the file name, not as
    /// modifications, so those count as well.
    fn should_reload(&self, event: &notify::Event) -> bool {
        use notify::EventKind;

        self.touches_file(event) && matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
    }

    fn touches_file(&self, event: &notify::Event) -> bool {
        event
            .paths
            .iter()
            .any(|path| path.file_name().is_some() && path.file_name() == self.path.file_name())
    }

    /// Start watching for widget file changes.
    ///
    /// The parent directory is watched rather than the file itself, so the
    /// watch survives the file being replaced or briefly removed.
    pub async fn watch(self) -> Result<()> {
        use notify::{EventKind, RecursiveMode, Watcher};

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        })
        .map_err(|e| TopographError::config(format!("Failed to create file watcher: {}", e)))?;

        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|e| TopographError::config(format!("Failed to watch widget directory: {}", e)))?;

        tracing::info!("Watching widget definition: {:?}", self.path);

        while let Some(event) = rx.recv().await {
            let event: notify::Event = event;
            if matches!(event.kind, EventKind::Remove(_)) && self.touches_file(&event) {
                tracing::debug!("Widget definition removed, keeping the last good one: {:?}", self.path);
                continue;
            }
            if !self.should_reload(&event) {
                continue;
            }
            if let Err(e) = self.reload().await {
                tracing::error!("Ignoring invalid widget definition: {}", e);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_root_node_limit() {
        let mut config = Config::default();
        config.topology.root_node_limit = 0;
        assert!(config.validate().is_err());

        config.topology.root_node_limit = MAX_ROOT_NODE_LIMIT + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_watcher_reacts_to_replaced_files() {
        use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
        use notify::{Event, EventKind};

        let watcher = WidgetWatcher::new(
            PathBuf::from("/tmp/widgets/widget.yaml"),
            TopologyWidgetConfig::new(crate::core::EntityType::Service),
        );
        let event = |kind: EventKind, path: &str| Event::new(kind).add_path(PathBuf::from(path));

        assert!(watcher.should_reload(&event(
            EventKind::Modify(ModifyKind::Any),
            "/tmp/widgets/widget.yaml"
        )));
        assert!(watcher.should_reload(&event(
            EventKind::Create(CreateKind::File),
            "/tmp/widgets/widget.yaml"
        )));
        assert!(watcher.should_reload(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            "/tmp/widgets/widget.yaml"
        )));

        // Removal alone never reloads, and siblings in the directory are ignored
        let removed = event(EventKind::Remove(RemoveKind::File), "/tmp/widgets/widget.yaml");
        assert!(watcher.touches_file(&removed));
        assert!(!watcher.should_reload(&removed));
        assert!(!watcher.should_reload(&event(
            EventKind::Create(CreateKind::File),
            "/tmp/widgets/.widget.yaml.swp"
        )));
    }

    #[test]
    fn test_invalid_canvas() {
        let mut config = Config::default();
        config.render.width = 0.0;
        assert!(config.validate().is_err());

        config.render.width = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .root_node_limit(25)
            .canvas(1200.0, 800.0)
            .cache_entries(8)
            .cache_ttl(Duration::from_secs(5))
            .debug(true)
            .build();

        assert!(config.is_ok());
        let config = config.unwrap();
        assert_eq!(config.topology.root_node_limit, 25);
        assert_eq!(config.render.width, 1200.0);
        assert_eq!(config.cache.max_entries, 8);
        assert_eq!(config.cache.ttl, Duration::from_secs(5));
        assert!(config.debug);
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
topology:
  root_node_limit: 40
  time_window: 15m
  request_timeout: 5s
cache:
  max_entries: 16
  ttl: 30s
logging:
  level: debug
"#;

        let config = ConfigBuilder::new().from_yaml(yaml).unwrap().build();

        assert!(config.is_ok());
        let config = config.unwrap();
        assert_eq!(config.topology.root_node_limit, 40);
        assert_eq!(config.topology.time_window, Duration::from_secs(900));
        assert_eq!(config.topology.request_timeout, Duration::from_secs(5));
        assert_eq!(config.cache.ttl, Duration::from_secs(30));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.render.bubble_radius, 8.0);
    }
}
