//! Command-line interface for Topograph.
//!
//! `topograph render` turns a widget definition and a recorded topology
//! response into an SVG scene, `topograph check` validates a widget
//! definition without rendering anything.

use crate::core::config::{ConfigBuilder, LoggingConfig};
use crate::core::{Config, Result, TimeRange, TopographError, WidgetWatcher};
use crate::filter::{parse_filters, Filter};
use crate::pipeline::{Applied, LayoutMode, TopologyController};
use crate::render::FixedLayout;
use crate::topology::{TopologyDataSource, TopologyResponse, TopologyWidgetConfig};
use crate::transport::{CachingTransport, ConsumerId, StaticTransport};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Topology graph renderer for tracing dashboards
#[derive(Parser, Debug)]
#[command(name = "topograph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (default: ~/.config/topograph/config.yaml)
    #[arg(short, long, global = true, env = "TOPOGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, env = "TOPOGRAPH_DEBUG")]
    pub debug: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Topograph subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a recorded topology response to SVG
    Render {
        /// Widget definition (YAML)
        #[arg(short, long)]
        widget: PathBuf,

        /// Recorded topology response (JSON)
        #[arg(short, long)]
        response: PathBuf,

        /// Fixed node positions (JSON); columns are computed when omitted
        #[arg(short, long)]
        layout: Option<PathBuf>,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// End of the time window (RFC 3339); now when omitted
        #[arg(long)]
        end: Option<String>,

        /// Root node filter, e.g. `environment = "prod" && calls >= 10`
        #[arg(short, long)]
        filter: Option<String>,

        /// Focus a node after rendering
        #[arg(long)]
        focus: Option<String>,

        /// Re-render whenever the widget definition changes
        #[arg(long)]
        watch: bool,
    },

    /// Validate a widget definition and exit
    Check {
        /// Widget definition (YAML)
        #[arg(short, long)]
        widget: PathBuf,
    },
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load configuration with proper precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Config file
    /// 3. Defaults (lowest priority)
    pub async fn load_config(&self) -> Result<Config> {
        let mut builder = ConfigBuilder::new();

        let config_path = match &self.config {
            Some(path) => path.clone(),
            None => {
                let default_path = dirs::config_dir()
                    .map(|d| d.join("topograph").join("config.yaml"))
                    .unwrap_or_else(|| PathBuf::from("~/.config/topograph/config.yaml"));
                if !default_path.exists() {
                    return builder.debug(self.debug).build();
                }
                default_path
            },
        };

        match tokio::fs::read_to_string(&config_path).await {
            Ok(content) => {
                builder = builder.from_yaml(&content)?;
                tracing::info!("Loaded configuration from: {:?}", config_path);
            },
            Err(e) if self.config.is_some() => {
                return Err(TopographError::config(format!(
                    "Failed to read config file {:?}: {}",
                    config_path, e
                )));
            },
            Err(_) => {
                tracing::debug!("No config file found at {:?}, using defaults", config_path);
            },
        }

        builder.debug(self.debug).build()
    }

    /// Initialize logging based on configuration.
    ///
    /// `--debug` wins over `TOPOGRAPH_LOG_LEVEL`, which wins over the
    /// configured level.
    pub fn init_logging(&self, logging: &LoggingConfig) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let env_log_level =
            std::env::var("TOPOGRAPH_LOG_LEVEL").unwrap_or_else(|_| logging.level.as_str().to_string());
        let log_level = if self.debug {
            "debug"
        } else {
            env_log_level.as_str()
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        // Logs go to stderr so rendered SVG on stdout stays clean
        let fmt_layer = if logging.structured {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .compact()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact()
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TopographError::config(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }
}

/// Execute a parsed command line.
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.load_config().await?;
    cli.init_logging(&config.logging)?;

    match cli.command {
        Command::Check { widget } => {
            let widget = load_widget(&widget).await?;
            println!("Widget definition is valid!");
            println!("  Entity type: {}", widget.entity_type);
            println!("  Upstream: {:?}", widget.upstream_types());
            println!("  Downstream: {:?}", widget.downstream_types());
            println!("  Node metrics: {}", widget.node_metrics.is_some());
            println!("  Edge metrics: {}", widget.edge_metrics.is_some());
            Ok(())
        },
        Command::Render {
            widget,
            response,
            layout,
            output,
            end,
            filter,
            focus,
            watch,
        } => {
            let job = RenderJob {
                response: load_response(&response).await?,
                layout: match layout {
                    Some(path) => LayoutMode::Fixed(FixedLayout::from_json(&tokio::fs::read_to_string(&path).await?)?),
                    None => LayoutMode::Columns,
                },
                output,
                end: end.as_deref().map(parse_time).transpose()?,
                filters: filter.as_deref().map(parse_filters).transpose()?.unwrap_or_default(),
                focus,
            };
            if watch {
                job.watch(&config, widget).await
            } else {
                let definition = load_widget(&widget).await?;
                job.run_once(&config, definition).await
            }
        },
    }
}

struct RenderJob {
    response: TopologyResponse,
    layout: LayoutMode,
    output: Option<PathBuf>,
    end: Option<DateTime<Utc>>,
    filters: Vec<Filter>,
    focus: Option<String>,
}

impl RenderJob {
    fn source(&self, config: &Config, widget: TopologyWidgetConfig) -> Result<TopologyDataSource> {
        let end = self.end.unwrap_or_else(Utc::now);
        let time_range = TimeRange::ending_at(end, config.topology.time_window)?;
        Ok(TopologyDataSource::new(widget)?
            .with_time_range(time_range)
            .with_filters(self.filters.clone())
            .with_root_node_limit(config.topology.root_node_limit))
    }

    fn transport(&self, config: &Config) -> CachingTransport<StaticTransport> {
        CachingTransport::new(StaticTransport::new(self.response.clone()), &config.cache)
            .with_timeout(config.topology.request_timeout)
    }

    fn controller(&self, config: &Config) -> TopologyController {
        TopologyController::new(ConsumerId(1), config.render.clone()).with_layout(self.layout.clone())
    }

    async fn render(
        &self,
        controller: &mut TopologyController,
        transport: &CachingTransport<StaticTransport>,
        source: TopologyDataSource,
    ) -> Result<()> {
        match controller.refresh(transport, source).await? {
            Applied::Rendered(summary) => {
                tracing::info!(
                    entered = summary.entered,
                    updated = summary.updated,
                    exiting = summary.exiting,
                    "scene updated"
                );
            },
            Applied::Unchanged => {
                tracing::debug!("widget produced the same request, scene unchanged");
                return Ok(());
            },
            Applied::Discarded { .. } => return Ok(()),
        }

        if let Some(focus) = &self.focus {
            controller.focus_node(&crate::core::NodeId::new(focus.as_str())?)?;
        }
        controller.complete_exits()?;
        self.write(&controller.scene().to_svg()).await
    }

    async fn write(&self, svg: &str) -> Result<()> {
        match &self.output {
            Some(path) => {
                tokio::fs::write(path, svg).await?;
                tracing::info!("Wrote {:?}", path);
            },
            None => println!("{}", svg),
        }
        Ok(())
    }

    async fn run_once(&self, config: &Config, widget: TopologyWidgetConfig) -> Result<()> {
        let transport = self.transport(config);
        let mut controller = self.controller(config);
        self.render(&mut controller, &transport, self.source(config, widget)?).await
    }

    async fn watch(&self, config: &Config, path: PathBuf) -> Result<()> {
        let initial = load_widget(&path).await?;
        let watcher = WidgetWatcher::new(path, initial.clone());
        let mut updates = watcher.subscribe();
        tokio::spawn(async move {
            if let Err(e) = watcher.watch().await {
                tracing::error!("Widget watcher stopped: {}", e);
            }
        });

        let transport = self.transport(config);
        let mut controller = self.controller(config);
        self.render(&mut controller, &transport, self.source(config, initial)?).await?;

        while updates.changed().await.is_ok() {
            let widget = updates.borrow_and_update().clone();
            if let Err(e) = self.render(&mut controller, &transport, self.source(config, widget)?).await {
                tracing::error!("Render failed: {}", e);
            }
        }
        Ok(())
    }
}

async fn load_widget(path: &Path) -> Result<TopologyWidgetConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| TopographError::config(format!("Failed to read widget definition {:?}: {}", path, e)))?;
    let widget = TopologyWidgetConfig::from_yaml(&content)?;
    widget.validate()?;
    Ok(widget)
}

async fn load_response(path: &Path) -> Result<TopologyResponse> {
    let content = tokio::fs::read_to_string(path).await?;
    TopologyResponse::from_json(&content)
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|e| TopographError::parse(format!("invalid time {:?}: {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_arguments() {
        let cli = Cli::try_parse_from([
            "topograph",
            "render",
            "--widget",
            "widget.yaml",
            "--response",
            "response.json",
            "--end",
            "2024-01-01T00:00:00Z",
            "--filter",
            "environment = \"prod\"",
            "--debug",
        ])
        .unwrap();

        assert!(cli.debug);
        match cli.command {
            Command::Render {
                widget,
                end,
                filter,
                watch,
                ..
            } => {
                assert_eq!(widget, PathBuf::from("widget.yaml"));
                assert_eq!(parse_filters(filter.as_deref().unwrap()).unwrap().len(), 1);
                assert_eq!(end.as_deref(), Some("2024-01-01T00:00:00Z"));
                assert!(!watch);
            },
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_time() {
        let time = parse_time("2024-01-01T01:00:00+01:00").unwrap();
        assert_eq!(time.timestamp(), 1_704_067_200);
        assert!(parse_time("yesterday").is_err());
    }
}
