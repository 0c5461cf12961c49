//! Tracing setup shared by etlflow binaries
//!
//! Console output is on by default; file output (daily rotation) is added
//! when a log directory is configured. Both can be active at once. Events
//! are rendered as text or as one JSON object per line.
//!
//! Prefer structured fields over formatted strings:
//!
//! ```rust
//! use tracing::{error, info};
//!
//! let file_id = "4c1f6f0e";
//! let err = "quota exceeded";
//! info!(file_id, "Created metadata record");
//! error!(file_id, error = %err, "Failed to start job run");
//! ```
//!
//! # Example
//!
//! ```no_run
//! use etl_common::logging::{init_logging, LogConfig};
//! use tracing::Level;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::new("etl-orchestrator")
//!         .with_level(Level::DEBUG)
//!         .apply_env()?;
//!     let _guard = init_logging(&config)?;
//!
//!     tracing::info!("Orchestrator starting");
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::{Directive, LevelFilter},
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::SubscriberExt,
    registry::Registry,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Directory used when file output is requested without `LOG_DIR`
pub const DEFAULT_LOG_DIR: &str = "./logs";

/// How events are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => bail!("Unknown log format '{}' (expected text or json)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    /// Write to stdout
    pub console: bool,
    /// Write daily-rotated files here; `None` disables file output
    pub log_dir: Option<PathBuf>,
    /// File name prefix, e.g. `etl-orchestrator` -> `etl-orchestrator.2024-05-01`
    pub file_prefix: String,
    /// Extra `target=level` directives on top of `level`
    pub directives: Vec<String>,
    /// Include source file and line in each event
    pub show_location: bool,
}

impl LogConfig {
    /// Console-only text logging at INFO
    pub fn new(file_prefix: impl Into<String>) -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Text,
            console: true,
            log_dir: None,
            file_prefix: file_prefix.into(),
            directives: Vec::new(),
            show_location: false,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Add comma-separated `target=level` directives
    pub fn with_directives(mut self, directives: &str) -> Self {
        self.directives.extend(
            directives
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        );
        self
    }

    /// Override settings from `LOG_*` environment variables
    ///
    /// - `LOG_LEVEL`: trace, debug, info, warn, error
    /// - `LOG_FORMAT`: text, json
    /// - `LOG_OUTPUT`: console, file, both
    /// - `LOG_DIR`: directory for log files (implies file output)
    /// - `LOG_FILTER`: extra directives, comma separated
    /// - `LOG_LOCATION`: true/false
    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.level = level
                .trim()
                .parse()
                .with_context(|| format!("Invalid LOG_LEVEL '{}'", level))?;
        }

        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.format = format.parse()?;
        }

        if let Ok(dir) = std::env::var("LOG_DIR") {
            self.log_dir = Some(PathBuf::from(dir));
        }

        if let Ok(output) = std::env::var("LOG_OUTPUT") {
            self.set_output(&output)?;
        }

        if let Ok(filter) = std::env::var("LOG_FILTER") {
            self = self.with_directives(&filter);
        }

        if let Some(show) = std::env::var("LOG_LOCATION").ok().and_then(|v| v.parse().ok()) {
            self.show_location = show;
        }

        Ok(self)
    }

    fn set_output(&mut self, output: &str) -> Result<()> {
        let (console, file) = match output.trim().to_ascii_lowercase().as_str() {
            "console" | "stdout" => (true, false),
            "file" => (false, true),
            "both" => (true, true),
            other => bail!("Unknown log output '{}' (expected console, file or both)", other),
        };

        self.console = console;
        if file {
            self.log_dir.get_or_insert_with(|| PathBuf::from(DEFAULT_LOG_DIR));
        } else {
            self.log_dir = None;
        }

        Ok(())
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        let mut filter =
            EnvFilter::from_default_env().add_directive(LevelFilter::from_level(self.level).into());

        for raw in &self.directives {
            let directive: Directive = raw
                .parse()
                .with_context(|| format!("Failed to parse filter directive '{}'", raw))?;
            filter = filter.add_directive(directive);
        }

        Ok(filter)
    }
}

/// Install the global subscriber
///
/// Call once at startup. The returned guard flushes buffered file output on
/// drop; keep it alive until exit.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    if !config.console && config.log_dir.is_none() {
        bail!("Logging has no output: enable the console or set a log directory");
    }

    let filter = config.env_filter()?;
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = None;

    if config.console {
        layers.push(fmt_layer(config, std::io::stdout, true));
    }

    if let Some(dir) = &config.log_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

        let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
        let (writer, worker_guard) = tracing_appender::non_blocking(appender);
        guard = Some(worker_guard);
        layers.push(fmt_layer(config, writer, false));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn fmt_layer<W>(config: &LogConfig, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_file(config.show_location)
        .with_line_number(config.show_location)
        .with_span_events(FmtSpan::CLOSE);

    match config.format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_console_text_info() {
        let config = LogConfig::new("etl-orchestrator");
        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.format, LogFormat::Text);
        assert!(config.console);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!(" JSON ".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_output_selection() {
        let mut config = LogConfig::new("etl");

        config.set_output("both").unwrap();
        assert!(config.console);
        assert_eq!(config.log_dir, Some(PathBuf::from(DEFAULT_LOG_DIR)));

        config.log_dir = Some(PathBuf::from("/var/log/etlflow"));
        config.set_output("file").unwrap();
        assert!(!config.console);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/etlflow")));

        config.set_output("console").unwrap();
        assert!(config.console);
        assert!(config.log_dir.is_none());

        assert!(config.set_output("syslog").is_err());
    }

    #[test]
    fn test_directives_are_split_and_validated() {
        let ok = LogConfig::new("etl").with_directives("etl_orchestrator=debug, aws_config=warn,");
        assert_eq!(ok.directives, vec!["etl_orchestrator=debug", "aws_config=warn"]);
        assert!(ok.env_filter().is_ok());

        let bad = LogConfig::new("etl").with_directives("etl_orchestrator=verbose");
        assert!(bad.env_filter().is_err());
    }

    #[test]
    fn test_init_requires_an_output() {
        let mut config = LogConfig::new("etl");
        config.console = false;
        assert!(init_logging(&config).is_err());
    }
}
