//! Logging configuration and initialization
//!
//! Centralized `tracing` setup for the library, the demo driver and the
//! benchmarks. Console output goes to stderr (human-readable or JSON) so
//! stdout stays free for program output; an optional file sink gets JSON.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Standard tracing filter (e.g. "info", "warn,logforge=debug");
//!   takes precedence over everything else
//! - `LOGFORGE_LOG_LEVEL`: Simple log level (error, warn, info, debug, trace)
//! - `LOGFORGE_LOG_FORMAT`: Console format ("human" or "json")
//! - `LOGFORGE_LOG_FILE`: Optional file path; the file always receives JSON

use std::path::{Path, PathBuf};
use std::str::FromStr;

use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Set once the global subscriber is installed
static TRACING_INITIALIZED: OnceCell<()> = OnceCell::new();

const LOG_LEVEL_ENV: &str = "LOGFORGE_LOG_LEVEL";
const LOG_FORMAT_ENV: &str = "LOGFORGE_LOG_FORMAT";
const LOG_FILE_ENV: &str = "LOGFORGE_LOG_FILE";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Errors that can occur during logging initialization
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("invalid log format: {0}")]
    InvalidLogFormat(String),

    #[error("failed to create log directory {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to open log file {path}: {source}")]
    FileOpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }

    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(LoggingError::InvalidLogLevel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable colored output
    #[default]
    Human,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "human" | "pretty" | "console" => Ok(LogFormat::Human),
            "json" | "structured" => Ok(LogFormat::Json),
            other => Err(LoggingError::InvalidLogFormat(other.to_string())),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Include file/line in console output
    pub with_file_info: bool,
    /// Emit an event when spans close (with timing)
    pub with_span_events: bool,
    /// Optional JSON file sink
    pub log_file: Option<PathBuf>,
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_file_info(mut self, with_file_info: bool) -> Self {
        self.with_file_info = with_file_info;
        self
    }

    pub fn with_span_events(mut self, with_span_events: bool) -> Self {
        self.with_span_events = with_span_events;
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Build a configuration from the `LOGFORGE_*` variables
    ///
    /// Unset variables keep their defaults; set but unparseable values are
    /// errors.
    pub fn from_env() -> Result<Self, LoggingError> {
        let mut config = Self::new();
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            config.level = level.parse()?;
        }
        if let Ok(format) = std::env::var(LOG_FORMAT_ENV) {
            config.format = format.parse()?;
        }
        if let Ok(file) = std::env::var(LOG_FILE_ENV) {
            if !file.is_empty() {
                config.log_file = Some(PathBuf::from(file));
            }
        }
        Ok(config)
    }
}

/// Initialize logging from the environment, ignoring configuration errors
///
/// Idempotent: only the first call installs a subscriber.
///
/// # Example
///
/// ```ignore
/// logforge::init_logging_default();
/// tracing::info!("Application started");
/// ```
pub fn init_logging_default() {
    if let Err(e) = init_logging_from_env() {
        eprintln!("logforge: logging disabled: {}", e);
    }
}

/// Initialize logging from `RUST_LOG` and the `LOGFORGE_*` variables
///
/// Idempotent. Returns an error if a variable holds an invalid value or the
/// log file cannot be opened; in that case nothing is installed.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    if is_initialized() {
        return Ok(());
    }
    let config = LoggingConfig::from_env()?;
    init_with_config(&config)
}

/// Initialize logging with an explicit configuration
///
/// Idempotent: returns `Ok(())` without changes once a subscriber from this
/// module is installed. A failed attempt leaves nothing installed, so a
/// later call may retry with a different configuration.
pub fn init_with_config(config: &LoggingConfig) -> Result<(), LoggingError> {
    if is_initialized() {
        return Ok(());
    }
    match install(config) {
        Ok(()) => {
            let _ = TRACING_INITIALIZED.set(());
            Ok(())
        }
        // Lost a race against another thread in this module
        Err(LoggingError::AlreadyInstalled) if is_initialized() => Ok(()),
        Err(e) => Err(e),
    }
}

fn install(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = build_env_filter(config.level);

    let mut layers: Vec<BoxedLayer> = vec![console_layer(config)];
    if let Some(path) = &config.log_file {
        layers.push(file_layer(config, path)?);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInstalled)
}

fn console_layer(config: &LoggingConfig) -> BoxedLayer {
    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(config.with_file_info)
        .with_line_number(config.with_file_info)
        .with_span_events(span_events(config.with_span_events));

    match config.format {
        LogFormat::Human => base
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
        LogFormat::Json => base.json().with_target(false).boxed(),
    }
}

fn file_layer(config: &LoggingConfig, path: &Path) -> Result<BoxedLayer, LoggingError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| LoggingError::DirectoryCreationFailed {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::FileOpenFailed {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(fmt::layer()
        .json()
        .with_writer(file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_span_events(span_events(config.with_span_events))
        .boxed())
}

fn span_events(enabled: bool) -> FmtSpan {
    if enabled {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

/// `RUST_LOG` wins; otherwise the configured level applies to every target
fn build_env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter_str()))
}

/// Check if this module has installed the global subscriber
pub fn is_initialized() -> bool {
    TRACING_INITIALIZED.get().is_some()
}
