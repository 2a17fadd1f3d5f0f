//! # Logging Utilities
//!
//! Logging infrastructure for Cobalt using `tracing`.
//!
//! Console output goes to **stderr**: stdout belongs to the debugger prompt
//! and its listings, and the two must never interleave.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cobalt_utils::{init_logging, LoggingConfig};
//!
//! let _guard = init_logging(&LoggingConfig::from_env()).expect("Failed to initialize logging");
//! tracing::info!("Debugger started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Log level filter (e.g., `RUST_LOG=debug`, `RUST_LOG=cobalt_core=trace`)
//! - `COBALT_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
//! - `COBALT_LOG_FILE`: Optional path to a log file, written in addition to stderr

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Environment variable selecting the output format
pub const FORMAT_VAR: &str = "COBALT_LOG_FORMAT";

/// Environment variable naming an additional log file
pub const FILE_VAR: &str = "COBALT_LOG_FILE";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format
    #[default]
    Pretty,
    /// JSON, one object per line
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    Error,
    Warn,
    /// Default when neither `RUST_LOG` nor `--log-level` is given
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

/// Where and how to log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig
{
    /// Explicit level; overrides `RUST_LOG` when set
    pub level: Option<LogLevel>,
    pub format: LogFormat,
    /// Additional log file, written without ANSI colors
    pub file: Option<PathBuf>,
}

impl LoggingConfig
{
    /// Read the format and file from the environment. Unparseable values
    /// fall back to the defaults.
    pub fn from_env() -> Self
    {
        let format = env::var(FORMAT_VAR)
            .ok()
            .and_then(|s| LogFormat::from_str(&s).ok())
            .unwrap_or_default();
        let file = env::var(FILE_VAR).ok().filter(|s| !s.is_empty()).map(PathBuf::from);
        Self {
            level: None,
            format,
            file,
        }
    }

    /// Override the level (the `--log-level` flag).
    #[must_use]
    pub fn with_level(mut self, level: Option<LogLevel>) -> Self
    {
        if level.is_some() {
            self.level = level;
        }
        self
    }

    /// Filter used by every layer.
    ///
    /// Priority: explicit level, then `RUST_LOG`, then `info`.
    pub fn filter(&self) -> EnvFilter
    {
        if let Some(level) = self.level {
            return EnvFilter::new(Level::from(level).to_string());
        }
        match env::var("RUST_LOG") {
            Ok(rust_log) => EnvFilter::try_new(&rust_log).unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string())),
            Err(_) => EnvFilter::new(Level::INFO.to_string()),
        }
    }
}

/// Keeps the file writer flushing; drop it at exit
#[derive(Debug)]
pub struct LoggingGuard
{
    _file: Option<WorkerGuard>,
}

/// Initialize the global subscriber.
///
/// ## Errors
///
/// - `InitializationFailed`: a global subscriber is already installed
/// - `FileError`: the log file's directory could not be created
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError>
{
    let filter = config.filter();

    let (file_writer, guard) = match &config.file {
        Some(path) => {
            let (directory, name) = split_log_path(path);
            std::fs::create_dir_all(&directory)?;
            let appender = tracing_appender::rolling::never(directory, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let result = match config.format {
        LogFormat::Pretty => {
            let console_layer = fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(true)
                .with_writer(io::stderr)
                .with_filter(filter.clone());
            let file_layer = file_writer.map(|writer| {
                fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .with_filter(filter)
            });
            Registry::default().with(console_layer).with(file_layer).try_init()
        }
        LogFormat::Json => {
            let console_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_current_span(true)
                .with_writer(io::stderr)
                .with_filter(filter.clone());
            let file_layer = file_writer.map(|writer| {
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_current_span(true)
                    .with_filter(filter)
            });
            Registry::default().with(console_layer).with(file_layer).try_init()
        }
    };
    result.map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;

    Ok(LoggingGuard { _file: guard })
}

/// Split a log path into the directory to create and the file name.
fn split_log_path(path: &Path) -> (PathBuf, PathBuf)
{
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let name = path
        .file_name()
        .map_or_else(|| PathBuf::from("cobalt.log"), PathBuf::from);
    (directory, name)
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    #[error("Unknown log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    #[error("Unknown log level: {0}. Use 'error', 'warn', 'info', 'debug', or 'trace'")]
    InvalidLevel(String),

    /// A global subscriber was already installed
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_log_format_from_str()
    {
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("dev").unwrap(), LogFormat::Pretty);
        assert!(matches!(LogFormat::from_str("xml"), Err(LoggingError::InvalidFormat(_))));
    }

    #[test]
    fn test_log_level_from_str()
    {
        assert_eq!(LogLevel::from_str("error").unwrap(), LogLevel::Error);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("dbg").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
        assert!(matches!(LogLevel::from_str("loud"), Err(LoggingError::InvalidLevel(_))));
    }

    #[test]
    fn test_log_level_to_tracing_level()
    {
        assert_eq!(Level::from(LogLevel::Warn), Level::WARN);
        assert_eq!(Level::from(LogLevel::Info), Level::INFO);
    }

    #[test]
    fn test_with_level_keeps_existing_when_none()
    {
        let config = LoggingConfig::default().with_level(Some(LogLevel::Debug)).with_level(None);
        assert_eq!(config.level, Some(LogLevel::Debug));
    }

    #[test]
    fn test_split_log_path()
    {
        let (directory, name) = split_log_path(Path::new("logs/cobalt.log"));
        assert_eq!(directory, PathBuf::from("logs"));
        assert_eq!(name, PathBuf::from("cobalt.log"));

        let (directory, name) = split_log_path(Path::new("session.log"));
        assert_eq!(directory, PathBuf::from("."));
        assert_eq!(name, PathBuf::from("session.log"));
    }
}
