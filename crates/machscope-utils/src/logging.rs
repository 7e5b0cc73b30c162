//! # Logging Utilities
//!
//! Logging setup for machscope using `tracing`.
//!
//! Log records go to stderr so they never mix with decoded output on stdout.
//! A copy can additionally be written to a file:
//! - Multiple output formats (JSON for machine consumption, pretty for people)
//! - Environment variable configuration
//! - Optional file output through a non-blocking writer
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use machscope_utils::init_logging;
//!
//! // Reads RUST_LOG, MACHSCOPE_LOG_FORMAT and MACHSCOPE_LOG_FILE
//! let _guard = init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("Decoder started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Filter directives (e.g., `RUST_LOG=debug`, `RUST_LOG=machscope_core=trace`)
//! - `MACHSCOPE_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
//! - `MACHSCOPE_LOG_FILE`: Optional path of a file that receives a copy of every record
//!
//! The returned [`LoggingGuard`] flushes buffered file output when dropped;
//! keep it alive until the program exits.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fs, io};

use chrono::{NaiveDate, Utc};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Environment variable selecting the output format.
pub const LOG_FORMAT_ENV: &str = "MACHSCOPE_LOG_FORMAT";
/// Environment variable naming an extra log file.
pub const LOG_FILE_ENV: &str = "MACHSCOPE_LOG_FILE";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format (default)
    #[default]
    Pretty,
    /// One JSON object per record
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel
{
    Error,
    Warn,
    /// Default when nothing else is configured
    Info,
    /// Per-slice and per-command progress
    Debug,
    /// Every load command and table read
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

/// Keeps the file writer's background worker alive.
///
/// Dropping the guard flushes any buffered records. It is empty when no file
/// output was configured.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug, Default)]
pub struct LoggingGuard
{
    _worker: Option<WorkerGuard>,
}

/// Initialize logging from the environment
///
/// - `RUST_LOG`: filter directives; defaults to `info`
/// - `MACHSCOPE_LOG_FORMAT`: `json` or `pretty`; unknown values fall back to `pretty`
/// - `MACHSCOPE_LOG_FILE`: optional extra file output
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed or the log
/// file's directory cannot be created.
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    init(None, log_format_from_env(), log_file_from_env())
}

/// Initialize logging with an explicit level and format
///
/// The level overrides `RUST_LOG`. `MACHSCOPE_LOG_FILE` is still honored.
///
/// ## Example
///
/// ```rust,no_run
/// use machscope_utils::{init_logging_with_level, LogFormat, LogLevel};
///
/// let _guard = init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)
///     .expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if logging is already initialized or file logging fails.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    init(Some(level.into()), format, log_file_from_env())
}

/// Initialize logging with an additional date-stamped file in `dir`
///
/// The file is named `YYYY-MM-DD-machscope.log` (UTC date) and is appended
/// to across runs on the same day. Returns the path of the file.
///
/// ## Errors
///
/// Returns an error if `dir` cannot be created or logging is already
/// initialized.
pub fn init_logging_to_dir(
    dir: &Path,
    level: Option<LogLevel>,
    format: LogFormat,
) -> Result<(PathBuf, LoggingGuard), LoggingError>
{
    fs::create_dir_all(dir)?;
    let log_file = dir.join(log_file_name(Utc::now().date_naive()));
    let guard = init(level.map(Into::into), format, Some(log_file.clone()))?;
    Ok((log_file, guard))
}

/// Name of the daily log file for `date`.
pub fn log_file_name(date: NaiveDate) -> String
{
    format!("{}-machscope.log", date.format("%Y-%m-%d"))
}

/// Format named by `MACHSCOPE_LOG_FORMAT`, or pretty.
pub fn log_format_from_env() -> LogFormat
{
    env::var(LOG_FORMAT_ENV)
        .ok()
        .and_then(|s| LogFormat::from_str(&s).ok())
        .unwrap_or_default()
}

fn log_file_from_env() -> Option<PathBuf>
{
    env::var_os(LOG_FILE_ENV).filter(|value| !value.is_empty()).map(PathBuf::from)
}

/// Build the filter
///
/// Priority:
/// 1. An explicit level (from `--log-level`)
/// 2. `RUST_LOG`, when it parses
/// 3. `info`
fn build_filter(explicit_level: Option<Level>) -> EnvFilter
{
    if let Some(level) = explicit_level {
        return EnvFilter::new(level.to_string());
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()))
}

fn console_layer(format: LogFormat, filter: EnvFilter) -> BoxedLayer
{
    let layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(io::stderr);

    match format {
        LogFormat::Pretty => layer.with_ansi(true).with_filter(filter).boxed(),
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    }
}

fn file_layer(format: LogFormat, filter: EnvFilter, path: &Path) -> Result<(BoxedLayer, WorkerGuard), LoggingError>
{
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| LoggingError::InvalidPath(path.to_path_buf()))?;
    fs::create_dir_all(&directory)?;

    // The name already carries the date when it comes from a log directory.
    let appender = tracing_appender::rolling::never(&directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_ansi(false);

    let layer = match format {
        LogFormat::Pretty => layer.with_filter(filter).boxed(),
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    };
    Ok((layer, guard))
}

fn init(explicit_level: Option<Level>, format: LogFormat, log_file: Option<PathBuf>) -> Result<LoggingGuard, LoggingError>
{
    let mut layers = vec![console_layer(format, build_filter(explicit_level))];
    let mut worker = None;

    if let Some(path) = log_file {
        let (layer, guard) = file_layer(format, build_filter(explicit_level), &path)?;
        layers.push(layer);
        worker = Some(guard);
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;

    Ok(LoggingGuard { _worker: worker })
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}. Use 'error', 'warn', 'info', 'debug', or 'trace'")]
    InvalidLevel(String),

    /// Log file path without a file name
    #[error("Invalid log file path: {}", .0.display())]
    InvalidPath(PathBuf),

    /// A global subscriber was already installed
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
