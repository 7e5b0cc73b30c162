//! # machscope Utilities
//!
//! Shared utilities for the machscope workspace.
//!
//! Currently this is the logging setup built on `tracing`, used by the CLI and
//! available to any other front end that embeds `machscope-core`.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{
    init_logging, init_logging_to_dir, init_logging_with_level, LogFormat, LogLevel, LoggingError, LoggingGuard,
};
pub use tracing::{debug, error, info, trace, warn};
