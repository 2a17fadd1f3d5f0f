//! # Cobalt Utilities
//!
//! Helpers shared across the Cobalt workspace:
//!
//! - [`logging`]: `tracing` subscriber setup driven by the environment and CLI flags
//! - [`cmdline`]: the operator command-line tokenizer and number parsing

pub mod cmdline;
pub mod logging;

pub use cmdline::{parse_command_line, parse_hex, parse_number, CommandLine, Invocation};
pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig, LoggingError, LoggingGuard};
pub use tracing::{debug, error, info, trace, warn};
