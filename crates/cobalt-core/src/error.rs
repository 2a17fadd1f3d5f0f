//! # Error Types
//!
//! General error handling for the debugger engine.
//!
//! We use `thiserror` to generate the `Error` trait implementations and the
//! operator-facing messages.
//!
//! ## Error Categories
//!
//! 1. **Fatal**: `LaunchFailed`, `WaitFailed` end the current target or the event loop
//! 2. **Operation failures**: `Os`, `MemoryRead`, `Symbol` are reported and the command returns
//! 3. **State errors**: `NotAttached`, `NoPendingEvent`
//! 4. **Platform**: `Unsupported` when no live backend exists for the build target
//!
//! Partial-data failures (one array element, one struct member, one stack
//! frame) never surface here; the formatters render them inline as `??`.

use std::io;
use std::panic::Location;

use thiserror::Error;

use crate::types::ProcessId;

/// Main error type for debugger operations
#[derive(Error, Debug)]
pub enum DebuggerError
{
    /// The OS refused to create or attach to the target process
    ///
    /// This ends the `run` / `attach` command; the session stays in `NoTarget`.
    #[error("Failed to start debugging: {0}")]
    LaunchFailed(Box<DebuggerError>),

    /// Operation requires a live target
    #[error("No target process")]
    NotAttached,

    /// A continuation was requested while no debug event is outstanding
    #[error("No pending debug event to continue")]
    NoPendingEvent,

    /// The blocking wait for the next debug event failed
    ///
    /// The event loop treats this as fatal and drops back to the command prompt.
    #[error("Waiting for debug events failed: {0}")]
    WaitFailed(Box<DebuggerError>),

    /// An OS call failed
    ///
    /// Carries the failing operation's name, the source location that issued
    /// the call and the OS error (whose display includes the numeric code).
    #[error("{operation} at {}:{}: {source}", location.file(), location.line())]
    Os
    {
        /// Name of the failing OS operation (e.g. `CreateProcessW`)
        operation: &'static str,
        /// Source location that issued the call
        location: &'static Location<'static>,
        /// OS error text and code
        source: io::Error,
    },

    /// Target memory could not be read
    #[error("Cannot read {len} bytes at 0x{address:X}")]
    MemoryRead
    {
        /// Start of the failed read
        address: u64,
        /// Requested length
        len: usize,
    },

    /// A symbol provider lookup failed
    #[error("Symbol lookup failed: {0}")]
    Symbol(String),

    /// The process with the given PID doesn't exist
    #[error("Process not found: PID {0}")]
    ProcessNotFound(ProcessId),

    /// Invalid argument passed to a debugger function
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No live backend exists for this build target
    #[error("Unsupported on this platform: {0}")]
    Unsupported(&'static str),

    /// I/O error (source files, image files)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl DebuggerError
{
    /// Build an [`DebuggerError::Os`] from the calling thread's last OS error.
    ///
    /// The caller's source location is recorded, so call this directly at the
    /// failing OS call site.
    #[track_caller]
    #[must_use]
    pub fn last_os_error(operation: &'static str) -> Self
    {
        Self::os(operation, io::Error::last_os_error())
    }

    /// Build an [`DebuggerError::Os`] from an explicit OS error.
    #[track_caller]
    #[must_use]
    pub fn os(operation: &'static str, source: io::Error) -> Self
    {
        Self::Os {
            operation,
            location: Location::caller(),
            source,
        }
    }

    /// Whether this error ends the current target or event loop.
    #[must_use]
    pub fn is_fatal(&self) -> bool
    {
        matches!(self, Self::LaunchFailed(_) | Self::WaitFailed(_))
    }
}

/// Convenience type alias for `Result<T, DebuggerError>`
///
/// ```rust
/// use cobalt_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, DebuggerError>;
