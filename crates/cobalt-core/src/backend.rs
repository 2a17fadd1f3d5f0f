//! # Debug Backend
//!
//! The process-control, debug-event, memory and register interface a
//! platform has to provide.
//!
//! The session never talks to the OS directly. It drives a
//! [`DebugBackend`] the same way on every platform, which also lets the
//! test-suite script a whole debugging session without a live target.
//!
//! ## Platform support
//!
//! - **Windows (x86, x86-64)**: Win32 debugging API (`CreateProcessW` with
//!   `DEBUG_ONLY_THIS_PROCESS`, `WaitForDebugEvent`, `ContinueDebugEvent`)
//! - **Everything else**: [`create_backend`] reports
//!   [`DebuggerError::Unsupported`]

use crate::error::{DebuggerError, Result};
use crate::events::{DebugEvent, Disposition};
use crate::snapshot::SnapshotProvider;
use crate::symbols::SymbolProvider;
use crate::types::{Address, ContextParts, ProcessId, ThreadContext, ThreadId, WordSize};

/// Cross-process memory reads
///
/// Failures are per call and never fatal: callers decide whether to fall
/// back to smaller reads or render a placeholder.
pub trait MemoryAccess
{
    /// Read exactly `len` bytes starting at `address`.
    ///
    /// ## Errors
    ///
    /// - `MemoryRead`: part of the range is not mapped or not readable
    /// - `NotAttached`: no target process
    fn read_memory(&self, address: Address, len: usize) -> Result<Vec<u8>>;

    /// Read a little-endian `u32`.
    fn read_u32(&self, address: Address) -> Result<u32>
    {
        let bytes = self.read_memory(address, 4)?;
        bytes
            .as_slice()
            .try_into()
            .map(u32::from_le_bytes)
            .map_err(|_| DebuggerError::MemoryRead { address: address.value(), len: 4 })
    }

    /// Read a little-endian `u64`.
    fn read_u64(&self, address: Address) -> Result<u64>
    {
        let bytes = self.read_memory(address, 8)?;
        bytes
            .as_slice()
            .try_into()
            .map(u64::from_le_bytes)
            .map_err(|_| DebuggerError::MemoryRead { address: address.value(), len: 8 })
    }
}

/// Process control and debug-event interface
///
/// ## Lifecycle
///
/// 1. `launch(program, args)` or `attach(pid)`
/// 2. Loop: `wait_for_event()`, inspect, `continue_event(..)`
/// 3. `detach(pending)` or `kill(pending)`, or the target exits on its own
///
/// The OS keeps the reporting thread stopped between `wait_for_event` and
/// `continue_event`, so every register or memory query made in between sees
/// a consistent target.
pub trait DebugBackend: MemoryAccess
{
    /// Create `program` as a new process under this debugger.
    ///
    /// `args` is the raw parameter string appended to the quoted program
    /// path. The first event the target reports is the process-created event.
    ///
    /// ## Errors
    ///
    /// - `Os`: the OS refused to create the process
    fn launch(&mut self, program: &str, args: &str) -> Result<ProcessId>;

    /// Attach to a running process.
    ///
    /// ## Errors
    ///
    /// - `ProcessNotFound`: no process with this id
    /// - `Os`: the OS refused to attach
    fn attach(&mut self, pid: ProcessId) -> Result<()>;

    /// Stop debugging and let the target run on.
    ///
    /// An outstanding event is continued first, otherwise the reporting
    /// thread would stay frozen after the debugger goes away.
    fn detach(&mut self, pending: Option<&DebugEvent>) -> Result<()>;

    /// Terminate the target and consume its remaining events.
    fn kill(&mut self, pending: Option<&DebugEvent>) -> Result<()>;

    /// Block until the target reports the next event.
    ///
    /// This is the only place the engine suspends. There is no timeout.
    ///
    /// ## Errors
    ///
    /// - `WaitFailed`: no further events can be received
    fn wait_for_event(&mut self) -> Result<DebugEvent>;

    /// Resume the thread that reported an event.
    fn continue_event(&mut self, pid: ProcessId, tid: ThreadId, disposition: Disposition) -> Result<()>;

    /// Capture the requested register subsets of a stopped thread.
    fn thread_context(&self, tid: ThreadId, parts: ContextParts) -> Result<ThreadContext>;

    /// Pointer width of the current target.
    fn word_size(&self) -> WordSize;
}

/// The three OS collaborators the session is assembled from
pub struct Platform
{
    pub backend: Box<dyn DebugBackend>,
    pub symbols: Box<dyn SymbolProvider>,
    pub snapshots: Box<dyn SnapshotProvider>,
}

/// Create the live platform for the build target.
///
/// ## Errors
///
/// - `Unsupported`: this build target has no live backend
#[cfg(all(windows, any(target_arch = "x86", target_arch = "x86_64")))]
pub fn create_backend() -> Result<Platform>
{
    crate::platform::windows::create_platform()
}

/// Create the live platform for the build target.
///
/// ## Errors
///
/// - `Unsupported`: this build target has no live backend
#[cfg(not(all(windows, any(target_arch = "x86", target_arch = "x86_64"))))]
pub fn create_backend() -> Result<Platform>
{
    Err(DebuggerError::Unsupported("live debugging requires Windows on x86 or x86-64"))
}
