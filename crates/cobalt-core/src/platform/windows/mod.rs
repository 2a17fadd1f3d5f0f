//! # Windows Debugging Implementation
//!
//! Live backend built on three Win32 API families:
//!
//! - **Debug API**: `CreateProcessW` with `DEBUG_ONLY_THIS_PROCESS`,
//!   `DebugActiveProcess`, `WaitForDebugEvent`, `ContinueDebugEvent`
//! - **dbghelp**: symbol sessions, type information and `StackWalk64`
//! - **toolhelp**: process, thread, module and heap snapshots
//!
//! x86 and x86-64 hosts are supported. On x86-64 a 32-bit target runs under
//! WOW64 and is inspected through the `Wow64*` context APIs.
//!
//! ## Dependencies
//!
//! - **windows-sys**: raw bindings for every call above
//!
//! ## References
//!
//! - [Debugging Functions](https://learn.microsoft.com/en-us/windows/win32/debug/debugging-functions)
//! - [DbgHelp Functions](https://learn.microsoft.com/en-us/windows/win32/debug/dbghelp-functions)
//! - [Tool Help Library](https://learn.microsoft.com/en-us/windows/win32/toolhelp/tool-help-library)

pub mod backend;
pub mod constants;
pub mod context;
pub mod dbghelp;
pub mod handle;
pub mod toolhelp;

pub use backend::WindowsBackend;
pub use dbghelp::DbgHelpProvider;
pub use toolhelp::ToolhelpProvider;

use crate::backend::Platform;
use crate::error::Result;

/// Assemble the live Win32 platform.
pub fn create_platform() -> Result<Platform>
{
    Ok(Platform {
        backend: Box::new(WindowsBackend::new()),
        symbols: Box::new(DbgHelpProvider::new()),
        snapshots: Box::new(ToolhelpProvider),
    })
}
