//! # Platform-Specific Implementations
//!
//! Live implementations of the [`DebugBackend`](crate::backend::DebugBackend),
//! [`SymbolProvider`](crate::symbols::SymbolProvider) and
//! [`SnapshotProvider`](crate::snapshot::SnapshotProvider) traits.
//!
//! - **Windows (x86, x86-64)**: Win32 debug API, dbghelp and toolhelp
//!   - See: [Windows Debugging API](https://learn.microsoft.com/en-us/windows/win32/debug/debugging-functions)
//!
//! Only the current platform's module is compiled. Everything outside this
//! module is platform-agnostic.

#[cfg(all(windows, any(target_arch = "x86", target_arch = "x86_64")))]
pub mod windows;
