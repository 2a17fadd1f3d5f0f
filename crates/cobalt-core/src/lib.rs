//! # cobalt-core
//!
//! Debugger engine for Cobalt: an interactive, command-driven debugger for
//! native Windows processes.
//!
//! This crate provides:
//! - The debug session state machine and its exception policy ([`session`])
//! - A memoized type model that formats raw target memory ([`typemodel`])
//! - Variable address resolution ([`variables`])
//! - Stack unwinding and frame description ([`unwind`])
//! - Process, thread, module and heap snapshots ([`snapshot`])
//!
//! The OS is reached only through the traits in [`backend`], [`symbols`] and
//! [`snapshot`], so everything above them runs (and is tested) on any host.
//!
//! ## Platform Support
//!
//! - **Windows (x86, x86-64)**: Win32 debug API, dbghelp and toolhelp
//! - **Everything else**: the engine builds, [`create_backend`] reports
//!   the platform as unsupported
//!
//! ## Why unsafe code is needed
//!
//! The Windows backend calls the debug, dbghelp and toolhelp APIs, which
//! read and control another process. Those calls are wrapped in safe types
//! inside [`platform`]; nothing outside it uses `unsafe`.

#![allow(unsafe_code)] // Required for the Win32 debug API

pub mod backend;
pub mod console;
pub mod error;
pub mod events;
pub mod image;
pub mod platform;
pub mod session;
pub mod snapshot;
pub mod symbols;
pub mod typemodel;
pub mod types;
pub mod unwind;
pub mod variables;

pub use backend::{create_backend, DebugBackend, MemoryAccess, Platform};
pub use console::{Console, ConsoleColor};
// Re-export commonly used types
pub use error::{DebuggerError, Result};
pub use events::{DebugEvent, DebugEventKind, Disposition};
pub use session::{DebugSession, SessionOptions, SessionState};
pub use types::{Address, ProcessId, ThreadId};
