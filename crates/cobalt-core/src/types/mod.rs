//! # Types
//!
//! Platform-agnostic types used throughout the debugger.
//!
//! These types keep the engine independent of the Windows API structures:
//! the backend translates `DEBUG_EVENT`, `CONTEXT`, `SYMBOL_INFO` and the
//! toolhelp records into these before anything else sees them.

pub mod address;
pub mod process;
pub mod registers;
pub mod snapshot;
pub mod symbols;

// Re-export all public types
pub use address::{Address, WordSize};
pub use process::{Architecture, ProcessId, ThreadId};
pub use registers::{ContextParts, Register, ThreadContext};
pub use snapshot::{BlockKind, HeapBlock, HeapInfo, HeapKind, HeapListEntry, ModuleInfo, ProcessInfo, ThreadInfo};
pub use symbols::{
    ModuleLoad, SourceLine, Storage, SymbolFlags, SymbolFormat, SymbolHit, SymbolScope, VariableSymbol,
};
