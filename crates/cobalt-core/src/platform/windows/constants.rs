//! # Windows Platform Constants
//!
//! Values the backend passes to dbghelp and the thread-context APIs.
//!
//! ## Organization
//!
//! - Thread context flags, per architecture
//! - dbghelp symbol options
//! - `SymGetTypeInfo` request kinds
//! - `VARIANT` tags returned for enumerator values
//! - Machine types for `StackWalk64`

// ============================================================================
// Thread Context Flags
// ============================================================================

#[cfg(target_arch = "x86_64")]
pub const CONTEXT_CONTROL: u32 = 0x0010_0001;
#[cfg(target_arch = "x86_64")]
pub const CONTEXT_INTEGER: u32 = 0x0010_0002;
#[cfg(target_arch = "x86_64")]
pub const CONTEXT_SEGMENTS: u32 = 0x0010_0004;
#[cfg(target_arch = "x86_64")]
pub const CONTEXT_DEBUG_REGISTERS: u32 = 0x0010_0010;
/// Control, integer and floating point; what `StackWalk64` needs
#[cfg(target_arch = "x86_64")]
pub const CONTEXT_FULL: u32 = 0x0010_000B;

#[cfg(target_arch = "x86")]
pub const CONTEXT_CONTROL: u32 = 0x0001_0001;
#[cfg(target_arch = "x86")]
pub const CONTEXT_INTEGER: u32 = 0x0001_0002;
#[cfg(target_arch = "x86")]
pub const CONTEXT_SEGMENTS: u32 = 0x0001_0004;
#[cfg(target_arch = "x86")]
pub const CONTEXT_DEBUG_REGISTERS: u32 = 0x0001_0010;
/// Control, integer and segments; what `StackWalk64` needs
#[cfg(target_arch = "x86")]
pub const CONTEXT_FULL: u32 = 0x0001_0007;

/// `WOW64_CONTEXT` flags for 32-bit targets on a 64-bit host
#[cfg(target_arch = "x86_64")]
pub const WOW64_CONTEXT_CONTROL: u32 = 0x0001_0001;
#[cfg(target_arch = "x86_64")]
pub const WOW64_CONTEXT_INTEGER: u32 = 0x0001_0002;
#[cfg(target_arch = "x86_64")]
pub const WOW64_CONTEXT_SEGMENTS: u32 = 0x0001_0004;
#[cfg(target_arch = "x86_64")]
pub const WOW64_CONTEXT_DEBUG_REGISTERS: u32 = 0x0001_0010;
#[cfg(target_arch = "x86_64")]
pub const WOW64_CONTEXT_FULL: u32 = 0x0001_0007;

// ============================================================================
// dbghelp Options
// ============================================================================

pub const SYMOPT_UNDNAME: u32 = 0x0000_0002;
pub const SYMOPT_DEFERRED_LOADS: u32 = 0x0000_0004;
pub const SYMOPT_LOAD_LINES: u32 = 0x0000_0010;
pub const SYMOPT_FAIL_CRITICAL_ERRORS: u32 = 0x0000_0200;

/// Options every symbol session starts with
pub const SYMBOL_OPTIONS: u32 = SYMOPT_UNDNAME | SYMOPT_DEFERRED_LOADS | SYMOPT_LOAD_LINES | SYMOPT_FAIL_CRITICAL_ERRORS;

/// Room for a symbol name after `SYMBOL_INFOW`, in UTF-16 units
pub const MAX_SYM_NAME: usize = 2000;

// ============================================================================
// SymGetTypeInfo Requests (IMAGEHLP_SYMBOL_TYPE_INFO)
// ============================================================================

pub const TI_GET_SYMTAG: i32 = 0;
pub const TI_GET_SYMNAME: i32 = 1;
pub const TI_GET_LENGTH: i32 = 2;
pub const TI_GET_TYPEID: i32 = 4;
pub const TI_GET_BASETYPE: i32 = 5;
pub const TI_FINDCHILDREN: i32 = 7;
pub const TI_GET_OFFSET: i32 = 10;
pub const TI_GET_VALUE: i32 = 11;
pub const TI_GET_COUNT: i32 = 12;
pub const TI_GET_CHILDRENCOUNT: i32 = 13;
pub const TI_GET_IS_REFERENCE: i32 = 31;

// ============================================================================
// VARIANT Tags
// ============================================================================

pub const VT_I2: u16 = 2;
pub const VT_I4: u16 = 3;
pub const VT_BOOL: u16 = 11;
pub const VT_I1: u16 = 16;
pub const VT_UI1: u16 = 17;
pub const VT_UI2: u16 = 18;
pub const VT_UI4: u16 = 19;
pub const VT_I8: u16 = 20;
pub const VT_UI8: u16 = 21;
pub const VT_INT: u16 = 22;
pub const VT_UINT: u16 = 23;

/// Byte offset of the payload inside a `VARIANT`
pub const VARIANT_DATA_OFFSET: usize = 8;

// ============================================================================
// Machine Types
// ============================================================================

pub const IMAGE_FILE_MACHINE_I386: u32 = 0x014C;
pub const IMAGE_FILE_MACHINE_AMD64: u32 = 0x8664;

/// Exit code given to a target killed by `stop`
pub const KILL_EXIT_CODE: u32 = 0xFFFF_FFFF;

/// How long `kill` waits for each remaining event of a terminated target, in ms
pub const DRAIN_TIMEOUT_MS: u32 = 5000;
