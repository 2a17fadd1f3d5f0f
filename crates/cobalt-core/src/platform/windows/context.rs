//! # Thread Contexts
//!
//! Captures `CONTEXT` records and translates them into [`ThreadContext`].
//!
//! A 32-bit target on a 64-bit host runs under WOW64; its registers come
//! from `Wow64GetThreadContext` as a `WOW64_CONTEXT`, which has the x86
//! layout. The native record is kept around for `StackWalk64`, which updates
//! it in place frame by frame.

use std::ffi::c_void;

use windows_sys::Win32::Foundation::HANDLE;
#[cfg(target_arch = "x86_64")]
use windows_sys::Win32::System::Diagnostics::Debug::{Wow64GetThreadContext, WOW64_CONTEXT};
use windows_sys::Win32::System::Diagnostics::Debug::{GetThreadContext, CONTEXT};

use super::constants;
use crate::error::{DebuggerError, Result};
use crate::types::{Address, ContextParts, Register, ThreadContext, WordSize};

/// x86 layout shared by the native 32-bit `CONTEXT` and `WOW64_CONTEXT`.
macro_rules! x86_context {
    ($context:expr, $parts:expr) => {{
        let c = $context;
        let parts: ContextParts = $parts;
        let mut context = ThreadContext::control(
            WordSize::Bits32,
            Address::from(u64::from(c.Eip)),
            Address::from(u64::from(c.Esp)),
            Address::from(u64::from(c.Ebp)),
        );
        context.parts = parts | ContextParts::CONTROL;
        context.flags = u64::from(c.EFlags);
        if parts.contains(ContextParts::INTEGER) {
            context.integer = vec![
                Register::new("EAX", u64::from(c.Eax)),
                Register::new("EBX", u64::from(c.Ebx)),
                Register::new("ECX", u64::from(c.Ecx)),
                Register::new("EDX", u64::from(c.Edx)),
                Register::new("ESI", u64::from(c.Esi)),
                Register::new("EDI", u64::from(c.Edi)),
            ];
        }
        if parts.contains(ContextParts::SEGMENTS) {
            context.segments = vec![
                Register::new("CS", u64::from(c.SegCs)),
                Register::new("DS", u64::from(c.SegDs)),
                Register::new("ES", u64::from(c.SegEs)),
                Register::new("FS", u64::from(c.SegFs)),
                Register::new("GS", u64::from(c.SegGs)),
                Register::new("SS", u64::from(c.SegSs)),
            ];
        }
        if parts.contains(ContextParts::DEBUG_REGISTERS) {
            context.debug = vec![
                Register::new("DR0", u64::from(c.Dr0)),
                Register::new("DR1", u64::from(c.Dr1)),
                Register::new("DR2", u64::from(c.Dr2)),
                Register::new("DR3", u64::from(c.Dr3)),
                Register::new("DR6", u64::from(c.Dr6)),
                Register::new("DR7", u64::from(c.Dr7)),
            ];
        }
        context
    }};
}

/// Raw register record of one thread
pub enum NativeContext
{
    Native(Box<CONTEXT>),
    #[cfg(target_arch = "x86_64")]
    Wow64(Box<WOW64_CONTEXT>),
}

impl NativeContext
{
    /// Capture the requested subsets of `thread`'s registers.
    ///
    /// ## Errors
    ///
    /// - `Os`: `GetThreadContext` / `Wow64GetThreadContext` failed
    pub fn capture(thread: HANDLE, wow64: bool, parts: ContextParts) -> Result<Self>
    {
        #[cfg(target_arch = "x86_64")]
        {
            if wow64 {
                let mut context: Box<WOW64_CONTEXT> = Box::new(unsafe { std::mem::zeroed() });
                context.ContextFlags = wow64_flags(parts);
                if unsafe { Wow64GetThreadContext(thread, &mut *context) } == 0 {
                    return Err(DebuggerError::last_os_error("Wow64GetThreadContext"));
                }
                return Ok(NativeContext::Wow64(context));
            }
        }
        #[cfg(not(target_arch = "x86_64"))]
        let _ = wow64;

        let mut context: Box<CONTEXT> = Box::new(unsafe { std::mem::zeroed() });
        context.ContextFlags = native_flags(parts);
        if unsafe { GetThreadContext(thread, &mut *context) } == 0 {
            return Err(DebuggerError::last_os_error("GetThreadContext"));
        }
        Ok(NativeContext::Native(context))
    }

    /// Capture everything `StackWalk64` needs.
    pub fn capture_full(thread: HANDLE, wow64: bool) -> Result<Self>
    {
        Self::capture(thread, wow64, ContextParts::CONTROL | ContextParts::INTEGER | ContextParts::SEGMENTS)
    }

    /// Pointer handed to `StackWalk64` as its context record.
    pub fn as_mut_ptr(&mut self) -> *mut c_void
    {
        match self {
            NativeContext::Native(context) => (&mut **context as *mut CONTEXT).cast(),
            #[cfg(target_arch = "x86_64")]
            NativeContext::Wow64(context) => (&mut **context as *mut WOW64_CONTEXT).cast(),
        }
    }

    /// Translate into the platform-agnostic register snapshot.
    pub fn to_thread_context(&self, parts: ContextParts) -> ThreadContext
    {
        match self {
            #[cfg(target_arch = "x86_64")]
            NativeContext::Native(context) => amd64_context(context, parts),
            #[cfg(target_arch = "x86")]
            NativeContext::Native(context) => x86_context!(context, parts),
            #[cfg(target_arch = "x86_64")]
            NativeContext::Wow64(context) => x86_context!(context, parts),
        }
    }
}

fn native_flags(parts: ContextParts) -> u32
{
    let mut flags = constants::CONTEXT_CONTROL;
    if parts.contains(ContextParts::INTEGER) {
        flags |= constants::CONTEXT_INTEGER;
    }
    if parts.contains(ContextParts::SEGMENTS) {
        flags |= constants::CONTEXT_SEGMENTS;
    }
    if parts.contains(ContextParts::DEBUG_REGISTERS) {
        flags |= constants::CONTEXT_DEBUG_REGISTERS;
    }
    flags
}

#[cfg(target_arch = "x86_64")]
fn wow64_flags(parts: ContextParts) -> u32
{
    let mut flags = constants::WOW64_CONTEXT_CONTROL;
    if parts.contains(ContextParts::INTEGER) {
        flags |= constants::WOW64_CONTEXT_INTEGER;
    }
    if parts.contains(ContextParts::SEGMENTS) {
        flags |= constants::WOW64_CONTEXT_SEGMENTS;
    }
    if parts.contains(ContextParts::DEBUG_REGISTERS) {
        flags |= constants::WOW64_CONTEXT_DEBUG_REGISTERS;
    }
    flags
}

#[cfg(target_arch = "x86_64")]
fn amd64_context(c: &CONTEXT, parts: ContextParts) -> ThreadContext
{
    let mut context = ThreadContext::control(
        WordSize::Bits64,
        Address::from(c.Rip),
        Address::from(c.Rsp),
        Address::from(c.Rbp),
    );
    context.parts = parts | ContextParts::CONTROL;
    context.flags = u64::from(c.EFlags);
    if parts.contains(ContextParts::INTEGER) {
        context.integer = vec![
            Register::new("RAX", c.Rax),
            Register::new("RBX", c.Rbx),
            Register::new("RCX", c.Rcx),
            Register::new("RDX", c.Rdx),
            Register::new("RSI", c.Rsi),
            Register::new("RDI", c.Rdi),
            Register::new("R8", c.R8),
            Register::new("R9", c.R9),
            Register::new("R10", c.R10),
            Register::new("R11", c.R11),
            Register::new("R12", c.R12),
            Register::new("R13", c.R13),
            Register::new("R14", c.R14),
            Register::new("R15", c.R15),
        ];
    }
    if parts.contains(ContextParts::SEGMENTS) {
        context.segments = vec![
            Register::new("CS", u64::from(c.SegCs)),
            Register::new("DS", u64::from(c.SegDs)),
            Register::new("ES", u64::from(c.SegEs)),
            Register::new("FS", u64::from(c.SegFs)),
            Register::new("GS", u64::from(c.SegGs)),
            Register::new("SS", u64::from(c.SegSs)),
        ];
    }
    if parts.contains(ContextParts::DEBUG_REGISTERS) {
        context.debug = vec![
            Register::new("DR0", c.Dr0),
            Register::new("DR1", c.Dr1),
            Register::new("DR2", c.Dr2),
            Register::new("DR3", c.Dr3),
            Register::new("DR6", c.Dr6),
            Register::new("DR7", c.Dr7),
        ];
    }
    context
}
