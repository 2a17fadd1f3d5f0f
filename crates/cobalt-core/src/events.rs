//! Debug event types.
//!
//! The backend translates each OS debug notification into a [`DebugEvent`].
//! The session classifies it, applies the exception policy and, when the
//! event is surfaced, renders it with [`DebugEvent::describe`].

use std::fmt;
use std::path::PathBuf;

use crate::types::{Address, ProcessId, ThreadId, WordSize};

/// How the target should treat an exception when it resumes
///
/// Every continuation carries exactly one disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition
{
    /// `DBG_CONTINUE`: the debugger dealt with the event
    Handled,
    /// `DBG_EXCEPTION_NOT_HANDLED`: let the target's own handlers (and the
    /// OS's first/second chance escalation) run
    Unhandled,
}

impl fmt::Display for Disposition
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(match self {
            Disposition::Handled => "handled",
            Disposition::Unhandled => "unhandled",
        })
    }
}

/// Event emitted by the debug backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugEvent
{
    /// Process that reported the event
    pub process: ProcessId,
    /// Thread that reported the event; the OS keeps it stopped until the
    /// event is continued
    pub thread: ThreadId,
    pub kind: DebugEventKind,
}

/// Variant-specific payload of a [`DebugEvent`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugEventKind
{
    Exception(ExceptionRecord),
    CreateThread
    {
        handle: u64,
        local_base: Address,
        start: Address,
    },
    CreateProcess
    {
        image: Option<PathBuf>,
        base: Address,
        process_handle: u64,
        thread_handle: u64,
        start: Address,
    },
    ExitThread
    {
        exit_code: u32,
    },
    ExitProcess
    {
        exit_code: u32,
    },
    LoadModule
    {
        image: Option<PathBuf>,
        base: Address,
    },
    UnloadModule
    {
        base: Address,
    },
    /// `OutputDebugString` from the target; the text still lives in target memory
    DebugString
    {
        address: Address,
        /// Length in characters, including the terminating NUL
        length: u16,
        unicode: bool,
    },
    /// System debugging error
    Rip
    {
        error: u32,
        kind: u32,
    },
}

impl DebugEventKind
{
    /// Windows event code name
    pub fn name(&self) -> &'static str
    {
        match self {
            Self::Exception(_) => "EXCEPTION_DEBUG_EVENT",
            Self::CreateThread { .. } => "CREATE_THREAD_DEBUG_EVENT",
            Self::CreateProcess { .. } => "CREATE_PROCESS_DEBUG_EVENT",
            Self::ExitThread { .. } => "EXIT_THREAD_DEBUG_EVENT",
            Self::ExitProcess { .. } => "EXIT_PROCESS_DEBUG_EVENT",
            Self::LoadModule { .. } => "LOAD_DLL_DEBUG_EVENT",
            Self::UnloadModule { .. } => "UNLOAD_DLL_DEBUG_EVENT",
            Self::DebugString { .. } => "OUTPUT_DEBUG_STRING_EVENT",
            Self::Rip { .. } => "RIP_EVENT",
        }
    }
}

impl DebugEvent
{
    /// Header line printed before every surfaced event.
    #[must_use]
    pub fn header(&self) -> String
    {
        format!("DebugEvent from process {} : thread {}>", self.process, self.thread)
    }

    /// Multi-line body describing the payload.
    ///
    /// Debug strings are described by the session instead, since their text
    /// has to be read from target memory first.
    #[must_use]
    pub fn describe(&self, word: WordSize) -> String
    {
        let hex = |addr: Address| format!("0x{}", addr.to_hex(word));
        match &self.kind {
            DebugEventKind::Exception(record) => record.describe(word),
            DebugEventKind::CreateThread {
                handle,
                local_base,
                start,
            } => format!(
                "CREATE_THREAD_DEBUG_INFO: \n    hThread:   {}\n    LocalBase: {}\n    StartAddr: {}",
                hex(Address::from(*handle)),
                hex(*local_base),
                hex(*start)
            ),
            DebugEventKind::CreateProcess {
                image,
                base,
                process_handle,
                thread_handle,
                start,
            } => format!(
                "CREATE_PROCESS_DEBUG_EVENT: \n    Image: {}\n    BaseAddr Of Image: {}\n    hProcess: {}, hThread: {}\n    StartAddr: {}",
                display_image(image.as_ref()),
                hex(*base),
                hex(Address::from(*process_handle)),
                hex(Address::from(*thread_handle)),
                hex(*start)
            ),
            DebugEventKind::ExitThread { exit_code } => {
                format!("EXIT_THREAD_DEBUG_EVENT: \n    ExitCode:   {}", *exit_code as i32)
            }
            DebugEventKind::ExitProcess { exit_code } => {
                format!("EXIT_PROCESS_DEBUG_EVENT: \n    ExitCode:   {}", *exit_code as i32)
            }
            DebugEventKind::LoadModule { image, base } => format!(
                "LOAD_DLL_DEBUG_INFO: \n    Image: {}\n    BaseAddr Of DLL: {}",
                display_image(image.as_ref()),
                hex(*base)
            ),
            DebugEventKind::UnloadModule { base } => {
                format!("UNLOAD_DLL_DEBUG_INFO: \n    BaseAddr Of DLL: {}", hex(*base))
            }
            DebugEventKind::DebugString { address, length, .. } => format!(
                "OUTPUT_DEBUG_STRING_INFO: \n    <{length} characters at {}>",
                hex(*address)
            ),
            DebugEventKind::Rip { error, kind } => format!("RIP_INFO: \n    dwError={error}, dwType={kind}"),
        }
    }
}

fn display_image(image: Option<&PathBuf>) -> String
{
    image.map_or_else(|| "??".to_string(), |path| path.display().to_string())
}

/// Exception payload of a debug event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionRecord
{
    /// Raw `NTSTATUS` exception code
    pub code: u32,
    /// Faulting instruction address
    pub address: Address,
    /// `true` on the first notification, `false` on the last-chance one
    pub first_chance: bool,
    /// `ExceptionInformation` parameters
    pub parameters: Vec<u64>,
}

impl ExceptionRecord
{
    pub fn kind(&self) -> ExceptionKind
    {
        ExceptionKind::from_code(self.code)
    }

    /// Access kind and faulting data address for access violations and
    /// in-page errors.
    pub fn access(&self) -> Option<(AccessKind, Address)>
    {
        match self.kind() {
            ExceptionKind::AccessViolation | ExceptionKind::InPageError => {
                let kind = AccessKind::from_raw(*self.parameters.first()?);
                let address = Address::from(*self.parameters.get(1)?);
                Some((kind, address))
            }
            _ => None,
        }
    }

    /// Operator-facing description of the exception.
    #[must_use]
    pub fn describe(&self, word: WordSize) -> String
    {
        let mut text = format!(
            "Exception {} (0x{:08X}) {} chance at 0x{}",
            self.kind().name(),
            self.code,
            if self.first_chance { "first" } else { "second" },
            self.address.to_hex(word)
        );
        if let Some((access, address)) = self.access() {
            text.push_str(&format!("\n    Attempt to {access} address 0x{}", address.to_hex(word)));
        }
        text
    }
}

/// Kind of memory access that faulted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind
{
    Read,
    Write,
    /// Data execution prevention
    Execute,
}

impl AccessKind
{
    /// Decode `ExceptionInformation[0]`.
    pub const fn from_raw(raw: u64) -> Self
    {
        match raw {
            1 => AccessKind::Write,
            8 => AccessKind::Execute,
            _ => AccessKind::Read,
        }
    }
}

impl fmt::Display for AccessKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(match self {
            AccessKind::Read => "read from",
            AccessKind::Write => "write to",
            AccessKind::Execute => "execute",
        })
    }
}

/// Exception codes the session knows by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind
{
    AccessViolation,
    Breakpoint,
    DatatypeMisalignment,
    SingleStep,
    ControlC,
    ControlBreak,
    ArrayBoundsExceeded,
    FloatDenormalOperand,
    FloatDivideByZero,
    FloatInexactResult,
    FloatInvalidOperation,
    FloatOverflow,
    FloatStackCheck,
    FloatUnderflow,
    IllegalInstruction,
    InPageError,
    IntegerDivideByZero,
    IntegerOverflow,
    InvalidDisposition,
    NoncontinuableException,
    PrivilegedInstruction,
    StackOverflow,
    GuardPage,
    InvalidHandle,
    /// Breakpoint raised by a 32-bit process running under WOW64
    Wow64Breakpoint,
    /// Single step in a 32-bit process running under WOW64
    Wow64SingleStep,
    Other(u32),
}

impl ExceptionKind
{
    const TABLE: [(u32, ExceptionKind, &'static str); 26] = [
        (0xC000_0005, ExceptionKind::AccessViolation, "EXCEPTION_ACCESS_VIOLATION"),
        (0x8000_0003, ExceptionKind::Breakpoint, "EXCEPTION_BREAKPOINT"),
        (0x8000_0002, ExceptionKind::DatatypeMisalignment, "EXCEPTION_DATATYPE_MISALIGNMENT"),
        (0x8000_0004, ExceptionKind::SingleStep, "EXCEPTION_SINGLE_STEP"),
        (0x4001_0005, ExceptionKind::ControlC, "DBG_CONTROL_C"),
        (0x4001_0008, ExceptionKind::ControlBreak, "DBG_CONTROL_BREAK"),
        (0xC000_008C, ExceptionKind::ArrayBoundsExceeded, "EXCEPTION_ARRAY_BOUNDS_EXCEEDED"),
        (0xC000_008D, ExceptionKind::FloatDenormalOperand, "EXCEPTION_FLT_DENORMAL_OPERAND"),
        (0xC000_008E, ExceptionKind::FloatDivideByZero, "EXCEPTION_FLT_DIVIDE_BY_ZERO"),
        (0xC000_008F, ExceptionKind::FloatInexactResult, "EXCEPTION_FLT_INEXACT_RESULT"),
        (0xC000_0090, ExceptionKind::FloatInvalidOperation, "EXCEPTION_FLT_INVALID_OPERATION"),
        (0xC000_0091, ExceptionKind::FloatOverflow, "EXCEPTION_FLT_OVERFLOW"),
        (0xC000_0092, ExceptionKind::FloatStackCheck, "EXCEPTION_FLT_STACK_CHECK"),
        (0xC000_0093, ExceptionKind::FloatUnderflow, "EXCEPTION_FLT_UNDERFLOW"),
        (0xC000_001D, ExceptionKind::IllegalInstruction, "EXCEPTION_ILLEGAL_INSTRUCTION"),
        (0xC000_0006, ExceptionKind::InPageError, "EXCEPTION_IN_PAGE_ERROR"),
        (0xC000_0094, ExceptionKind::IntegerDivideByZero, "EXCEPTION_INT_DIVIDE_BY_ZERO"),
        (0xC000_0095, ExceptionKind::IntegerOverflow, "EXCEPTION_INT_OVERFLOW"),
        (0xC000_0026, ExceptionKind::InvalidDisposition, "EXCEPTION_INVALID_DISPOSITION"),
        (0xC000_0025, ExceptionKind::NoncontinuableException, "EXCEPTION_NONCONTINUABLE_EXCEPTION"),
        (0xC000_0096, ExceptionKind::PrivilegedInstruction, "EXCEPTION_PRIV_INSTRUCTION"),
        (0xC000_00FD, ExceptionKind::StackOverflow, "EXCEPTION_STACK_OVERFLOW"),
        (0x8000_0001, ExceptionKind::GuardPage, "EXCEPTION_GUARD_PAGE"),
        (0xC000_0008, ExceptionKind::InvalidHandle, "EXCEPTION_INVALID_HANDLE"),
        (0x4000_001F, ExceptionKind::Wow64Breakpoint, "STATUS_WX86_BREAKPOINT"),
        (0x4000_001E, ExceptionKind::Wow64SingleStep, "STATUS_WX86_SINGLE_STEP"),
    ];

    pub fn from_code(code: u32) -> Self
    {
        Self::TABLE
            .iter()
            .find(|(raw, _, _)| *raw == code)
            .map_or(ExceptionKind::Other(code), |(_, kind, _)| *kind)
    }

    /// Symbolic exception name
    pub fn name(self) -> &'static str
    {
        Self::TABLE
            .iter()
            .find(|(_, kind, _)| *kind == self)
            .map_or("UNKNOWN_EXCEPTION", |(_, _, name)| *name)
    }

    /// Exceptions that are passed straight back to the target on first
    /// chance unless the operator asked to catch them.
    ///
    /// Besides access violations, breakpoints, misalignment and Ctrl+Break,
    /// the set holds the WOW64 breakpoint, which is how a breakpoint reaches
    /// the debugger from a 32-bit target on a 64-bit OS, and Ctrl+C, the
    /// console signal that travels the same way as Ctrl+Break.
    pub const fn defers_to_target(self) -> bool
    {
        matches!(
            self,
            ExceptionKind::AccessViolation
                | ExceptionKind::Breakpoint
                | ExceptionKind::Wow64Breakpoint
                | ExceptionKind::DatatypeMisalignment
                | ExceptionKind::ControlC
                | ExceptionKind::ControlBreak
        )
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_exception_kind_round_trips_names()
    {
        assert_eq!(ExceptionKind::from_code(0xC000_0005), ExceptionKind::AccessViolation);
        assert_eq!(ExceptionKind::AccessViolation.name(), "EXCEPTION_ACCESS_VIOLATION");
        assert_eq!(ExceptionKind::from_code(0x1234), ExceptionKind::Other(0x1234));
        assert_eq!(ExceptionKind::Other(0x1234).name(), "UNKNOWN_EXCEPTION");
    }

    #[test]
    fn test_first_chance_policy_class()
    {
        assert!(!ExceptionKind::SingleStep.defers_to_target());
        assert!(ExceptionKind::Breakpoint.defers_to_target());
        assert!(ExceptionKind::ControlBreak.defers_to_target());
        assert!(ExceptionKind::ControlC.defers_to_target());
        assert!(ExceptionKind::Wow64Breakpoint.defers_to_target());
        assert!(ExceptionKind::DatatypeMisalignment.defers_to_target());
        assert!(!ExceptionKind::StackOverflow.defers_to_target());
    }

    #[test]
    fn test_access_violation_description()
    {
        let record = ExceptionRecord {
            code: 0xC000_0005,
            address: Address::from(0x0040_1000),
            first_chance: true,
            parameters: vec![1, 0xDEAD_BEEF],
        };
        assert_eq!(record.access(), Some((AccessKind::Write, Address::from(0xDEAD_BEEF))));
        assert_eq!(
            record.describe(WordSize::Bits32),
            "Exception EXCEPTION_ACCESS_VIOLATION (0xC0000005) first chance at 0x00401000\n    Attempt to write to address 0xDEADBEEF"
        );
    }

    #[test]
    fn test_breakpoint_has_no_access_line()
    {
        let record = ExceptionRecord {
            code: 0x8000_0003,
            address: Address::from(0x77C1_0000),
            first_chance: false,
            parameters: vec![0],
        };
        assert!(record.access().is_none());
        assert!(record.describe(WordSize::Bits32).ends_with("second chance at 0x77C10000"));
    }

    #[test]
    fn test_event_header()
    {
        let event = DebugEvent {
            process: ProcessId(100),
            thread: ThreadId(200),
            kind: DebugEventKind::ExitProcess { exit_code: 0 },
        };
        assert_eq!(event.header(), "DebugEvent from process 100 : thread 200>");
        assert_eq!(event.kind.name(), "EXIT_PROCESS_DEBUG_EVENT");
    }
}
