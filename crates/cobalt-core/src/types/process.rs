//! Process and thread identifiers, machine architecture.

use std::fmt;

/// Process identifier (PID)
///
/// Windows process ids are 32-bit values handed out by the kernel. The
/// newtype keeps them from being mixed up with thread ids, which share the
/// same numeric space.
///
/// ## Example
///
/// ```rust
/// use cobalt_core::types::ProcessId;
///
/// let pid = ProcessId::from(4242);
/// assert_eq!(u32::from(pid), 4242);
/// assert_eq!(pid.to_string(), "4242");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub u32);

impl From<u32> for ProcessId
{
    fn from(pid: u32) -> Self
    {
        ProcessId(pid)
    }
}

impl From<ProcessId> for u32
{
    fn from(pid: ProcessId) -> Self
    {
        pid.0
    }
}

impl fmt::Display for ProcessId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

/// Thread identifier
///
/// Debug events are keyed by `(ProcessId, ThreadId)`; continuing an event
/// needs both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub u32);

impl ThreadId
{
    /// Raw thread id as reported by the OS
    pub fn raw(&self) -> u32
    {
        self.0
    }
}

impl From<u32> for ThreadId
{
    fn from(value: u32) -> Self
    {
        Self(value)
    }
}

impl fmt::Display for ThreadId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

/// CPU architecture of a debuggee image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture
{
    /// 32-bit x86
    X86,
    /// x86-64 / AMD64
    X86_64,
    /// ARM64 / AArch64
    Arm64,
    /// Anything else; carries a short description
    Unknown(&'static str),
}

impl Architecture
{
    /// `IMAGE_FILE_MACHINE_*` value used by the stack walker
    pub const fn machine_type(self) -> u32
    {
        match self {
            Architecture::X86 => 0x014C,
            Architecture::X86_64 => 0x8664,
            Architecture::Arm64 => 0xAA64,
            Architecture::Unknown(_) => 0,
        }
    }

    /// Architecture this crate was compiled for.
    pub const fn native() -> Self
    {
        if cfg!(target_arch = "x86_64") {
            Architecture::X86_64
        } else if cfg!(target_arch = "x86") {
            Architecture::X86
        } else if cfg!(target_arch = "aarch64") {
            Architecture::Arm64
        } else {
            Architecture::Unknown("unsupported host")
        }
    }
}

impl fmt::Display for Architecture
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Architecture::X86 => write!(f, "x86"),
            Architecture::X86_64 => write!(f, "x86-64"),
            Architecture::Arm64 => write!(f, "arm64"),
            Architecture::Unknown(what) => write!(f, "unknown ({what})"),
        }
    }
}
