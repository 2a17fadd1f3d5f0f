//! Thread register context.
//!
//! A [`ThreadContext`] is a snapshot of one thread's registers taken while
//! the target is halted. The OS lets callers request subsets of the context
//! independently, which [`ContextParts`] models.

use std::fmt;
use std::ops::BitOr;

use super::{Address, WordSize};

/// Register subsets that can be requested from the OS
///
/// ```rust
/// use cobalt_core::types::ContextParts;
///
/// let parts = ContextParts::CONTROL | ContextParts::INTEGER;
/// assert!(parts.contains(ContextParts::CONTROL));
/// assert!(!parts.contains(ContextParts::DEBUG_REGISTERS));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContextParts(u8);

impl ContextParts
{
    /// Program counter, stack pointer, frame pointer, flags
    pub const CONTROL: Self = ContextParts(0x01);
    /// General-purpose integer registers
    pub const INTEGER: Self = ContextParts(0x02);
    /// Segment selectors
    pub const SEGMENTS: Self = ContextParts(0x04);
    /// Hardware debug registers (DR0-DR7)
    pub const DEBUG_REGISTERS: Self = ContextParts(0x08);
    /// Everything the `registers` command shows
    pub const ALL: Self = ContextParts(0x0F);

    /// `true` if every bit of `other` is requested
    pub const fn contains(self, other: Self) -> bool
    {
        self.0 & other.0 == other.0
    }

    /// Raw bit pattern
    pub const fn bits(self) -> u8
    {
        self.0
    }
}

impl BitOr for ContextParts
{
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output
    {
        ContextParts(self.0 | rhs.0)
    }
}

/// One named register value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register
{
    /// Register name as shown to the operator (`EAX`, `R8`, `DR7`, ...)
    pub name: &'static str,
    /// Raw value
    pub value: u64,
}

impl Register
{
    pub const fn new(name: &'static str, value: u64) -> Self
    {
        Self { name, value }
    }
}

/// Captured register state of a halted thread
///
/// The control registers the engine relies on (`pc`, `sp`, `fp`) are named
/// fields; the remaining subsets are kept as ordered lists for display. Lists
/// for subsets that were not requested stay empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadContext
{
    /// Pointer width of the thread's process
    pub word: WordSize,
    /// Subsets actually captured
    pub parts: ContextParts,
    /// Program counter (EIP / RIP)
    pub pc: Address,
    /// Stack pointer (ESP / RSP)
    pub sp: Address,
    /// Frame pointer (EBP / RBP)
    pub fp: Address,
    /// Flags register (EFLAGS)
    pub flags: u64,
    /// General-purpose registers
    pub integer: Vec<Register>,
    /// Segment selectors
    pub segments: Vec<Register>,
    /// Debug registers
    pub debug: Vec<Register>,
}

impl ThreadContext
{
    /// Control-only context, which is all variable resolution and unwinding need.
    pub fn control(word: WordSize, pc: Address, sp: Address, fp: Address) -> Self
    {
        Self {
            word,
            parts: ContextParts::CONTROL,
            pc,
            sp,
            fp,
            flags: 0,
            integer: Vec::new(),
            segments: Vec::new(),
            debug: Vec::new(),
        }
    }

    /// Control registers with their architectural names.
    pub fn control_registers(&self) -> [Register; 4]
    {
        let (pc, sp, fp) = match self.word {
            WordSize::Bits32 => ("EIP", "ESP", "EBP"),
            WordSize::Bits64 => ("RIP", "RSP", "RBP"),
        };
        [
            Register::new(pc, self.pc.value()),
            Register::new(sp, self.sp.value()),
            Register::new(fp, self.fp.value()),
            Register::new("EFL", self.flags),
        ]
    }

    /// All captured registers in display order.
    pub fn registers(&self) -> Vec<Register>
    {
        let mut all = Vec::with_capacity(4 + self.integer.len() + self.segments.len() + self.debug.len());
        all.extend_from_slice(&self.integer);
        if self.parts.contains(ContextParts::CONTROL) {
            all.extend_from_slice(&self.control_registers());
        }
        all.extend_from_slice(&self.segments);
        all.extend_from_slice(&self.debug);
        all
    }
}

impl fmt::Display for ThreadContext
{
    /// Four `NAME=VALUE` pairs per line, values padded to the word width.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        for (index, register) in self.registers().iter().enumerate() {
            if index > 0 {
                f.write_str(if index % 4 == 0 { "\n" } else { " " })?;
            }
            write!(f, "{:>3}={}", register.name, Address::from(register.value).to_hex(self.word))?;
        }
        Ok(())
    }
}
