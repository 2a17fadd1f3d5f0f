//! Target address and word-size types.

use std::fmt;
use std::ops::{Add, Sub};

/// Address in the debuggee's virtual address space
///
/// Addresses are always stored as `u64`, even for 32-bit targets. How many
/// hex digits are shown depends on the target's [`WordSize`], so formatting
/// goes through [`Address::to_hex`] rather than `Display` whenever the width
/// matters.
///
/// ## Example
///
/// ```rust
/// use cobalt_core::types::{Address, WordSize};
///
/// let addr = Address::from(0x0040_1000);
/// assert_eq!(addr.to_hex(WordSize::Bits32), "00401000");
/// assert_eq!((addr + 0x10).value(), 0x0040_1010);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u64);

impl Address
{
    /// The null address
    pub const ZERO: Self = Address(0);

    /// Create an address in const contexts.
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Raw value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// `true` for the null address
    pub const fn is_null(self) -> bool
    {
        self.0 == 0
    }

    /// Add a signed displacement (register-relative offsets are signed).
    #[must_use]
    pub const fn offset(self, displacement: i64) -> Self
    {
        Address(self.0.wrapping_add_signed(displacement))
    }

    /// Uppercase, zero-padded hex with as many digits as the word size needs.
    #[must_use]
    pub fn to_hex(self, word: WordSize) -> String
    {
        match word {
            WordSize::Bits32 => format!("{:08X}", self.0 & 0xFFFF_FFFF),
            WordSize::Bits64 => format!("{:016X}", self.0),
        }
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:08X}", self.0)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}

/// Pointer width of the debuggee
///
/// Drives pointer formatting in the type model and the `SP - word` rule used
/// for variables at a function's first instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordSize
{
    /// 32-bit target (x86)
    Bits32,
    /// 64-bit target (x86-64, arm64)
    Bits64,
}

impl WordSize
{
    /// Word size of the machine this crate was compiled for.
    pub const fn native() -> Self
    {
        if cfg!(target_pointer_width = "64") {
            WordSize::Bits64
        } else {
            WordSize::Bits32
        }
    }

    /// Width in bytes
    pub const fn bytes(self) -> usize
    {
        match self {
            WordSize::Bits32 => 4,
            WordSize::Bits64 => 8,
        }
    }

    /// Read one word from the start of `bytes`, little-endian.
    ///
    /// Returns `None` when `bytes` is shorter than a word.
    pub fn read(self, bytes: &[u8]) -> Option<u64>
    {
        match self {
            WordSize::Bits32 => bytes.get(..4)?.try_into().ok().map(|b| u64::from(u32::from_le_bytes(b))),
            WordSize::Bits64 => bytes.get(..8)?.try_into().ok().map(u64::from_le_bytes),
        }
    }
}

impl Default for WordSize
{
    fn default() -> Self
    {
        Self::native()
    }
}
