//! Read-only snapshot entities.
//!
//! Rebuilt on every listing command, never mutated in place.

use std::fmt;
use std::path::PathBuf;

use super::symbols::SymbolFormat;
use super::{Address, ProcessId, ThreadId};

/// Entry of a process listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo
{
    pub pid: ProcessId,
    pub parent: ProcessId,
    pub thread_count: u32,
    /// Executable file name (no directory)
    pub exe: String,
}

/// Entry of a thread listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadInfo
{
    pub tid: ThreadId,
    pub owner: ProcessId,
}

/// Entry of a module listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo
{
    pub base: Address,
    pub size: u32,
    /// OS module handle value
    pub handle: u64,
    pub name: String,
    pub path: PathBuf,
    /// Debug info kind; filled in from the symbol provider after enumeration
    pub symbol_format: SymbolFormat,
}

/// Raw heap-list record as enumerated from the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapListEntry
{
    /// OS heap identifier used to enumerate its blocks
    pub heap_id: u64,
    pub owner: ProcessId,
    pub flags: u32,
}

/// Heap with its blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapInfo
{
    pub owner: ProcessId,
    /// Heap kind flag; see [`HeapKind`]
    pub flags: u32,
    pub blocks: Vec<HeapBlock>,
}

impl HeapInfo
{
    pub fn kind(&self) -> HeapKind
    {
        HeapKind::from_flags(self.flags)
    }
}

/// One heap block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapBlock
{
    pub handle: u64,
    pub owner: ProcessId,
    pub address: Address,
    pub size: u64,
    /// Block kind flags; see [`BlockKind`]
    pub flags: u32,
}

impl HeapBlock
{
    pub fn kind(&self) -> BlockKind
    {
        BlockKind::from_flags(self.flags)
    }
}

/// Heap kind (`HF32_*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapKind
{
    Default,
    Shared,
    Other,
}

impl HeapKind
{
    pub const fn from_flags(flags: u32) -> Self
    {
        match flags {
            1 => HeapKind::Default,
            2 => HeapKind::Shared,
            _ => HeapKind::Other,
        }
    }
}

impl fmt::Display for HeapKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(match self {
            HeapKind::Default => "default",
            HeapKind::Shared => "shared",
            HeapKind::Other => "--",
        })
    }
}

/// Heap block kind (`LF32_*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind
{
    Fixed,
    Free,
    Moveable,
    Other,
}

impl BlockKind
{
    pub const fn from_flags(flags: u32) -> Self
    {
        match flags {
            1 => BlockKind::Fixed,
            2 => BlockKind::Free,
            4 => BlockKind::Moveable,
            _ => BlockKind::Other,
        }
    }
}

impl fmt::Display for BlockKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(match self {
            BlockKind::Fixed => "fixed",
            BlockKind::Free => "free",
            BlockKind::Moveable => "moveable",
            BlockKind::Other => "--",
        })
    }
}
