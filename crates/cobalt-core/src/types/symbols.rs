//! Symbol records handed out by the symbol provider.

use std::fmt;
use std::path::PathBuf;

use super::Address;

/// dbghelp `SYMFLAG_*` bits describing where and how a symbol is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SymbolFlags(pub u32);

impl SymbolFlags
{
    pub const VALUE_PRESENT: u32 = 0x0000_0001;
    pub const REGISTER: u32 = 0x0000_0008;
    pub const REGREL: u32 = 0x0000_0010;
    pub const FRAMEREL: u32 = 0x0000_0020;
    pub const PARAMETER: u32 = 0x0000_0040;
    pub const LOCAL: u32 = 0x0000_0080;
    pub const CONSTANT: u32 = 0x0000_0100;
    pub const EXPORT: u32 = 0x0000_0200;
    pub const FORWARDER: u32 = 0x0000_0400;
    pub const FUNCTION: u32 = 0x0000_0800;
    pub const VIRTUAL: u32 = 0x0000_1000;
    pub const THUNK: u32 = 0x0000_2000;
    pub const TLSREL: u32 = 0x0000_4000;
    pub const SLOT: u32 = 0x0000_8000;
    pub const ILREL: u32 = 0x0001_0000;
    pub const METADATA: u32 = 0x0002_0000;
    pub const CLR_TOKEN: u32 = 0x0004_0000;
    pub const NULL: u32 = 0x0008_0000;
    pub const FUNC_NO_RETURN: u32 = 0x0010_0000;
    pub const SYNTHETIC_ZEROBASE: u32 = 0x0020_0000;
    pub const PUBLIC_CODE: u32 = 0x0040_0000;

    const NAMES: [(u32, &'static str); 21] = [
        (Self::VALUE_PRESENT, "SYMFLAG_VALUEPRESENT"),
        (Self::REGISTER, "SYMFLAG_REGISTER"),
        (Self::REGREL, "SYMFLAG_REGREL"),
        (Self::FRAMEREL, "SYMFLAG_FRAMEREL"),
        (Self::PARAMETER, "SYMFLAG_PARAMETER"),
        (Self::LOCAL, "SYMFLAG_LOCAL"),
        (Self::CONSTANT, "SYMFLAG_CONSTANT"),
        (Self::EXPORT, "SYMFLAG_EXPORT"),
        (Self::FORWARDER, "SYMFLAG_FORWARDER"),
        (Self::FUNCTION, "SYMFLAG_FUNCTION"),
        (Self::VIRTUAL, "SYMFLAG_VIRTUAL"),
        (Self::THUNK, "SYMFLAG_THUNK"),
        (Self::TLSREL, "SYMFLAG_TLSREL"),
        (Self::SLOT, "SYMFLAG_SLOT"),
        (Self::ILREL, "SYMFLAG_ILREL"),
        (Self::METADATA, "SYMFLAG_METADATA"),
        (Self::CLR_TOKEN, "SYMFLAG_CLR_TOKEN"),
        (Self::NULL, "SYMFLAG_NULL"),
        (Self::FUNC_NO_RETURN, "SYMFLAG_FUNC_NO_RETURN"),
        (Self::SYNTHETIC_ZEROBASE, "SYMFLAG_SYNTHETIC_ZEROBASE"),
        (Self::PUBLIC_CODE, "SYMFLAG_PUBLIC_CODE"),
    ];

    pub const fn contains(self, bit: u32) -> bool
    {
        self.0 & bit != 0
    }

    /// Space-joined `SYMFLAG_*` names of every set bit.
    #[must_use]
    pub fn describe(self) -> String
    {
        Self::NAMES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Where a variable's value lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage
{
    /// Fixed address (globals, statics)
    Absolute,
    /// Offset from the frame (or, at function entry, stack) pointer
    RegisterRelative,
    /// Value held in a register or known constant; no memory address
    RegisterHeld,
}

/// Data symbol enumerated from debug info
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSymbol
{
    /// Type index inside the owning module's debug info
    pub type_id: u32,
    /// Size of the value in bytes
    pub size: u32,
    /// Base address of the module containing the symbol
    pub module_base: Address,
    /// Storage flags
    pub flags: SymbolFlags,
    /// Stored raw value (register-held and constant symbols)
    pub value: u64,
    /// Absolute address, or the register-relative offset for `REGREL` symbols
    pub address: u64,
    /// Register index holding the value or used as the relative base
    pub register: u32,
    /// Display name
    pub name: String,
}

impl VariableSymbol
{
    /// Classify the storage flags.
    pub fn storage(&self) -> Storage
    {
        if self.flags.contains(SymbolFlags::REGREL) {
            Storage::RegisterRelative
        } else if self.flags.contains(SymbolFlags::REGISTER) || self.flags.contains(SymbolFlags::VALUE_PRESENT) {
            Storage::RegisterHeld
        } else {
            Storage::Absolute
        }
    }
}

/// Symbol covering an address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolHit
{
    /// Raw symbol name as stored in the debug info
    pub name: String,
    /// Distance of the queried address from the symbol start
    pub displacement: u64,
}

/// Source position of an address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine
{
    pub file: PathBuf,
    pub line: u32,
    /// Distance of the queried address from the line's first instruction
    pub displacement: u32,
}

impl fmt::Display for SourceLine
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// Kind of debug information loaded for a module (dbghelp `SYM_TYPE`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymbolFormat
{
    #[default]
    None,
    Coff,
    CodeView,
    Pdb,
    Export,
    Deferred,
    Sym,
    Dia,
    Virtual,
}

impl SymbolFormat
{
    /// Map a raw `SYM_TYPE` value.
    pub const fn from_raw(raw: u32) -> Self
    {
        match raw {
            1 => SymbolFormat::Coff,
            2 => SymbolFormat::CodeView,
            3 => SymbolFormat::Pdb,
            4 => SymbolFormat::Export,
            5 => SymbolFormat::Deferred,
            6 => SymbolFormat::Sym,
            7 => SymbolFormat::Dia,
            8 => SymbolFormat::Virtual,
            _ => SymbolFormat::None,
        }
    }
}

impl fmt::Display for SymbolFormat
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            SymbolFormat::None => "none",
            SymbolFormat::Coff => "coff",
            SymbolFormat::CodeView => "codeview",
            SymbolFormat::Pdb => "pdb",
            SymbolFormat::Export => "export",
            SymbolFormat::Deferred => "deferred",
            SymbolFormat::Sym => "sym",
            SymbolFormat::Dia => "dia",
            SymbolFormat::Virtual => "virtual",
        };
        f.write_str(label)
    }
}

/// Which variables to enumerate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope
{
    /// Globals of the module containing this address
    Module(Address),
    /// Locals and parameters of the function containing this address
    Frame(Address),
}

/// Module announced by a process-created or module-loaded event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLoad
{
    /// Load base in the target
    pub base: Address,
    /// Image path, when the OS could resolve one
    pub image: Option<PathBuf>,
}
