//! # Symbols
//!
//! Interface to the platform's debug-information provider.
//!
//! The provider is split in two traits:
//!
//! - [`TypeInfoSource`]: per-type-id queries (tag, base kind, children, ...)
//!   used by the [type model](crate::typemodel) to build type nodes.
//! - [`SymbolProvider`]: module registration, address lookups, variable
//!   enumeration and the stack-walk primitive.
//!
//! Lookups that can legitimately fail for a single item return `Option`; the
//! caller renders a placeholder and moves on. Only whole-operation failures
//! (registering a module, enumerating a scope) return `Result`.
//!
//! On Windows both traits are backed by dbghelp. Tests use table-driven doubles.

mod demangle;
mod tags;

pub use demangle::display_name;
pub use tags::{BaseKind, SymTag};

use crate::error::Result;
use crate::types::{Address, ModuleLoad, ProcessId, SourceLine, SymbolFormat, SymbolHit, SymbolScope, ThreadId, VariableSymbol, WordSize};
use crate::unwind::StackWalker;

/// Type-information queries, keyed by (module base, type id)
pub trait TypeInfoSource
{
    /// Record kind of a type id
    fn tag(&self, module: Address, type_id: u32) -> Option<SymTag>;

    /// Built-in kind of a `BaseType` (also the underlying type of an `Enum`)
    fn base_kind(&self, module: Address, type_id: u32) -> Option<BaseKind>;

    /// Size in bytes
    fn length(&self, module: Address, type_id: u32) -> Option<u64>;

    /// Pointee, element, aliased, member or return type
    fn inner_type(&self, module: Address, type_id: u32) -> Option<u32>;

    /// `true` for C++ references (as opposed to pointers)
    fn is_reference(&self, module: Address, type_id: u32) -> bool;

    /// Element count of an array
    fn count(&self, module: Address, type_id: u32) -> Option<u32>;

    /// Child ids (members, enumerators, parameters), in declaration order
    fn children(&self, module: Address, type_id: u32) -> Vec<u32>;

    /// Declared name
    fn name(&self, module: Address, type_id: u32) -> Option<String>;

    /// Byte offset of a data member or base class inside its record
    fn offset(&self, module: Address, type_id: u32) -> Option<u32>;

    /// Value of an enumerator constant
    fn constant_value(&self, module: Address, type_id: u32) -> Option<i128>;
}

/// Debug-information provider for one target process
///
/// ## Lifecycle
///
/// `initialize` on the process-created event, `load_module` for the image and
/// every loaded DLL, `unload_module` when a DLL goes away, `cleanup` when the
/// process exits or the session detaches.
pub trait SymbolProvider: TypeInfoSource
{
    /// Start a symbol session for a freshly created or attached process.
    fn initialize(&mut self, pid: ProcessId) -> Result<()>;

    /// Register a module's debug information.
    fn load_module(&mut self, load: &ModuleLoad) -> Result<()>;

    /// Forget a module's debug information.
    fn unload_module(&mut self, base: Address) -> Result<()>;

    /// End the symbol session. Safe to call when not initialized.
    fn cleanup(&mut self);

    /// Symbol covering `address`
    fn symbol_from_address(&self, address: Address) -> Option<SymbolHit>;

    /// Source line covering `address`
    fn line_from_address(&self, address: Address) -> Option<SourceLine>;

    /// Name of the module containing `address`
    fn module_name(&self, address: Address) -> Option<String>;

    /// Load base of the module containing `address`
    fn module_base(&self, address: Address) -> Option<Address>;

    /// Kind of debug information loaded for the module at `base`
    fn symbol_format(&self, base: Address) -> SymbolFormat;

    /// Data symbols of a scope whose names match `mask` (`*` wildcards; empty
    /// matches everything).
    ///
    /// ## Errors
    ///
    /// - `Symbol`: the scope could not be set or enumerated
    fn enumerate_variables(&self, scope: SymbolScope, mask: &str) -> Result<Vec<VariableSymbol>>;

    /// Stack-walk primitive for a stopped thread.
    fn stack_walker(&self, thread: ThreadId, word: WordSize) -> Result<Box<dyn StackWalker + '_>>;
}
