//! # Variable Resolution
//!
//! Locates a variable in the halted target and renders it through the type model.
//!
//! ## Register-relative storage
//!
//! Locals and parameters are stored as an offset from the frame pointer.
//! While the program counter sits on a function's first instruction the
//! prologue has not run yet, so the frame pointer still belongs to the
//! caller. In that case the base is the stack pointer minus one word (the
//! return address the call just pushed).

use tracing::{debug, warn};

use crate::backend::MemoryAccess;
use crate::symbols::SymbolProvider;
use crate::typemodel::TypeArena;
use crate::types::{Address, Storage, ThreadContext, VariableSymbol};

/// Where a variable's bytes come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location
{
    /// Target memory
    Memory(Address),
    /// The symbol record itself carries the value
    Value(u64),
}

/// Compute where a variable lives for the given register snapshot.
///
/// ```rust,ignore
/// // offset -8 from EBP, program counter past the prologue
/// assert_eq!(locate(&local, &context, symbols), Location::Memory(context.fp.offset(-8)));
/// ```
pub fn locate<P>(symbol: &VariableSymbol, context: &ThreadContext, symbols: &P) -> Location
where
    P: SymbolProvider + ?Sized,
{
    match symbol.storage() {
        Storage::Absolute => Location::Memory(Address::from(symbol.address)),
        Storage::RegisterHeld => Location::Value(symbol.value),
        Storage::RegisterRelative => {
            let at_entry = symbols.symbol_from_address(context.pc).is_some_and(|hit| hit.displacement == 0);
            let base = if at_entry {
                context.sp - context.word.bytes() as u64
            } else {
                context.fp
            };
            Location::Memory(mask(base + symbol.address, context))
        }
    }
}

/// Truncate a computed address to the target's pointer width.
fn mask(address: Address, context: &ThreadContext) -> Address
{
    match context.word.bytes() {
        4 => Address::from(address.value() & 0xFFFF_FFFF),
        _ => address,
    }
}

/// Raw bytes of a variable, `None` when its memory cannot be read.
pub fn read_variable<P, M>(symbol: &VariableSymbol, context: &ThreadContext, symbols: &P, memory: &M) -> Option<Vec<u8>>
where
    P: SymbolProvider + ?Sized,
    M: MemoryAccess + ?Sized,
{
    let len = symbol.size as usize;
    match locate(symbol, context, symbols) {
        Location::Value(value) => Some(value.to_le_bytes().into_iter().take(len.min(8)).collect()),
        Location::Memory(address) => match memory.read_memory(address, len) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                debug!(name = %symbol.name, %address, "variable unreadable: {err}");
                None
            }
        },
    }
}

/// One listing line: `name(type):  value`.
///
/// With `verbose` the storage flags follow on the same line.
pub fn describe_variable<P, M>(
    arena: &mut TypeArena,
    symbols: &P,
    memory: &M,
    symbol: &VariableSymbol,
    context: &ThreadContext,
    verbose: bool,
) -> String
where
    P: SymbolProvider + ?Sized,
    M: MemoryAccess + ?Sized,
{
    let ty = arena.resolve(symbols, symbol.module_base, symbol.type_id);
    let value = read_variable(symbol, context, symbols, memory)
        .map_or_else(|| "??".to_string(), |bytes| arena.format_value(ty, &bytes));
    let mut line = format!("{}({}):  {}", symbol.name, arena.type_name(ty), value);
    if verbose {
        line.push_str(&format!("    [{}]", symbol.flags.describe()));
    }
    line
}

/// Describe every variable in `symbols_found`, in order.
pub fn list_variables<P, M>(
    arena: &mut TypeArena,
    symbols: &P,
    memory: &M,
    symbols_found: &[VariableSymbol],
    context: &ThreadContext,
    verbose: bool,
) -> Vec<String>
where
    P: SymbolProvider + ?Sized,
    M: MemoryAccess + ?Sized,
{
    if symbols_found.is_empty() {
        warn!("no variables matched");
    }
    symbols_found
        .iter()
        .map(|symbol| describe_variable(arena, symbols, memory, symbol, context, verbose))
        .collect()
}
