//! Variable location and rendering.

mod common;

use cobalt_core::symbols::BaseKind;
use cobalt_core::typemodel::TypeArena;
use cobalt_core::types::{Address, SymbolFlags, WordSize};
use cobalt_core::variables::{list_variables, locate, read_variable, Location};
use common::{context32, variable, MemoryMap, TableSymbols, TypeRecord};
use pretty_assertions::assert_eq;

const INT: u32 = 1;

const FUNCTION_START: u64 = 0x0040_1000;
const SP: u64 = 0x0012_FF00;
const FP: u64 = 0x0012_FF40;

fn symbols() -> TableSymbols
{
    let mut symbols = TableSymbols::new().with_type(INT, TypeRecord::base(BaseKind::Int, 4));
    symbols.functions.push((FUNCTION_START, 0x100, "main".to_string()));
    symbols
}

fn local(name: &str, offset: i64) -> cobalt_core::types::VariableSymbol
{
    variable(name, INT, 4, SymbolFlags::REGREL | SymbolFlags::LOCAL, offset as u64)
}

#[test]
fn test_frame_relative_after_prologue()
{
    let symbols = symbols();
    let context = context32(FUNCTION_START + 0x10, SP, FP);

    assert_eq!(
        locate(&local("count", -8), &context, &symbols),
        Location::Memory(Address::from(FP - 8))
    );
}

#[test]
fn test_stack_relative_at_function_entry()
{
    let symbols = symbols();
    let context = context32(FUNCTION_START, SP, FP);

    // The return address was just pushed; the frame pointer is still the caller's
    assert_eq!(
        locate(&local("argc", 8), &context, &symbols),
        Location::Memory(Address::from(SP - 4 + 8))
    );
}

#[test]
fn test_pc_outside_any_function_uses_frame_pointer()
{
    let symbols = symbols();
    let context = context32(0x0090_0000, SP, FP);

    assert_eq!(
        locate(&local("x", 12), &context, &symbols),
        Location::Memory(Address::from(FP + 12))
    );
}

#[test]
fn test_register_held_uses_stored_value()
{
    let symbols = symbols();
    let context = context32(FUNCTION_START + 0x10, SP, FP);
    let mut held = variable("i", INT, 4, SymbolFlags::REGISTER, 0);
    held.value = 5;

    assert_eq!(locate(&held, &context, &symbols), Location::Value(5));
    let bytes = read_variable(&held, &context, &symbols, &MemoryMap::new()).unwrap();
    assert_eq!(bytes, vec![5, 0, 0, 0]);
}

#[test]
fn test_absolute_storage()
{
    let symbols = symbols();
    let context = context32(FUNCTION_START + 0x10, SP, FP);
    let global = variable("g_count", INT, 4, 0, 0x0040_3000);

    assert_eq!(locate(&global, &context, &symbols), Location::Memory(Address::from(0x0040_3000)));
}

#[test]
fn test_listing_lines()
{
    let symbols = symbols();
    let context = context32(FUNCTION_START + 0x10, SP, FP);
    let memory = MemoryMap::new()
        .with(FP - 8, &42i32.to_le_bytes())
        .with(0x0040_3000, &(-1i32).to_le_bytes());
    let found = vec![
        local("count", -8),
        variable("g_count", INT, 4, 0, 0x0040_3000),
        variable("g_missing", INT, 4, 0, 0x0050_0000),
    ];
    let mut arena = TypeArena::new(WordSize::Bits32);

    let lines = list_variables(&mut arena, &symbols, &memory, &found, &context, false);
    assert_eq!(
        lines,
        vec!["count(int):  42", "g_count(int):  -1", "g_missing(int):  ??"]
    );
    assert_eq!(arena.len(), 1);
}

#[test]
fn test_verbose_listing_names_flags()
{
    let symbols = symbols();
    let context = context32(FUNCTION_START + 0x10, SP, FP);
    let memory = MemoryMap::new().with(FP - 8, &3i32.to_le_bytes());
    let mut arena = TypeArena::new(WordSize::Bits32);

    let lines = list_variables(&mut arena, &symbols, &memory, &[local("count", -8)], &context, true);
    assert_eq!(lines, vec!["count(int):  3    [SYMFLAG_REGREL SYMFLAG_LOCAL]"]);
}
