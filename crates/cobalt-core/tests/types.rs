//! Tests for platform-agnostic types

use cobalt_core::types::{
    Address, BlockKind, ContextParts, HeapKind, ProcessId, Storage, SymbolFlags, SymbolFormat, ThreadContext,
    VariableSymbol, WordSize,
};

#[test]
fn test_process_id_from_u32()
{
    let pid = ProcessId::from(12345);
    assert_eq!(pid.0, 12345);
    let value: u32 = pid.into();
    assert_eq!(value, 12345);
}

#[test]
fn test_address_hex_follows_word_size()
{
    let address = Address::from(0x0000_7FF6_0040_1000);
    assert_eq!(address.to_hex(WordSize::Bits64), "00007FF600401000");
    assert_eq!(address.to_hex(WordSize::Bits32), "00401000");
    assert_eq!(Address::from(0x1000).to_string(), "0x00001000");
}

#[test]
fn test_address_arithmetic_wraps()
{
    assert_eq!((Address::ZERO - 4).value(), u64::MAX - 3);
    assert_eq!(Address::from(0x1000).offset(-8), Address::from(0x0FF8));
    assert!(Address::ZERO.is_null());
}

#[test]
fn test_word_size_read()
{
    let bytes = [0x78, 0x56, 0x34, 0x12, 0x00, 0x00, 0x00, 0x80];
    assert_eq!(WordSize::Bits32.read(&bytes), Some(0x1234_5678));
    assert_eq!(WordSize::Bits64.read(&bytes), Some(0x8000_0000_1234_5678));
    assert_eq!(WordSize::Bits64.read(&bytes[..4]), None);
}

#[test]
fn test_control_context_display()
{
    let context = ThreadContext::control(
        WordSize::Bits32,
        Address::from(0x0040_1000),
        Address::from(0x0012_FF00),
        Address::from(0x0012_FF40),
    );
    assert_eq!(context.parts, ContextParts::CONTROL);
    assert_eq!(context.to_string(), "EIP=00401000 ESP=0012FF00 EBP=0012FF40 EFL=00000000");
}

#[test]
fn test_symbol_storage_classification()
{
    let mut symbol = VariableSymbol {
        type_id: 1,
        size: 4,
        module_base: Address::from(0x0040_0000),
        flags: SymbolFlags(0),
        value: 0,
        address: 0x0040_3000,
        register: 0,
        name: "g_count".to_string(),
    };
    assert_eq!(symbol.storage(), Storage::Absolute);

    symbol.flags = SymbolFlags(SymbolFlags::REGREL | SymbolFlags::PARAMETER);
    assert_eq!(symbol.storage(), Storage::RegisterRelative);
    assert_eq!(symbol.flags.describe(), "SYMFLAG_REGREL SYMFLAG_PARAMETER");

    symbol.flags = SymbolFlags(SymbolFlags::REGISTER);
    assert_eq!(symbol.storage(), Storage::RegisterHeld);
}

#[test]
fn test_snapshot_kind_labels()
{
    assert_eq!(HeapKind::from_flags(1).to_string(), "default");
    assert_eq!(HeapKind::from_flags(2).to_string(), "shared");
    assert_eq!(BlockKind::from_flags(4).to_string(), "moveable");
    assert_eq!(BlockKind::from_flags(0).to_string(), "--");
    assert_eq!(SymbolFormat::from_raw(3).to_string(), "pdb");
    assert_eq!(SymbolFormat::from_raw(42), SymbolFormat::None);
}
