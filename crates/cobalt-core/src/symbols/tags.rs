//! Debug-info tag and base-type enumerations.
//!
//! Values follow the PDB `cvconst.h` numbering the symbol provider reports.

/// Kind of a debug-info record (`SymTag*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymTag
{
    Function,
    Data,
    Udt,
    Enum,
    FunctionType,
    PointerType,
    ArrayType,
    BaseType,
    Typedef,
    BaseClass,
    FunctionArgType,
    Other(u32),
}

impl SymTag
{
    pub const fn from_raw(raw: u32) -> Self
    {
        match raw {
            5 => SymTag::Function,
            7 => SymTag::Data,
            11 => SymTag::Udt,
            12 => SymTag::Enum,
            13 => SymTag::FunctionType,
            14 => SymTag::PointerType,
            15 => SymTag::ArrayType,
            16 => SymTag::BaseType,
            17 => SymTag::Typedef,
            18 => SymTag::BaseClass,
            20 => SymTag::FunctionArgType,
            other => SymTag::Other(other),
        }
    }

    pub const fn raw(self) -> u32
    {
        match self {
            SymTag::Function => 5,
            SymTag::Data => 7,
            SymTag::Udt => 11,
            SymTag::Enum => 12,
            SymTag::FunctionType => 13,
            SymTag::PointerType => 14,
            SymTag::ArrayType => 15,
            SymTag::BaseType => 16,
            SymTag::Typedef => 17,
            SymTag::BaseClass => 18,
            SymTag::FunctionArgType => 20,
            SymTag::Other(raw) => raw,
        }
    }

    /// Children of a record that contribute to its value.
    pub const fn is_record_member(self) -> bool
    {
        matches!(self, SymTag::Data | SymTag::BaseClass)
    }
}

/// Built-in type kind of a `BaseType` record (`bt*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseKind
{
    NoType,
    Void,
    Char,
    WChar,
    Int,
    UInt,
    Float,
    Bool,
    Long,
    ULong,
    Other(u32),
}

impl BaseKind
{
    pub const fn from_raw(raw: u32) -> Self
    {
        match raw {
            0 => BaseKind::NoType,
            1 => BaseKind::Void,
            2 => BaseKind::Char,
            3 => BaseKind::WChar,
            6 => BaseKind::Int,
            7 => BaseKind::UInt,
            8 => BaseKind::Float,
            10 => BaseKind::Bool,
            13 => BaseKind::Long,
            14 => BaseKind::ULong,
            other => BaseKind::Other(other),
        }
    }

    pub const fn raw(self) -> u32
    {
        match self {
            BaseKind::NoType => 0,
            BaseKind::Void => 1,
            BaseKind::Char => 2,
            BaseKind::WChar => 3,
            BaseKind::Int => 6,
            BaseKind::UInt => 7,
            BaseKind::Float => 8,
            BaseKind::Bool => 10,
            BaseKind::Long => 13,
            BaseKind::ULong => 14,
            BaseKind::Other(raw) => raw,
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_tag_raw_values()
    {
        for raw in 0..32 {
            assert_eq!(SymTag::from_raw(raw).raw(), raw);
            assert_eq!(BaseKind::from_raw(raw).raw(), raw);
        }
        assert_eq!(SymTag::from_raw(11), SymTag::Udt);
        assert_eq!(BaseKind::from_raw(7), BaseKind::UInt);
    }

    #[test]
    fn test_record_members()
    {
        assert!(SymTag::Data.is_record_member());
        assert!(SymTag::BaseClass.is_record_member());
        assert!(!SymTag::Function.is_record_member());
        assert!(!SymTag::Typedef.is_record_member());
    }
}
