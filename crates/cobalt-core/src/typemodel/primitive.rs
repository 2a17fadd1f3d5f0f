//! C primitive types.

use std::fmt;

use crate::symbols::BaseKind;

/// Closed set of C built-in types a `BaseType` record maps onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive
{
    /// Unrecognised base kind
    None,
    Void,
    Bool,
    Char,
    UChar,
    WChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
}

impl Primitive
{
    /// Map a base kind and byte length onto a C type.
    ///
    /// Integer and float kinds are disambiguated by width; anything the
    /// debug info does not classify becomes [`Primitive::None`].
    ///
    /// ```rust
    /// use cobalt_core::symbols::BaseKind;
    /// use cobalt_core::typemodel::Primitive;
    ///
    /// assert_eq!(Primitive::from_base(BaseKind::UInt, 1), Primitive::UChar);
    /// assert_eq!(Primitive::from_base(BaseKind::Int, 8), Primitive::LongLong);
    /// assert_eq!(Primitive::from_base(BaseKind::Float, 8), Primitive::Double);
    /// ```
    pub const fn from_base(kind: BaseKind, length: u64) -> Self
    {
        match kind {
            BaseKind::Void => Primitive::Void,
            BaseKind::Char => Primitive::Char,
            BaseKind::WChar => Primitive::WChar,
            BaseKind::Int => match length {
                2 => Primitive::Short,
                4 => Primitive::Int,
                _ => Primitive::LongLong,
            },
            BaseKind::UInt => match length {
                1 => Primitive::UChar,
                2 => Primitive::UShort,
                4 => Primitive::UInt,
                _ => Primitive::ULongLong,
            },
            BaseKind::Float => match length {
                4 => Primitive::Float,
                _ => Primitive::Double,
            },
            BaseKind::Bool => Primitive::Bool,
            BaseKind::Long => Primitive::Long,
            BaseKind::ULong => Primitive::ULong,
            BaseKind::NoType | BaseKind::Other(_) => Primitive::None,
        }
    }

    /// C spelling of the type
    pub const fn name(self) -> &'static str
    {
        match self {
            Primitive::None => "<no-type>",
            Primitive::Void => "void",
            Primitive::Bool => "bool",
            Primitive::Char => "char",
            Primitive::UChar => "unsigned char",
            Primitive::WChar => "wchar_t",
            Primitive::Short => "short",
            Primitive::UShort => "unsigned short",
            Primitive::Int => "int",
            Primitive::UInt => "unsigned int",
            Primitive::Long => "long",
            Primitive::ULong => "unsigned long",
            Primitive::LongLong => "long long",
            Primitive::ULongLong => "unsigned long long",
            Primitive::Float => "float",
            Primitive::Double => "double",
        }
    }

    /// Bytes read when formatting a value (`long` is 32 bits on Windows)
    pub const fn size(self) -> usize
    {
        match self {
            Primitive::None | Primitive::Void => 0,
            Primitive::Bool | Primitive::Char | Primitive::UChar => 1,
            Primitive::WChar | Primitive::Short | Primitive::UShort => 2,
            Primitive::Int | Primitive::UInt | Primitive::Long | Primitive::ULong | Primitive::Float => 4,
            Primitive::LongLong | Primitive::ULongLong | Primitive::Double => 8,
        }
    }

    /// Render the value at the start of `bytes`.
    ///
    /// Returns `??` for `void`, unrecognised kinds and buffers shorter than
    /// the type.
    pub fn format(self, bytes: &[u8]) -> String
    {
        let Some(raw) = bytes.get(..self.size()).filter(|raw| !raw.is_empty()) else {
            return "??".to_string();
        };
        match self {
            Primitive::None | Primitive::Void => "??".to_string(),
            Primitive::Bool => (if raw[0] == 0 { "false" } else { "true" }).to_string(),
            Primitive::Char => safe_char(raw[0]).to_string(),
            Primitive::UChar => format!("{:02X}", raw[0]),
            Primitive::WChar => safe_wchar(u16::from_le_bytes([raw[0], raw[1]])).to_string(),
            Primitive::Float => f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]).to_string(),
            Primitive::Double => {
                let mut word = [0u8; 8];
                word.copy_from_slice(raw);
                f64::from_le_bytes(word).to_string()
            }
            _ => self.integer(raw).map_or_else(|| "??".to_string(), |value| value.to_string()),
        }
    }

    /// Integer value of `bytes` read as this type, used for enumerator matching.
    ///
    /// Types without an integer reading (`bool`, floats, `void`) compare as
    /// `int`.
    pub fn integer_value(self, bytes: &[u8]) -> Option<i128>
    {
        let kind = match self {
            Primitive::None | Primitive::Void | Primitive::Bool | Primitive::Float | Primitive::Double => {
                Primitive::Int
            }
            other => other,
        };
        kind.integer(bytes.get(..kind.size())?)
    }

    fn integer(self, raw: &[u8]) -> Option<i128>
    {
        let value = match self {
            Primitive::Char => i128::from(i8::from_le_bytes(raw.try_into().ok()?)),
            Primitive::UChar => i128::from(u8::from_le_bytes(raw.try_into().ok()?)),
            Primitive::Short => i128::from(i16::from_le_bytes(raw.try_into().ok()?)),
            Primitive::WChar | Primitive::UShort => i128::from(u16::from_le_bytes(raw.try_into().ok()?)),
            Primitive::Int | Primitive::Long => i128::from(i32::from_le_bytes(raw.try_into().ok()?)),
            Primitive::UInt | Primitive::ULong => i128::from(u32::from_le_bytes(raw.try_into().ok()?)),
            Primitive::LongLong => i128::from(i64::from_le_bytes(raw.try_into().ok()?)),
            Primitive::ULongLong => i128::from(u64::from_le_bytes(raw.try_into().ok()?)),
            _ => return None,
        };
        Some(value)
    }
}

impl fmt::Display for Primitive
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.name())
    }
}

/// Console-safe rendering of a narrow character.
fn safe_char(byte: u8) -> char
{
    if (0x1E..=0x7F).contains(&byte) {
        char::from(byte)
    } else {
        '?'
    }
}

/// Console-safe rendering of a UTF-16 code unit.
fn safe_wchar(unit: u16) -> char
{
    if unit < 0x1E {
        return '?';
    }
    char::from_u32(u32::from(unit)).filter(|c| !c.is_control()).unwrap_or('?')
}
