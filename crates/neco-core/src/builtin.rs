//! The fixed numeric table of built-in functions.
//!
//! The analyzer resolves calls to these by name and overload; the generator
//! emits `CallBuiltin <id>`; the VM dispatches on the same id. The numbering
//! is part of the binary format and must never be reordered.

use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum BuiltinId {
    Print = 0,
    PrintLine = 1,
    Str = 2,
    Float = 3,
    Int = 4,
    ParseInt = 5,
    ParseFloat = 6,
    Round = 7,
    Floor = 8,
    Ceil = 9,
    ToUpper = 10,
    ToLower = 11,
    Len = 12,
    Random = 13,
    RandomFloat = 14,
    Read = 15,
    Append = 16,
    Add = 17,
    RemoveAt = 18,
    Abs = 19,
    PrintNewline = 20,
}

impl BuiltinId {
    pub const ALL: [BuiltinId; 21] = [
        BuiltinId::Print,
        BuiltinId::PrintLine,
        BuiltinId::Str,
        BuiltinId::Float,
        BuiltinId::Int,
        BuiltinId::ParseInt,
        BuiltinId::ParseFloat,
        BuiltinId::Round,
        BuiltinId::Floor,
        BuiltinId::Ceil,
        BuiltinId::ToUpper,
        BuiltinId::ToLower,
        BuiltinId::Len,
        BuiltinId::Random,
        BuiltinId::RandomFloat,
        BuiltinId::Read,
        BuiltinId::Append,
        BuiltinId::Add,
        BuiltinId::RemoveAt,
        BuiltinId::Abs,
        BuiltinId::PrintNewline,
    ];

    /// The name scripts call this built-in by.
    pub fn name(self) -> &'static str {
        match self {
            BuiltinId::Print => "print",
            BuiltinId::PrintLine => "printLine",
            BuiltinId::Str => "str",
            BuiltinId::Float => "float",
            BuiltinId::Int => "int",
            BuiltinId::ParseInt => "parseInt",
            BuiltinId::ParseFloat => "parseFloat",
            BuiltinId::Round => "round",
            BuiltinId::Floor => "floor",
            BuiltinId::Ceil => "ceil",
            BuiltinId::ToUpper => "toUpper",
            BuiltinId::ToLower => "toLower",
            BuiltinId::Len => "len",
            BuiltinId::Random => "random",
            BuiltinId::RandomFloat => "randomFloat",
            BuiltinId::Read => "read",
            BuiltinId::Append => "append",
            BuiltinId::Add => "add",
            BuiltinId::RemoveAt => "removeAt",
            BuiltinId::Abs => "abs",
            BuiltinId::PrintNewline => "printLine",
        }
    }

    /// How many values the built-in pops from the argument stack.
    pub fn arity(self) -> usize {
        match self {
            BuiltinId::RandomFloat | BuiltinId::Read | BuiltinId::PrintNewline => 0,
            BuiltinId::Random | BuiltinId::Append | BuiltinId::Add | BuiltinId::RemoveAt => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_bytes() {
        for (i, id) in BuiltinId::ALL.iter().enumerate() {
            let byte: u8 = (*id).into();
            assert_eq!(byte as usize, i);
            assert_eq!(BuiltinId::try_from(byte).ok(), Some(*id));
        }
        assert!(BuiltinId::try_from(21u8).is_err());
    }

    #[test]
    fn printline_without_arguments_shares_its_name() {
        assert_eq!(BuiltinId::PrintNewline.name(), BuiltinId::PrintLine.name());
        assert_eq!(BuiltinId::PrintNewline.arity(), 0);
    }
}
