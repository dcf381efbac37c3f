//! Bytecode operation codes.
//!
//! The numeric value of an opcode decides how many operand bytes follow it
//! in the binary encoding:
//!
//! | range          | operand                                   |
//! |----------------|-------------------------------------------|
//! | `0x00..=0x1F`  | 2 bytes, big-endian (extended forms)      |
//! | `0x20..=0x4F`  | 1 byte                                    |
//! | `0x50..=0x7E`  | none                                      |
//! | `0x7F`         | tombstone, never serialized               |
//! | `0x80..=0xFF`  | line offset, delta in the low 7 bits      |

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// First opcode with a 1-byte operand.
pub const NARROW_START: u8 = 0x20;
/// First opcode without an operand.
pub const BARE_START: u8 = 0x50;
/// Encoded line offsets have this bit set.
pub const LINE_OFFSET_BIT: u8 = 0x80;
/// Largest delta one line-offset instruction can carry.
pub const MAX_LINE_DELTA: u16 = 0x7F;

/// How many operand bytes follow an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandWidth {
    None,
    Byte,
    Wide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    // =========================================================================
    // Extended forms (2-byte operand)
    // =========================================================================
    JumpExt = 0x00,
    JumpIfFalseExt = 0x01,
    JumpIfTrueExt = 0x02,
    JumpBackExt = 0x03,
    LoadConstStringExt = 0x04,
    LoadConstIntExt = 0x05,
    LoadConstFloatExt = 0x06,
    InsertConstStringExt = 0x07,
    InsertConstIntExt = 0x08,
    InsertConstFloatExt = 0x09,
    CallExt = 0x0A,

    // =========================================================================
    // 1-byte operand
    // =========================================================================
    /// Forward jump by the operand, counted in instructions.
    Jump = 0x20,
    /// Pop a bool; jump forward when it is false.
    JumpIfFalse = 0x21,
    /// Pop a bool; jump forward when it is true.
    JumpIfTrue = 0x22,
    /// Backward jump by the operand.
    JumpBack = 0x23,
    LoadConstString = 0x24,
    LoadConstInt = 0x25,
    LoadConstFloat = 0x26,
    /// Insert a pooled string into the collection on top of the stack.
    InsertConstString = 0x27,
    InsertConstInt = 0x28,
    InsertConstFloat = 0x29,
    LoadLocal = 0x2A,
    StoreLocal = 0x2B,
    LoadGlobal = 0x2C,
    StoreGlobal = 0x2D,
    /// Declare a slot holding the default value of the type markers that
    /// follow.
    DeclareLocal = 0x2E,
    LoadRegister = 0x2F,
    StoreRegister = 0x30,
    /// Pop the operand's number of field values into a new struct.
    CreateStruct = 0x31,
    GetField = 0x32,
    /// Pop the struct, then the value.
    SetField = 0x33,
    Call = 0x34,
    CallBuiltin = 0x35,

    // =========================================================================
    // No operand
    // =========================================================================
    Pop = 0x50,
    Dup = 0x51,
    PushNone = 0x52,
    PushTrue = 0x53,
    PushFalse = 0x54,
    Add = 0x55,
    Sub = 0x56,
    Mul = 0x57,
    Div = 0x58,
    Mod = 0x59,
    Pow = 0x5A,
    Neg = 0x5B,
    Not = 0x5C,
    Equal = 0x5D,
    NotEqual = 0x5E,
    Less = 0x5F,
    LessEqual = 0x60,
    Greater = 0x61,
    GreaterEqual = 0x62,
    In = 0x63,
    CreateList = 0x64,
    CreateSet = 0x65,
    /// Pop a value and append it to the list below it.
    Append = 0x66,
    /// Pop a value and insert it into the set below it.
    Insert = 0x67,
    GetIndex = 0x68,
    /// Pop key, container and value.
    SetIndex = 0x69,
    ScopePush = 0x6A,
    ScopePop = 0x6B,
    Return = 0x6C,
    /// Pop the exit code and stop.
    Halt = 0x6D,
    TypeBool = 0x6E,
    TypeInt = 0x6F,
    TypeFloat = 0x70,
    TypeString = 0x71,
    TypeAny = 0x72,
    TypeNone = 0x73,
    TypeList = 0x74,
    TypeSet = 0x75,

    /// Removed by the optimizer; skipped by every consumer.
    Tombstone = 0x7F,
    /// Advance the source line by the operand (1..=127).
    LineOffset = 0x80,
}

impl Opcode {
    pub fn operand_width(self) -> OperandWidth {
        let byte = u8::from(self);
        if byte >= BARE_START {
            OperandWidth::None
        } else if byte >= NARROW_START {
            OperandWidth::Byte
        } else {
            OperandWidth::Wide
        }
    }

    /// Decode a non-line-offset opcode byte.
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        if byte >= LINE_OFFSET_BIT {
            return Some(Opcode::LineOffset);
        }
        Opcode::try_from(byte).ok()
    }

    /// The 2-byte twin of a 1-byte opcode.
    pub fn extended(self) -> Option<Opcode> {
        Some(match self {
            Opcode::Jump => Opcode::JumpExt,
            Opcode::JumpIfFalse => Opcode::JumpIfFalseExt,
            Opcode::JumpIfTrue => Opcode::JumpIfTrueExt,
            Opcode::JumpBack => Opcode::JumpBackExt,
            Opcode::LoadConstString => Opcode::LoadConstStringExt,
            Opcode::LoadConstInt => Opcode::LoadConstIntExt,
            Opcode::LoadConstFloat => Opcode::LoadConstFloatExt,
            Opcode::InsertConstString => Opcode::InsertConstStringExt,
            Opcode::InsertConstInt => Opcode::InsertConstIntExt,
            Opcode::InsertConstFloat => Opcode::InsertConstFloatExt,
            Opcode::Call => Opcode::CallExt,
            _ => return None,
        })
    }

    /// The 1-byte twin of an extended opcode; other opcodes map to themselves.
    pub fn narrow(self) -> Opcode {
        match self {
            Opcode::JumpExt => Opcode::Jump,
            Opcode::JumpIfFalseExt => Opcode::JumpIfFalse,
            Opcode::JumpIfTrueExt => Opcode::JumpIfTrue,
            Opcode::JumpBackExt => Opcode::JumpBack,
            Opcode::LoadConstStringExt => Opcode::LoadConstString,
            Opcode::LoadConstIntExt => Opcode::LoadConstInt,
            Opcode::LoadConstFloatExt => Opcode::LoadConstFloat,
            Opcode::InsertConstStringExt => Opcode::InsertConstString,
            Opcode::InsertConstIntExt => Opcode::InsertConstInt,
            Opcode::InsertConstFloatExt => Opcode::InsertConstFloat,
            Opcode::CallExt => Opcode::Call,
            other => other,
        }
    }

    pub fn is_forward_jump(self) -> bool {
        matches!(
            self.narrow(),
            Opcode::Jump | Opcode::JumpIfFalse | Opcode::JumpIfTrue
        )
    }

    pub fn is_jump(self) -> bool {
        self.is_forward_jump() || self.narrow() == Opcode::JumpBack
    }

    /// Nested type markers following a `DeclareLocal`.
    pub fn is_type_marker(self) -> bool {
        (Opcode::TypeBool as u8..=Opcode::TypeSet as u8).contains(&(self as u8))
    }

    /// Composite markers are followed by their element's marker.
    pub fn is_composite_marker(self) -> bool {
        matches!(self, Opcode::TypeList | Opcode::TypeSet)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::JumpExt => "JUMP_EXT",
            Opcode::JumpIfFalseExt => "JUMP_IF_FALSE_EXT",
            Opcode::JumpIfTrueExt => "JUMP_IF_TRUE_EXT",
            Opcode::JumpBackExt => "JUMP_BACK_EXT",
            Opcode::LoadConstStringExt => "LOAD_CONST_STRING_EXT",
            Opcode::LoadConstIntExt => "LOAD_CONST_INT_EXT",
            Opcode::LoadConstFloatExt => "LOAD_CONST_FLOAT_EXT",
            Opcode::InsertConstStringExt => "INSERT_CONST_STRING_EXT",
            Opcode::InsertConstIntExt => "INSERT_CONST_INT_EXT",
            Opcode::InsertConstFloatExt => "INSERT_CONST_FLOAT_EXT",
            Opcode::CallExt => "CALL_EXT",
            Opcode::Jump => "JUMP",
            Opcode::JumpIfFalse => "JUMP_IF_FALSE",
            Opcode::JumpIfTrue => "JUMP_IF_TRUE",
            Opcode::JumpBack => "JUMP_BACK",
            Opcode::LoadConstString => "LOAD_CONST_STRING",
            Opcode::LoadConstInt => "LOAD_CONST_INT",
            Opcode::LoadConstFloat => "LOAD_CONST_FLOAT",
            Opcode::InsertConstString => "INSERT_CONST_STRING",
            Opcode::InsertConstInt => "INSERT_CONST_INT",
            Opcode::InsertConstFloat => "INSERT_CONST_FLOAT",
            Opcode::LoadLocal => "LOAD_LOCAL",
            Opcode::StoreLocal => "STORE_LOCAL",
            Opcode::LoadGlobal => "LOAD_GLOBAL",
            Opcode::StoreGlobal => "STORE_GLOBAL",
            Opcode::DeclareLocal => "DECLARE_LOCAL",
            Opcode::LoadRegister => "LOAD_REGISTER",
            Opcode::StoreRegister => "STORE_REGISTER",
            Opcode::CreateStruct => "CREATE_STRUCT",
            Opcode::GetField => "GET_FIELD",
            Opcode::SetField => "SET_FIELD",
            Opcode::Call => "CALL",
            Opcode::CallBuiltin => "CALL_BUILTIN",
            Opcode::Pop => "POP",
            Opcode::Dup => "DUP",
            Opcode::PushNone => "PUSH_NONE",
            Opcode::PushTrue => "PUSH_TRUE",
            Opcode::PushFalse => "PUSH_FALSE",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Pow => "POW",
            Opcode::Neg => "NEG",
            Opcode::Not => "NOT",
            Opcode::Equal => "EQUAL",
            Opcode::NotEqual => "NOT_EQUAL",
            Opcode::Less => "LESS",
            Opcode::LessEqual => "LESS_EQUAL",
            Opcode::Greater => "GREATER",
            Opcode::GreaterEqual => "GREATER_EQUAL",
            Opcode::In => "IN",
            Opcode::CreateList => "CREATE_LIST",
            Opcode::CreateSet => "CREATE_SET",
            Opcode::Append => "APPEND",
            Opcode::Insert => "INSERT",
            Opcode::GetIndex => "GET_INDEX",
            Opcode::SetIndex => "SET_INDEX",
            Opcode::ScopePush => "SCOPE_PUSH",
            Opcode::ScopePop => "SCOPE_POP",
            Opcode::Return => "RETURN",
            Opcode::Halt => "HALT",
            Opcode::TypeBool => "TYPE_BOOL",
            Opcode::TypeInt => "TYPE_INT",
            Opcode::TypeFloat => "TYPE_FLOAT",
            Opcode::TypeString => "TYPE_STRING",
            Opcode::TypeAny => "TYPE_ANY",
            Opcode::TypeNone => "TYPE_NONE",
            Opcode::TypeList => "TYPE_LIST",
            Opcode::TypeSet => "TYPE_SET",
            Opcode::Tombstone => "TOMBSTONE",
            Opcode::LineOffset => "LINE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_follow_ranges() {
        assert_eq!(Opcode::JumpExt.operand_width(), OperandWidth::Wide);
        assert_eq!(Opcode::CallExt.operand_width(), OperandWidth::Wide);
        assert_eq!(Opcode::Jump.operand_width(), OperandWidth::Byte);
        assert_eq!(Opcode::CallBuiltin.operand_width(), OperandWidth::Byte);
        assert_eq!(Opcode::Pop.operand_width(), OperandWidth::None);
        assert_eq!(Opcode::TypeSet.operand_width(), OperandWidth::None);
        assert_eq!(Opcode::LineOffset.operand_width(), OperandWidth::None);
    }

    #[test]
    fn extended_twins_round_trip() {
        for op in [
            Opcode::Jump,
            Opcode::JumpIfFalse,
            Opcode::JumpBack,
            Opcode::LoadConstFloat,
            Opcode::InsertConstString,
            Opcode::Call,
        ] {
            let ext = op.extended().unwrap();
            assert_eq!(ext.operand_width(), OperandWidth::Wide);
            assert_eq!(ext.narrow(), op);
        }
        assert_eq!(Opcode::LoadLocal.extended(), None);
    }

    #[test]
    fn line_offsets_decode_from_high_bit() {
        assert_eq!(Opcode::from_byte(0x81), Some(Opcode::LineOffset));
        assert_eq!(Opcode::from_byte(0xFF), Some(Opcode::LineOffset));
        assert_eq!(Opcode::from_byte(0x4F), None);
        assert_eq!(Opcode::from_byte(0x55), Some(Opcode::Add));
    }

    #[test]
    fn type_markers() {
        assert!(Opcode::TypeInt.is_type_marker());
        assert!(Opcode::TypeList.is_composite_marker());
        assert!(!Opcode::Halt.is_type_marker());
    }
}
