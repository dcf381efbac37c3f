//! Compile-time instructions.

use std::fmt;

use super::opcode::{MAX_LINE_DELTA, Opcode, OperandWidth};

/// One entry of an instruction stream.
///
/// Every instruction occupies exactly one entry regardless of its encoded
/// width, so jump distances counted in entries stay valid when a jump is
/// widened to its extended form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand: u16,
}

impl Instruction {
    #[inline]
    pub fn new(opcode: Opcode, operand: u16) -> Self {
        Self { opcode, operand }
    }

    #[inline]
    pub fn bare(opcode: Opcode) -> Self {
        Self { opcode, operand: 0 }
    }

    /// A line offset. `delta` must be in `1..=127`.
    #[inline]
    pub fn line(delta: u16) -> Self {
        debug_assert!((1..=MAX_LINE_DELTA).contains(&delta));
        Self {
            opcode: Opcode::LineOffset,
            operand: delta,
        }
    }

    /// An instruction taking `operand`, widened to the extended twin when the
    /// value does not fit one byte.
    pub fn sized(opcode: Opcode, operand: u16) -> Self {
        match opcode.extended() {
            Some(ext) if operand > 0xFF => Self::new(ext, operand),
            _ => Self::new(opcode.narrow(), operand),
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.opcode == Opcode::Tombstone
    }

    /// Number of bytes this instruction takes in a binary module.
    pub fn encoded_len(&self) -> usize {
        match self.opcode {
            Opcode::Tombstone => 0,
            op => match op.operand_width() {
                OperandWidth::None => 1,
                OperandWidth::Byte => 2,
                OperandWidth::Wide => 3,
            },
        }
    }

    /// Absolute index a jump at `index` lands on.
    pub fn jump_target(&self, index: usize) -> Option<usize> {
        if self.opcode.is_forward_jump() {
            Some(index + 1 + usize::from(self.operand))
        } else if self.opcode.narrow() == Opcode::JumpBack {
            (index + 1).checked_sub(usize::from(self.operand))
        } else {
            None
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.opcode == Opcode::LineOffset {
            return write!(f, "LINE +{}", self.operand);
        }
        match self.opcode.operand_width() {
            OperandWidth::None => f.write_str(self.opcode.mnemonic()),
            OperandWidth::Byte | OperandWidth::Wide => {
                write!(f, "{} {}", self.opcode.mnemonic(), self.operand)
            }
        }
    }
}
